//! # Queue Ticker
//!
//! Drives [`Gatekeeper::tick`] on a fixed interval and hands the started
//! sessions to the host, each with the [`Ticket`] its login was queued under.
//!
//! ```text
//! ┌──────────────┐ every poll_interval ┌──────────────┐  Session   ┌──────────────┐
//! │ tokio timer  │────────────────────>│  Gatekeeper  │───────────>│  host I/O    │
//! └──────────────┘                     └──────────────┘ (channel)  └──────────────┘
//! ```
//!
//! The ticker owns no sessions. Missed ticks are skipped rather than
//! replayed, so a stalled runtime never starts a burst of sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tokio::time::MissedTickBehavior;

use crate::gatekeeper::{Gatekeeper, Ticket};
use crate::session::Session;

/// Ticks between two purges of expired entries.
const PURGE_EVERY: u64 = 20;

/// Stops a running [`Ticker`] from any thread.
#[derive(Clone, Debug)]
pub struct TickerHandle {
    running: Arc<AtomicBool>,
}

impl TickerHandle {
    /// Asks the ticker to stop after its current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the ticker loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

/// Periodic driver of one gatekeeper.
pub struct Ticker {
    gatekeeper: Arc<Gatekeeper>,
    sessions: Sender<(Ticket, Session)>,
    running: Arc<AtomicBool>,
    ticks: u64,
}

impl Ticker {
    /// Creates a ticker delivering started sessions to `sessions`.
    #[must_use]
    pub fn new(gatekeeper: Arc<Gatekeeper>, sessions: Sender<(Ticket, Session)>) -> Self {
        Self { gatekeeper, sessions, running: Arc::new(AtomicBool::new(false)), ticks: 0 }
    }

    /// Handle that stops the loop.
    #[must_use]
    pub fn handle(&self) -> TickerHandle {
        TickerHandle { running: Arc::clone(&self.running) }
    }

    /// Runs one tick; returns the number of sessions started.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.ticks += 1;
        if self.ticks % PURGE_EVERY == 0 {
            let purged = self.gatekeeper.purge_expired();
            if purged > 0 {
                tracing::debug!("purged {} expired entries", purged);
            }
        }

        let mut started = 0;
        for (ticket, session) in self.gatekeeper.tick(now) {
            if self.sessions.send((ticket, session)).is_err() {
                // nobody will ever feed it
                tracing::warn!("session receiver is gone, dropping a session");
                self.gatekeeper.disconnected(ticket);
                continue;
            }
            started += 1;
        }
        started
    }

    /// Ticks until stopped through a [`TickerHandle`] or until the
    /// session receiver is dropped.
    pub async fn run(mut self) {
        let period = Duration::from_millis(self.gatekeeper.verifier().config().queue.poll_interval_ms);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.running.store(true, Ordering::SeqCst);
        tracing::debug!("queue ticker started, interval {:?}", period);

        loop {
            interval.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.tick(Instant::now());
        }
        tracing::debug!("queue ticker stopped after {} ticks", self.ticks);
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker").field("ticks", &self.ticks).field("running", &self.handle().is_running()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LoopbackChannel;
    use crate::config::BastionConfig;
    use crate::connection::LoginAttempt;
    use crate::verifier::Verifier;
    use bastion_protocol::packets::LoginStart;
    use bastion_protocol::ProtocolVersion;

    fn gatekeeper() -> Arc<Gatekeeper> {
        let verifier = Arc::new(Verifier::builder(BastionConfig::default()).seed(2).build());
        Arc::new(Gatekeeper::with_seed(verifier, 2))
    }

    fn queue_login(gatekeeper: &Gatekeeper, address: &str) {
        let attempt = LoginAttempt {
            address: address.parse().unwrap(),
            version: ProtocolVersion::V1_20_5,
            hostname: "play.example.net".into(),
            login: LoginStart { username: "Steve".into(), uuid: None },
            reduced_protocol: false,
            pending: Vec::new(),
        };
        let (channel, _frames) = LoopbackChannel::pair();
        gatekeeper.login(attempt, Box::new(channel), Instant::now());
    }

    #[test]
    fn test_tick_delivers_sessions() {
        let gatekeeper = gatekeeper();
        queue_login(&gatekeeper, "10.0.0.1");
        queue_login(&gatekeeper, "10.0.0.2");

        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut ticker = Ticker::new(Arc::clone(&gatekeeper), sender);
        assert_eq!(ticker.tick(Instant::now()), 2);
        assert_eq!(receiver.try_iter().count(), 2);
        assert_eq!(gatekeeper.verifying(), 2);
    }

    #[test]
    fn test_dropped_receiver_releases_the_address() {
        let gatekeeper = gatekeeper();
        queue_login(&gatekeeper, "10.0.0.1");

        let (sender, receiver) = crossbeam_channel::unbounded();
        drop(receiver);
        let mut ticker = Ticker::new(Arc::clone(&gatekeeper), sender);
        assert_eq!(ticker.tick(Instant::now()), 0);
        assert_eq!(gatekeeper.verifying(), 0);
    }

    #[test]
    fn test_run_stops_on_request() {
        let gatekeeper = gatekeeper();
        let (sender, _receiver) = crossbeam_channel::unbounded();
        let ticker = Ticker::new(gatekeeper, sender);
        let handle = ticker.handle();

        let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        runtime.block_on(async move {
            let stopper = handle.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(120)).await;
                stopper.stop();
            });
            ticker.run().await;
            assert!(!handle.is_running());
        });
    }
}
