//! # Gatekeeper
//!
//! Decides what happens to a login before any challenge is sent, and
//! starts queued sessions at a bounded rate.
//!
//! ## Admission Order
//!
//! ```text
//! unsupported protocol ──────────────────► refuse
//! verified fingerprint ──────────────────► pass through (online-per-ip limit)
//! blacklisted protocol ──────────────────► refuse
//! address blacklisted ───────────────────► refuse
//! timing off, reduced protocol ──────────► pass through (online-per-ip limit)
//! address verifying ─────────────────────► refuse (already verifying)
//! ┌ queue lock ─────────────────────────────────────────────────┐
//! │ address queued ──────────────────────► refuse (already queued) │
//! │ reconnect window ────────────────────► refuse (too fast)       │
//! │ otherwise ───────────────────────────► enqueue                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design
//!
//! - The queue check, the rate limiter and the insert happen under one
//!   lock, so two simultaneous logins from one address can never both be
//!   queued; the first entry is kept
//! - [`Gatekeeper::tick`] moves an address from the queue to the connected
//!   set under the same lock, so it is never in neither
//! - Every admitted connection gets a [`Ticket`]; closing it releases
//!   only what that ticket holds, never another connection's entry
//! - Lock order is queue, then connected

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bastion_protocol::ProtocolVersion;
use bastion_security::{AttackTransition, LoadSample, RateLimiter};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::channel::ClientChannel;
use crate::connection::{LoginAttempt, LoginError};
use crate::dispatcher;
use crate::error::Rejection;
use crate::events::VerificationEvent;
use crate::session::Session;
use crate::verifier::Verifier;

/// One admitted connection.
///
/// Returned by [`Gatekeeper::login`] and reported back through
/// [`Gatekeeper::disconnected`] once the connection closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    id: u64,
    address: IpAddr,
}

impl Ticket {
    /// Address of the connection.
    #[must_use]
    pub const fn address(&self) -> IpAddr {
        self.address
    }
}

/// A login the gate lets through untouched.
pub struct Handoff {
    /// Reported to [`Gatekeeper::disconnected`] when the connection closes.
    pub ticket: Ticket,
    /// The login request.
    pub attempt: LoginAttempt,
    /// The connection, to be handed to the real server.
    pub channel: Box<dyn ClientChannel>,
}

impl std::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff").field("ticket", &self.ticket).field("attempt", &self.attempt).finish_non_exhaustive()
    }
}

/// Result of [`Gatekeeper::login`].
#[derive(Debug)]
pub enum Admission {
    /// Refused; the peer has already been told and the channel closed.
    Rejected(Rejection),
    /// Not verified; the host forwards the connection to the real server.
    PassThrough(Handoff),
    /// Waiting for a scheduler tick to start its session.
    Queued(Ticket),
}

/// Where a login goes once the pre-queue checks passed.
enum Route {
    PassThrough,
    Verify,
}

struct Pending {
    ticket: Ticket,
    attempt: LoginAttempt,
    channel: Box<dyn ClientChannel>,
}

#[derive(Default)]
struct Queue {
    entries: VecDeque<Pending>,
    addresses: HashMap<IpAddr, Ticket>,
}

/// Admission control of one gate.
pub struct Gatekeeper {
    verifier: Arc<Verifier>,
    queue: Mutex<Queue>,
    connected: Mutex<HashMap<IpAddr, Ticket>>,
    online: Mutex<HashMap<IpAddr, HashSet<Ticket>>>,
    rate_limiter: RateLimiter,
    tickets: AtomicU64,
    joins: AtomicUsize,
    last_tick: Mutex<Option<Instant>>,
    seeds: Mutex<ChaCha8Rng>,
}

impl Gatekeeper {
    /// Creates a gatekeeper for `verifier`, seeding sessions from entropy.
    #[must_use]
    pub fn new(verifier: Arc<Verifier>) -> Self {
        Self::with_rng(verifier, ChaCha8Rng::from_entropy())
    }

    /// Creates a gatekeeper whose session seeds derive from `seed`.
    #[must_use]
    pub fn with_seed(verifier: Arc<Verifier>, seed: u64) -> Self {
        Self::with_rng(verifier, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(verifier: Arc<Verifier>, rng: ChaCha8Rng) -> Self {
        let window = Duration::from_millis(verifier.config().verification.reconnect_delay_ms);
        Self {
            verifier,
            queue: Mutex::new(Queue::default()),
            connected: Mutex::new(HashMap::new()),
            online: Mutex::new(HashMap::new()),
            rate_limiter: RateLimiter::new(window),
            tickets: AtomicU64::new(0),
            joins: AtomicUsize::new(0),
            last_tick: Mutex::new(None),
            seeds: Mutex::new(rng),
        }
    }

    /// Shared verification state.
    #[must_use]
    pub const fn verifier(&self) -> &Arc<Verifier> {
        &self.verifier
    }

    /// Decides the fate of one login.
    ///
    /// Rejections are answered on `channel` before returning.
    pub fn login(&self, attempt: LoginAttempt, channel: Box<dyn ClientChannel>, now: Instant) -> Admission {
        self.joins.fetch_add(1, Ordering::Relaxed);
        let ticket = Ticket { id: self.tickets.fetch_add(1, Ordering::Relaxed), address: attempt.address };

        let (attempt, mut channel, rejection) = match self.route(&attempt, now) {
            Ok(Route::PassThrough) => match self.reserve_online(ticket) {
                Ok(()) => return Admission::PassThrough(Handoff { ticket, attempt, channel }),
                Err(rejection) => (attempt, channel, rejection),
            },
            Ok(Route::Verify) => match self.enqueue(Pending { ticket, attempt, channel }, now) {
                Ok(()) => return Admission::Queued(ticket),
                Err((pending, rejection)) => (pending.attempt, pending.channel, rejection),
            },
            Err(rejection) => (attempt, channel, rejection),
        };

        if self.verifier.should_log() {
            tracing::debug!(
                "refused {} ({}): {}",
                attempt.username(),
                self.verifier.format_address(attempt.address),
                rejection
            );
        }
        dispatcher::refuse(channel.as_mut(), attempt.version, rejection, &self.verifier.config().messages);
        Admission::Rejected(rejection)
    }

    /// Checks that need no queue lock.
    fn route(&self, attempt: &LoginAttempt, now: Instant) -> Result<Route, Rejection> {
        let config = &self.verifier.config().verification;
        let address = attempt.address;

        if !attempt.version.is_supported() {
            return Err(Rejection::UnsupportedVersion);
        }
        if self.verifier.is_verified(&attempt.fingerprint()) {
            return Ok(Route::PassThrough);
        }
        if config.blacklisted_protocols.contains(&attempt.version.id()) {
            return Err(Rejection::ProtocolBlacklisted);
        }
        let threshold = config.blacklist_threshold;
        if threshold > 0 && self.verifier.blacklist().is_blacklisted_at(address, threshold, now) {
            return Err(Rejection::Blacklisted);
        }
        if !config.timing.applies(self.verifier.is_under_attack()) {
            return Ok(Route::PassThrough);
        }
        if attempt.reduced_protocol && !config.check_reduced_protocol {
            return Ok(Route::PassThrough);
        }
        if self.connected.lock().contains_key(&address) {
            return Err(Rejection::AlreadyVerifying);
        }
        Ok(Route::Verify)
    }

    /// Counts one more passed-through connection of its address.
    fn reserve_online(&self, ticket: Ticket) -> Result<(), Rejection> {
        let limit = self.verifier.config().general.max_online_per_ip as usize;
        let mut online = self.online.lock();
        let tickets = online.entry(ticket.address).or_default();
        if limit > 0 && tickets.len() >= limit {
            return Err(Rejection::TooManyOnlinePerIp);
        }
        tickets.insert(ticket);
        Ok(())
    }

    fn enqueue(&self, pending: Pending, now: Instant) -> Result<(), (Pending, Rejection)> {
        let address = pending.attempt.address;
        let mut queue = self.queue.lock();
        if queue.addresses.contains_key(&address) {
            return Err((pending, Rejection::AlreadyQueued));
        }
        // a tick may have started this address since the unlocked check
        if self.connected.lock().contains_key(&address) {
            return Err((pending, Rejection::AlreadyVerifying));
        }
        if self.verifier.config().verification.reconnect_delay_ms > 0 && !self.rate_limiter.attempt_at(address, now) {
            return Err((pending, Rejection::ReconnectedTooFast));
        }
        queue.addresses.insert(address, pending.ticket);
        queue.entries.push_back(pending);
        Ok(())
    }

    /// Starts up to `max_queue_polls` queued sessions and samples the load.
    ///
    /// The returned sessions are owned by the caller from here on, paired
    /// with the ticket their login was queued under; their addresses count
    /// as verifying until that ticket is [`Gatekeeper::disconnected`].
    pub fn tick(&self, now: Instant) -> Vec<(Ticket, Session)> {
        let polls = self.verifier.config().queue.max_queue_polls;
        let (started, queued) = {
            let mut queue = self.queue.lock();
            let count = queue.entries.len().min(polls);
            let mut connected = self.connected.lock();
            let mut started = Vec::with_capacity(count);
            for pending in queue.entries.drain(..count) {
                connected.insert(pending.attempt.address, pending.ticket);
                started.push(pending);
            }
            for pending in &started {
                queue.addresses.remove(&pending.attempt.address);
            }
            (started, queue.entries.len())
        };

        let sessions: Vec<(Ticket, Session)> = started
            .into_iter()
            .map(|pending| {
                let seed = self.seeds.lock().gen();
                let session = Session::start(Arc::clone(&self.verifier), pending.attempt, pending.channel, seed, now);
                (pending.ticket, session)
            })
            .collect();

        self.sample_load(now, queued);
        sessions
    }

    fn sample_load(&self, now: Instant, queued: usize) {
        let joins = self.joins.swap(0, Ordering::Relaxed);
        let elapsed = {
            let mut last = self.last_tick.lock();
            let elapsed = last.map_or(Duration::from_secs(1), |last| now.saturating_duration_since(last));
            *last = Some(now);
            elapsed
        };
        // whole joins per second are precise enough for the tracker
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let joins_per_second = (joins as f64 / elapsed.as_secs_f64().max(0.001)).round() as usize;
        let sample = LoadSample { joins_per_second, verifying: self.verifying(), queued };

        match self.verifier.attack().check(sample, now) {
            Some(AttackTransition::Started(_)) => {
                self.verifier.events().send(VerificationEvent::AttackStarted);
            }
            Some(AttackTransition::Stopped(statistics)) => {
                self.verifier.events().send(VerificationEvent::AttackStopped { statistics });
            }
            None => {}
        }
    }

    /// Forgets the closed connection that holds `ticket`.
    pub fn disconnected(&self, ticket: Ticket) {
        let address = ticket.address;
        {
            let mut queue = self.queue.lock();
            if queue.addresses.get(&address) == Some(&ticket) {
                queue.addresses.remove(&address);
                queue.entries.retain(|pending| pending.ticket != ticket);
                return;
            }
            let mut connected = self.connected.lock();
            if connected.get(&address) == Some(&ticket) {
                connected.remove(&address);
                return;
            }
        }
        let mut online = self.online.lock();
        if let Some(tickets) = online.get_mut(&address) {
            tickets.remove(&ticket);
            if tickets.is_empty() {
                online.remove(&address);
            }
        }
    }

    /// Answers a connection whose login bytes could not be read.
    ///
    /// Malformed bytes close the connection silently.
    pub fn reject_login(&self, mut channel: Box<dyn ClientChannel>, version: Option<ProtocolVersion>, error: &LoginError) {
        tracing::debug!("unreadable login: {}", error);
        match error {
            LoginError::Rejected(rejection) => dispatcher::refuse(
                channel.as_mut(),
                version.unwrap_or(ProtocolVersion::OLDEST),
                *rejection,
                &self.verifier.config().messages,
            ),
            LoginError::Frame(_) => channel.close(),
        }
    }

    /// Drops expired blacklist and reconnect entries.
    pub fn purge_expired(&self) -> usize {
        self.verifier.blacklist().purge_expired() + self.rate_limiter.purge_expired()
    }

    /// Logins waiting for a tick.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().entries.len()
    }

    /// Whether `address` waits in the queue.
    #[must_use]
    pub fn is_queued(&self, address: IpAddr) -> bool {
        self.queue.lock().addresses.contains_key(&address)
    }

    /// Addresses with a session in progress.
    #[must_use]
    pub fn verifying(&self) -> usize {
        self.connected.lock().len()
    }

    /// Passed-through connections of `address`.
    #[must_use]
    pub fn online(&self, address: IpAddr) -> usize {
        self.online.lock().get(&address).map_or(0, HashSet::len)
    }
}

impl std::fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("queued", &self.queued())
            .field("verifying", &self.verifying())
            .finish_non_exhaustive()
    }
}
