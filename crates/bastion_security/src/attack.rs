//! # Attack Tracker
//!
//! Watches verification load and raises a global "under attack" flag.
//!
//! ## Hysteresis
//!
//! ```text
//!               over limit for min_threshold checks
//!   CALM ────────────────────────────────────────────► ATTACK
//!     ▲                                                  │
//!     └──── lasted min_duration AND calm for cooldown ───┘
//! ```
//!
//! A check is "over limit" when joins per second, verifying sessions or
//! queued logins exceed `min_players`. Any calm check resets the counter,
//! so isolated spikes never start an attack.
//!
//! The flag is read lock-free through [`AttackTracker::is_under_attack`];
//! only the scheduler tick takes the state lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Hysteresis thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackConfig {
    /// Load above which a check counts as over limit.
    pub min_players: usize,
    /// Minimum attack length before it may stop.
    pub min_duration: Duration,
    /// Consecutive over-limit checks needed to start an attack.
    pub min_threshold: u32,
    /// Calm time needed before an attack may stop.
    pub cooldown: Duration,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            min_players: 8,
            min_duration: Duration::from_secs(30),
            min_threshold: 2,
            cooldown: Duration::from_secs(3),
        }
    }
}

/// Load observed during one scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSample {
    /// Logins that arrived during the last second.
    pub joins_per_second: usize,
    /// Sessions currently being verified.
    pub verifying: usize,
    /// Logins waiting in the queue.
    pub queued: usize,
}

impl LoadSample {
    fn exceeds(&self, limit: usize) -> bool {
        self.joins_per_second > limit || self.verifying > limit || self.queued > limit
    }
}

/// Statistics of one attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackStatistics {
    /// When the attack was declared.
    pub started: Instant,
    /// When it was cleared, if it was.
    pub ended: Option<Instant>,
    /// Highest joins per second seen.
    pub peak_joins_per_second: usize,
    /// Highest concurrent verifications seen.
    pub peak_verifying: usize,
    /// Longest queue seen.
    pub peak_queued: usize,
}

impl AttackStatistics {
    fn begin(sample: &LoadSample, now: Instant) -> Self {
        Self {
            started: now,
            ended: None,
            peak_joins_per_second: sample.joins_per_second,
            peak_verifying: sample.verifying,
            peak_queued: sample.queued,
        }
    }

    fn record(&mut self, sample: &LoadSample) {
        self.peak_joins_per_second = self.peak_joins_per_second.max(sample.joins_per_second);
        self.peak_verifying = self.peak_verifying.max(sample.verifying);
        self.peak_queued = self.peak_queued.max(sample.queued);
    }

    /// Length of the attack, up to `now` while it is still running.
    #[must_use]
    pub fn duration(&self, now: Instant) -> Duration {
        self.ended.unwrap_or(now).saturating_duration_since(self.started)
    }
}

/// Edge reported by [`AttackTracker::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackTransition {
    /// Attack mode was entered.
    Started(AttackStatistics),
    /// Attack mode was left.
    Stopped(AttackStatistics),
}

#[derive(Debug, Default)]
struct TrackerState {
    over_count: u32,
    last_over: Option<Instant>,
    current: Option<AttackStatistics>,
}

/// Global attack flag with hysteresis.
#[derive(Debug)]
pub struct AttackTracker {
    config: AttackConfig,
    under_attack: AtomicBool,
    state: Mutex<TrackerState>,
}

impl AttackTracker {
    /// Creates a calm tracker.
    #[must_use]
    pub fn new(config: AttackConfig) -> Self {
        Self { config, under_attack: AtomicBool::new(false), state: Mutex::new(TrackerState::default()) }
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn config(&self) -> &AttackConfig {
        &self.config
    }

    /// True while attack mode is active.
    #[must_use]
    pub fn is_under_attack(&self) -> bool {
        self.under_attack.load(Ordering::Acquire)
    }

    /// Statistics of the running attack.
    #[must_use]
    pub fn current(&self) -> Option<AttackStatistics> {
        self.state.lock().current
    }

    /// Feeds one load sample; returns the edge it caused, if any.
    pub fn check(&self, sample: LoadSample, now: Instant) -> Option<AttackTransition> {
        let mut state = self.state.lock();

        if sample.exceeds(self.config.min_players) {
            state.over_count = state.over_count.saturating_add(1);
            state.last_over = Some(now);

            if let Some(stats) = state.current.as_mut() {
                stats.record(&sample);
                return None;
            }
            if state.over_count < self.config.min_threshold {
                return None;
            }

            let stats = AttackStatistics::begin(&sample, now);
            state.current = Some(stats);
            self.under_attack.store(true, Ordering::Release);
            tracing::info!(
                "Attack detected: {} joins/s, {} verifying, {} queued",
                sample.joins_per_second,
                sample.verifying,
                sample.queued
            );
            return Some(AttackTransition::Started(stats));
        }

        state.over_count = 0;
        let stats = state.current?;
        let calm_for = state.last_over.map_or(Duration::MAX, |last| now.saturating_duration_since(last));
        if stats.duration(now) < self.config.min_duration || calm_for < self.config.cooldown {
            return None;
        }

        let finished = AttackStatistics { ended: Some(now), ..stats };
        state.current = None;
        self.under_attack.store(false, Ordering::Release);
        tracing::info!(
            "Attack stopped after {:?}: peak {} joins/s, {} verifying, {} queued",
            finished.duration(now),
            finished.peak_joins_per_second,
            finished.peak_verifying,
            finished.peak_queued
        );
        Some(AttackTransition::Stopped(finished))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AttackConfig {
        AttackConfig {
            min_players: 8,
            min_duration: Duration::from_secs(30),
            min_threshold: 2,
            cooldown: Duration::from_secs(3),
        }
    }

    fn heavy(joins: usize) -> LoadSample {
        LoadSample { joins_per_second: joins, verifying: 0, queued: 0 }
    }

    #[test]
    fn test_single_spike_does_not_start() {
        let tracker = AttackTracker::new(config());
        let now = Instant::now();

        assert_eq!(tracker.check(heavy(50), now), None);
        assert_eq!(tracker.check(LoadSample::default(), now + Duration::from_secs(1)), None);
        assert_eq!(tracker.check(heavy(50), now + Duration::from_secs(2)), None);
        assert!(!tracker.is_under_attack());
    }

    #[test]
    fn test_sustained_load_starts_attack() {
        let tracker = AttackTracker::new(config());
        let now = Instant::now();

        assert_eq!(tracker.check(heavy(9), now), None);
        let started = tracker.check(heavy(12), now + Duration::from_millis(500));
        assert!(matches!(started, Some(AttackTransition::Started(_))));
        assert!(tracker.is_under_attack());
    }

    #[test]
    fn test_attack_respects_min_duration_and_cooldown() {
        let tracker = AttackTracker::new(config());
        let now = Instant::now();
        tracker.check(heavy(20), now);
        tracker.check(heavy(20), now);
        tracker.check(heavy(40), now + Duration::from_secs(10));

        // too short
        assert_eq!(tracker.check(LoadSample::default(), now + Duration::from_secs(20)), None);
        // long enough but the last spike was too recent
        tracker.check(heavy(30), now + Duration::from_secs(29));
        assert_eq!(tracker.check(LoadSample::default(), now + Duration::from_secs(31)), None);
        assert!(tracker.is_under_attack());

        let stopped = tracker.check(LoadSample::default(), now + Duration::from_secs(33));
        let Some(AttackTransition::Stopped(stats)) = stopped else {
            panic!("expected stop, got {stopped:?}");
        };
        assert_eq!(stats.peak_joins_per_second, 40);
        assert_eq!(stats.duration(now), Duration::from_secs(33));
        assert!(!tracker.is_under_attack());
    }

    #[test]
    fn test_any_counter_can_trigger() {
        let tracker = AttackTracker::new(AttackConfig { min_threshold: 1, ..config() });
        let sample = LoadSample { joins_per_second: 0, verifying: 0, queued: 9 };

        assert!(matches!(tracker.check(sample, Instant::now()), Some(AttackTransition::Started(_))));
        assert_eq!(tracker.current().map(|stats| stats.peak_queued), Some(9));
    }
}
