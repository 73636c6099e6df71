//! # Blacklist
//!
//! Failure score per address. Every failed verification adds one point;
//! at the configured threshold the address is refused admission until
//! the score decays.
//!
//! ## Design
//!
//! - Scores live in a [`TtlStore`]; each increment restarts the decay timer
//! - A threshold of zero disables blocking entirely

use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::store::TtlStore;

/// Per-address failure scores.
#[derive(Debug)]
pub struct Blacklist {
    scores: TtlStore<IpAddr, u32>,
}

impl Blacklist {
    /// Creates an empty blacklist whose scores decay after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { scores: TtlStore::new(ttl) }
    }

    /// Current score of `address`.
    #[must_use]
    pub fn score(&self, address: IpAddr) -> u32 {
        self.score_at(address, Instant::now())
    }

    /// Current score of `address` as seen at `now`.
    #[must_use]
    pub fn score_at(&self, address: IpAddr, now: Instant) -> u32 {
        self.scores.get_at(&address, now).unwrap_or(0)
    }

    /// Adds one failure. Returns the new score.
    pub fn increment(&self, address: IpAddr) -> u32 {
        self.increment_at(address, Instant::now())
    }

    /// Adds one failure at `now`. Returns the new score.
    pub fn increment_at(&self, address: IpAddr, now: Instant) -> u32 {
        self.scores.compute_at(address, now, |score| Some(score.unwrap_or(0).saturating_add(1))).unwrap_or(0)
    }

    /// True if `address` reached `threshold`. Zero disables the check.
    #[must_use]
    pub fn is_blacklisted(&self, address: IpAddr, threshold: u32) -> bool {
        self.is_blacklisted_at(address, threshold, Instant::now())
    }

    /// [`Blacklist::is_blacklisted`] at an explicit instant.
    #[must_use]
    pub fn is_blacklisted_at(&self, address: IpAddr, threshold: u32, now: Instant) -> bool {
        threshold > 0 && self.score_at(address, now) >= threshold
    }

    /// Forgets `address`.
    pub fn remove(&self, address: IpAddr) {
        self.scores.compute_at(address, Instant::now(), |_| None);
    }

    /// Forgets everyone.
    pub fn clear(&self) {
        self.scores.clear();
    }

    /// Number of addresses with a live score.
    #[must_use]
    pub fn size(&self) -> usize {
        self.scores.size_at(Instant::now())
    }

    /// Drops decayed scores.
    pub fn purge_expired(&self) -> usize {
        self.scores.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
    const TTL: Duration = Duration::from_secs(600);

    #[test]
    fn test_below_threshold_is_usable() {
        let blacklist = Blacklist::new(TTL);
        let now = Instant::now();

        assert_eq!(blacklist.increment_at(ADDRESS, now), 1);
        assert!(!blacklist.is_blacklisted_at(ADDRESS, 2, now));
        assert_eq!(blacklist.increment_at(ADDRESS, now), 2);
        assert!(blacklist.is_blacklisted_at(ADDRESS, 2, now));
    }

    #[test]
    fn test_score_decays() {
        let blacklist = Blacklist::new(TTL);
        let now = Instant::now();
        blacklist.increment_at(ADDRESS, now);
        blacklist.increment_at(ADDRESS, now);

        assert!(!blacklist.is_blacklisted_at(ADDRESS, 2, now + TTL));
        assert_eq!(blacklist.score_at(ADDRESS, now + TTL), 0);
    }

    #[test]
    fn test_zero_threshold_disables() {
        let blacklist = Blacklist::new(TTL);
        let now = Instant::now();
        blacklist.increment_at(ADDRESS, now);

        assert!(!blacklist.is_blacklisted_at(ADDRESS, 0, now));
    }

    #[test]
    fn test_remove_and_clear() {
        let blacklist = Blacklist::new(TTL);
        blacklist.increment(ADDRESS);
        blacklist.remove(ADDRESS);
        assert_eq!(blacklist.score(ADDRESS), 0);

        blacklist.increment(ADDRESS);
        blacklist.clear();
        assert_eq!(blacklist.size(), 0);
    }
}
