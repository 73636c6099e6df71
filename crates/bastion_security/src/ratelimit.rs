//! # Reconnect Rate Limiter
//!
//! One verification attempt per address per window. The window starts at
//! the first attempt and is not extended by rejected ones.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::store::TtlStore;

/// Admits an address at most once per window.
#[derive(Debug)]
pub struct RateLimiter {
    attempts: TtlStore<IpAddr, ()>,
}

impl RateLimiter {
    /// Creates a limiter with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { attempts: TtlStore::new(window) }
    }

    /// Records an attempt. Returns false if the address is still inside its window.
    pub fn attempt(&self, address: IpAddr) -> bool {
        self.attempt_at(address, Instant::now())
    }

    /// [`RateLimiter::attempt`] at an explicit instant.
    pub fn attempt_at(&self, address: IpAddr, now: Instant) -> bool {
        self.attempts.insert_if_absent_at(address, (), now)
    }

    /// Drops finished windows.
    pub fn purge_expired(&self) -> usize {
        self.attempts.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    const ADDRESS: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);

    #[test]
    fn test_second_attempt_inside_window_fails() {
        let limiter = RateLimiter::new(Duration::from_secs(8));
        let now = Instant::now();

        assert!(limiter.attempt_at(ADDRESS, now));
        assert!(!limiter.attempt_at(ADDRESS, now + Duration::from_secs(7)));
    }

    #[test]
    fn test_rejected_attempt_does_not_extend_window() {
        let limiter = RateLimiter::new(Duration::from_secs(8));
        let now = Instant::now();

        assert!(limiter.attempt_at(ADDRESS, now));
        assert!(!limiter.attempt_at(ADDRESS, now + Duration::from_secs(7)));
        assert!(limiter.attempt_at(ADDRESS, now + Duration::from_secs(8)));
    }
}
