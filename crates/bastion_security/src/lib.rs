//! # BASTION Security - The Ledger
//!
//! Shared verdict state for the verification gate.
//!
//! ## Features
//!
//! - **Fingerprints**: deterministic identity keys from username and address
//! - **Stores**: expire-after-write maps behind the [`IdentityStore`] trait
//! - **Blacklist**: per-address failure score with a blocking threshold
//! - **Rate Limiter**: one attempt per address per reconnect window
//! - **Attack Tracker**: load observation with hysteresis
//!
//! ## Architecture
//!
//! ```text
//! SESSIONS (many workers)                 SHARED STATE
//!     │                                       │
//!     │─── verified? ────────────────────────►│ TtlStore<Fingerprint, Instant>
//!     │─── failed: increment ────────────────►│ Blacklist
//!     │─── attempt ──────────────────────────►│ RateLimiter
//!     │                                       │
//! SCHEDULER TICK                              │
//!     │─── load sample ──────────────────────►│ AttackTracker
//!     │◄── Started / Stopped ─────────────────┤
//! ```
//!
//! Every check-then-write happens under the owning map's lock, so two
//! workers can never interleave on the same key.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bastion_security::{Blacklist, Fingerprint, RateLimiter};
//!
//! let blacklist = Blacklist::new(Duration::from_secs(600));
//! if blacklist.increment(address) >= threshold {
//!     tracing::info!("{} was blacklisted", address);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod attack;
pub mod blacklist;
pub mod fingerprint;
pub mod ratelimit;
pub mod store;

pub use attack::{AttackConfig, AttackStatistics, AttackTracker, AttackTransition, LoadSample};
pub use blacklist::Blacklist;
pub use fingerprint::Fingerprint;
pub use ratelimit::RateLimiter;
pub use store::{IdentityStore, TtlStore};
