//! # Verifier
//!
//! Process-wide state shared by every session of one gate.
//!
//! ## Design
//!
//! - Built once at startup and handed around as `Arc<Verifier>`; nothing
//!   in here is an ambient singleton, so tests can run many gates side by side
//! - Sessions read the configuration and the prepared world, and write
//!   to the verified store, the blacklist and the event channel
//! - The verified store is a trait object so a persistent backend can
//!   replace the in-memory [`TtlStore`]

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bastion_security::{AttackTracker, Blacklist, Fingerprint, IdentityStore, TtlStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::captcha::{Captcha, CaptchaProvider};
use crate::config::BastionConfig;
use crate::events::{EventBus, EventSender};
use crate::world::PreparedWorld;

/// Undelivered events kept when no sender is supplied.
const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Shared verification state.
pub struct Verifier {
    config: BastionConfig,
    world: PreparedWorld,
    verified: Arc<dyn IdentityStore<Fingerprint, Instant>>,
    blacklist: Blacklist,
    attack: AttackTracker,
    events: EventSender,
    captcha: Option<Arc<dyn CaptchaProvider>>,
}

impl Verifier {
    /// Starts building a verifier for `config`.
    #[must_use]
    pub fn builder(config: BastionConfig) -> VerifierBuilder {
        VerifierBuilder::new(config)
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &BastionConfig {
        &self.config
    }

    /// The synthetic world.
    #[must_use]
    pub const fn world(&self) -> &PreparedWorld {
        &self.world
    }

    /// Store of verified fingerprints.
    #[must_use]
    pub fn verified(&self) -> &dyn IdentityStore<Fingerprint, Instant> {
        self.verified.as_ref()
    }

    /// Whether `fingerprint` passed recently.
    #[must_use]
    pub fn is_verified(&self, fingerprint: &Fingerprint) -> bool {
        self.verified.contains(fingerprint)
    }

    /// Failure scores.
    #[must_use]
    pub const fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Attack tracker.
    #[must_use]
    pub const fn attack(&self) -> &AttackTracker {
        &self.attack
    }

    /// True while attack mode is active.
    #[inline]
    #[must_use]
    pub fn is_under_attack(&self) -> bool {
        self.attack.is_under_attack()
    }

    /// Event channel.
    #[must_use]
    pub const fn events(&self) -> &EventSender {
        &self.events
    }

    /// Next puzzle from the provider, if one is configured and ready.
    #[must_use]
    pub fn next_captcha(&self) -> Option<Arc<Captcha>> {
        self.captcha.as_ref()?.next_captcha()
    }

    /// Whether per-session logs are written right now.
    #[must_use]
    pub fn should_log(&self) -> bool {
        !self.is_under_attack() || self.config.verification.log_during_attack
    }

    /// `address` as it may appear in logs.
    #[must_use]
    pub fn format_address(&self, address: IpAddr) -> String {
        if self.config.general.log_player_addresses {
            address.to_string()
        } else {
            "<ip address withheld>".to_owned()
        }
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("world", &self.world)
            .field("verified", &self.verified.size())
            .field("blacklisted", &self.blacklist.size())
            .field("under_attack", &self.is_under_attack())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Verifier`].
pub struct VerifierBuilder {
    config: BastionConfig,
    verified: Option<Arc<dyn IdentityStore<Fingerprint, Instant>>>,
    events: Option<EventSender>,
    captcha: Option<Arc<dyn CaptchaProvider>>,
    seed: Option<u64>,
}

impl VerifierBuilder {
    /// Creates a builder with in-memory stores and no CAPTCHA provider.
    #[must_use]
    pub fn new(config: BastionConfig) -> Self {
        Self { config, verified: None, events: None, captcha: None, seed: None }
    }

    /// Uses `store` for verified fingerprints.
    #[must_use]
    pub fn verified_store(mut self, store: Arc<dyn IdentityStore<Fingerprint, Instant>>) -> Self {
        self.verified = Some(store);
        self
    }

    /// Publishes events through `sender`.
    #[must_use]
    pub fn events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Draws puzzles from `provider`.
    #[must_use]
    pub fn captcha_provider(mut self, provider: Arc<dyn CaptchaProvider>) -> Self {
        self.captcha = Some(provider);
        self
    }

    /// Rolls the world from a fixed seed instead of entropy.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Prepares the world and assembles the verifier.
    #[must_use]
    pub fn build(self) -> Verifier {
        let mut rng = self.seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        let world = PreparedWorld::new(&self.config, &mut rng);
        let verification = &self.config.verification;

        let verified = self.verified.unwrap_or_else(|| {
            Arc::new(TtlStore::new(Duration::from_millis(verification.remember_time_ms)))
        });
        let blacklist = Blacklist::new(Duration::from_millis(verification.blacklist_time_ms));
        let attack = AttackTracker::new(self.config.attack.tracker());
        let events = self.events.unwrap_or_else(|| EventBus::create_pair(DEFAULT_EVENT_CAPACITY).0);

        tracing::debug!(
            "prepared world: platform y {}, fall start y {}, {} ticks, budget {} packets",
            world.platform_y,
            world.dynamic_spawn_y,
            world.max_movement_ticks,
            world.max_total_packets
        );

        Verifier { config: self.config, world, verified, blacklist, attack, events, captcha: self.captcha }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::StaticCaptchaProvider;

    #[test]
    fn test_same_seed_same_world() {
        let a = Verifier::builder(BastionConfig::default()).seed(3).build();
        let b = Verifier::builder(BastionConfig::default()).seed(3).build();
        assert_eq!(a.world(), b.world());
    }

    #[test]
    fn test_withheld_addresses() {
        let mut config = BastionConfig::default();
        config.general.log_player_addresses = false;
        let verifier = Verifier::builder(config).seed(1).build();
        assert_eq!(verifier.format_address("10.0.0.1".parse().unwrap()), "<ip address withheld>");
    }

    #[test]
    fn test_captcha_requires_a_provider() {
        let plain = Verifier::builder(BastionConfig::default()).seed(1).build();
        assert!(plain.next_captcha().is_none());

        let provider = Arc::new(StaticCaptchaProvider::new(vec![Captcha::new("abc", Vec::new())]));
        let with_provider = Verifier::builder(BastionConfig::default()).seed(1).captcha_provider(provider).build();
        assert_eq!(with_provider.next_captcha().map(|captcha| captcha.answer().to_owned()), Some("abc".into()));
    }

    #[test]
    fn test_verified_store_is_shared() {
        let store: Arc<dyn IdentityStore<Fingerprint, Instant>> = Arc::new(TtlStore::new(Duration::from_secs(60)));
        let verifier = Verifier::builder(BastionConfig::default()).seed(1).verified_store(Arc::clone(&store)).build();
        let fingerprint = Fingerprint::of("Steve", "10.0.0.1".parse().unwrap());

        store.put(fingerprint, Instant::now());
        assert!(verifier.is_verified(&fingerprint));
    }
}
