//! # Configuration
//!
//! Every threshold, timeout and policy the gate consults.
//!
//! ## Design
//!
//! The tree is plain data: `#[serde(default)]` on every section means a
//! file only has to name the values it changes. Loading always runs
//! [`BastionConfig::sanitized`], which clamps out-of-range values and logs
//! a warning for each clamp instead of refusing to start.
//!
//! ```toml
//! [verification]
//! timing = "during_attack"
//!
//! [verification.gravity]
//! max_movement_ticks = 10
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// When a check runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    /// On every login.
    #[default]
    Always,
    /// Only while the attack tracker reports an attack.
    DuringAttack,
    /// Never.
    Never,
}

impl Timing {
    /// Whether the check runs given the current attack state.
    #[must_use]
    pub const fn applies(self, under_attack: bool) -> bool {
        match self {
            Self::Always => true,
            Self::DuringAttack => under_attack,
            Self::Never => false,
        }
    }
}

/// Game mode of the synthetic world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamemode {
    /// Survival.
    Survival,
    /// Creative.
    Creative,
    /// Adventure.
    #[default]
    Adventure,
    /// Spectator.
    Spectator,
}

impl Gamemode {
    /// Wire id.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Survival => 0,
            Self::Creative => 1,
            Self::Adventure => 2,
            Self::Spectator => 3,
        }
    }

    /// Whether the experience bar is visible.
    #[must_use]
    pub const fn shows_experience(self) -> bool {
        matches!(self, Self::Survival | Self::Adventure)
    }
}

/// A regular expression the whole value has to match.
///
/// Invalid expressions fail the config load. The expression is anchored
/// at both ends, so an empty value only passes if the expression allows it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValidPattern {
    source: String,
    regex: Regex,
}

impl ValidPattern {
    /// Compiles `source`.
    ///
    /// # Errors
    ///
    /// The [`regex::Error`] if `source` is not a valid expression or
    /// compiles too large.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self { source: source.to_owned(), regex })
    }

    fn builtin(source: &'static str) -> Self {
        Self::new(source).expect("built-in pattern compiles")
    }

    /// Whether all of `value` matches.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl TryFrom<String> for ValidPattern {
    type Error = regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::new(&source)
    }
}

impl From<ValidPattern> for String {
    fn from(pattern: ValidPattern) -> Self {
        pattern.source
    }
}

impl PartialEq for ValidPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ValidPattern {}

impl fmt::Debug for ValidPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidPattern({:?})", self.source)
    }
}

/// Root of the configuration tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BastionConfig {
    /// Address limits and logging.
    pub general: GeneralConfig,
    /// Attack tracker thresholds.
    pub attack: AttackTrackerConfig,
    /// Admission queue.
    pub queue: QueueConfig,
    /// Verification checks.
    pub verification: VerificationConfig,
    /// Texts sent to clients.
    pub messages: Messages,
}

/// `[general]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Verified accounts allowed online per address; 0 disables the limit.
    pub max_online_per_ip: u32,
    /// Whether logs may contain player addresses.
    pub log_player_addresses: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { max_online_per_ip: 3, log_player_addresses: true }
    }
}

/// `[attack]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct AttackTrackerConfig {
    pub min_players_for_attack: u32,
    pub min_attack_duration_ms: u64,
    pub min_attack_threshold: u32,
    pub attack_cooldown_delay_ms: u64,
}

impl Default for AttackTrackerConfig {
    fn default() -> Self {
        Self {
            min_players_for_attack: 8,
            min_attack_duration_ms: 30_000,
            min_attack_threshold: 2,
            attack_cooldown_delay_ms: 3_000,
        }
    }
}

impl AttackTrackerConfig {
    /// Thresholds in the form the tracker consumes.
    #[must_use]
    pub fn tracker(&self) -> bastion_security::AttackConfig {
        bastion_security::AttackConfig {
            min_players: self.min_players_for_attack as usize,
            min_duration: Duration::from_millis(self.min_attack_duration_ms),
            min_threshold: self.min_attack_threshold,
            cooldown: Duration::from_millis(self.attack_cooldown_delay_ms),
        }
    }
}

/// `[queue]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queued logins started per tick.
    pub max_queue_polls: usize,
    /// Scheduler tick interval.
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_queue_polls: 30, poll_interval_ms: 500 }
    }
}

/// `[verification]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// When logins are verified at all.
    pub timing: Timing,
    /// Whether reduced-protocol clients are verified.
    pub check_reduced_protocol: bool,
    /// Log every new session.
    pub log_connections: bool,
    /// Keep logging sessions and failures while under attack.
    pub log_during_attack: bool,
    /// Longest allowed gap between two inbound packets.
    pub read_timeout_ms: u64,
    /// Window in which an address may start only one verification.
    pub reconnect_delay_ms: u64,
    /// How long a verified fingerprint skips verification.
    pub remember_time_ms: u64,
    /// How long a blacklist score lives after its last failure.
    pub blacklist_time_ms: u64,
    /// Failures that block an address; 0 disables blacklisting.
    pub blacklist_threshold: u32,
    /// Raw protocol ids refused outright.
    pub blacklisted_protocols: Vec<i32>,
    /// Pattern a username has to match.
    pub valid_name_regex: ValidPattern,
    /// Pattern a client locale has to match.
    pub valid_locale_regex: ValidPattern,
    /// World time sent to the client; 1000 sends nothing.
    pub time_of_day: i64,
    /// Host to transfer verified clients to; empty disconnects instead.
    pub transfer_host: String,
    /// Port to transfer verified clients to.
    pub transfer_port: u16,
    /// Gravity and collision check.
    pub gravity: GravityConfig,
    /// Vehicle check.
    pub vehicle: VehicleConfig,
    /// Client brand check.
    pub brand: BrandConfig,
    /// Map CAPTCHA.
    pub captcha: CaptchaConfig,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timing: Timing::Always,
            check_reduced_protocol: true,
            log_connections: true,
            log_during_attack: false,
            read_timeout_ms: 3_500,
            reconnect_delay_ms: 8_000,
            remember_time_ms: 120_000,
            blacklist_time_ms: 600_000,
            blacklist_threshold: 2,
            blacklisted_protocols: Vec::new(),
            valid_name_regex: ValidPattern::builtin("^[a-zA-Z0-9_]+$"),
            valid_locale_regex: ValidPattern::builtin("^[a-zA-Z_]+$"),
            time_of_day: 1_000,
            transfer_host: String::new(),
            transfer_port: 25_565,
            gravity: GravityConfig::default(),
            vehicle: VehicleConfig::default(),
            brand: BrandConfig::default(),
            captcha: CaptchaConfig::default(),
        }
    }
}

impl VerificationConfig {
    /// Read timeout as a duration.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// `[verification.gravity]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    /// Check the free-fall motion.
    pub enabled: bool,
    /// Require landing on the platform.
    pub check_collisions: bool,
    /// Show the CAPTCHA instead of failing a physics check.
    pub captcha_on_fail: bool,
    /// Free-fall ticks checked before landing.
    pub max_movement_ticks: u32,
    /// Game mode of the synthetic world.
    pub gamemode: Gamemode,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_collisions: true,
            captcha_on_fail: false,
            max_movement_ticks: 8,
            gamemode: Gamemode::Adventure,
        }
    }
}

/// `[verification.vehicle]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Run the vehicle stage.
    pub enabled: bool,
    /// Packets of every kind required per vehicle.
    pub minimum_packets: u32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self { enabled: true, minimum_packets: 2 }
    }
}

/// `[verification.brand]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandConfig {
    /// Validate the client brand.
    pub enabled: bool,
    /// Pattern the brand text has to match.
    pub valid_regex: ValidPattern,
    /// Exclusive upper bound of the raw brand payload length.
    pub max_length: usize,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self { enabled: true, valid_regex: ValidPattern::builtin("^[!-~ ]+$"), max_length: 64 }
    }
}

/// `[verification.captcha]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// When the CAPTCHA is shown.
    pub timing: Timing,
    /// Time allowed to solve it, measured from login.
    pub max_duration_ms: u64,
    /// Wrong answers allowed.
    pub max_tries: u32,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self { timing: Timing::Never, max_duration_ms: 45_000, max_tries: 3 }
    }
}

impl CaptchaConfig {
    /// Seconds shown on the experience countdown.
    #[must_use]
    pub const fn countdown_len(&self) -> u64 {
        self.max_duration_ms / 1000
    }
}

/// `[messages]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Messages {
    pub verification_success: String,
    pub verification_failed: String,
    pub already_verifying: String,
    pub already_queued: String,
    pub blacklisted: String,
    pub protocol_blacklisted: String,
    pub unsupported_version: String,
    pub too_many_online_per_ip: String,
    pub too_fast_reconnect: String,
    pub invalid_username: String,
    pub currently_preparing: String,
    pub enter_code: String,
    pub incorrect_captcha: String,
    pub unexpected_error: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            verification_success: "You have successfully passed the verification. You are now able to play on the server when you reconnect.".into(),
            verification_failed: "You have failed the bot verification. Please wait a few seconds before trying to verify again.".into(),
            already_verifying: "Your IP address is currently being verified. Please wait a few seconds before trying to verify again.".into(),
            already_queued: "Your IP address is currently queued for verification. Please wait a few seconds before trying to verify again.".into(),
            blacklisted: "You are currently denied from entering the server. Please wait a few minutes to be able to join the server again.".into(),
            protocol_blacklisted: "Your protocol version is currently unsupported.".into(),
            unsupported_version: "Your client version is not supported.".into(),
            too_many_online_per_ip: "There are too many players online with your IP address.".into(),
            too_fast_reconnect: "You reconnected too fast, try again later.".into(),
            invalid_username: "Your username contains invalid characters.".into(),
            currently_preparing: "Your anti-bot data has not been prepared yet. Please wait a few seconds before trying to verify again.".into(),
            enter_code: "Please enter the code in chat that is displayed on the map.".into(),
            incorrect_captcha: "You have entered a wrong code. Please try again.".into(),
            unexpected_error: "An unexpected error occurred while trying to process your connection.".into(),
        }
    }
}

fn clamp<T: PartialOrd + Copy + fmt::Display>(name: &str, value: &mut T, low: T, high: T) {
    let clamped = if *value < low {
        low
    } else if *value > high {
        high
    } else {
        return;
    };
    tracing::warn!("{} = {} is out of range, using {}", name, value, clamped);
    *value = clamped;
}

impl BastionConfig {
    /// Parses a TOML document and sanitizes it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the document does not fit the schema.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        Ok(config.sanitized())
    }

    /// Reads, parses and sanitizes a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`BastionConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Clamps every bounded value into its legal range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let general = &mut self.general;
        clamp("general.max_online_per_ip", &mut general.max_online_per_ip, 0, 99);

        let attack = &mut self.attack;
        clamp("attack.min_players_for_attack", &mut attack.min_players_for_attack, 2, 1024);
        clamp("attack.min_attack_duration_ms", &mut attack.min_attack_duration_ms, 1_000, 900_000);
        clamp("attack.min_attack_threshold", &mut attack.min_attack_threshold, 0, 20);
        clamp("attack.attack_cooldown_delay_ms", &mut attack.attack_cooldown_delay_ms, 100, 30_000);

        clamp("queue.max_queue_polls", &mut self.queue.max_queue_polls, 1, 1000);
        clamp("queue.poll_interval_ms", &mut self.queue.poll_interval_ms, 50, 10_000);

        let verification = &mut self.verification;
        clamp("verification.read_timeout_ms", &mut verification.read_timeout_ms, 1_000, 30_000);
        clamp("verification.reconnect_delay_ms", &mut verification.reconnect_delay_ms, 0, 100_000);
        clamp("verification.remember_time_ms", &mut verification.remember_time_ms, 0, 86_400_000);
        clamp("verification.blacklist_time_ms", &mut verification.blacklist_time_ms, 0, 86_400_000);
        clamp("verification.blacklist_threshold", &mut verification.blacklist_threshold, 0, 100);
        clamp("verification.time_of_day", &mut verification.time_of_day, 0, 24_000);
        clamp("verification.gravity.max_movement_ticks", &mut verification.gravity.max_movement_ticks, 2, 100);
        clamp("verification.vehicle.minimum_packets", &mut verification.vehicle.minimum_packets, 0, 20);
        clamp("verification.brand.max_length", &mut verification.brand.max_length, 2, 256);
        clamp("verification.captcha.max_duration_ms", &mut verification.captcha.max_duration_ms, 5_000, 360_000);
        clamp("verification.captcha.max_tries", &mut verification.captcha.max_tries, 1, 100);

        if verification.timing == Timing::Never {
            tracing::warn!("verification.timing is 'never': no login will be verified");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let verification = VerificationConfig::default();
        assert!(verification.valid_name_regex.matches("Steve_01"));
        assert!(!verification.valid_name_regex.matches("Steve-01"));
        assert!(!verification.valid_name_regex.matches("Stéve"));
        assert!(!verification.valid_name_regex.matches(""));
        assert!(verification.valid_locale_regex.matches("en_us"));
        assert!(!verification.valid_locale_regex.matches(""));

        let brand = &verification.brand.valid_regex;
        assert!(brand.matches("vanilla"));
        assert!(brand.matches("fabric 0.15"));
        assert!(!brand.matches("tab\there"));
        assert!(!brand.matches(""));
    }

    #[test]
    fn test_pattern_matches_the_whole_value() {
        let pattern = ValidPattern::new("[a-c-]{2,4}").unwrap();
        assert!(pattern.matches("a-c"));
        assert!(!pattern.matches("a"));
        assert!(!pattern.matches("abcab"));
        assert!(!pattern.matches("xab"));
    }

    #[test]
    fn test_invalid_pattern_fails_to_load() {
        let result = BastionConfig::from_toml_str("[verification]\nvalid_name_regex = \"[a-z\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = BastionConfig::from_toml_str(
            r#"
            [verification]
            timing = "during_attack"
            valid_name_regex = "[a-z]+"

            [verification.gravity]
            captcha_on_fail = true
            "#,
        )
        .unwrap();

        assert_eq!(config.verification.timing, Timing::DuringAttack);
        assert!(config.verification.valid_name_regex.matches("steve"));
        assert!(!config.verification.valid_name_regex.matches("Steve"));
        assert!(config.verification.gravity.captcha_on_fail);
        assert_eq!(config.verification.gravity.max_movement_ticks, 8);
        assert_eq!(config.queue.max_queue_polls, 30);
        assert_eq!(config.messages, Messages::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = BastionConfig::from_toml_str(
            r#"
            [verification]
            read_timeout_ms = 10

            [verification.gravity]
            max_movement_ticks = 500

            [verification.captcha]
            max_tries = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.verification.read_timeout_ms, 1_000);
        assert_eq!(config.verification.gravity.max_movement_ticks, 100);
        assert_eq!(config.verification.captcha.max_tries, 1);
    }

    #[test]
    fn test_unknown_timing_is_a_parse_error() {
        let result = BastionConfig::from_toml_str("[verification]\ntiming = \"sometimes\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_timing() {
        assert!(Timing::Always.applies(false));
        assert!(!Timing::DuringAttack.applies(false));
        assert!(Timing::DuringAttack.applies(true));
        assert!(!Timing::Never.applies(true));
    }

    #[test]
    fn test_defaults_are_already_sane() {
        assert_eq!(BastionConfig::default().sanitized(), BastionConfig::default());
    }
}
