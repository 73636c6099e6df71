//! # Verification Error Types
//!
//! Everything that ends a session or refuses to start one.
//!
//! Failures carry a detailed reason for the log. The peer only ever sees
//! the generic failure message; admission refusals get their own, slightly
//! more helpful, message because no hidden challenge has started yet.

use bastion_protocol::FrameError;
use thiserror::Error;

use crate::config::Messages;

/// Why a running session failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
    /// Malformed bytes.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A packet that is illegal at this point of the session.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Movement that does not follow the simulated physics.
    #[error("physics violation: {0}")]
    Physics(String),

    /// The client took too long.
    #[error("timed out: {0}")]
    Timeout(&'static str),
}

/// Result alias for stage handlers.
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Fails with a protocol violation unless `condition` holds.
pub(crate) fn ensure(condition: bool, reason: impl FnOnce() -> String) -> VerifyResult<()> {
    if condition {
        Ok(())
    } else {
        Err(VerificationError::ProtocolViolation(reason()))
    }
}

/// Why a login was refused before any session started.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Unknown or unsupported protocol version.
    #[error("unsupported version")]
    UnsupportedVersion,
    /// The address already has a session in progress.
    #[error("already verifying")]
    AlreadyVerifying,
    /// The address already waits in the queue.
    #[error("already queued")]
    AlreadyQueued,
    /// The address failed too often.
    #[error("blacklisted")]
    Blacklisted,
    /// The protocol version is refused by configuration.
    #[error("protocol blacklisted")]
    ProtocolBlacklisted,
    /// The address retried inside the reconnect window.
    #[error("reconnected too fast")]
    ReconnectedTooFast,
    /// Too many accounts online from one address.
    #[error("too many online per ip")]
    TooManyOnlinePerIp,
    /// The username contains forbidden characters.
    #[error("invalid username")]
    InvalidUsername,
    /// A second login packet on the same connection.
    #[error("duplicate login")]
    DuplicateLogin,
    /// A login packet before any handshake.
    #[error("handshake required")]
    HandshakeRequired,
    /// No CAPTCHA is ready to be shown.
    #[error("currently preparing")]
    CurrentlyPreparing,
}

impl Rejection {
    /// Disconnect text shown to the peer, or `None` to close silently.
    #[must_use]
    pub fn message(self, messages: &Messages) -> Option<&str> {
        let text = match self {
            Self::UnsupportedVersion => &messages.unsupported_version,
            Self::AlreadyVerifying => &messages.already_verifying,
            Self::AlreadyQueued => &messages.already_queued,
            Self::Blacklisted => &messages.blacklisted,
            Self::ProtocolBlacklisted => &messages.protocol_blacklisted,
            Self::ReconnectedTooFast => &messages.too_fast_reconnect,
            Self::TooManyOnlinePerIp => &messages.too_many_online_per_ip,
            Self::InvalidUsername => &messages.invalid_username,
            Self::CurrentlyPreparing => &messages.currently_preparing,
            // malformed login sequences get no explanation
            Self::DuplicateLogin | Self::HandshakeRequired => return None,
        };
        Some(text)
    }
}

/// Errors loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
