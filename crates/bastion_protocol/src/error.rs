//! # Frame Error Types
//!
//! Everything that can go wrong while turning bytes into packets or back.
//! A frame error is always fatal to the connection that produced it.

use thiserror::Error;

use crate::packets::PacketKind;
use crate::registry::{Direction, Phase};
use crate::version::ProtocolVersion;

/// Errors produced by the wire codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The buffer ended before a field could be read.
    #[error("unexpected end of buffer: needed {needed} more bytes")]
    Truncated {
        /// Bytes that were missing.
        needed: usize,
    },

    /// A VarInt or VarLong ran past its maximum width.
    #[error("variable-length integer too big")]
    VarIntTooBig,

    /// A frame length prefix was wider than 21 bits.
    #[error("frame length prefix too big")]
    LengthPrefixTooBig,

    /// A frame length prefix was negative.
    #[error("negative frame length: {0}")]
    NegativeLength(i32),

    /// A string field exceeded its limit.
    #[error("string too long: {length} > {max}")]
    StringTooLong {
        /// Declared or measured length.
        length: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// A string field was not valid UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,

    /// A length prefix for a byte array or list was out of range.
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i32),

    /// The payload is larger than the packet allows.
    #[error("packet too large: {length} > {max}")]
    TooLarge {
        /// Payload length.
        length: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// The payload is smaller than the packet requires.
    #[error("packet too small: {length} < {min}")]
    TooSmall {
        /// Payload length.
        length: usize,
        /// Required minimum.
        min: usize,
    },

    /// Decoding finished with bytes left in the payload.
    #[error("could not read packet to end: {remaining} bytes left")]
    Leftover {
        /// Unread bytes.
        remaining: usize,
    },

    /// A field held a value the protocol does not allow.
    #[error("invalid field value: {0}")]
    InvalidValue(&'static str),

    /// The packet is clientbound only and has no decoder.
    #[error("{kind:?} cannot be decoded")]
    NotDecodable {
        /// The packet kind.
        kind: PacketKind,
    },

    /// The packet has no id in this phase, direction and version.
    #[error("{kind:?} is not registered for {phase:?}/{direction:?} in {version}")]
    Unregistered {
        /// The packet kind.
        kind: PacketKind,
        /// Protocol phase.
        phase: Phase,
        /// Packet direction.
        direction: Direction,
        /// Protocol version.
        version: ProtocolVersion,
    },

    /// The protocol version is not supported.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(i32),
}

/// Result type for codec operations.
pub type FrameResult<T> = Result<T, FrameError>;
