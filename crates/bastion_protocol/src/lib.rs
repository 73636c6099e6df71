//! # BASTION Protocol - The Dialect Engine
//!
//! Version-aware wire codec for every client dialect the gate speaks, from
//! 1.7.2 to 1.21.9.
//!
//! ## Architecture
//!
//! - **Version**: totally ordered [`ProtocolVersion`] with closed-range era checks
//! - **Codec**: VarInts, strings, UUIDs, binary tags, text components, frames
//! - **Packets**: a closed [`Packet`] enum; every variant encodes, serverbound ones decode
//! - **Registry**: `(phase, direction, version) -> id <-> kind`, built once
//! - **Decoder**: bytes in, packets out, unknown ids silently dropped
//!
//! ## Frame Layout
//!
//! ```text
//! ┌──────────────────┬───────────────┬──────────────────────────┐
//! │ VarInt length    │ VarInt id     │ payload (version layout) │
//! │ (max 3 bytes)    │               │                          │
//! └──────────────────┴───────────────┴──────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use bastion_protocol::packets::KeepAlive;
//! use bastion_protocol::{Direction, Packet, PacketDecoder, PacketRegistry, Phase, ProtocolVersion};
//!
//! let mut decoder = PacketDecoder::serverbound(Phase::Game, ProtocolVersion::V1_20_5);
//! decoder.push(&bytes_from_socket);
//! while let Some(packet) = decoder.next_packet()? {
//!     handle(packet);
//! }
//!
//! let frame = PacketRegistry::global().encode_frame(
//!     Phase::Game,
//!     Direction::Clientbound,
//!     ProtocolVersion::V1_20_5,
//!     &Packet::KeepAlive(KeepAlive { id: 42 }),
//! )?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod decoder;
pub mod error;
pub mod packets;
pub mod registry;
pub mod version;

// Re-exports for convenience
pub use codec::{Compound, PacketDeserializer, PacketSerializer, Tag, TextComponent};
pub use decoder::PacketDecoder;
pub use error::{FrameError, FrameResult};
pub use packets::{Packet, PacketKind};
pub use registry::{Direction, PacketRegistry, Phase, RegistryError};
pub use version::ProtocolVersion;
