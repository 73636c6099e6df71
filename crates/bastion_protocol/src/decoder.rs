//! # Packet Decoder
//!
//! Turns the raw inbound byte stream of one connection into packets.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ──► FrameDecoder ──► frame body ──► PacketRegistry::decode_frame ──► Packet
//!                                                  │
//!                                                  └─ unknown id: dropped
//! ```
//!
//! The phase changes as the session advances; the version is fixed by the
//! handshake and never changes afterwards.

use crate::codec::FrameDecoder;
use crate::error::FrameResult;
use crate::packets::Packet;
use crate::registry::{Direction, PacketRegistry, Phase};
use crate::version::ProtocolVersion;

/// Stateful decoder for one connection.
#[derive(Debug)]
pub struct PacketDecoder {
    frames: FrameDecoder,
    registry: &'static PacketRegistry,
    direction: Direction,
    phase: Phase,
    version: ProtocolVersion,
}

impl PacketDecoder {
    /// Decoder for packets a client sends.
    #[must_use]
    pub fn serverbound(phase: Phase, version: ProtocolVersion) -> Self {
        Self::new(Direction::Serverbound, phase, version)
    }

    /// Decoder for an arbitrary direction.
    #[must_use]
    pub fn new(direction: Direction, phase: Phase, version: ProtocolVersion) -> Self {
        Self { frames: FrameDecoder::new(), registry: PacketRegistry::global(), direction, phase, version }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Switches to another phase; buffered bytes are kept.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Protocol version in use.
    #[must_use]
    pub const fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Appends bytes received from the transport.
    pub fn push(&mut self, bytes: &[u8]) {
        self.frames.push(bytes);
    }

    /// Decodes the next known packet, skipping unknown ones.
    ///
    /// # Errors
    ///
    /// Any frame or payload error; the connection must be closed.
    pub fn next_packet(&mut self) -> FrameResult<Option<Packet>> {
        while let Some(body) = self.frames.next_frame()? {
            if let Some(packet) = self.registry.decode_frame(self.phase, self.direction, self.version, &body)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }
}
