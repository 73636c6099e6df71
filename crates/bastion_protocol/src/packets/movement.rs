//! # Serverbound Play Packets
//!
//! Everything a client reports while inside the synthetic world:
//! movement, vehicle steering, hotbar selection, swings and chat.
//!
//! ## Design
//!
//! - Each packet encodes too, so synthetic clients share this codec
//! - 1.7 position packets carry an extra bounding-box Y that is discarded
//! - From 1.21.2 the on-ground boolean becomes a flags byte

use uuid::Uuid;

use crate::codec::{PacketDeserializer, PacketSerializer};
use crate::error::{FrameError, FrameResult};
use crate::version::ProtocolVersion as V;

/// Offset between feet and the legacy bounding-box Y of 1.7 clients.
pub const LEGACY_EYE_OFFSET: f64 = 1.62;

/// Longest chat message a client may send.
pub const MAX_CHAT_LEN: usize = 256;

fn write_ground(out: &mut PacketSerializer, version: V, on_ground: bool) {
    if version.greater_or_equal(V::V1_21_2) {
        out.write_u8(u8::from(on_ground));
    } else {
        out.write_bool(on_ground);
    }
}

fn read_ground(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<bool> {
    if version.greater_or_equal(V::V1_21_2) {
        Ok(input.read_u8()? & 0x01 != 0)
    } else {
        input.read_bool()
    }
}

fn write_feet(out: &mut PacketSerializer, version: V, x: f64, y: f64, z: f64) {
    out.write_f64(x);
    out.write_f64(y);
    if version.less_than(V::V1_8) {
        out.write_f64(y + LEGACY_EYE_OFFSET);
    }
    out.write_f64(z);
}

fn read_feet(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<(f64, f64, f64)> {
    let x = input.read_f64()?;
    let y = input.read_f64()?;
    if version.less_than(V::V1_8) {
        let _head_y = input.read_f64()?;
    }
    let z = input.read_f64()?;
    Ok((x, y, z))
}

/// Acknowledges a server teleport (1.9+).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmTeleportation {
    /// Teleport id being confirmed.
    pub teleport_id: i32,
}

impl ConfirmTeleportation {
    pub(crate) fn encode(self, out: &mut PacketSerializer) {
        out.write_varint(self.teleport_id);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>) -> FrameResult<Self> {
        Ok(Self { teleport_id: input.read_varint()? })
    }
}

/// Position-only movement report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetPlayerPosition {
    /// Feet X.
    pub x: f64,
    /// Feet Y.
    pub y: f64,
    /// Feet Z.
    pub z: f64,
    /// Client-side ground flag.
    pub on_ground: bool,
}

impl SetPlayerPosition {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        write_feet(out, version, self.x, self.y, self.z);
        write_ground(out, version, self.on_ground);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let (x, y, z) = read_feet(input, version)?;
        Ok(Self { x, y, z, on_ground: read_ground(input, version)? })
    }
}

/// Combined position and rotation report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetPlayerPositionRotation {
    /// Feet X.
    pub x: f64,
    /// Feet Y.
    pub y: f64,
    /// Feet Z.
    pub z: f64,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Client-side ground flag.
    pub on_ground: bool,
}

impl SetPlayerPositionRotation {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        write_feet(out, version, self.x, self.y, self.z);
        out.write_f32(self.yaw);
        out.write_f32(self.pitch);
        write_ground(out, version, self.on_ground);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let (x, y, z) = read_feet(input, version)?;
        Ok(Self {
            x,
            y,
            z,
            yaw: input.read_f32()?,
            pitch: input.read_f32()?,
            on_ground: read_ground(input, version)?,
        })
    }
}

/// Rotation-only report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetPlayerRotation {
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Client-side ground flag.
    pub on_ground: bool,
}

impl SetPlayerRotation {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        out.write_f32(self.yaw);
        out.write_f32(self.pitch);
        write_ground(out, version, self.on_ground);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        Ok(Self {
            yaw: input.read_f32()?,
            pitch: input.read_f32()?,
            on_ground: read_ground(input, version)?,
        })
    }
}

/// Ground-status-only report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetPlayerOnGround {
    /// Client-side ground flag.
    pub on_ground: bool,
}

impl SetPlayerOnGround {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        write_ground(out, version, self.on_ground);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        Ok(Self { on_ground: read_ground(input, version)? })
    }
}

/// Steering input while mounted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerInput {
    /// Strafe input (before 1.21.2).
    pub sideways: f32,
    /// Forward input (before 1.21.2).
    pub forward: f32,
    /// Jump key held.
    pub jump: bool,
    /// Sneak key held.
    pub sneak: bool,
}

impl PlayerInput {
    const JUMP_MASK: u8 = 16;
    const SNEAK_MASK: u8 = 32;

    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.greater_or_equal(V::V1_21_2) {
            let mut mask = 0;
            if self.jump {
                mask |= Self::JUMP_MASK;
            }
            if self.sneak {
                mask |= Self::SNEAK_MASK;
            }
            out.write_u8(mask);
            return;
        }
        out.write_f32(self.sideways);
        out.write_f32(self.forward);
        if version.less_than(V::V1_8) {
            out.write_bool(self.jump);
            out.write_bool(self.sneak);
        } else {
            out.write_u8(u8::from(self.jump) | (u8::from(self.sneak) << 1));
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        if version.greater_or_equal(V::V1_21_2) {
            let mask = input.read_u8()?;
            return Ok(Self {
                jump: mask & Self::JUMP_MASK != 0,
                sneak: mask & Self::SNEAK_MASK != 0,
                ..Self::default()
            });
        }
        let sideways = input.read_f32()?;
        let forward = input.read_f32()?;
        let (jump, sneak) = if version.less_than(V::V1_8) {
            (input.read_bool()?, input.read_bool()?)
        } else {
            let flags = input.read_u8()?;
            (flags & 0x01 != 0, flags & 0x02 != 0)
        };
        Ok(Self { sideways, forward, jump, sneak })
    }
}

/// Position of the vehicle the client is steering (1.9+).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleMove {
    /// Vehicle X.
    pub x: f64,
    /// Vehicle Y.
    pub y: f64,
    /// Vehicle Z.
    pub z: f64,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Ground flag (1.21.4+).
    pub on_ground: bool,
}

impl VehicleMove {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        out.write_f64(self.x);
        out.write_f64(self.y);
        out.write_f64(self.z);
        out.write_f32(self.yaw);
        out.write_f32(self.pitch);
        if version.greater_or_equal(V::V1_21_4) {
            out.write_bool(self.on_ground);
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        Ok(Self {
            x: input.read_f64()?,
            y: input.read_f64()?,
            z: input.read_f64()?,
            yaw: input.read_f32()?,
            pitch: input.read_f32()?,
            on_ground: version.greater_or_equal(V::V1_21_4) && input.read_bool()?,
        })
    }
}

/// Boat paddle state (1.9+).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaddleBoat {
    /// Left paddle turning.
    pub left: bool,
    /// Right paddle turning.
    pub right: bool,
}

impl PaddleBoat {
    pub(crate) fn encode(self, out: &mut PacketSerializer) {
        out.write_bool(self.left);
        out.write_bool(self.right);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>) -> FrameResult<Self> {
        Ok(Self { left: input.read_bool()?, right: input.read_bool()? })
    }
}

/// Hotbar selection reported by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetHeldItem {
    /// Selected hotbar slot.
    pub slot: i16,
}

impl SetHeldItem {
    pub(crate) fn encode(self, out: &mut PacketSerializer) {
        out.write_i16(self.slot);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>) -> FrameResult<Self> {
        Ok(Self { slot: input.read_i16()? })
    }
}

/// Arm swing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Animation {
    /// Swinging entity (1.7 only).
    pub entity_id: i32,
    /// Legacy animation type (1.7 only).
    pub kind: i8,
    /// Hand used (1.9+).
    pub hand: i32,
}

impl Animation {
    /// Hand id of the main hand.
    pub const MAIN_HAND: i32 = 0;
    /// 1.7 animation id of an arm swing.
    pub const LEGACY_SWING: i8 = 1;

    /// A main-hand swing.
    #[must_use]
    pub const fn swing(entity_id: i32) -> Self {
        Self { entity_id, kind: Self::LEGACY_SWING, hand: Self::MAIN_HAND }
    }

    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.less_than(V::V1_8) {
            out.write_i32(self.entity_id);
            out.write_i8(self.kind);
        } else if version.greater_than(V::V1_8) {
            out.write_varint(self.hand);
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let mut packet = Self { entity_id: -1, kind: Self::LEGACY_SWING, hand: Self::MAIN_HAND };
        if version.less_than(V::V1_8) {
            packet.entity_id = input.read_i32()?;
            packet.kind = input.read_i8()?;
        } else if version.greater_than(V::V1_8) {
            packet.hand = input.read_varint()?;
        }
        Ok(packet)
    }
}

/// Ping/transaction. Clientbound it carries the challenge, serverbound
/// the echo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Inventory window (before 1.17).
    pub window_id: i8,
    /// Transaction or ping id.
    pub id: i32,
    /// Whether the transaction was accepted.
    pub accepted: bool,
}

impl Transaction {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.less_than(V::V1_17) {
            out.write_i8(self.window_id);
            out.write_i16(self.id as i16);
            out.write_bool(self.accepted);
        } else {
            out.write_i32(self.id);
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        if version.less_than(V::V1_17) {
            Ok(Self {
                window_id: input.read_i8()?,
                id: i32::from(input.read_i16()?),
                accepted: input.read_bool()?,
            })
        } else {
            // pongs are always accepted
            Ok(Self { window_id: 0, id: input.read_i32()?, accepted: true })
        }
    }
}

/// Chat message typed by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chat {
    /// Message text.
    pub message: String,
}

impl Chat {
    const ACKNOWLEDGED_BYTES: usize = 3;
    const SIGNATURE_BYTES: usize = 256;
    const MAX_LAST_SEEN: i32 = 5;

    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        out.write_string(&self.message);
        if version.less_than(V::V1_19) {
            return;
        }
        if version.less_or_equal(V::V1_19_1) {
            out.write_i64(0); // expires at
            out.write_i64(0); // salt
            out.write_byte_array(&[]);
            out.write_bool(false);
            if version.greater_or_equal(V::V1_19_1) {
                out.write_varint(0);
                out.write_bool(false);
            }
        } else {
            out.write_i64(0); // timestamp
            out.write_i64(0); // salt
            out.write_bool(false);
            out.write_varint(0);
            out.write_bytes(&[0; Self::ACKNOWLEDGED_BYTES]);
            if version.greater_or_equal(V::V1_21_5) {
                out.write_u8(0); // checksum
            }
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let message = input.read_string(MAX_CHAT_LEN)?;
        if version.less_than(V::V1_19) {
            return Ok(Self { message });
        }
        if version.less_or_equal(V::V1_19_1) {
            let _expires_at = input.read_i64()?;
            let salt = input.read_i64()?;
            let signature = input.read_byte_array(Self::SIGNATURE_BYTES * 2)?;
            let unsigned = if salt != 0 && !signature.is_empty() {
                false
            } else if (version.greater_or_equal(V::V1_19_1) || salt == 0) && signature.is_empty() {
                true
            } else {
                return Err(FrameError::InvalidValue("invalid chat signature"));
            };
            if input.read_bool()? && unsigned {
                return Err(FrameError::InvalidValue("chat preview signature missing"));
            }
            if version.greater_or_equal(V::V1_19_1) {
                let seen = input.read_varint()?;
                if !(0..=Self::MAX_LAST_SEEN).contains(&seen) {
                    return Err(FrameError::InvalidArrayLength(seen));
                }
                for _ in 0..seen {
                    let _: Uuid = input.read_uuid()?;
                    input.read_byte_array(Self::SIGNATURE_BYTES * 2)?;
                }
                if input.read_bool()? {
                    let _: Uuid = input.read_uuid()?;
                    input.read_byte_array(Self::SIGNATURE_BYTES * 2)?;
                }
            }
        } else {
            let _timestamp = input.read_i64()?;
            let _salt = input.read_i64()?;
            if input.read_bool()? {
                input.read_bytes(Self::SIGNATURE_BYTES)?;
            }
            let _offset = input.read_varint()?;
            input.read_bytes(Self::ACKNOWLEDGED_BYTES)?;
            if version.greater_or_equal(V::V1_21_5) {
                let _checksum = input.read_u8()?;
            }
        }
        Ok(Self { message })
    }
}
