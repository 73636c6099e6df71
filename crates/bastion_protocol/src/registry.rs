//! # Packet Registry
//!
//! Maps `(phase, direction, version)` to a bijection between packet ids and
//! [`PacketKind`]s.
//!
//! ## Design
//!
//! - Tables are declared the way ids evolved: `m(id, from)` covers every
//!   version from `from` up to the next mapping, the last one up to LATEST
//! - Built once per process, then only read
//! - Construction rejects unordered mappings, duplicate ids and duplicate
//!   kinds, so a bad table fails at startup and never per connection
//! - Unknown ids decode to "no packet" instead of an error

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use crate::codec::{encode_frame, PacketDeserializer, PacketSerializer};
use crate::error::{FrameError, FrameResult};
use crate::packets::{Packet, PacketKind as K};
use crate::version::ProtocolVersion as V;

/// Protocol phase a connection is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// First packet only.
    Handshake,
    /// Username exchange.
    Login,
    /// Registry sync (1.20.2+).
    Config,
    /// In-world play.
    Game,
}

/// Which peer sends a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Serverbound,
    /// Server to client.
    Clientbound,
}

/// A table describes the wrong thing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Mappings of one kind are not in release order.
    #[error("{kind:?} mappings for {phase:?}/{direction:?} are not ordered")]
    UnorderedMappings {
        /// Offending kind.
        kind: K,
        /// Phase of the table.
        phase: Phase,
        /// Direction of the table.
        direction: Direction,
    },

    /// Two kinds share an id in one version.
    #[error("id {id:#04x} used by {first:?} and {second:?} in {phase:?}/{direction:?} {version}")]
    DuplicateId {
        /// Packet id.
        id: i32,
        /// Kind registered first.
        first: K,
        /// Kind registered second.
        second: K,
        /// Phase of the table.
        phase: Phase,
        /// Direction of the table.
        direction: Direction,
        /// Affected version.
        version: V,
    },

    /// One kind is listed twice in a table.
    #[error("{kind:?} registered twice in {phase:?}/{direction:?} {version}")]
    DuplicateKind {
        /// Offending kind.
        kind: K,
        /// Phase of the table.
        phase: Phase,
        /// Direction of the table.
        direction: Direction,
        /// Affected version.
        version: V,
    },
}

/// One id assignment, valid from `from` until the next one.
#[derive(Clone, Copy, Debug)]
struct Mapping {
    id: i32,
    from: V,
}

const fn m(id: i32, from: V) -> Mapping {
    Mapping { id, from }
}

type Table = &'static [(K, &'static [Mapping])];

const HANDSHAKE_SERVERBOUND: Table = &[
    (K::Handshake, &[m(0x00, V::V1_7_2)]),
];

const LOGIN_CLIENTBOUND: Table = &[
    (K::Disconnect, &[m(0x00, V::V1_7_2)]),
    (K::LoginSuccess, &[m(0x02, V::V1_7_2)]),
];

const LOGIN_SERVERBOUND: Table = &[
    (K::LoginStart, &[m(0x00, V::V1_7_2)]),
    (K::LoginAcknowledged, &[m(0x03, V::V1_20_2)]),
];

const CONFIG_CLIENTBOUND: Table = &[
    (K::Disconnect, &[m(0x01, V::V1_20_2), m(0x02, V::V1_20_5)]),
    (K::FinishConfiguration, &[m(0x02, V::V1_20_2), m(0x03, V::V1_20_5)]),
    (K::KeepAlive, &[m(0x03, V::V1_20_2), m(0x04, V::V1_20_5)]),
    (K::RegistryData, &[m(0x05, V::V1_20_2), m(0x07, V::V1_20_5)]),
];

const CONFIG_SERVERBOUND: Table = &[
    (K::ClientInformation, &[m(0x00, V::V1_20_2)]),
    (K::PluginMessage, &[m(0x01, V::V1_20_2), m(0x02, V::V1_20_5)]),
    (K::FinishConfiguration, &[m(0x02, V::V1_20_2), m(0x03, V::V1_20_5)]),
    (K::KeepAlive, &[m(0x03, V::V1_20_2), m(0x04, V::V1_20_5)]),
];

const GAME_CLIENTBOUND: Table = &[
    (K::JoinGame, &[
        m(0x01, V::V1_7_2), m(0x23, V::V1_9), m(0x25, V::V1_13), m(0x25, V::V1_14),
        m(0x26, V::V1_15), m(0x25, V::V1_16), m(0x24, V::V1_16_2), m(0x26, V::V1_17),
        m(0x23, V::V1_19), m(0x25, V::V1_19_1), m(0x24, V::V1_19_3), m(0x28, V::V1_19_4),
        m(0x29, V::V1_20_2), m(0x2B, V::V1_20_5), m(0x2C, V::V1_21_2), m(0x2B, V::V1_21_5),
        m(0x30, V::V1_21_9),
    ]),
    (K::KeepAlive, &[
        m(0x00, V::V1_7_2), m(0x1F, V::V1_9), m(0x21, V::V1_13), m(0x20, V::V1_14),
        m(0x21, V::V1_15), m(0x20, V::V1_16), m(0x1F, V::V1_16_2), m(0x21, V::V1_17),
        m(0x1E, V::V1_19), m(0x20, V::V1_19_1), m(0x1F, V::V1_19_3), m(0x23, V::V1_19_4),
        m(0x24, V::V1_20_2), m(0x26, V::V1_20_5), m(0x27, V::V1_21_2), m(0x26, V::V1_21_5),
        m(0x2B, V::V1_21_9),
    ]),
    (K::Disconnect, &[
        m(0x40, V::V1_7_2), m(0x1A, V::V1_9), m(0x1B, V::V1_13), m(0x1A, V::V1_14),
        m(0x1B, V::V1_15), m(0x1A, V::V1_16), m(0x19, V::V1_16_2), m(0x1A, V::V1_17),
        m(0x17, V::V1_19), m(0x19, V::V1_19_1), m(0x17, V::V1_19_3), m(0x1A, V::V1_19_4),
        m(0x1B, V::V1_20_2), m(0x1D, V::V1_20_5), m(0x1C, V::V1_21_5), m(0x20, V::V1_21_9),
    ]),
    (K::SynchronizePlayerPosition, &[
        m(0x08, V::V1_7_2), m(0x2E, V::V1_9), m(0x2F, V::V1_12_1), m(0x32, V::V1_13),
        m(0x35, V::V1_14), m(0x36, V::V1_15), m(0x35, V::V1_16), m(0x34, V::V1_16_2),
        m(0x38, V::V1_17), m(0x36, V::V1_19), m(0x39, V::V1_19_1), m(0x38, V::V1_19_3),
        m(0x3C, V::V1_19_4), m(0x3E, V::V1_20_2), m(0x40, V::V1_20_5), m(0x42, V::V1_21_2),
        m(0x41, V::V1_21_5), m(0x46, V::V1_21_9),
    ]),
    (K::PlayerAbilities, &[
        m(0x39, V::V1_7_2), m(0x2B, V::V1_9), m(0x2C, V::V1_12_1), m(0x2E, V::V1_13),
        m(0x31, V::V1_14), m(0x32, V::V1_15), m(0x31, V::V1_16), m(0x30, V::V1_16_2),
        m(0x32, V::V1_17), m(0x2F, V::V1_19), m(0x31, V::V1_19_1), m(0x30, V::V1_19_3),
        m(0x34, V::V1_19_4), m(0x36, V::V1_20_2), m(0x38, V::V1_20_5), m(0x3A, V::V1_21_2),
        m(0x39, V::V1_21_5), m(0x3E, V::V1_21_9),
    ]),
    (K::ChunkData, &[
        m(0x21, V::V1_7_2), m(0x20, V::V1_9), m(0x22, V::V1_13), m(0x21, V::V1_14),
        m(0x22, V::V1_15), m(0x21, V::V1_16), m(0x20, V::V1_16_2), m(0x22, V::V1_17),
        m(0x1F, V::V1_19), m(0x21, V::V1_19_1), m(0x20, V::V1_19_3), m(0x24, V::V1_19_4),
        m(0x25, V::V1_20_2), m(0x27, V::V1_20_5), m(0x28, V::V1_21_2), m(0x27, V::V1_21_5),
        m(0x2C, V::V1_21_9),
    ]),
    (K::RemoveEntities, &[
        m(0x13, V::V1_7_2), m(0x30, V::V1_9), m(0x31, V::V1_12), m(0x32, V::V1_12_2),
        m(0x35, V::V1_13), m(0x37, V::V1_14), m(0x38, V::V1_15), m(0x37, V::V1_16),
        m(0x36, V::V1_16_2), m(0x3A, V::V1_17), m(0x38, V::V1_19), m(0x3B, V::V1_19_1),
        m(0x3A, V::V1_19_3), m(0x3E, V::V1_19_4), m(0x40, V::V1_20_2), m(0x42, V::V1_20_5),
        m(0x47, V::V1_21_2), m(0x46, V::V1_21_5), m(0x4B, V::V1_21_9),
    ]),
    (K::SetPassengers, &[
        m(0x1B, V::V1_7_2), m(0x40, V::V1_9), m(0x42, V::V1_12), m(0x43, V::V1_12_1),
        m(0x46, V::V1_13), m(0x4A, V::V1_14), m(0x4B, V::V1_15), m(0x54, V::V1_17),
        m(0x57, V::V1_19_1), m(0x55, V::V1_19_3), m(0x59, V::V1_19_4), m(0x5B, V::V1_20_2),
        m(0x5D, V::V1_20_3), m(0x5F, V::V1_20_5), m(0x65, V::V1_21_2), m(0x64, V::V1_21_5),
        m(0x69, V::V1_21_9),
    ]),
    (K::SpawnEntity, &[m(0x0E, V::V1_7_2), m(0x00, V::V1_9), m(0x01, V::V1_19_4)]),
    (K::UpdateSectionBlocks, &[
        m(0x22, V::V1_7_2), m(0x10, V::V1_9), m(0x0F, V::V1_13), m(0x10, V::V1_15),
        m(0x0F, V::V1_16), m(0x3B, V::V1_16_2), m(0x3F, V::V1_17), m(0x3D, V::V1_19),
        m(0x40, V::V1_19_1), m(0x3F, V::V1_19_3), m(0x43, V::V1_19_4), m(0x45, V::V1_20_2),
        m(0x47, V::V1_20_3), m(0x49, V::V1_20_5), m(0x4E, V::V1_21_2), m(0x4D, V::V1_21_5),
        m(0x52, V::V1_21_9),
    ]),
    (K::Transaction, &[
        m(0x32, V::V1_7_2), m(0x11, V::V1_9), m(0x12, V::V1_13), m(0x13, V::V1_15),
        m(0x12, V::V1_16), m(0x11, V::V1_16_2), m(0x30, V::V1_17), m(0x2D, V::V1_19),
        m(0x2F, V::V1_19_1), m(0x2E, V::V1_19_3), m(0x32, V::V1_19_4), m(0x33, V::V1_20_2),
        m(0x35, V::V1_20_5), m(0x37, V::V1_21_2), m(0x36, V::V1_21_5), m(0x3B, V::V1_21_9),
    ]),
    (K::SetDefaultSpawnPosition, &[
        m(0x05, V::V1_7_2), m(0x43, V::V1_9), m(0x45, V::V1_12), m(0x46, V::V1_12_1),
        m(0x49, V::V1_13), m(0x4D, V::V1_14), m(0x4E, V::V1_15), m(0x42, V::V1_16),
        m(0x4B, V::V1_17), m(0x4A, V::V1_19), m(0x4D, V::V1_19_1), m(0x4C, V::V1_19_3),
        m(0x50, V::V1_19_4), m(0x52, V::V1_20_2), m(0x54, V::V1_20_3), m(0x56, V::V1_20_5),
        m(0x5B, V::V1_21_2), m(0x5A, V::V1_21_5), m(0x5F, V::V1_21_9),
    ]),
    (K::MapData, &[
        m(0x34, V::V1_7_2), m(0x24, V::V1_9), m(0x26, V::V1_13), m(0x27, V::V1_15),
        m(0x26, V::V1_16), m(0x25, V::V1_16_2), m(0x27, V::V1_17), m(0x24, V::V1_19),
        m(0x26, V::V1_19_1), m(0x25, V::V1_19_3), m(0x29, V::V1_19_4), m(0x2A, V::V1_20_2),
        m(0x2C, V::V1_20_5), m(0x2D, V::V1_21_2), m(0x2C, V::V1_21_5), m(0x31, V::V1_21_9),
    ]),
    (K::SetContainerSlot, &[
        m(0x2F, V::V1_7_2), m(0x16, V::V1_9), m(0x17, V::V1_13), m(0x16, V::V1_14),
        m(0x17, V::V1_15), m(0x16, V::V1_16), m(0x15, V::V1_16_2), m(0x16, V::V1_17),
        m(0x13, V::V1_19), m(0x12, V::V1_19_3), m(0x14, V::V1_19_4), m(0x15, V::V1_20_2),
        m(0x14, V::V1_21_5),
    ]),
    (K::SetExperience, &[
        m(0x1F, V::V1_7_2), m(0x3D, V::V1_9), m(0x3F, V::V1_12), m(0x40, V::V1_12_1),
        m(0x43, V::V1_13), m(0x47, V::V1_14), m(0x48, V::V1_15), m(0x51, V::V1_17),
        m(0x54, V::V1_19_1), m(0x52, V::V1_19_3), m(0x56, V::V1_19_4), m(0x58, V::V1_20_2),
        m(0x5A, V::V1_20_3), m(0x5C, V::V1_20_5), m(0x61, V::V1_21_2), m(0x60, V::V1_21_5),
        m(0x65, V::V1_21_9),
    ]),
    (K::SystemChat, &[
        m(0x02, V::V1_7_2), m(0x0F, V::V1_9), m(0x0E, V::V1_13), m(0x0F, V::V1_15),
        m(0x0E, V::V1_16), m(0x0F, V::V1_17), m(0x5F, V::V1_19), m(0x62, V::V1_19_1),
        m(0x60, V::V1_19_3), m(0x64, V::V1_19_4), m(0x67, V::V1_20_2), m(0x69, V::V1_20_3),
        m(0x6C, V::V1_20_5), m(0x73, V::V1_21_2), m(0x72, V::V1_21_5), m(0x77, V::V1_21_9),
    ]),
    (K::GameEvent, &[
        m(0x20, V::V1_20_3), m(0x22, V::V1_20_5), m(0x23, V::V1_21_2), m(0x22, V::V1_21_5),
        m(0x26, V::V1_21_9),
    ]),
    (K::Transfer, &[m(0x73, V::V1_20_5), m(0x7A, V::V1_21_2), m(0x7F, V::V1_21_9)]),
    (K::SetHeldSlot, &[
        m(0x09, V::V1_7_2), m(0x37, V::V1_9), m(0x39, V::V1_12), m(0x3A, V::V1_12_1),
        m(0x3D, V::V1_13), m(0x3F, V::V1_14), m(0x40, V::V1_15), m(0x3F, V::V1_16),
        m(0x48, V::V1_17), m(0x47, V::V1_19), m(0x4A, V::V1_19_1), m(0x49, V::V1_19_3),
        m(0x4D, V::V1_19_4), m(0x4F, V::V1_20_2), m(0x51, V::V1_20_3), m(0x53, V::V1_20_5),
        m(0x63, V::V1_21_2), m(0x62, V::V1_21_5), m(0x67, V::V1_21_9),
    ]),
    (K::EntityAnimation, &[
        m(0x0B, V::V1_7_2), m(0x06, V::V1_9), m(0x05, V::V1_16), m(0x06, V::V1_17),
        m(0x03, V::V1_19), m(0x04, V::V1_19_4), m(0x03, V::V1_20_2), m(0x02, V::V1_21_5),
    ]),
    (K::UpdateTime, &[
        m(0x03, V::V1_7_2), m(0x44, V::V1_9), m(0x46, V::V1_12), m(0x47, V::V1_12_1),
        m(0x4A, V::V1_13), m(0x4E, V::V1_14), m(0x4F, V::V1_15), m(0x4E, V::V1_16),
        m(0x58, V::V1_17), m(0x59, V::V1_18), m(0x5C, V::V1_19_1), m(0x5A, V::V1_19_3),
        m(0x5E, V::V1_19_4), m(0x60, V::V1_20_2), m(0x62, V::V1_20_3), m(0x64, V::V1_20_5),
        m(0x6B, V::V1_21_2), m(0x6A, V::V1_21_5), m(0x6F, V::V1_21_9),
    ]),
];

const GAME_SERVERBOUND: Table = &[
    (K::ClientTickEnd, &[m(0x0B, V::V1_21_2), m(0x0C, V::V1_21_6)]),
    (K::SetHeldItem, &[
        m(0x09, V::V1_7_2), m(0x17, V::V1_9), m(0x1A, V::V1_12), m(0x21, V::V1_13),
        m(0x23, V::V1_14), m(0x24, V::V1_16), m(0x25, V::V1_16_2), m(0x27, V::V1_19),
        m(0x28, V::V1_19_1), m(0x2B, V::V1_20_2), m(0x2C, V::V1_20_3), m(0x2F, V::V1_20_5),
        m(0x31, V::V1_21_2), m(0x33, V::V1_21_4), m(0x34, V::V1_21_6),
    ]),
    (K::PaddleBoat, &[
        m(0x11, V::V1_9), m(0x12, V::V1_12), m(0x11, V::V1_12_1), m(0x14, V::V1_13),
        m(0x16, V::V1_14), m(0x17, V::V1_16), m(0x16, V::V1_17), m(0x18, V::V1_19),
        m(0x19, V::V1_19_1), m(0x18, V::V1_19_3), m(0x19, V::V1_19_4), m(0x1B, V::V1_20_2),
        m(0x1C, V::V1_20_3), m(0x1F, V::V1_20_5), m(0x21, V::V1_21_2), m(0x22, V::V1_21_6),
    ]),
    (K::PlayerInput, &[
        m(0x0C, V::V1_7_2), m(0x15, V::V1_9), m(0x16, V::V1_12), m(0x1A, V::V1_13),
        m(0x1C, V::V1_14), m(0x1D, V::V1_16), m(0x1C, V::V1_17), m(0x1E, V::V1_19),
        m(0x1F, V::V1_19_1), m(0x1E, V::V1_19_3), m(0x1F, V::V1_19_4), m(0x22, V::V1_20_2),
        m(0x23, V::V1_20_3), m(0x26, V::V1_20_5), m(0x28, V::V1_21_2), m(0x29, V::V1_21_4),
        m(0x2A, V::V1_21_6),
    ]),
    (K::VehicleMove, &[
        m(0x10, V::V1_9), m(0x11, V::V1_12), m(0x10, V::V1_12_1), m(0x13, V::V1_13),
        m(0x15, V::V1_14), m(0x16, V::V1_16), m(0x15, V::V1_17), m(0x17, V::V1_19),
        m(0x18, V::V1_19_1), m(0x17, V::V1_19_3), m(0x18, V::V1_19_4), m(0x1A, V::V1_20_2),
        m(0x1B, V::V1_20_3), m(0x1E, V::V1_20_5), m(0x20, V::V1_21_2), m(0x21, V::V1_21_6),
    ]),
    (K::Chat, &[
        m(0x01, V::V1_7_2), m(0x02, V::V1_9), m(0x03, V::V1_12), m(0x02, V::V1_12_1),
        m(0x03, V::V1_14), m(0x04, V::V1_19), m(0x05, V::V1_19_1), m(0x05, V::V1_19_3),
        m(0x06, V::V1_20_5), m(0x07, V::V1_21_2), m(0x08, V::V1_21_6),
    ]),
    (K::KeepAlive, &[
        m(0x00, V::V1_7_2), m(0x0B, V::V1_9), m(0x0C, V::V1_12), m(0x0B, V::V1_12_1),
        m(0x0E, V::V1_13), m(0x0F, V::V1_14), m(0x10, V::V1_16), m(0x0F, V::V1_17),
        m(0x11, V::V1_19), m(0x12, V::V1_19_1), m(0x11, V::V1_19_3), m(0x12, V::V1_19_4),
        m(0x14, V::V1_20_2), m(0x15, V::V1_20_3), m(0x18, V::V1_20_5), m(0x1A, V::V1_21_2),
        m(0x1B, V::V1_21_6),
    ]),
    (K::ClientInformation, &[
        m(0x15, V::V1_7_2), m(0x04, V::V1_9), m(0x05, V::V1_12), m(0x04, V::V1_12_1),
        m(0x05, V::V1_14), m(0x07, V::V1_19), m(0x08, V::V1_19_1), m(0x07, V::V1_19_3),
        m(0x08, V::V1_19_4), m(0x09, V::V1_20_2), m(0x0A, V::V1_20_5), m(0x0C, V::V1_21_2),
        m(0x0D, V::V1_21_6),
    ]),
    (K::PluginMessage, &[
        m(0x17, V::V1_7_2), m(0x09, V::V1_9), m(0x0A, V::V1_12), m(0x09, V::V1_12_1),
        m(0x0A, V::V1_13), m(0x0B, V::V1_14), m(0x0A, V::V1_17), m(0x0C, V::V1_19),
        m(0x0D, V::V1_19_1), m(0x0C, V::V1_19_3), m(0x0D, V::V1_19_4), m(0x0F, V::V1_20_2),
        m(0x12, V::V1_21), m(0x14, V::V1_21_2), m(0x15, V::V1_21_6),
    ]),
    (K::SetPlayerOnGround, &[
        m(0x03, V::V1_7_2), m(0x0F, V::V1_9), m(0x0D, V::V1_12), m(0x0C, V::V1_12_1),
        m(0x0F, V::V1_13), m(0x14, V::V1_14), m(0x15, V::V1_16), m(0x14, V::V1_17),
        m(0x16, V::V1_19), m(0x17, V::V1_19_1), m(0x16, V::V1_19_3), m(0x17, V::V1_19_4),
        m(0x19, V::V1_20_2), m(0x1A, V::V1_20_3), m(0x1D, V::V1_20_5), m(0x1F, V::V1_21_2),
        m(0x20, V::V1_21_6),
    ]),
    (K::SetPlayerPosition, &[
        m(0x04, V::V1_7_2), m(0x0C, V::V1_9), m(0x0E, V::V1_12), m(0x0D, V::V1_12_1),
        m(0x10, V::V1_13), m(0x11, V::V1_14), m(0x12, V::V1_16), m(0x11, V::V1_17),
        m(0x13, V::V1_19), m(0x14, V::V1_19_1), m(0x13, V::V1_19_3), m(0x14, V::V1_19_4),
        m(0x16, V::V1_20_2), m(0x17, V::V1_20_3), m(0x1A, V::V1_20_5), m(0x1C, V::V1_21_2),
        m(0x1D, V::V1_21_6),
    ]),
    (K::SetPlayerRotation, &[
        m(0x05, V::V1_7_2), m(0x0E, V::V1_9), m(0x10, V::V1_12), m(0x0F, V::V1_12_1),
        m(0x12, V::V1_13), m(0x13, V::V1_14), m(0x14, V::V1_16), m(0x13, V::V1_17),
        m(0x15, V::V1_19), m(0x16, V::V1_19_1), m(0x15, V::V1_19_3), m(0x16, V::V1_19_4),
        m(0x18, V::V1_20_2), m(0x19, V::V1_20_3), m(0x1C, V::V1_20_5), m(0x1E, V::V1_21_2),
        m(0x1F, V::V1_21_6),
    ]),
    (K::SetPlayerPositionRotation, &[
        m(0x06, V::V1_7_2), m(0x0D, V::V1_9), m(0x0F, V::V1_12), m(0x0E, V::V1_12_1),
        m(0x11, V::V1_13), m(0x12, V::V1_14), m(0x13, V::V1_16), m(0x12, V::V1_17),
        m(0x14, V::V1_19), m(0x15, V::V1_19_1), m(0x14, V::V1_19_3), m(0x15, V::V1_19_4),
        m(0x17, V::V1_20_2), m(0x18, V::V1_20_3), m(0x1B, V::V1_20_5), m(0x1D, V::V1_21_2),
        m(0x1E, V::V1_21_6),
    ]),
    (K::ConfirmTeleportation, &[m(0x00, V::V1_9)]),
    (K::Transaction, &[
        m(0x0F, V::V1_7_2), m(0x05, V::V1_9), m(0x06, V::V1_12), m(0x05, V::V1_12_1),
        m(0x06, V::V1_13), m(0x07, V::V1_14), m(0x1D, V::V1_17), m(0x1F, V::V1_19),
        m(0x20, V::V1_19_1), m(0x1F, V::V1_19_3), m(0x20, V::V1_19_4), m(0x23, V::V1_20_2),
        m(0x24, V::V1_20_3), m(0x27, V::V1_20_5), m(0x29, V::V1_21_2), m(0x2B, V::V1_21_4),
        m(0x2C, V::V1_21_6),
    ]),
    (K::Animation, &[
        m(0x0A, V::V1_7_2), m(0x1A, V::V1_9), m(0x1D, V::V1_12), m(0x27, V::V1_13),
        m(0x2A, V::V1_14), m(0x2B, V::V1_16), m(0x2C, V::V1_16_2), m(0x2E, V::V1_19),
        m(0x2F, V::V1_19_1), m(0x32, V::V1_20_2), m(0x33, V::V1_20_3), m(0x36, V::V1_20_5),
        m(0x38, V::V1_21_2), m(0x3A, V::V1_21_4), m(0x3B, V::V1_21_5), m(0x3C, V::V1_21_6),
    ]),
];
fn table(phase: Phase, direction: Direction) -> Table {
    match (phase, direction) {
        (Phase::Handshake, Direction::Serverbound) => HANDSHAKE_SERVERBOUND,
        (Phase::Handshake, Direction::Clientbound) => &[],
        (Phase::Login, Direction::Serverbound) => LOGIN_SERVERBOUND,
        (Phase::Login, Direction::Clientbound) => LOGIN_CLIENTBOUND,
        (Phase::Config, Direction::Serverbound) => CONFIG_SERVERBOUND,
        (Phase::Config, Direction::Clientbound) => CONFIG_CLIENTBOUND,
        (Phase::Game, Direction::Serverbound) => GAME_SERVERBOUND,
        (Phase::Game, Direction::Clientbound) => GAME_CLIENTBOUND,
    }
}

const PHASES: [Phase; 4] = [Phase::Handshake, Phase::Login, Phase::Config, Phase::Game];
const DIRECTIONS: [Direction; 2] = [Direction::Serverbound, Direction::Clientbound];

/// Id lookups for one version.
#[derive(Debug, Default)]
struct VersionTable {
    by_id: HashMap<i32, K>,
    by_kind: HashMap<K, i32>,
}

/// Immutable packet id tables for every phase, direction and version.
#[derive(Debug)]
pub struct PacketRegistry {
    /// Indexed by `ProtocolVersion::ordinal`.
    tables: HashMap<(Phase, Direction), Vec<VersionTable>>,
}

static GLOBAL: OnceLock<PacketRegistry> = OnceLock::new();

impl PacketRegistry {
    /// Builds and validates every table.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] if a table is inconsistent.
    pub fn try_build() -> Result<Self, RegistryError> {
        let mut tables = HashMap::new();
        for phase in PHASES {
            for direction in DIRECTIONS {
                tables.insert((phase, direction), Self::build_table(phase, direction)?);
            }
        }
        Ok(Self { tables })
    }

    fn build_table(phase: Phase, direction: Direction) -> Result<Vec<VersionTable>, RegistryError> {
        let mut versions: Vec<VersionTable> = V::ALL.iter().map(|_| VersionTable::default()).collect();

        for &(kind, mappings) in table(phase, direction) {
            if mappings.windows(2).any(|pair| pair[0].from >= pair[1].from) {
                return Err(RegistryError::UnorderedMappings { kind, phase, direction });
            }
            for (index, mapping) in mappings.iter().enumerate() {
                let until = mappings.get(index + 1).map(|next| next.from);
                let covered = V::ALL
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| **v >= mapping.from && until.map_or(true, |until| **v < until));
                for (ordinal, &version) in covered {
                    let entry = &mut versions[ordinal];
                    if entry.by_kind.insert(kind, mapping.id).is_some() {
                        return Err(RegistryError::DuplicateKind { kind, phase, direction, version });
                    }
                    if let Some(first) = entry.by_id.insert(mapping.id, kind) {
                        return Err(RegistryError::DuplicateId {
                            id: mapping.id,
                            first,
                            second: kind,
                            phase,
                            direction,
                            version,
                        });
                    }
                }
            }
        }
        Ok(versions)
    }

    /// The process-wide registry.
    ///
    /// # Panics
    ///
    /// Panics on first use if the built-in tables are inconsistent, which
    /// the test suite rules out.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| Self::try_build().unwrap_or_else(|err| panic!("packet tables: {err}")))
    }

    fn version_table(&self, phase: Phase, direction: Direction, version: V) -> Option<&VersionTable> {
        let ordinal = version.ordinal()?;
        self.tables.get(&(phase, direction))?.get(ordinal)
    }

    /// Kind registered under `id`, if any.
    #[must_use]
    pub fn packet_kind(&self, phase: Phase, direction: Direction, version: V, id: i32) -> Option<K> {
        self.version_table(phase, direction, version)?.by_id.get(&id).copied()
    }

    /// Id of `kind`, if it exists in this phase and version.
    #[must_use]
    pub fn packet_id(&self, phase: Phase, direction: Direction, version: V, kind: K) -> Option<i32> {
        self.version_table(phase, direction, version)?.by_kind.get(&kind).copied()
    }

    /// Encodes `packet` into a complete length-prefixed frame.
    ///
    /// # Errors
    ///
    /// Fails if the version is unsupported or the packet has no id in
    /// this phase, direction and version.
    pub fn encode_frame(&self, phase: Phase, direction: Direction, version: V, packet: &Packet) -> FrameResult<Vec<u8>> {
        if !version.is_supported() {
            return Err(FrameError::UnsupportedVersion(version.id()));
        }
        let kind = packet.kind();
        let id = self
            .packet_id(phase, direction, version, kind)
            .ok_or(FrameError::Unregistered { kind, phase, direction, version })?;
        let mut body = PacketSerializer::new();
        body.write_varint(id);
        packet.encode(&mut body, version);
        Ok(encode_frame(body.as_slice()))
    }

    /// Decodes one frame body (`VarInt id ++ payload`).
    ///
    /// Returns `Ok(None)` for ids with no registered packet; those are
    /// dropped without revealing anything to the peer.
    ///
    /// # Errors
    ///
    /// Fails on malformed payloads, payloads outside the packet's length
    /// bounds and bytes left over after decoding.
    pub fn decode_frame(&self, phase: Phase, direction: Direction, version: V, body: &[u8]) -> FrameResult<Option<Packet>> {
        if !version.is_supported() {
            return Err(FrameError::UnsupportedVersion(version.id()));
        }
        let mut input = PacketDeserializer::new(body);
        let id = input.read_varint()?;
        let Some(kind) = self.packet_kind(phase, direction, version, id) else {
            tracing::debug!("dropping unknown packet {:#04x} in {:?}/{:?} for {}", id, phase, direction, version);
            return Ok(None);
        };

        let length = input.remaining();
        let (min, max) = kind.length_bounds(version);
        if length > max {
            return Err(FrameError::TooLarge { length, max });
        }
        if length < min {
            return Err(FrameError::TooSmall { length, min });
        }

        let packet = Packet::decode(kind, &mut input, version)?;
        if input.remaining() > 0 {
            return Err(FrameError::Leftover { remaining: input.remaining() });
        }
        Ok(Some(packet))
    }
}
