//! # Packets
//!
//! The closed set of messages the verification engine speaks.
//!
//! ## Packet Families
//!
//! ```text
//! login          Handshake, LoginStart, LoginSuccess, Disconnect
//! configuration  KeepAlive, PluginMessage, ClientInformation, RegistryData
//! movement       everything the client reports while in the world
//! world          everything the server sends to build the world
//! ```
//!
//! ## Design Philosophy
//!
//! - [`PacketKind`] is the registry key, [`Packet`] carries the fields
//! - Every packet encodes, so synthetic clients share the codec
//! - Only serverbound packets decode; the rest report `NotDecodable`
//! - Length bounds are checked before a decoder ever runs

pub mod configuration;
pub mod dimension;
pub mod ids;
pub mod login;
pub mod movement;
pub mod world;

pub use configuration::{ClientInformation, KeepAlive, PluginMessage, RegistryData, RegistryEntry, Transfer};
pub use ids::{BlockKind, EntityKind};
pub use login::{Disconnect, Handshake, Intent, LoginStart, LoginSuccess};
pub use movement::{
    Animation, Chat, ConfirmTeleportation, PaddleBoat, PlayerInput, SetHeldItem, SetPlayerOnGround,
    SetPlayerPosition, SetPlayerPositionRotation, SetPlayerRotation, Transaction, VehicleMove,
};
pub use world::{
    BlockUpdate, ChunkData, EntityAnimation, GameEvent, JoinGame, MapData, PlayerAbilities, RemoveEntities,
    SetContainerSlot, SetDefaultSpawnPosition, SetExperience, SetHeldSlot, SetPassengers, SpawnEntity,
    SynchronizePlayerPosition, SystemChat, UpdateSectionBlocks, UpdateTime,
};

use crate::codec::{PacketDeserializer, PacketSerializer, MAX_FRAME_LEN};
use crate::error::{FrameError, FrameResult};
use crate::version::ProtocolVersion as V;

/// Identifies a packet type independent of its fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketKind {
    // Handshake & login
    /// Connection intent.
    Handshake,
    /// Username announcement.
    LoginStart,
    /// Client confirms login success (1.20.2+).
    LoginAcknowledged,
    /// Login accepted.
    LoginSuccess,
    /// Connection closed by the server.
    Disconnect,

    // Configuration (shared with play)
    /// End of configuration, both directions.
    FinishConfiguration,
    /// Liveness challenge, both directions.
    KeepAlive,
    /// Registry synchronisation.
    RegistryData,
    /// Client settings.
    ClientInformation,
    /// Custom channel payload.
    PluginMessage,
    /// Server transfer.
    Transfer,

    // Play, clientbound
    /// World join.
    JoinGame,
    /// Movement abilities.
    PlayerAbilities,
    /// World spawn.
    SetDefaultSpawnPosition,
    /// Teleport.
    SynchronizePlayerPosition,
    /// Chunk column.
    ChunkData,
    /// Multi-block change.
    UpdateSectionBlocks,
    /// Time of day.
    UpdateTime,
    /// Game state change.
    GameEvent,
    /// Server-selected hotbar slot.
    SetHeldSlot,
    /// Entity animation.
    EntityAnimation,
    /// Entity spawn.
    SpawnEntity,
    /// Vehicle mounting.
    SetPassengers,
    /// Entity removal.
    RemoveEntities,
    /// Inventory slot.
    SetContainerSlot,
    /// Map pixels.
    MapData,
    /// Experience bar.
    SetExperience,
    /// Server chat.
    SystemChat,

    // Play, both directions
    /// Window transaction / ping-pong.
    Transaction,

    // Play, serverbound
    /// Teleport acknowledgement.
    ConfirmTeleportation,
    /// Position report.
    SetPlayerPosition,
    /// Position and rotation report.
    SetPlayerPositionRotation,
    /// Rotation report.
    SetPlayerRotation,
    /// Ground status report.
    SetPlayerOnGround,
    /// Hotbar selection.
    SetHeldItem,
    /// Arm swing.
    Animation,
    /// Chat input.
    Chat,
    /// Steering input.
    PlayerInput,
    /// Vehicle position.
    VehicleMove,
    /// Boat paddles.
    PaddleBoat,
    /// End of a client tick (1.21.2+).
    ClientTickEnd,
}

impl PacketKind {
    /// Inclusive payload length bounds checked before decoding.
    #[must_use]
    pub fn length_bounds(self, version: V) -> (usize, usize) {
        match self {
            Self::PluginMessage => (4, 0xFFF),
            Self::ClientInformation => (2, 0xFF + 1),
            Self::SetPlayerPosition => (25, if version.less_than(V::V1_8) { 33 } else { 25 }),
            Self::SetPlayerPositionRotation => (33, if version.less_than(V::V1_8) { 41 } else { 33 }),
            _ => (0, MAX_FRAME_LEN),
        }
    }
}

/// A decoded or to-be-encoded packet.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Packet {
    Handshake(Handshake),
    LoginStart(LoginStart),
    LoginAcknowledged,
    LoginSuccess(LoginSuccess),
    Disconnect(Disconnect),
    FinishConfiguration,
    KeepAlive(KeepAlive),
    RegistryData(RegistryData),
    ClientInformation(ClientInformation),
    PluginMessage(PluginMessage),
    Transfer(Transfer),
    JoinGame(JoinGame),
    PlayerAbilities(PlayerAbilities),
    SetDefaultSpawnPosition(SetDefaultSpawnPosition),
    SynchronizePlayerPosition(SynchronizePlayerPosition),
    ChunkData(ChunkData),
    UpdateSectionBlocks(UpdateSectionBlocks),
    UpdateTime(UpdateTime),
    GameEvent(GameEvent),
    SetHeldSlot(SetHeldSlot),
    EntityAnimation(EntityAnimation),
    SpawnEntity(SpawnEntity),
    SetPassengers(SetPassengers),
    RemoveEntities(RemoveEntities),
    SetContainerSlot(SetContainerSlot),
    MapData(MapData),
    SetExperience(SetExperience),
    SystemChat(SystemChat),
    Transaction(Transaction),
    ConfirmTeleportation(ConfirmTeleportation),
    SetPlayerPosition(SetPlayerPosition),
    SetPlayerPositionRotation(SetPlayerPositionRotation),
    SetPlayerRotation(SetPlayerRotation),
    SetPlayerOnGround(SetPlayerOnGround),
    SetHeldItem(SetHeldItem),
    Animation(Animation),
    Chat(Chat),
    PlayerInput(PlayerInput),
    VehicleMove(VehicleMove),
    PaddleBoat(PaddleBoat),
    ClientTickEnd,
}

impl Packet {
    /// The registry key of this packet.
    #[must_use]
    pub const fn kind(&self) -> PacketKind {
        match self {
            Self::Handshake(_) => PacketKind::Handshake,
            Self::LoginStart(_) => PacketKind::LoginStart,
            Self::LoginAcknowledged => PacketKind::LoginAcknowledged,
            Self::LoginSuccess(_) => PacketKind::LoginSuccess,
            Self::Disconnect(_) => PacketKind::Disconnect,
            Self::FinishConfiguration => PacketKind::FinishConfiguration,
            Self::KeepAlive(_) => PacketKind::KeepAlive,
            Self::RegistryData(_) => PacketKind::RegistryData,
            Self::ClientInformation(_) => PacketKind::ClientInformation,
            Self::PluginMessage(_) => PacketKind::PluginMessage,
            Self::Transfer(_) => PacketKind::Transfer,
            Self::JoinGame(_) => PacketKind::JoinGame,
            Self::PlayerAbilities(_) => PacketKind::PlayerAbilities,
            Self::SetDefaultSpawnPosition(_) => PacketKind::SetDefaultSpawnPosition,
            Self::SynchronizePlayerPosition(_) => PacketKind::SynchronizePlayerPosition,
            Self::ChunkData(_) => PacketKind::ChunkData,
            Self::UpdateSectionBlocks(_) => PacketKind::UpdateSectionBlocks,
            Self::UpdateTime(_) => PacketKind::UpdateTime,
            Self::GameEvent(_) => PacketKind::GameEvent,
            Self::SetHeldSlot(_) => PacketKind::SetHeldSlot,
            Self::EntityAnimation(_) => PacketKind::EntityAnimation,
            Self::SpawnEntity(_) => PacketKind::SpawnEntity,
            Self::SetPassengers(_) => PacketKind::SetPassengers,
            Self::RemoveEntities(_) => PacketKind::RemoveEntities,
            Self::SetContainerSlot(_) => PacketKind::SetContainerSlot,
            Self::MapData(_) => PacketKind::MapData,
            Self::SetExperience(_) => PacketKind::SetExperience,
            Self::SystemChat(_) => PacketKind::SystemChat,
            Self::Transaction(_) => PacketKind::Transaction,
            Self::ConfirmTeleportation(_) => PacketKind::ConfirmTeleportation,
            Self::SetPlayerPosition(_) => PacketKind::SetPlayerPosition,
            Self::SetPlayerPositionRotation(_) => PacketKind::SetPlayerPositionRotation,
            Self::SetPlayerRotation(_) => PacketKind::SetPlayerRotation,
            Self::SetPlayerOnGround(_) => PacketKind::SetPlayerOnGround,
            Self::SetHeldItem(_) => PacketKind::SetHeldItem,
            Self::Animation(_) => PacketKind::Animation,
            Self::Chat(_) => PacketKind::Chat,
            Self::PlayerInput(_) => PacketKind::PlayerInput,
            Self::VehicleMove(_) => PacketKind::VehicleMove,
            Self::PaddleBoat(_) => PacketKind::PaddleBoat,
            Self::ClientTickEnd => PacketKind::ClientTickEnd,
        }
    }

    /// Writes the payload (without id) in the layout of `version`.
    pub fn encode(&self, out: &mut PacketSerializer, version: V) {
        match self {
            Self::Handshake(p) => p.encode(out),
            Self::LoginStart(p) => p.encode(out, version),
            Self::LoginSuccess(p) => p.encode(out, version),
            Self::Disconnect(p) => p.encode(out, version),
            Self::LoginAcknowledged | Self::FinishConfiguration | Self::ClientTickEnd => {}
            Self::KeepAlive(p) => p.encode(out, version),
            Self::RegistryData(p) => p.encode(out),
            Self::ClientInformation(p) => p.encode(out, version),
            Self::PluginMessage(p) => p.encode(out, version),
            Self::Transfer(p) => p.encode(out),
            Self::JoinGame(p) => p.encode(out, version),
            Self::PlayerAbilities(p) => p.encode(out),
            Self::SetDefaultSpawnPosition(p) => p.encode(out, version),
            Self::SynchronizePlayerPosition(p) => p.encode(out, version),
            Self::ChunkData(p) => p.encode(out, version),
            Self::UpdateSectionBlocks(p) => p.encode(out, version),
            Self::UpdateTime(p) => p.encode(out, version),
            Self::GameEvent(p) => p.encode(out),
            Self::SetHeldSlot(p) => p.encode(out, version),
            Self::EntityAnimation(p) => p.encode(out, version),
            Self::SpawnEntity(p) => p.encode(out, version),
            Self::SetPassengers(p) => p.encode(out, version),
            Self::RemoveEntities(p) => p.encode(out, version),
            Self::SetContainerSlot(p) => p.encode(out, version),
            Self::MapData(p) => p.encode(out, version),
            Self::SetExperience(p) => p.encode(out, version),
            Self::SystemChat(p) => p.encode(out, version),
            Self::Transaction(p) => p.encode(out, version),
            Self::ConfirmTeleportation(p) => p.encode(out),
            Self::SetPlayerPosition(p) => p.encode(out, version),
            Self::SetPlayerPositionRotation(p) => p.encode(out, version),
            Self::SetPlayerRotation(p) => p.encode(out, version),
            Self::SetPlayerOnGround(p) => p.encode(out, version),
            Self::SetHeldItem(p) => p.encode(out),
            Self::Animation(p) => p.encode(out, version),
            Self::Chat(p) => p.encode(out, version),
            Self::PlayerInput(p) => p.encode(out, version),
            Self::VehicleMove(p) => p.encode(out, version),
            Self::PaddleBoat(p) => p.encode(out),
        }
    }

    /// Reads a packet of `kind` from its payload.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] if the payload is malformed or `kind` has
    /// no decoder. Leftover bytes are checked by the caller.
    pub fn decode(kind: PacketKind, input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        Ok(match kind {
            PacketKind::Handshake => Self::Handshake(Handshake::decode(input)?),
            PacketKind::LoginStart => Self::LoginStart(LoginStart::decode(input, version)?),
            PacketKind::LoginAcknowledged => Self::LoginAcknowledged,
            PacketKind::FinishConfiguration => Self::FinishConfiguration,
            PacketKind::ClientTickEnd => Self::ClientTickEnd,
            PacketKind::KeepAlive => Self::KeepAlive(KeepAlive::decode(input, version)?),
            PacketKind::ClientInformation => Self::ClientInformation(ClientInformation::decode(input, version)?),
            PacketKind::PluginMessage => Self::PluginMessage(PluginMessage::decode(input, version)?),
            PacketKind::Transaction => Self::Transaction(Transaction::decode(input, version)?),
            PacketKind::ConfirmTeleportation => Self::ConfirmTeleportation(ConfirmTeleportation::decode(input)?),
            PacketKind::SetPlayerPosition => Self::SetPlayerPosition(SetPlayerPosition::decode(input, version)?),
            PacketKind::SetPlayerPositionRotation => {
                Self::SetPlayerPositionRotation(SetPlayerPositionRotation::decode(input, version)?)
            }
            PacketKind::SetPlayerRotation => Self::SetPlayerRotation(SetPlayerRotation::decode(input, version)?),
            PacketKind::SetPlayerOnGround => Self::SetPlayerOnGround(SetPlayerOnGround::decode(input, version)?),
            PacketKind::SetHeldItem => Self::SetHeldItem(SetHeldItem::decode(input)?),
            PacketKind::Animation => Self::Animation(Animation::decode(input, version)?),
            PacketKind::Chat => Self::Chat(Chat::decode(input, version)?),
            PacketKind::PlayerInput => Self::PlayerInput(PlayerInput::decode(input, version)?),
            PacketKind::VehicleMove => Self::VehicleMove(VehicleMove::decode(input, version)?),
            PacketKind::PaddleBoat => Self::PaddleBoat(PaddleBoat::decode(input)?),
            kind => return Err(FrameError::NotDecodable { kind }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let packet = Packet::KeepAlive(KeepAlive { id: 1 });
        assert_eq!(packet.kind(), PacketKind::KeepAlive);
        assert_eq!(Packet::ClientTickEnd.kind(), PacketKind::ClientTickEnd);
    }

    #[test]
    fn test_clientbound_kinds_do_not_decode() {
        let mut input = PacketDeserializer::new(&[]);
        let result = Packet::decode(PacketKind::JoinGame, &mut input, V::LATEST);
        assert_eq!(result, Err(FrameError::NotDecodable { kind: PacketKind::JoinGame }));
    }

    #[test]
    fn test_position_bounds_widen_on_1_7() {
        assert_eq!(PacketKind::SetPlayerPosition.length_bounds(V::V1_7_6), (25, 33));
        assert_eq!(PacketKind::SetPlayerPosition.length_bounds(V::V1_21_2), (25, 25));
        assert_eq!(PacketKind::SetPlayerPositionRotation.length_bounds(V::V1_8), (33, 33));
    }
}
