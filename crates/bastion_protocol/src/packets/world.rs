//! # Clientbound Play Packets
//!
//! Everything the engine sends to build and drive the synthetic world:
//! join, spawn, terrain, entities, inventory, map and chat.
//!
//! ## Design
//!
//! - Encode only; the engine never needs to read these back
//! - Era branches are ordered oldest first inside each encoder
//! - Binary tags use the named root before 1.20.2 and the nameless root after

use uuid::Uuid;

use super::dimension::{self, OVERWORLD};
use super::ids::{filled_map_item, map_id_component, BlockKind, EntityKind};
use crate::codec::{Compound, PacketSerializer, Tag, TextComponent};
use crate::version::ProtocolVersion as V;

/// Writes a compound in the root form `version` expects.
pub fn write_compound(out: &mut PacketSerializer, version: V, compound: &Compound) {
    if version.greater_or_equal(V::V1_20_2) {
        compound.write_nameless(out);
    } else {
        compound.write_named(out);
    }
}

/// Spawns the player into the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinGame {
    /// The player's entity id.
    pub entity_id: i32,
    /// Hardcore hearts.
    pub hardcore: bool,
    /// Game mode id.
    pub gamemode: u8,
    /// Previous game mode, -1 for none.
    pub previous_gamemode: i8,
    /// Truncated seed hash.
    pub hashed_seed: i64,
    /// Difficulty (before 1.14).
    pub difficulty: u8,
    /// Displayed player limit.
    pub max_players: i32,
    /// Server view distance.
    pub view_distance: i32,
    /// Server simulation distance.
    pub simulation_distance: i32,
    /// Hide coordinates in the debug screen.
    pub reduced_debug_info: bool,
    /// Show the respawn screen on death.
    pub show_respawn_screen: bool,
    /// Limited crafting (1.20.2+).
    pub limited_crafting: bool,
    /// Debug world.
    pub debug: bool,
    /// Superflat world.
    pub flat: bool,
    /// Portal cooldown ticks (1.20+).
    pub portal_cooldown: i32,
    /// Sea level (1.21.2+).
    pub sea_level: i32,
    /// Secure chat enforced (1.20.5+).
    pub enforces_secure_chat: bool,
}

impl JoinGame {
    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        out.write_i32(self.entity_id);
        if version.greater_or_equal(V::V1_16_2) {
            out.write_bool(self.hardcore);
        }
        if version.less_than(V::V1_8) {
            // no spectator before 1.8
            out.write_u8(if self.gamemode == 3 { 1 } else { self.gamemode });
        } else if version.less_than(V::V1_20_2) {
            out.write_u8(self.gamemode);
        }

        if version.greater_or_equal(V::V1_16) {
            if version.less_than(V::V1_20_2) {
                out.write_i8(self.previous_gamemode);
            }
            out.write_string_array(&[OVERWORLD]);
            if version.less_than(V::V1_20_2) {
                write_compound(out, version, &dimension::codec(version));
                if version.in_between(V::V1_16_2, V::V1_18_2) {
                    write_compound(out, version, &dimension::dimension_element(version));
                } else {
                    out.write_string(OVERWORLD);
                }
                out.write_string(OVERWORLD);
            }
        } else if version.greater_than(V::V1_9) {
            out.write_i32(0);
        } else {
            out.write_i8(0);
        }

        if version.in_between(V::V1_15, V::V1_20) {
            out.write_i64(self.hashed_seed);
        }
        if version.less_than(V::V1_14) {
            out.write_u8(self.difficulty);
        }
        if version.greater_or_equal(V::V1_16_2) {
            out.write_varint(self.max_players);
        } else {
            out.write_u8(self.max_players as u8);
        }
        if version.less_than(V::V1_16) {
            out.write_string("flat");
        }
        if version.greater_or_equal(V::V1_14) {
            out.write_varint(self.view_distance);
        }
        if version.greater_or_equal(V::V1_18) {
            out.write_varint(self.simulation_distance);
        }
        if version.greater_or_equal(V::V1_8) {
            out.write_bool(self.reduced_debug_info);
        }
        if version.greater_or_equal(V::V1_15) {
            out.write_bool(self.show_respawn_screen);
        }
        if version.greater_or_equal(V::V1_20_2) {
            out.write_bool(self.limited_crafting);
            if version.greater_or_equal(V::V1_20_5) {
                out.write_varint(0);
            } else {
                out.write_string(OVERWORLD);
            }
            out.write_string(OVERWORLD);
            out.write_i64(self.hashed_seed);
            out.write_u8(self.gamemode);
            out.write_i8(self.previous_gamemode);
        }
        if version.greater_or_equal(V::V1_16) {
            out.write_bool(self.debug);
            out.write_bool(self.flat);
        }
        if version.greater_or_equal(V::V1_19) {
            // no death location
            out.write_bool(false);
        }
        if version.greater_or_equal(V::V1_20) {
            out.write_varint(self.portal_cooldown);
        }
        if version.greater_or_equal(V::V1_21_2) {
            out.write_varint(self.sea_level);
        }
        if version.greater_or_equal(V::V1_20_5) {
            out.write_bool(self.enforces_secure_chat);
        }
    }
}

/// Movement abilities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerAbilities {
    /// Ability bit flags.
    pub flags: u8,
    /// Flying speed.
    pub flying_speed: f32,
    /// Field of view modifier.
    pub field_of_view: f32,
}

impl PlayerAbilities {
    /// Flag set while flying.
    pub const FLYING: u8 = 0x02;
    /// Flag allowing flight.
    pub const ALLOW_FLYING: u8 = 0x04;

    pub(crate) fn encode(self, out: &mut PacketSerializer) {
        out.write_u8(self.flags);
        out.write_f32(self.flying_speed);
        out.write_f32(self.field_of_view);
    }
}

/// Compass target / world spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetDefaultSpawnPosition {
    /// Block X.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
}

impl SetDefaultSpawnPosition {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.less_than(V::V1_8) {
            out.write_i32(self.x);
            out.write_i32(self.y);
            out.write_i32(self.z);
            return;
        }
        if version.greater_or_equal(V::V1_21_9) {
            out.write_string(OVERWORLD);
        }
        out.write_i64(pack_position(version, self.x, self.y, self.z));
        if version.greater_or_equal(V::V1_17) {
            out.write_f32(0.0);
            if version.greater_or_equal(V::V1_21_9) {
                out.write_f32(0.0);
            }
        }
    }
}

/// Packs a block position into the i64 layout of `version`.
#[must_use]
pub fn pack_position(version: V, x: i32, y: i32, z: i32) -> i64 {
    let (x, y, z) = (i64::from(x), i64::from(y), i64::from(z));
    if version.less_than(V::V1_14) {
        ((x & 0x3FF_FFFF) << 38) | ((y & 0xFFF) << 26) | (z & 0x3FF_FFFF)
    } else {
        ((x & 0x3FF_FFFF) << 38) | ((z & 0x3FF_FFFF) << 12) | (y & 0xFFF)
    }
}

/// Server-side teleport of the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynchronizePlayerPosition {
    /// Target X.
    pub x: f64,
    /// Target Y.
    pub y: f64,
    /// Target Z.
    pub z: f64,
    /// Yaw.
    pub yaw: f32,
    /// Pitch.
    pub pitch: f32,
    /// Relative-coordinate bit mask.
    pub relative: u8,
    /// Id the client must confirm (1.9+).
    pub teleport_id: i32,
    /// Dismount flag (1.17-1.19.3).
    pub dismount: bool,
}

impl SynchronizePlayerPosition {
    /// Bit marking Y as relative.
    pub const RELATIVE_Y: u8 = 1 << 1;

    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.greater_or_equal(V::V1_21_2) {
            out.write_varint(self.teleport_id);
            out.write_f64(self.x);
            out.write_f64(self.y);
            out.write_f64(self.z);
            // velocity
            out.write_f64(0.0);
            out.write_f64(0.0);
            out.write_f64(0.0);
            out.write_f32(self.yaw);
            out.write_f32(self.pitch);
            out.write_i32(i32::from(self.relative));
            return;
        }
        out.write_f64(self.x);
        if version.less_than(V::V1_8) {
            out.write_f64(self.y + f64::from(1.62_f32));
        } else {
            out.write_f64(self.y);
        }
        out.write_f64(self.z);
        out.write_f32(self.yaw);
        out.write_f32(self.pitch);
        out.write_u8(self.relative);
        if version.greater_than(V::V1_8) {
            out.write_varint(self.teleport_id);
            if version.in_between(V::V1_17, V::V1_19_3) {
                out.write_bool(self.dismount);
            }
        }
    }
}

/// An empty chunk column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkData {
    /// Chunk X.
    pub x: i32,
    /// Chunk Z.
    pub z: i32,
}

impl ChunkData {
    const SECTION_BYTES: [u8; 8] = [0, 0, 0, 0, 0, 0, 1, 0];
    const LIGHT_BYTES: [u8; 15] = [1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 3, 0xFF, 0xFF, 0, 0];
    const MOTION_BLOCKING: i32 = 4;

    fn heightmap_longs(version: V) -> usize {
        if version.less_than(V::V1_18) {
            36
        } else {
            37
        }
    }

    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        out.write_i32(self.x);
        out.write_i32(self.z);

        if version.greater_or_equal(V::V1_17) {
            if version.less_or_equal(V::V1_17_1) {
                out.write_varint(0); // mask
            }
        } else {
            out.write_bool(true); // full chunk
            if version.in_between(V::V1_16, V::V1_16_1) {
                out.write_bool(true); // ignore old data
            }
            if version.greater_than(V::V1_8) {
                out.write_varint(0);
            } else {
                out.write_i16(1);
            }
        }

        if version.greater_or_equal(V::V1_21_5) {
            out.write_varint(1);
            out.write_varint(Self::MOTION_BLOCKING);
            let longs = Self::heightmap_longs(version);
            out.write_varint(longs as i32);
            for _ in 0..longs {
                out.write_i64(0);
            }
        } else if version.greater_or_equal(V::V1_14) {
            let heightmap = Compound::new().with(
                "MOTION_BLOCKING",
                Tag::LongArray(vec![0; Self::heightmap_longs(version)]),
            );
            write_compound(out, version, &Compound::new().with("root", Tag::Compound(heightmap)));

            if version.in_between(V::V1_15, V::V1_17_1) {
                if version.greater_or_equal(V::V1_16_2) {
                    out.write_varint(1024);
                    for _ in 0..1024 {
                        out.write_varint(1);
                    }
                } else {
                    for _ in 0..1024 {
                        out.write_i32(0);
                    }
                }
            }
        }

        if version.less_than(V::V1_8) {
            out.write_i32(0);
            out.write_bytes(&[0; 2]);
        } else if version.less_than(V::V1_13) {
            out.write_varint(0);
        } else if version.less_than(V::V1_15) {
            out.write_byte_array(&[0; 256 * 4]);
        } else if version.less_than(V::V1_18) {
            out.write_varint(0);
        } else {
            let sections = if version.greater_or_equal(V::V1_21_2) { 24 } else { 16 };
            out.write_varint((Self::SECTION_BYTES.len() * sections) as i32);
            for _ in 0..sections {
                out.write_bytes(&Self::SECTION_BYTES);
            }
        }

        if version.greater_or_equal(V::V1_9_4) {
            out.write_varint(0); // block entities
        }

        if version.greater_or_equal(V::V1_21_2) {
            for _ in 0..6 {
                out.write_varint(0);
            }
        } else if version.greater_or_equal(V::V1_20) {
            out.write_bytes(&Self::LIGHT_BYTES[1..]);
        } else if version.greater_or_equal(V::V1_18) {
            out.write_bytes(&Self::LIGHT_BYTES);
        }
    }
}

/// One block change inside a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockUpdate {
    /// X inside the chunk, 0-15.
    pub x: u8,
    /// Absolute Y.
    pub y: i32,
    /// Z inside the chunk, 0-15.
    pub z: u8,
    /// Block placed.
    pub block: BlockKind,
}

impl BlockUpdate {
    fn legacy_position(self) -> i16 {
        ((i32::from(self.x & 15) << 12) | (i32::from(self.z & 15) << 8) | (self.y & 0xFF)) as i16
    }

    fn section_position(self) -> i64 {
        i64::from((i32::from(self.x & 15) << 8) | (i32::from(self.z & 15) << 4) | (self.y & 15))
    }
}

/// Multi-block change within one chunk section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateSectionBlocks {
    /// Chunk X.
    pub section_x: i32,
    /// Chunk Z.
    pub section_z: i32,
    /// Changes; all must share one section Y.
    pub blocks: Vec<BlockUpdate>,
}

impl UpdateSectionBlocks {
    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        if version.less_than(V::V1_16_2) {
            out.write_i32(self.section_x);
            out.write_i32(self.section_z);
            if version.less_than(V::V1_8) {
                out.write_i16(self.blocks.len() as i16);
                out.write_i32(4 * self.blocks.len() as i32);
            } else {
                out.write_varint(self.blocks.len() as i32);
            }
            for block in &self.blocks {
                out.write_i16(block.legacy_position());
                let id = block.block.state_id(version);
                if version.greater_or_equal(V::V1_13) {
                    out.write_varint(id);
                } else if version.less_than(V::V1_8) {
                    out.write_i16((id << 4) as i16);
                } else {
                    out.write_varint(id << 4);
                }
            }
            return;
        }

        let section_y = self.blocks.first().map_or(0, |block| block.y >> 4);
        out.write_i64(
            ((i64::from(self.section_x) & 0x3F_FFFF) << 42)
                | (i64::from(section_y) & 0xF_FFFF)
                | ((i64::from(self.section_z) & 0x3F_FFFF) << 20),
        );
        if version.less_than(V::V1_20) {
            out.write_bool(true); // suppress light updates
        }
        out.write_varint(self.blocks.len() as i32);
        for block in &self.blocks {
            let state = i64::from(block.block.state_id(version)) << 12;
            out.write_varlong(state | block.section_position());
        }
    }
}

/// World age and time of day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateTime {
    /// World age in ticks.
    pub world_age: i64,
    /// Time of day in ticks.
    pub time_of_day: i64,
    /// Whether the client advances the time itself (1.21.2+).
    pub ticking: bool,
}

impl UpdateTime {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        out.write_i64(self.world_age);
        out.write_i64(self.time_of_day);
        if version.greater_or_equal(V::V1_21_2) {
            out.write_bool(self.ticking);
        }
    }
}

/// Game state change (1.20.3+ is the only era it is registered for).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameEvent {
    /// Event id.
    pub event: u8,
    /// Event value.
    pub value: f32,
}

impl GameEvent {
    /// Tells the client chunks are about to arrive.
    pub const START_WAITING_FOR_CHUNKS: u8 = 13;

    pub(crate) fn encode(self, out: &mut PacketSerializer) {
        out.write_u8(self.event);
        out.write_f32(self.value);
    }
}

/// Server-selected hotbar slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetHeldSlot {
    /// Hotbar slot.
    pub slot: i32,
}

impl SetHeldSlot {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.greater_or_equal(V::V1_21_2) {
            out.write_varint(self.slot);
        } else {
            out.write_i8(self.slot as i8);
        }
    }
}

/// Plays an animation on an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityAnimation {
    /// Animated entity.
    pub entity_id: i32,
    /// Animation id, 0 swings the main arm.
    pub animation: u8,
}

impl EntityAnimation {
    /// Main arm swing.
    pub const SWING_MAIN_ARM: u8 = 0;

    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.less_than(V::V1_8) {
            out.write_i32(self.entity_id);
        } else {
            out.write_varint(self.entity_id);
        }
        out.write_u8(self.animation);
    }
}

/// Spawns a non-living entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnEntity {
    /// Entity id.
    pub entity_id: i32,
    /// Entity uuid (1.9+).
    pub uuid: Uuid,
    /// Entity type.
    pub kind: EntityKind,
    /// X.
    pub x: f64,
    /// Y.
    pub y: f64,
    /// Z.
    pub z: f64,
    /// Type-specific data.
    pub data: i32,
}

impl SpawnEntity {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        out.write_varint(self.entity_id);
        if version.greater_or_equal(V::V1_9) {
            out.write_uuid(self.uuid);
        }
        let kind = self.kind.id(version);
        if version.greater_or_equal(V::V1_14) {
            out.write_varint(kind);
        } else {
            out.write_i8(kind as i8);
        }
        if version.greater_or_equal(V::V1_9) {
            out.write_f64(self.x);
            out.write_f64(self.y);
            out.write_f64(self.z);
        } else {
            out.write_i32((self.x * 32.0) as i32);
            out.write_i32((self.y * 32.0) as i32);
            out.write_i32((self.z * 32.0) as i32);
        }
        out.write_i8(0); // pitch
        out.write_i8(0); // yaw
        if version.greater_or_equal(V::V1_19) {
            out.write_i8(0); // head yaw
            out.write_varint(self.data);
        } else {
            out.write_i32(self.data);
        }
        if self.data > 0 || version.greater_or_equal(V::V1_9) {
            // no velocity
            out.write_i16(0);
            out.write_i16(0);
            out.write_i16(0);
        }
    }
}

/// Mounts entities on a vehicle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetPassengers {
    /// Vehicle entity.
    pub vehicle_id: i32,
    /// Mounted entities.
    pub passengers: Vec<i32>,
}

impl SetPassengers {
    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        if version.greater_or_equal(V::V1_9) {
            out.write_varint(self.vehicle_id);
            out.write_varint(self.passengers.len() as i32);
            for passenger in &self.passengers {
                out.write_varint(*passenger);
            }
        } else {
            // attach entity: one rider, no leash
            out.write_i32(self.passengers.first().copied().unwrap_or(-1));
            out.write_i32(self.vehicle_id);
            out.write_bool(false);
        }
    }
}

/// Despawns entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveEntities {
    /// Entities to remove.
    pub entity_ids: Vec<i32>,
}

impl RemoveEntities {
    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        if version.less_than(V::V1_8) {
            out.write_u8(self.entity_ids.len() as u8);
            for id in &self.entity_ids {
                out.write_i32(*id);
            }
        } else if version == V::V1_17 {
            // 1.17 removes exactly one entity per packet
            out.write_varint(self.entity_ids.first().copied().unwrap_or_default());
        } else {
            out.write_varint(self.entity_ids.len() as i32);
            for id in &self.entity_ids {
                out.write_varint(*id);
            }
        }
    }
}

/// Puts a filled map into an inventory slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetContainerSlot {
    /// Window id, 0 is the player inventory.
    pub window_id: i32,
    /// Slot index.
    pub slot: i16,
    /// Stack size.
    pub count: u8,
    /// Map id stored on the item.
    pub map_id: i32,
}

impl SetContainerSlot {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.greater_or_equal(V::V1_21_2) {
            out.write_varint(self.window_id);
        } else {
            out.write_u8(self.window_id as u8);
        }
        if version.greater_or_equal(V::V1_17_1) {
            out.write_varint(0); // state id
        }
        out.write_i16(self.slot);
        if version.in_between(V::V1_13_2, V::V1_20_3) {
            out.write_bool(true); // present
        }
        if version.greater_or_equal(V::V1_20_5) {
            out.write_varint(i32::from(self.count));
        }
        let item = filled_map_item(version);
        if version.less_than(V::V1_13_2) {
            out.write_i16(item as i16);
        } else {
            out.write_varint(item);
        }
        if version.less_than(V::V1_20_5) {
            out.write_u8(self.count);
        }
        if version.less_than(V::V1_13) {
            out.write_i16(self.map_id as i16); // damage
        }
        if version.less_than(V::V1_17) {
            if version.less_than(V::V1_8) {
                out.write_i16(-1);
            } else {
                out.write_u8(0);
            }
        } else if version.less_than(V::V1_20_5) {
            let tag = Compound::new().with("map", Tag::Int(self.map_id));
            write_compound(out, version, &tag);
        } else {
            out.write_varint(1); // components added
            out.write_varint(0); // components removed
            out.write_varint(map_id_component(version));
            out.write_varint(self.map_id);
        }
    }
}

/// Map pixel data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapData {
    /// Map id.
    pub map_id: i32,
    /// First column of the patch.
    pub x: u8,
    /// First row of the patch.
    pub y: u8,
    /// Colour indices, row major.
    pub colors: Vec<u8>,
}

impl MapData {
    /// Width and height of a map in pixels.
    pub const SIZE: usize = 128;

    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        out.write_varint(self.map_id);
        if version.less_than(V::V1_8) {
            out.write_i16((self.colors.len() + 3) as i16);
            out.write_u8(0);
            out.write_u8(self.x);
            out.write_u8(self.y);
            out.write_bytes(&self.colors);
            return;
        }
        out.write_u8(0); // scale
        if version.in_between(V::V1_9, V::V1_16_4) {
            out.write_bool(false); // tracking position
        }
        if version.greater_or_equal(V::V1_14) {
            out.write_bool(false); // locked
        }
        if version.greater_or_equal(V::V1_17) {
            out.write_bool(false);
        } else {
            out.write_varint(0);
        }
        out.write_u8(Self::SIZE as u8);
        out.write_u8(Self::SIZE as u8);
        out.write_u8(self.x);
        out.write_u8(self.y);
        out.write_varint(self.colors.len() as i32);
        out.write_bytes(&self.colors);
    }
}

/// Experience bar, used as a countdown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetExperience {
    /// Bar fill, 0.0-1.0.
    pub bar: f32,
    /// Displayed level.
    pub level: i32,
    /// Total experience.
    pub total: i32,
}

impl SetExperience {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        out.write_f32(self.bar);
        if version.less_than(V::V1_8) {
            out.write_i16(self.level as i16);
            out.write_i16(self.total as i16);
        } else {
            out.write_varint(self.level);
            out.write_varint(self.total);
        }
    }
}

/// Server chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemChat {
    /// Message body.
    pub message: TextComponent,
    /// Sender uuid (1.16-1.18.2).
    pub sender: Uuid,
}

impl SystemChat {
    /// A system message from the nil sender.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: TextComponent::new(message), sender: Uuid::nil() }
    }

    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        self.message.write(out, version);
        if version.greater_or_equal(V::V1_19_1) {
            out.write_bool(false); // not an action bar message
        } else if version.greater_or_equal(V::V1_19) {
            out.write_varint(1);
        } else if version.greater_or_equal(V::V1_8) {
            out.write_u8(1);
        }
        if version.in_between(V::V1_16, V::V1_18_2) {
            out.write_uuid(self.sender);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_position_layouts() {
        assert_eq!(pack_position(V::V1_8, 1, 2, 3), (1 << 38) | (2 << 26) | 3);
        assert_eq!(pack_position(V::V1_14, 1, 2, 3), (1 << 38) | (3 << 12) | 2);
        // negative coordinates keep their low bits
        assert_eq!(pack_position(V::V1_14, -1, 0, 0) >> 38, -1);
    }

    #[test]
    fn test_teleport_layout_changes_in_1_21_2() {
        let teleport = SynchronizePlayerPosition {
            x: 8.0,
            y: 1200.0,
            z: 8.0,
            yaw: 0.0,
            pitch: 0.0,
            relative: 0,
            teleport_id: 7,
            dismount: false,
        };
        let mut legacy = PacketSerializer::new();
        teleport.encode(&mut legacy, V::V1_7_6);
        assert_eq!(legacy.len(), 8 * 3 + 4 * 2 + 1);

        let mut with_dismount = PacketSerializer::new();
        teleport.encode(&mut with_dismount, V::V1_19_3);
        assert_eq!(with_dismount.len(), 8 * 3 + 4 * 2 + 1 + 1 + 1);

        let mut modern = PacketSerializer::new();
        teleport.encode(&mut modern, V::V1_21_2);
        assert_eq!(modern.len(), 1 + 8 * 6 + 4 * 2 + 4);
        assert_eq!(modern.as_slice()[0], 7);
    }

    #[test]
    fn test_remove_entities_single_id_on_1_17() {
        let packet = RemoveEntities { entity_ids: vec![300] };
        let mut out = PacketSerializer::new();
        packet.encode(&mut out, V::V1_17);
        assert_eq!(out.as_slice(), &[0xAC, 0x02]);

        let mut counted = PacketSerializer::new();
        packet.encode(&mut counted, V::V1_17_1);
        assert_eq!(counted.as_slice(), &[0x01, 0xAC, 0x02]);
    }

    #[test]
    fn test_section_blocks_modern_entry() {
        let packet = UpdateSectionBlocks {
            section_x: 0,
            section_z: 0,
            blocks: vec![BlockUpdate { x: 4, y: 17, z: 5, block: BlockKind::StoneSlab }],
        };
        let mut out = PacketSerializer::new();
        packet.encode(&mut out, V::V1_20);
        // position long + count + one varlong
        let state = i64::from(BlockKind::StoneSlab.state_id(V::V1_20));
        let mut expected = PacketSerializer::new();
        expected.write_i64(1);
        expected.write_varint(1);
        expected.write_varlong((state << 12) | (4 << 8) | (5 << 4) | 1);
        assert_eq!(out.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_join_game_encodes_for_every_version() {
        let join = JoinGame {
            entity_id: 1,
            hardcore: false,
            gamemode: 2,
            previous_gamemode: -1,
            hashed_seed: 0,
            difficulty: 0,
            max_players: 1,
            view_distance: 2,
            simulation_distance: 2,
            reduced_debug_info: true,
            show_respawn_screen: false,
            limited_crafting: false,
            debug: false,
            flat: true,
            portal_cooldown: 0,
            sea_level: 63,
            enforces_secure_chat: false,
        };
        for version in V::ALL {
            let mut out = PacketSerializer::new();
            join.encode(&mut out, *version);
            assert!(out.len() > 4, "{version}");
        }
    }
}
