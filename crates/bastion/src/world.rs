//! # Synthetic World
//!
//! The empty world every session is dropped into, prepared once per gate.
//!
//! ## Layout
//!
//! ```text
//!   y = in_air_y          first teleport (spawn column x = z = 8)
//!        │
//!   y = dynamic_spawn_y   second teleport, start of the free fall
//!        │  max_movement_ticks of (v - 0.1) * 0.98
//!        ▼
//!   y = platform_y        8 x 8 platform of one random block kind
//! ```
//!
//! Heights and entity ids are randomized per gate so a bot cannot ship
//! hard-coded coordinates. The fall is precomputed with a slightly
//! stronger pull than the client's, so the platform always sits below
//! the point a genuine client reaches after the checked ticks.

use bastion_protocol::packets::{
    BlockKind, BlockUpdate, ChunkData, EntityKind, JoinGame, RemoveEntities, SetDefaultSpawnPosition,
    SetExperience, SetPassengers, SpawnEntity, SynchronizePlayerPosition, UpdateSectionBlocks,
};
use bastion_protocol::ProtocolVersion;
use rand::Rng;
use uuid::Uuid;

use crate::config::{BastionConfig, Gamemode};

/// Spawn column X, the middle of chunk 0.
pub const SPAWN_X: f64 = 8.0;
/// Spawn column Z, the middle of chunk 0.
pub const SPAWN_Z: f64 = 8.0;
/// Platform edge length in blocks.
pub const BLOCKS_PER_ROW: u8 = 8;
/// Height the CAPTCHA stage freezes the player at.
pub const CAPTCHA_Y: f64 = 10_000.0;
/// Height a seated player is teleported to; clients must stay seated.
pub const VEHICLE_TELEPORT_Y: f64 = 10_000.0;

/// Per-gate constants of the synthetic world.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedWorld {
    /// Entity id of every verified player.
    pub player_entity_id: i32,
    /// Entity id of the test vehicle.
    pub vehicle_entity_id: i32,
    /// Uuid of the test vehicle.
    pub vehicle_uuid: Uuid,
    /// Y of the collision platform.
    pub platform_y: i32,
    /// Height of the first teleport and the boat.
    pub in_air_y: i32,
    /// Y the free fall starts from.
    pub dynamic_spawn_y: i32,
    /// Free-fall ticks checked.
    pub max_movement_ticks: u32,
    /// Inbound packet budget of one session.
    pub max_total_packets: u32,
    /// Steps of the CAPTCHA experience countdown.
    pub countdown_len: u32,
    gamemode: Gamemode,
    difficulty: u8,
    hashed_seed: i64,
}

/// Distance covered by `ticks` ticks of `v' = (v - 0.1) * 0.98`.
#[must_use]
pub fn fall_distance(ticks: u32) -> f64 {
    let mut motion = 0.0_f64;
    let mut distance = 0.0_f64;
    for _ in 0..ticks {
        motion = (motion - 0.1) * f64::from(0.98_f32);
        distance += motion.abs();
    }
    distance
}

impl PreparedWorld {
    /// Rolls a new world for `config`.
    #[must_use]
    pub fn new<R: Rng + ?Sized>(config: &BastionConfig, rng: &mut R) -> Self {
        let verification = &config.verification;
        let max_movement_ticks = verification.gravity.max_movement_ticks;
        let platform_y = rng.gen_range(1..=255);
        // fall distances stay far below i32 range
        #[allow(clippy::cast_possible_truncation)]
        let dynamic_spawn_y = platform_y + fall_distance(max_movement_ticks).ceil() as i32;

        let countdown_len = if verification.captcha.timing == crate::config::Timing::Never
            && !verification.gravity.captcha_on_fail
        {
            0
        } else {
            u32::try_from(verification.captcha.countdown_len()).unwrap_or(u32::MAX)
        };
        let max_total_packets = max_movement_ticks
            .saturating_add(2)
            .saturating_add(countdown_len.saturating_mul(20))
            .saturating_add(5)
            .saturating_add(verification.vehicle.minimum_packets.saturating_mul(4))
            .saturating_add(verification.captcha.max_tries)
            .saturating_add(150);

        Self {
            player_entity_id: rng.gen(),
            vehicle_entity_id: rng.gen(),
            vehicle_uuid: Uuid::from_u128(rng.gen()),
            platform_y,
            in_air_y: rng.gen_range(3000..3500),
            dynamic_spawn_y,
            max_movement_ticks,
            max_total_packets,
            countdown_len,
            gamemode: verification.gravity.gamemode,
            difficulty: rng.gen_range(0..3),
            hashed_seed: rng.gen::<i64>() & 1337,
        }
    }

    /// Game mode of the world.
    #[must_use]
    pub const fn gamemode(&self) -> Gamemode {
        self.gamemode
    }

    /// Join packet for the synthetic world.
    #[must_use]
    pub fn join_game(&self) -> JoinGame {
        JoinGame {
            entity_id: self.player_entity_id,
            hardcore: false,
            gamemode: self.gamemode.id(),
            previous_gamemode: -1,
            hashed_seed: self.hashed_seed,
            difficulty: self.difficulty,
            max_players: 1,
            view_distance: 0,
            simulation_distance: 0,
            reduced_debug_info: false,
            show_respawn_screen: true,
            limited_crafting: false,
            debug: false,
            flat: true,
            portal_cooldown: 0,
            sea_level: 63,
            enforces_secure_chat: false,
        }
    }

    /// Compass target; only sent to 1.19.3+.
    #[must_use]
    pub fn default_spawn(&self) -> SetDefaultSpawnPosition {
        SetDefaultSpawnPosition { x: 8, y: self.in_air_y, z: 8 }
    }

    /// First teleport, high in the air.
    #[must_use]
    pub fn spawn_teleport(&self, teleport_id: i32) -> SynchronizePlayerPosition {
        SynchronizePlayerPosition {
            x: SPAWN_X,
            y: f64::from(self.in_air_y),
            z: SPAWN_Z,
            yaw: 0.0,
            pitch: 0.0,
            relative: 0,
            teleport_id,
            dismount: false,
        }
    }

    /// Second teleport, relative down to the fall start.
    #[must_use]
    pub fn fall_start(&self, teleport_id: i32) -> SynchronizePlayerPosition {
        SynchronizePlayerPosition {
            x: SPAWN_X,
            y: f64::from(self.dynamic_spawn_y - self.in_air_y),
            z: SPAWN_Z,
            yaw: 0.0,
            pitch: -90.0,
            relative: SynchronizePlayerPosition::RELATIVE_Y,
            teleport_id,
            dismount: false,
        }
    }

    /// Only teleport of clients without teleport confirmations.
    #[must_use]
    pub fn legacy_fall_start(&self) -> SynchronizePlayerPosition {
        SynchronizePlayerPosition {
            x: SPAWN_X,
            y: f64::from(self.dynamic_spawn_y),
            z: SPAWN_Z,
            yaw: 0.0,
            pitch: -90.0,
            relative: 0,
            teleport_id: 0,
            dismount: false,
        }
    }

    /// Empty chunks around the spawn column.
    #[must_use]
    pub fn chunks(version: ProtocolVersion) -> Vec<ChunkData> {
        if version.less_than(ProtocolVersion::V1_20_3) {
            return vec![ChunkData { x: 0, z: 0 }];
        }
        // newer clients keep loading until every neighbour is present
        let mut chunks = Vec::with_capacity(9);
        for x in [0, 1, -1] {
            for z in [0, 1, -1] {
                chunks.push(ChunkData { x, z });
            }
        }
        chunks
    }

    /// The landing platform built from `block`.
    #[must_use]
    pub fn platform(&self, block: BlockKind) -> UpdateSectionBlocks {
        let offset = BLOCKS_PER_ROW / 2;
        let mut blocks = Vec::with_capacity(usize::from(BLOCKS_PER_ROW) * usize::from(BLOCKS_PER_ROW));
        for x in 0..BLOCKS_PER_ROW {
            for z in 0..BLOCKS_PER_ROW {
                blocks.push(BlockUpdate { x: x + offset, y: self.platform_y, z: z + offset, block });
            }
        }
        UpdateSectionBlocks { section_x: 0, section_z: 0, blocks }
    }

    /// Y a client standing on a `block` platform reports.
    #[must_use]
    pub fn landing_y(&self, block: BlockKind) -> f64 {
        f64::from(self.platform_y) + block.collision_height()
    }

    /// Spawns the test vehicle of `kind` above the spawn column.
    #[must_use]
    pub fn spawn_vehicle(&self, kind: EntityKind) -> SpawnEntity {
        let y = match kind {
            EntityKind::Boat => self.in_air_y,
            EntityKind::Minecart => self.in_air_y - 16,
        };
        SpawnEntity {
            entity_id: self.vehicle_entity_id,
            uuid: self.vehicle_uuid,
            kind,
            x: SPAWN_X,
            y: f64::from(y),
            z: SPAWN_Z,
            data: 0,
        }
    }

    /// Seats the player on the test vehicle.
    #[must_use]
    pub fn mount(&self) -> SetPassengers {
        SetPassengers { vehicle_id: self.vehicle_entity_id, passengers: vec![self.player_entity_id] }
    }

    /// Despawns the test vehicle.
    #[must_use]
    pub fn remove_vehicle(&self) -> RemoveEntities {
        RemoveEntities { entity_ids: vec![self.vehicle_entity_id] }
    }

    /// Experience bar showing `step` of the countdown.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    pub fn countdown(&self, step: u32) -> SetExperience {
        let step = step.min(self.countdown_len.saturating_sub(1));
        SetExperience { bar: step as f32 / self.countdown_len.max(1) as f32, level: step as i32, total: 0 }
    }

    /// Teleport that freezes the player for the CAPTCHA.
    #[must_use]
    pub fn captcha_position() -> SynchronizePlayerPosition {
        SynchronizePlayerPosition {
            x: SPAWN_X,
            y: CAPTCHA_Y,
            z: SPAWN_Z,
            yaw: 0.0,
            pitch: 90.0,
            relative: 0,
            teleport_id: 0,
            dismount: false,
        }
    }

    /// Teleport sent while the player sits in the test vehicle.
    #[must_use]
    pub fn vehicle_teleport() -> SynchronizePlayerPosition {
        SynchronizePlayerPosition {
            x: SPAWN_X,
            y: VEHICLE_TELEPORT_Y,
            z: SPAWN_Z,
            yaw: 0.0,
            pitch: 0.0,
            relative: 0,
            teleport_id: 0,
            dismount: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world(config: &BastionConfig) -> PreparedWorld {
        PreparedWorld::new(config, &mut ChaCha8Rng::seed_from_u64(7))
    }

    #[test]
    fn test_fall_distance_is_monotonic() {
        assert_eq!(fall_distance(0), 0.0);
        let mut last = 0.0;
        for ticks in 1..20 {
            let distance = fall_distance(ticks);
            assert!(distance > last);
            last = distance;
        }
    }

    #[test]
    fn test_platform_sits_below_a_real_fall() {
        // a real client falls with 0.08 per tick and must not land early
        let config = BastionConfig::default();
        let world = world(&config);
        let mut motion = 0.0_f64;
        let mut y = f64::from(world.dynamic_spawn_y);
        for _ in 0..world.max_movement_ticks {
            motion = (motion - 0.08) * f64::from(0.98_f32);
            y += motion;
        }
        let highest_landing = BlockKind::ALL.iter().map(|block| world.landing_y(*block)).fold(f64::MIN, f64::max);
        assert!(y > highest_landing, "lands at {highest_landing} before {y}");
    }

    #[test]
    fn test_ranges() {
        for seed in 0..32 {
            let world = PreparedWorld::new(&BastionConfig::default(), &mut ChaCha8Rng::seed_from_u64(seed));
            assert!((1..=255).contains(&world.platform_y));
            assert!((3000..3500).contains(&world.in_air_y));
            assert!(world.dynamic_spawn_y > world.platform_y);
        }
    }

    #[test]
    fn test_packet_budget() {
        let mut config = BastionConfig::default();
        let plain = world(&config);
        assert_eq!(plain.countdown_len, 0);
        assert_eq!(plain.max_total_packets, 8 + 2 + 5 + 2 * 4 + 3 + 150);

        config.verification.captcha.timing = crate::config::Timing::Always;
        let with_captcha = world(&config);
        assert_eq!(with_captcha.countdown_len, 45);
        assert_eq!(with_captcha.max_total_packets, plain.max_total_packets + 45 * 20);
    }

    #[test]
    fn test_platform_layout() {
        let world = world(&BastionConfig::default());
        let platform = world.platform(BlockKind::StoneSlab);
        assert_eq!(platform.blocks.len(), 64);
        assert!(platform.blocks.iter().all(|block| (4..12).contains(&block.x) && (4..12).contains(&block.z)));
        assert!(platform.blocks.iter().all(|block| block.y == world.platform_y));
    }

    #[test]
    fn test_chunks_by_version() {
        assert_eq!(PreparedWorld::chunks(ProtocolVersion::V1_20_2).len(), 1);
        assert_eq!(PreparedWorld::chunks(ProtocolVersion::V1_20_3).len(), 9);
    }

    #[test]
    fn test_countdown_is_clamped() {
        let mut config = BastionConfig::default();
        config.verification.captcha.timing = crate::config::Timing::Always;
        let world = world(&config);
        assert_eq!(world.countdown(0).level, 0);
        assert_eq!(world.countdown(1_000).level, 44);
    }
}
