//! # Gravity
//!
//! Drops the player into the synthetic world and watches the fall.
//!
//! ## Design
//!
//! Two teleports bracket the fall: the first parks the player high in
//! the air, the second moves it relatively to the fall start. Only after
//! both are confirmed does the player's position mean anything. From
//! there every airborne tick must match the client's own motion formula,
//! `v' = (v - 0.08) * 0.98f`, to within `1e-7`, and the landing must sit
//! exactly on top of the platform block.
//!
//! 1.21.2+ clients may report their position between the two confirms;
//! that report is held back and replayed once teleported.

use std::sync::Arc;

use bastion_protocol::packets::{
    BlockKind, ConfirmTeleportation, GameEvent, PlayerAbilities, SetPlayerPositionRotation, UpdateTime,
};
use bastion_protocol::{Packet, ProtocolVersion};
use rand::seq::SliceRandom;
use rand::Rng;

use super::prejoin::{handle_client_information, handle_plugin_message, validate_announcements};
use super::Step;
use crate::config::Gamemode;
use crate::error::{ensure, VerificationError, VerifyResult};
use crate::session::StageContext;
use crate::world::{PreparedWorld, SPAWN_X, SPAWN_Z};

/// Gravity of a falling player, blocks per tick squared.
const GRAVITY: f64 = 0.08;

/// Largest accepted difference between predicted and reported motion.
const TOLERANCE: f64 = 1e-7;

/// Time of day clients assume when none is sent.
const DEFAULT_TIME_OF_DAY: i64 = 1000;

/// Motion a genuine client reports after `last` on the next tick.
#[must_use]
pub(crate) fn predict_motion(last: f64) -> f64 {
    (last - GRAVITY) * f64::from(0.98_f32)
}

#[derive(Debug)]
pub(crate) struct Gravity {
    gravity: bool,
    collisions: bool,
    block_height: f64,
    expected_teleport_id: i32,
    fall_teleport_id: i32,
    spawn_confirmed: bool,
    teleported: bool,
    cached_position: Option<SetPlayerPositionRotation>,
    checking_movement: bool,
    can_fall: bool,
    x: f64,
    y: f64,
    z: f64,
    motion: f64,
    movement_tick: u32,
    client_tick: u32,
}

impl Gravity {
    pub(crate) fn enter(ctx: &mut StageContext) -> VerifyResult<Self> {
        let verifier = Arc::clone(&ctx.verifier);
        let world = verifier.world();
        let config = &verifier.config().verification;
        let version = ctx.version();

        let reduced = ctx.reduced_protocol;
        let collisions = config.gravity.check_collisions && !reduced;
        let block = *BlockKind::ALL.choose(&mut ctx.rng).unwrap_or(&BlockKind::StoneSlab);
        let spawn_teleport_id = ctx.rng.gen_range(1..=i32::MAX);
        let fall_teleport_id = ctx.rng.gen_range(1..=i32::MAX);

        ctx.send(Packet::JoinGame(world.join_game()))?;
        if world.gamemode() == Gamemode::Creative {
            // creative clients would otherwise fly
            ctx.send(Packet::PlayerAbilities(PlayerAbilities { flags: 0, flying_speed: 0.0, field_of_view: 0.0 }))?;
        }
        if version.greater_or_equal(ProtocolVersion::V1_19_3) {
            ctx.send(Packet::SetDefaultSpawnPosition(world.default_spawn()))?;
        }
        if version.greater_or_equal(ProtocolVersion::V1_8) {
            ctx.send(Packet::SynchronizePlayerPosition(world.spawn_teleport(spawn_teleport_id)))?;
            ctx.send(Packet::SynchronizePlayerPosition(world.fall_start(fall_teleport_id)))?;
        } else {
            ctx.send(Packet::SynchronizePlayerPosition(world.legacy_fall_start()))?;
        }
        if version.greater_or_equal(ProtocolVersion::V1_20_3) {
            ctx.send(Packet::GameEvent(GameEvent { event: GameEvent::START_WAITING_FOR_CHUNKS, value: 0.0 }))?;
        }
        for chunk in PreparedWorld::chunks(version) {
            ctx.send(Packet::ChunkData(chunk))?;
        }
        if collisions {
            ctx.send(Packet::UpdateSectionBlocks(world.platform(block)))?;
        }
        if config.time_of_day != DEFAULT_TIME_OF_DAY {
            ctx.send(Packet::UpdateTime(UpdateTime {
                world_age: 0,
                time_of_day: config.time_of_day,
                ticking: false,
            }))?;
        }

        Ok(Self {
            gravity: config.gravity.enabled && !reduced,
            collisions,
            block_height: block.collision_height(),
            expected_teleport_id: spawn_teleport_id,
            fall_teleport_id,
            spawn_confirmed: false,
            // no teleport confirmations before 1.9
            teleported: version.less_than(ProtocolVersion::V1_9),
            cached_position: None,
            checking_movement: false,
            can_fall: reduced,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            motion: 0.0,
            movement_tick: 0,
            client_tick: 0,
        })
    }

    pub(crate) fn handle(&mut self, ctx: &mut StageContext, packet: Packet) -> VerifyResult<Step> {
        match packet {
            Packet::SetPlayerPositionRotation(position) => {
                if self.teleported {
                    return self.handle_movement(ctx, position.x, position.y, position.z, position.on_ground, true);
                }
                if ctx.version().greater_or_equal(ProtocolVersion::V1_21_2) {
                    self.cached_position = Some(position);
                }
                Ok(Step::Stay)
            }
            Packet::SetPlayerPosition(position) if self.teleported => {
                self.handle_movement(ctx, position.x, position.y, position.z, position.on_ground, false)
            }
            Packet::ConfirmTeleportation(confirm) => self.handle_confirm(ctx, confirm),
            Packet::ClientTickEnd => {
                self.client_tick = self.client_tick.saturating_add(1);
                Ok(Step::Stay)
            }
            Packet::ClientInformation(information) => {
                handle_client_information(ctx, &information)?;
                Ok(Step::Stay)
            }
            Packet::PluginMessage(message) => {
                handle_plugin_message(ctx, &message)?;
                Ok(Step::Stay)
            }
            _ => Ok(Step::Stay),
        }
    }

    fn handle_confirm(&mut self, ctx: &mut StageContext, confirm: ConfirmTeleportation) -> VerifyResult<Step> {
        ensure(!self.teleported, || "duplicate teleport confirmation".into())?;
        ensure(confirm.teleport_id == self.expected_teleport_id, || {
            format!("expected teleport {}, got {}", self.expected_teleport_id, confirm.teleport_id)
        })?;

        if !self.spawn_confirmed {
            // first teleport done; anything reported so far was mid-air
            self.spawn_confirmed = true;
            self.cached_position = None;
            self.expected_teleport_id = self.fall_teleport_id;
            return Ok(Step::Stay);
        }
        self.teleported = true;

        if ctx.version().greater_or_equal(ProtocolVersion::V1_21_2) {
            let cached = self
                .cached_position
                .take()
                .ok_or_else(|| VerificationError::ProtocolViolation("no position before teleport".into()))?;
            return self.handle_movement(ctx, cached.x, cached.y, cached.z, cached.on_ground, true);
        }
        Ok(Step::Stay)
    }

    #[allow(clippy::float_cmp)]
    fn handle_movement(
        &mut self,
        ctx: &mut StageContext,
        x: f64,
        y: f64,
        z: f64,
        on_ground: bool,
        rotated: bool,
    ) -> VerifyResult<Step> {
        if !self.checking_movement {
            if !self.gravity && !self.collisions {
                return pass(ctx);
            }
            // the client echoes the fall start before anything else
            ensure(rotated && !on_ground && x == SPAWN_X && z == SPAWN_Z, || {
                format!("unexpected first position: {x}, {y}, {z}")
            })?;
            let world = ctx.world();
            self.x = x;
            self.y = f64::from(world.dynamic_spawn_y);
            self.z = z;
            self.checking_movement = true;
            return Ok(Step::Stay);
        }

        let (platform_y, max_ticks) = {
            let world = ctx.world();
            (world.platform_y, world.max_movement_ticks)
        };
        let delta = y - self.y;
        if y < f64::from(platform_y) {
            return fail_or_captcha(ctx, format!("fell through the platform: {y}"));
        }
        if (x - SPAWN_X).abs() >= 8.0 || (z - SPAWN_Z).abs() >= 8.0 {
            return Err(VerificationError::Physics(format!("left the spawn chunk: {x}, {z}")));
        }
        if ctx.version().greater_or_equal(ProtocolVersion::V1_21_2) {
            ensure(self.client_tick >= self.movement_tick, || {
                format!("moved {} times in {} ticks", self.movement_tick, self.client_tick)
            })?;
        }
        self.x = x;
        self.z = z;

        if !on_ground {
            if delta == 0.0 {
                // a stationary, rotated report precedes the first fall tick
                ensure(rotated && self.movement_tick == 0, || "hovering without falling".into())?;
                if ctx.version().less_than(ProtocolVersion::V1_8) {
                    self.movement_tick += 1;
                }
                self.can_fall = true;
                return Ok(Step::Stay);
            }
            ensure(self.can_fall, || "fell before settling".into())?;
            self.movement_tick += 1;

            let last = self.motion;
            self.y = y;
            self.motion = delta;
            if self.gravity {
                let predicted = predict_motion(last);
                let difference = (delta - predicted).abs();
                if difference > TOLERANCE {
                    return fail_or_captcha(ctx, format!("motion {delta}, expected {predicted}"));
                }
            }
            if !self.collisions && self.movement_tick == max_ticks {
                return pass(ctx);
            }
            return Ok(Step::Stay);
        }

        self.y = y;
        if self.collisions {
            if self.gravity {
                self.movement_tick += 1;
                if self.movement_tick < max_ticks {
                    return fail_or_captcha(ctx, format!("landed after {} ticks", self.movement_tick));
                }
            }
            let offset = (f64::from(platform_y) + self.block_height) - y;
            if offset != 0.0 {
                return fail_or_captcha(ctx, format!("landed {offset} off the platform"));
            }
            return pass(ctx);
        }
        Ok(Step::Stay)
    }
}

/// Routes a physics failure to the CAPTCHA when configured to.
fn fail_or_captcha(ctx: &mut StageContext, reason: String) -> VerifyResult<Step> {
    if ctx.verifier.config().verification.gravity.captcha_on_fail {
        ctx.force_captcha = true;
        return pass(ctx);
    }
    Err(VerificationError::Physics(reason))
}

/// Clients without a configuration phase announce themselves here.
fn pass(ctx: &StageContext) -> VerifyResult<Step> {
    if ctx.version().less_than(ProtocolVersion::V1_20_2) && !ctx.reduced_protocol {
        validate_announcements(ctx)?;
    }
    Ok(Step::Passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fall_tick() {
        let first = predict_motion(0.0);
        assert!((first + 0.0784).abs() < 1e-6);
        assert!(predict_motion(first) < first);
    }

    #[test]
    fn test_perturbed_motion_is_out_of_tolerance() {
        let expected = predict_motion(predict_motion(0.0));
        assert!(((expected + 1e-6) - expected).abs() > TOLERANCE);
    }
}
