//! # Vehicle
//!
//! Seats the player in a boat, then in a minecart, and checks that the
//! client's steering packets arrive in the order a real client sends them.
//!
//! ## Design
//!
//! ```text
//! WAITING ──► IN_BOAT ──► IN_AIR_AFTER_BOAT ──► IN_MINECART ──► IN_AIR_AFTER_MINECART ──► pass
//!        keep-alive   keep-alive           keep-alive      keep-alive
//! ```
//!
//! Every state change is gated by a keep-alive round trip so packets the
//! client sent for the previous state cannot leak into the next one.
//! Counters reset on every state change.

use std::sync::Arc;

use bastion_protocol::packets::{EntityKind, KeepAlive, PlayerInput, VehicleMove};
use bastion_protocol::{Packet, ProtocolVersion};
use rand::Rng;

use super::Step;
use crate::error::{ensure, VerificationError, VerifyResult};
use crate::session::StageContext;
use crate::world::{PreparedWorld, VEHICLE_TELEPORT_Y};

/// Per-tick gravity of an airborne vehicle, as the client computes it.
const VEHICLE_GRAVITY: f64 = 0.039_999_999_105_930_33;

/// Largest accepted difference between predicted and reported motion.
const TOLERANCE: f64 = 1e-7;

/// Largest steering input a vanilla client reports.
const MAX_INPUT: f32 = 0.98;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VehicleState {
    Waiting,
    InBoat,
    InAirAfterBoat,
    InMinecart,
    InAirAfterMinecart,
}

impl VehicleState {
    const fn in_vehicle(self) -> bool {
        matches!(self, Self::InBoat | Self::InMinecart)
    }
}

#[derive(Debug)]
pub(crate) struct Vehicle {
    state: VehicleState,
    next_state: Option<VehicleState>,
    expected_keep_alive: i64,
    can_teleport: bool,
    minimum_packets: u32,
    boat_y: f64,
    boat_motion: f64,
    rotations: u32,
    inputs: u32,
    paddles: u32,
    vehicle_moves: u32,
}

impl Vehicle {
    pub(crate) fn enter(ctx: &mut StageContext) -> VerifyResult<Self> {
        let version = ctx.version();
        let world = ctx.world();
        let mut vehicle = Self {
            state: VehicleState::Waiting,
            next_state: None,
            expected_keep_alive: 0,
            // 1.15.2 and 1.16 drop the player out of the vehicle on teleport
            can_teleport: version.less_than(ProtocolVersion::V1_15_2)
                || version.greater_or_equal(ProtocolVersion::V1_17),
            minimum_packets: ctx.verifier.config().verification.vehicle.minimum_packets,
            boat_y: f64::from(world.in_air_y),
            boat_motion: 0.0,
            rotations: 0,
            inputs: 0,
            paddles: 0,
            vehicle_moves: 0,
        };
        vehicle.spawn(ctx, EntityKind::Boat)?;
        Ok(vehicle)
    }

    fn spawn(&mut self, ctx: &mut StageContext, kind: EntityKind) -> VerifyResult<()> {
        let verifier = Arc::clone(&ctx.verifier);
        let world = verifier.world();
        ctx.send(Packet::SpawnEntity(world.spawn_vehicle(kind)))?;
        ctx.send(Packet::SetPassengers(world.mount()))?;
        let next = match kind {
            EntityKind::Boat => VehicleState::InBoat,
            EntityKind::Minecart => VehicleState::InMinecart,
        };
        self.prepare(ctx, next)
    }

    fn prepare(&mut self, ctx: &mut StageContext, next: VehicleState) -> VerifyResult<()> {
        self.next_state = Some(next);
        self.expected_keep_alive = i64::from(ctx.rng.gen::<i32>());
        self.rotations = 0;
        self.inputs = 0;
        self.paddles = 0;
        self.vehicle_moves = 0;
        ctx.send(Packet::KeepAlive(KeepAlive { id: self.expected_keep_alive }))
    }

    pub(crate) fn handle(&mut self, ctx: &mut StageContext, packet: &Packet) -> VerifyResult<Step> {
        if let Packet::KeepAlive(keep_alive) = packet {
            let next = self
                .next_state
                .take()
                .ok_or_else(|| VerificationError::ProtocolViolation("unexpected keep-alive".into()))?;
            ensure(keep_alive.id == self.expected_keep_alive, || {
                format!("expected keep-alive {}, got {}", self.expected_keep_alive, keep_alive.id)
            })?;
            self.state = next;
            return Ok(Step::Stay);
        }
        if self.next_state.is_some() {
            return Ok(Step::Stay);
        }

        match packet {
            Packet::PaddleBoat(_) => {
                ensure(self.state == VehicleState::InBoat, || format!("paddled in {:?}", self.state))?;
                self.paddles += 1;
                Ok(Step::Stay)
            }
            Packet::VehicleMove(movement) => self.handle_vehicle_move(ctx, movement),
            Packet::SetPlayerRotation(_) => {
                if self.state.in_vehicle() {
                    self.rotations += 1;
                }
                Ok(Step::Stay)
            }
            Packet::PlayerInput(input) => self.handle_player_input(ctx, input),
            Packet::SetPlayerPositionRotation(position) => {
                if self.state.in_vehicle() {
                    ensure(!position.on_ground, || "on ground while seated".into())?;
                    ensure(position.y >= VEHICLE_TELEPORT_Y, || format!("left the vehicle at y {}", position.y))?;
                    return Ok(Step::Stay);
                }
                self.handle_movement(ctx, position.y, position.on_ground)
            }
            Packet::SetPlayerPosition(position) if !self.state.in_vehicle() => {
                self.handle_movement(ctx, position.y, position.on_ground)
            }
            _ => Ok(Step::Stay),
        }
    }

    fn handle_vehicle_move(&mut self, ctx: &mut StageContext, movement: &VehicleMove) -> VerifyResult<Step> {
        ensure(self.state.in_vehicle(), || format!("vehicle move in {:?}", self.state))?;
        let in_air_y = f64::from(ctx.world().in_air_y);
        ensure(movement.y <= in_air_y, || format!("vehicle above spawn: {}", movement.y))?;

        if !ctx.reduced_protocol {
            let last_motion = self.boat_motion;
            self.boat_motion = movement.y - self.boat_y;
            self.boat_y = movement.y;
            let predicted = last_motion - VEHICLE_GRAVITY;
            if (self.boat_motion - predicted).abs() >= TOLERANCE {
                return Err(VerificationError::Physics(format!(
                    "vehicle motion {}, expected {predicted}",
                    self.boat_motion
                )));
            }
        }

        // 1.21.2+ clients stop sending steering input while seated
        let step = if ctx.version().greater_or_equal(ProtocolVersion::V1_21_2) {
            self.handle_input(ctx)?
        } else {
            Step::Stay
        };
        self.vehicle_moves += 1;
        Ok(step)
    }

    fn handle_player_input(&mut self, ctx: &mut StageContext, input: &PlayerInput) -> VerifyResult<Step> {
        ensure(self.state.in_vehicle(), || format!("steering in {:?}", self.state))?;
        let max = if ctx.reduced_protocol { 1.0 } else { MAX_INPUT };
        ensure(input.forward.abs() <= max, || format!("forward input {}", input.forward))?;
        ensure(input.sideways.abs() <= max, || format!("sideways input {}", input.sideways))?;

        if ctx.version().less_than(ProtocolVersion::V1_21_2) {
            return self.handle_input(ctx);
        }
        Ok(Step::Stay)
    }

    fn handle_input(&mut self, ctx: &mut StageContext) -> VerifyResult<Step> {
        let reduced = ctx.reduced_protocol;
        if reduced {
            // reduced clients never report rotations while seated
            self.rotations += 1;
        } else {
            ensure(self.rotations >= self.inputs, || {
                format!("input before rotation: {}/{}", self.rotations, self.inputs)
            })?;
        }

        // minecarts report neither paddles nor vehicle moves, nor does 1.8
        if ctx.version().less_than(ProtocolVersion::V1_9) || self.state == VehicleState::InMinecart {
            self.paddles += 1;
            self.vehicle_moves += 1;
        } else if !reduced {
            ensure(self.paddles >= self.inputs, || format!("input before paddle: {}/{}", self.paddles, self.inputs))?;
            ensure(self.vehicle_moves >= self.inputs, || {
                format!("input before vehicle move: {}/{}", self.vehicle_moves, self.inputs)
            })?;
        }
        self.inputs += 1;

        let minimum = self.minimum_packets;
        if self.inputs > minimum && self.rotations > minimum && self.paddles > minimum && self.vehicle_moves > minimum {
            let verifier = Arc::clone(&ctx.verifier);
            ctx.send(Packet::RemoveEntities(verifier.world().remove_vehicle()))?;
            let next = if self.state == VehicleState::InBoat {
                VehicleState::InAirAfterBoat
            } else {
                VehicleState::InAirAfterMinecart
            };
            self.prepare(ctx, next)?;
        } else if self.can_teleport && self.inputs <= minimum {
            // a bot that ignores the seat would follow the teleport
            ctx.send(Packet::SynchronizePlayerPosition(PreparedWorld::vehicle_teleport()))?;
        }
        Ok(Step::Stay)
    }

    fn handle_movement(&mut self, ctx: &mut StageContext, y: f64, on_ground: bool) -> VerifyResult<Step> {
        if self.state == VehicleState::Waiting {
            return Ok(Step::Stay);
        }
        ensure(!on_ground, || format!("on ground after leaving the vehicle: {y}"))?;
        ensure(y <= f64::from(ctx.world().in_air_y), || format!("above spawn after leaving the vehicle: {y}"))?;

        if self.state == VehicleState::InAirAfterBoat {
            self.spawn(ctx, EntityKind::Minecart)?;
            return Ok(Step::Stay);
        }
        Ok(Step::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seated_states() {
        assert!(VehicleState::InBoat.in_vehicle());
        assert!(VehicleState::InMinecart.in_vehicle());
        assert!(!VehicleState::Waiting.in_vehicle());
        assert!(!VehicleState::InAirAfterBoat.in_vehicle());
    }

    #[test]
    fn test_vehicle_gravity_is_the_float_constant() {
        assert!((VEHICLE_GRAVITY - f64::from(0.04_f32)).abs() < 1e-12);
    }
}
