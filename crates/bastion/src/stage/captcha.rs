//! # CAPTCHA
//!
//! Freezes the player high above the world with a map in hand and waits
//! for the code drawn on it to be typed into chat.
//!
//! The whole stage shares one deadline measured from login. Survival and
//! adventure players see the remaining seconds on the experience bar.

use std::sync::Arc;

use bastion_protocol::packets::{KeepAlive, PlayerAbilities, SetContainerSlot, SystemChat};
use bastion_protocol::Packet;
use rand::Rng;

use super::Step;
use crate::captcha::{Captcha as Puzzle, MAP_ID};
use crate::error::{ensure, VerificationError, VerifyResult};
use crate::session::StageContext;
use crate::world::PreparedWorld;

/// Off-hand slot of the player inventory.
const OFF_HAND_SLOT: i16 = 40;
/// First hotbar slot, used when the off hand is not available.
const HOTBAR_SLOT: i16 = 36;
/// Reports counted past this send a keep-alive, so one goes out every 22nd report.
const KEEP_ALIVE_STREAK: u32 = 20;

#[derive(Debug)]
pub(crate) struct Captcha {
    puzzle: Arc<Puzzle>,
    tries: u32,
    last_countdown: Option<u64>,
    keep_alive_streak: u32,
}

impl Captcha {
    pub(crate) fn enter(ctx: &mut StageContext, puzzle: Arc<Puzzle>) -> VerifyResult<Self> {
        let verifier = Arc::clone(&ctx.verifier);
        let config = verifier.config();
        let reduced = ctx.reduced_protocol;

        let slot = if reduced { HOTBAR_SLOT } else { OFF_HAND_SLOT };
        ctx.send(Packet::SetContainerSlot(SetContainerSlot { window_id: 0, slot, count: 1, map_id: MAP_ID }))?;
        for map in puzzle.map_packets(ctx.version()) {
            ctx.send(Packet::MapData(map))?;
        }
        ctx.send(Packet::SynchronizePlayerPosition(PreparedWorld::captcha_position()))?;
        let flags = if reduced {
            PlayerAbilities::FLYING | PlayerAbilities::ALLOW_FLYING
        } else {
            PlayerAbilities::FLYING
        };
        // zero speed keeps the player frozen mid-air
        ctx.send(Packet::PlayerAbilities(PlayerAbilities { flags, flying_speed: 0.0, field_of_view: 0.0 }))?;
        ctx.send(Packet::SystemChat(SystemChat::new(config.messages.enter_code.as_str())))?;

        Ok(Self { puzzle, tries: config.verification.captcha.max_tries, last_countdown: None, keep_alive_streak: 0 })
    }

    pub(crate) fn handle(&mut self, ctx: &mut StageContext, packet: &Packet) -> VerifyResult<Step> {
        check_deadline(ctx)?;
        match packet {
            Packet::Chat(chat) => {
                if self.puzzle.is_solved_by(&chat.message) {
                    return Ok(Step::Passed);
                }
                ensure(self.tries > 0, || "failed the captcha too often".into())?;
                self.tries -= 1;
                let message = ctx.verifier.config().messages.incorrect_captcha.clone();
                ctx.send(Packet::SystemChat(SystemChat::new(message)))?;
                Ok(Step::Stay)
            }
            Packet::SetPlayerPosition(_) | Packet::SetPlayerPositionRotation(_) => {
                self.handle_position(ctx)?;
                Ok(Step::Stay)
            }
            _ => Ok(Step::Stay),
        }
    }

    /// Position reports arrive about once a second and drive the countdown.
    fn handle_position(&mut self, ctx: &mut StageContext) -> VerifyResult<()> {
        let verifier = Arc::clone(&ctx.verifier);
        let world = verifier.world();
        if world.gamemode().shows_experience() {
            let max = u128::from(verifier.config().verification.captcha.max_duration_ms);
            let remaining = max.saturating_sub(ctx.elapsed().as_millis());
            let index = u64::try_from(remaining / 1000).unwrap_or(u64::MAX);
            if self.last_countdown != Some(index) && index < u64::from(world.countdown_len) {
                // index is below countdown_len
                #[allow(clippy::cast_possible_truncation)]
                ctx.send(Packet::SetExperience(world.countdown(index as u32)))?;
            }
            self.last_countdown = Some(index);
        }

        let streak = self.keep_alive_streak;
        self.keep_alive_streak += 1;
        if streak > KEEP_ALIVE_STREAK {
            self.keep_alive_streak = 0;
            let id = i64::from(ctx.rng.gen::<i32>());
            ctx.send(Packet::KeepAlive(KeepAlive { id }))?;
        }
        Ok(())
    }

    pub(crate) fn poll(&mut self, ctx: &mut StageContext) -> VerifyResult<Step> {
        check_deadline(ctx)?;
        Ok(Step::Stay)
    }
}

fn check_deadline(ctx: &StageContext) -> VerifyResult<()> {
    let max = ctx.verifier.config().verification.captcha.max_duration_ms;
    if ctx.elapsed().as_millis() > u128::from(max) {
        return Err(VerificationError::Timeout("took too long to solve the captcha"));
    }
    Ok(())
}
