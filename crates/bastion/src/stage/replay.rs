//! # Replay
//!
//! Round trips a vanilla client answers on its own and a replaying bot
//! gets wrong: a transaction echo, a server-chosen hotbar slot sent
//! twice (the client answers only the first), a second transaction, and
//! finally an arm swing.
//!
//! ```text
//! Transaction(id) ──► echo ──► SetHeldSlot(cur), SetHeldSlot(exp) x2 ──► SetHeldItem(exp)
//!   ──► Transaction(id') ──► echo ──► EntityAnimation(swing) ──► Animation ──► pass
//! ```

use std::sync::Arc;

use bastion_protocol::packets::{Animation, EntityAnimation, SetHeldItem, SetHeldSlot, Transaction};
use bastion_protocol::{Packet, ProtocolVersion};
use rand::Rng;

use super::Step;
use crate::error::{ensure, VerifyResult};
use crate::session::StageContext;

/// Hotbar slots, `0..=8`.
const HOTBAR_SLOTS: i16 = 9;

#[derive(Debug)]
pub(crate) struct Replay {
    expected_transaction: Option<i32>,
    current_slot: i16,
    expected_slot: Option<i16>,
    waiting_slot_confirm: bool,
    waiting_swing: bool,
}

impl Replay {
    pub(crate) fn enter(ctx: &mut StageContext) -> VerifyResult<Self> {
        let mut replay = Self {
            expected_transaction: None,
            current_slot: 0,
            expected_slot: None,
            waiting_slot_confirm: false,
            waiting_swing: false,
        };
        replay.send_transaction(ctx)?;
        Ok(replay)
    }

    fn send_transaction(&mut self, ctx: &mut StageContext) -> VerifyResult<()> {
        let id = -ctx.rng.gen_range(0..i32::from(i16::MAX));
        self.expected_transaction = Some(id);
        ctx.send(Packet::Transaction(Transaction { window_id: 0, id, accepted: false }))
    }

    pub(crate) fn handle(&mut self, ctx: &mut StageContext, packet: &Packet) -> VerifyResult<Step> {
        match packet {
            Packet::Transaction(transaction) => self.handle_transaction(ctx, *transaction),
            Packet::SetHeldItem(held) => self.handle_held_item(ctx, *held),
            Packet::Animation(animation) if self.waiting_swing => Self::handle_swing(ctx, *animation),
            _ => Ok(Step::Stay),
        }
    }

    fn handle_transaction(&mut self, ctx: &mut StageContext, transaction: Transaction) -> VerifyResult<Step> {
        let expected = self.expected_transaction.take();
        ensure(expected.is_some(), || "unexpected transaction".into())?;
        ensure(transaction.window_id == 0, || format!("wrong window: {}", transaction.window_id))?;
        ensure(transaction.accepted, || "transaction not accepted".into())?;
        ensure(expected == Some(transaction.id), || {
            format!("expected transaction {expected:?}, got {}", transaction.id)
        })?;

        if ctx.reduced_protocol {
            // the held slot check does not survive translation
            return Ok(Step::Passed);
        }
        if self.waiting_slot_confirm {
            self.waiting_slot_confirm = false;
            self.expected_slot = None;
            self.waiting_swing = true;
            let verifier = Arc::clone(&ctx.verifier);
            ctx.send(Packet::EntityAnimation(EntityAnimation {
                entity_id: verifier.world().player_entity_id,
                animation: EntityAnimation::SWING_MAIN_ARM,
            }))?;
            return Ok(Step::Stay);
        }

        let expected_slot = (self.current_slot + 4) % (HOTBAR_SLOTS - 1);
        self.expected_slot = Some(expected_slot);
        ctx.send(Packet::SetHeldSlot(SetHeldSlot { slot: i32::from(self.current_slot) }))?;
        // a vanilla client answers a repeated slot only once
        let held = SetHeldSlot { slot: i32::from(expected_slot) };
        ctx.send(Packet::SetHeldSlot(held))?;
        ctx.send(Packet::SetHeldSlot(held))?;
        Ok(Step::Stay)
    }

    fn handle_held_item(&mut self, ctx: &mut StageContext, held: SetHeldItem) -> VerifyResult<Step> {
        let slot = held.slot;
        ensure((0..HOTBAR_SLOTS).contains(&slot), || format!("slot out of range: {slot}"))?;
        ensure(slot != self.current_slot, || format!("duplicate slot: {slot}"))?;

        // players may switch slots on their own; only the expected one counts
        if self.expected_slot == Some(slot) && !self.waiting_slot_confirm {
            self.send_transaction(ctx)?;
            self.waiting_slot_confirm = true;
        }
        self.current_slot = slot;
        Ok(Step::Stay)
    }

    fn handle_swing(ctx: &StageContext, animation: Animation) -> VerifyResult<Step> {
        ensure(animation.hand == Animation::MAIN_HAND, || format!("swung hand {}", animation.hand))?;
        if ctx.version().less_than(ProtocolVersion::V1_8)
            && (animation.entity_id != ctx.world().player_entity_id || animation.kind != Animation::LEGACY_SWING)
        {
            return Ok(Step::Stay);
        }
        Ok(Step::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_slot_stays_in_the_hotbar() {
        for current in 0..HOTBAR_SLOTS {
            let expected = (current + 4) % (HOTBAR_SLOTS - 1);
            assert!((0..HOTBAR_SLOTS).contains(&expected));
        }
    }
}
