//! # Verification Stages
//!
//! The challenges a session walks through, one module per stage.
//!
//! ## Design
//!
//! A stage is a plain struct holding only its own counters. It is
//! created by `enter`, which sends the stage's challenge packets, and is
//! then fed packets through [`Stage::handle`] until it reports
//! [`Step::Passed`]. The session, not the stage, decides what comes next,
//! so no stage knows about its successor.
//!
//! | Stage    | Challenge                                         |
//! |----------|---------------------------------------------------|
//! | PreJoin  | keep-alive echo, configuration round trip          |
//! | Gravity  | teleport confirms, free fall, platform landing     |
//! | Vehicle  | boat and minecart input ordering, vehicle gravity  |
//! | Replay   | transaction echo, held item echo, arm swing        |
//! | Captcha  | map puzzle answered in chat                        |

mod captcha;
mod gravity;
mod prejoin;
mod replay;
mod vehicle;

pub(crate) use captcha::Captcha;
pub(crate) use gravity::Gravity;
pub(crate) use prejoin::{Announcements, PreJoin};
pub(crate) use replay::Replay;
pub(crate) use vehicle::Vehicle;

use bastion_protocol::Packet;

use crate::error::{Rejection, VerifyResult};
use crate::session::{Ending, StageContext, StageKind};

/// What a stage asks the session to do after a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Keep waiting.
    Stay,
    /// Move on to the next stage.
    Passed,
    /// End the session without a verdict.
    Abort(Rejection),
}

/// The live stage of a session.
pub(crate) enum Stage {
    PreJoin(PreJoin),
    Gravity(Gravity),
    Vehicle(Vehicle),
    Replay(Replay),
    Captcha(Captcha),
    Finished(Ending),
}

impl Stage {
    pub(crate) fn kind(&self) -> StageKind {
        match self {
            Self::PreJoin(_) => StageKind::PreJoin,
            Self::Gravity(_) => StageKind::Gravity,
            Self::Vehicle(_) => StageKind::Vehicle,
            Self::Replay(_) => StageKind::Replay,
            Self::Captcha(_) => StageKind::Captcha,
            Self::Finished(Ending::Verified) => StageKind::Success,
            Self::Finished(_) => StageKind::Failed,
        }
    }

    /// Routes one inbound packet to the live stage.
    pub(crate) fn handle(&mut self, ctx: &mut StageContext, packet: Packet) -> VerifyResult<Step> {
        match self {
            Self::PreJoin(stage) => stage.handle(ctx, packet),
            Self::Gravity(stage) => stage.handle(ctx, packet),
            Self::Vehicle(stage) => stage.handle(ctx, &packet),
            Self::Replay(stage) => stage.handle(ctx, &packet),
            Self::Captcha(stage) => stage.handle(ctx, &packet),
            Self::Finished(_) => Ok(Step::Stay),
        }
    }

    /// Time-driven checks, run on every feed and scheduler poll.
    pub(crate) fn poll(&mut self, ctx: &mut StageContext) -> VerifyResult<Step> {
        match self {
            Self::PreJoin(stage) => stage.poll(ctx),
            Self::Captcha(stage) => stage.poll(ctx),
            _ => Ok(Step::Stay),
        }
    }
}
