//! # Pre-Join
//!
//! Proves the connection is alive and talks the configuration dialect
//! before any world packet is spent on it.
//!
//! ```text
//! < 1.8        wait 100 ms
//! 1.8..1.20.2  KeepAlive(id) ──► echo
//! 1.20.2+      LoginAcknowledged ──► CONFIG, KeepAlive(id) ──► echo
//!              ──► registry data, FinishConfiguration ──► FinishConfiguration ──► GAME
//! ```
//!
//! Client information and the brand may arrive here or, for clients
//! without a configuration phase, during gravity; both stages report
//! them through [`handle_client_information`] and [`handle_plugin_message`].

use std::sync::Arc;
use std::time::Duration;

use bastion_protocol::packets::{dimension, ClientInformation, KeepAlive, PluginMessage};
use bastion_protocol::{Packet, Phase, ProtocolVersion};
use rand::Rng;

use super::Step;
use crate::error::{ensure, Rejection, VerifyResult};
use crate::session::StageContext;

/// How long 1.7 clients wait before the world is sent.
const LEGACY_DELAY: Duration = Duration::from_millis(100);

/// Smallest view distance a real client reports.
const MIN_VIEW_DISTANCE: i8 = 2;

/// Announcements received so far; they outlive the pre-join stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Announcements {
    pub(crate) client_information: bool,
    pub(crate) brand: bool,
}

#[derive(Debug)]
pub(crate) struct PreJoin {
    expected_keep_alive: i64,
    answered: bool,
    acknowledged_login: bool,
}

impl PreJoin {
    pub(crate) fn enter(ctx: &mut StageContext) -> VerifyResult<Self> {
        let expected_keep_alive = i64::from(ctx.rng.gen_range(1..=i32::MAX));
        let version = ctx.version();
        if version.in_between(ProtocolVersion::V1_8, ProtocolVersion::V1_20) {
            ctx.send(Packet::KeepAlive(KeepAlive { id: expected_keep_alive }))?;
        }
        Ok(Self { expected_keep_alive, answered: false, acknowledged_login: false })
    }

    pub(crate) fn handle(&mut self, ctx: &mut StageContext, packet: Packet) -> VerifyResult<Step> {
        match packet {
            Packet::KeepAlive(keep_alive) => self.handle_keep_alive(ctx, keep_alive),
            Packet::LoginAcknowledged => {
                ensure(!self.acknowledged_login, || "duplicate login acknowledgement".into())?;
                self.acknowledged_login = true;
                ctx.set_phase(Phase::Config);
                ctx.send(Packet::KeepAlive(KeepAlive { id: self.expected_keep_alive }))?;
                Ok(Step::Stay)
            }
            Packet::FinishConfiguration => {
                ensure(self.answered, || "finished configuration before the keep-alive".into())?;
                ctx.set_phase(Phase::Game);
                if !ctx.reduced_protocol {
                    validate_announcements(ctx)?;
                }
                Ok(mark_success(ctx))
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

    fn handle_keep_alive(&mut self, ctx: &mut StageContext, keep_alive: KeepAlive) -> VerifyResult<Step> {
        let expected = if self.answered { 0 } else { self.expected_keep_alive };
        ensure(keep_alive.id == expected, || format!("expected keep-alive {expected}, got {}", keep_alive.id))?;
        if self.answered {
            return Ok(Step::Stay);
        }
        self.answered = true;

        let version = ctx.version();
        if version.less_than(ProtocolVersion::V1_20_2) {
            return Ok(mark_success(ctx));
        }
        for registry in dimension::registry_data(version) {
            ctx.send(Packet::RegistryData(registry))?;
        }
        ctx.send(Packet::FinishConfiguration)?;
        Ok(Step::Stay)
    }

    pub(crate) fn poll(&mut self, ctx: &mut StageContext) -> VerifyResult<Step> {
        if ctx.version().less_than(ProtocolVersion::V1_8) && ctx.elapsed() >= LEGACY_DELAY {
            return Ok(mark_success(ctx));
        }
        Ok(Step::Stay)
    }
}

fn mark_success(ctx: &StageContext) -> Step {
    if ctx.verifier.config().verification.valid_name_regex.matches(&ctx.username) {
        Step::Passed
    } else {
        Step::Abort(Rejection::InvalidUsername)
    }
}

/// Checks the client settings; only one copy is accepted.
pub(crate) fn handle_client_information(ctx: &mut StageContext, information: &ClientInformation) -> VerifyResult<()> {
    ensure(!ctx.announcements.client_information, || "duplicate client information".into())?;
    if !ctx.reduced_protocol {
        ensure(information.view_distance >= MIN_VIEW_DISTANCE, || {
            format!("view distance: {}", information.view_distance)
        })?;
    }
    let verifier = Arc::clone(&ctx.verifier);
    ensure(verifier.config().verification.valid_locale_regex.matches(&information.locale), || {
        format!("invalid locale: {}", information.locale)
    })?;
    ctx.announcements.client_information = true;
    Ok(())
}

/// Checks the client brand; other channels are ignored.
pub(crate) fn handle_plugin_message(ctx: &mut StageContext, message: &PluginMessage) -> VerifyResult<()> {
    if !message.is_brand() {
        return Ok(());
    }
    let verifier = Arc::clone(&ctx.verifier);
    let brand = &verifier.config().verification.brand;
    if brand.enabled {
        ensure(!ctx.announcements.brand, || "duplicate client brand".into())?;
        let length = message.data.len();
        ensure(length > 1, || "client brand is too short".into())?;
        ensure(length < brand.max_length, || format!("client brand is too long: {length}"))?;

        let mut text = String::from_utf8_lossy(&message.data).into_owned();
        // 1.8+ prefixes the string with its length
        if ctx.version().greater_or_equal(ProtocolVersion::V1_8) && text.chars().count() > 1 {
            text.remove(0);
        }
        ensure(brand.valid_regex.matches(&text), || format!("client brand does not match: {text}"))?;
    }
    ctx.announcements.brand = true;
    Ok(())
}

/// Both announcements must have arrived by now.
pub(crate) fn validate_announcements(ctx: &StageContext) -> VerifyResult<()> {
    ensure(ctx.announcements.client_information, || "did not send client information".into())?;
    ensure(ctx.announcements.brand, || "did not send client brand".into())
}
