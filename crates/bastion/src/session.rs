//! # Session
//!
//! One connection's walk through the verification stages.
//!
//! ## Lifecycle
//!
//! ```text
//! start ──► PRE_JOIN ──► GRAVITY ──► [VEHICLE] ──► REPLAY ──► [CAPTCHA] ──► SUCCESS
//!              │            │            │            │            │
//!              └────────────┴────────────┴─────┬──────┴────────────┘
//!                                              ▼
//!                                           FAILED
//! ```
//!
//! ## Design
//!
//! - A session is driven by exactly one caller at a time: [`Session::feed`]
//!   with inbound bytes, [`Session::poll`] from a timer. Nothing inside
//!   needs a lock
//! - Each stage owns its own counters and is replaced wholesale on
//!   transition. Values that outlive a stage (the force-CAPTCHA flag, the
//!   client announcements) sit on the [`StageContext`]
//! - `SUCCESS` and `FAILED` are terminal: later input is ignored

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bastion_protocol::packets::LoginSuccess;
use bastion_protocol::{Direction, Packet, PacketDecoder, PacketRegistry, Phase, ProtocolVersion};
use bastion_security::Fingerprint;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::channel::ClientChannel;
use crate::connection::LoginAttempt;
use crate::dispatcher;
use crate::error::{Rejection, VerificationError, VerifyResult};
use crate::stage::{Announcements, Captcha, Gravity, PreJoin, Replay, Stage, Step, Vehicle};
use crate::verifier::Verifier;
use crate::world::PreparedWorld;

/// Position of a session in the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    /// Timing challenge and client announcements.
    PreJoin,
    /// Free fall onto the platform.
    Gravity,
    /// Boat and minecart rides.
    Vehicle,
    /// Transaction, held item and swing round trips.
    Replay,
    /// Map CAPTCHA.
    Captcha,
    /// Verified.
    Success,
    /// Failed or aborted.
    Failed,
}

impl StageKind {
    /// Whether no further transition can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// How a finished session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Ending {
    /// Every stage passed.
    Verified,
    /// A check failed; the address was penalized.
    Failed(VerificationError),
    /// The session was stopped without a verdict, e.g. no CAPTCHA ready.
    Aborted(Rejection),
}

/// Offline-mode uuid of `username`.
#[must_use]
pub fn offline_uuid(username: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_OID, format!("OfflinePlayer:{username}").as_bytes())
}

/// State shared by every stage of one session.
pub(crate) struct StageContext {
    pub(crate) verifier: Arc<Verifier>,
    channel: Box<dyn ClientChannel>,
    decoder: PacketDecoder,
    pub(crate) address: IpAddr,
    pub(crate) username: String,
    pub(crate) fingerprint: Fingerprint,
    pub(crate) reduced_protocol: bool,
    pub(crate) login_time: Instant,
    pub(crate) now: Instant,
    last_packet: Instant,
    packets: u32,
    pub(crate) force_captcha: bool,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) announcements: Announcements,
}

impl StageContext {
    pub(crate) fn version(&self) -> ProtocolVersion {
        self.decoder.version()
    }

    pub(crate) fn phase(&self) -> Phase {
        self.decoder.phase()
    }

    /// Switches both directions to `phase`.
    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.decoder.set_phase(phase);
    }

    /// Shortcut to the shared world.
    pub(crate) fn world(&self) -> &PreparedWorld {
        self.verifier.world()
    }

    /// Time since the login packet.
    pub(crate) fn elapsed(&self) -> Duration {
        self.now.saturating_duration_since(self.login_time)
    }

    /// Encodes `packet` for the current phase and queues it.
    pub(crate) fn send(&mut self, packet: Packet) -> VerifyResult<()> {
        let frame = PacketRegistry::global().encode_frame(
            self.decoder.phase(),
            Direction::Clientbound,
            self.decoder.version(),
            &packet,
        )?;
        self.channel.write_frame(&frame);
        Ok(())
    }

    pub(crate) fn flush(&mut self) {
        self.channel.flush();
    }

    pub(crate) fn close(&mut self) {
        self.channel.close();
    }

    /// Counts one inbound packet against the budget and the read timeout.
    fn record_packet(&mut self) -> VerifyResult<()> {
        self.check_idle()?;
        self.last_packet = self.now;
        self.packets = self.packets.saturating_add(1);
        if self.packets > self.verifier.world().max_total_packets {
            return Err(VerificationError::ProtocolViolation(format!("too many packets: {}", self.packets)));
        }
        Ok(())
    }

    fn check_idle(&self) -> VerifyResult<()> {
        let idle = self.now.saturating_duration_since(self.last_packet);
        if idle > self.verifier.config().verification.read_timeout() {
            return Err(VerificationError::Timeout("read timed out"));
        }
        Ok(())
    }
}

/// A connection under verification.
pub struct Session {
    ctx: StageContext,
    stage: Stage,
}

impl Session {
    /// Accepts the login and enters the first stage.
    ///
    /// `seed` drives every challenge value of this session. Bytes the
    /// client sent after its login packet are processed right away.
    #[must_use]
    pub fn start(
        verifier: Arc<Verifier>,
        attempt: LoginAttempt,
        channel: Box<dyn ClientChannel>,
        seed: u64,
        now: Instant,
    ) -> Self {
        let fingerprint = attempt.fingerprint();
        let LoginAttempt { address, version, login, reduced_protocol, pending, .. } = attempt;

        let config = &verifier.config().verification;
        if config.log_connections && verifier.should_log() {
            tracing::info!("{} ({}) has connected using {}", login.username, verifier.format_address(address), version);
        }

        let ctx = StageContext {
            channel,
            decoder: PacketDecoder::serverbound(Phase::Login, version),
            address,
            username: login.username,
            fingerprint,
            reduced_protocol,
            login_time: now,
            now,
            last_packet: now,
            packets: 0,
            force_captcha: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
            announcements: Announcements::default(),
            verifier,
        };
        let uuid = login.uuid.unwrap_or_else(|| offline_uuid(&ctx.username));
        let mut session = Self { ctx, stage: Stage::Finished(Ending::Verified) };

        let entered = session.welcome(uuid).and_then(|()| PreJoin::enter(&mut session.ctx));
        match entered {
            Ok(stage) => session.stage = Stage::PreJoin(stage),
            Err(error) => session.fail(error),
        }
        session.ctx.flush();

        if !pending.is_empty() {
            session.feed(&pending, now);
        }
        session
    }

    fn welcome(&mut self, uuid: Uuid) -> VerifyResult<()> {
        let username = self.ctx.username.clone();
        self.ctx.send(Packet::LoginSuccess(LoginSuccess { uuid, username }))?;
        // the configuration phase starts only after the client acknowledges
        if self.ctx.version().less_than(ProtocolVersion::V1_20_2) {
            self.ctx.set_phase(Phase::Game);
        }
        Ok(())
    }

    /// Processes inbound bytes in arrival order.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> StageKind {
        if self.is_finished() {
            return self.stage();
        }
        self.ctx.now = now;
        self.ctx.decoder.push(bytes);

        let timed = self.stage.poll(&mut self.ctx);
        self.apply(timed);

        while !self.is_finished() {
            let packet = match self.ctx.decoder.next_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!("{}: malformed packet: {}", self.ctx.username, error);
                    self.fail(error.into());
                    break;
                }
            };
            let result = self.ctx.record_packet().and_then(|()| self.stage.handle(&mut self.ctx, packet));
            self.apply(result);
        }

        self.ctx.flush();
        self.stage()
    }

    /// Enforces timeouts and delayed transitions without new input.
    pub fn poll(&mut self, now: Instant) -> StageKind {
        if self.is_finished() {
            return self.stage();
        }
        self.ctx.now = now;
        let result = self.ctx.check_idle().and_then(|()| self.stage.poll(&mut self.ctx));
        self.apply(result);
        self.ctx.flush();
        self.stage()
    }

    fn apply(&mut self, result: VerifyResult<Step>) {
        match result {
            Ok(Step::Stay) => {}
            Ok(Step::Passed) => self.advance(),
            Ok(Step::Abort(rejection)) => self.abort(rejection),
            Err(error) => self.fail(error),
        }
    }

    fn next_stage(&self) -> StageKind {
        let config = &self.ctx.verifier.config().verification;
        match self.stage.kind() {
            StageKind::PreJoin => StageKind::Gravity,
            StageKind::Gravity if config.vehicle.enabled && !self.ctx.reduced_protocol => StageKind::Vehicle,
            StageKind::Gravity | StageKind::Vehicle => StageKind::Replay,
            StageKind::Replay
                if self.ctx.force_captcha || config.captcha.timing.applies(self.ctx.verifier.is_under_attack()) =>
            {
                StageKind::Captcha
            }
            StageKind::Replay | StageKind::Captcha => StageKind::Success,
            terminal => terminal,
        }
    }

    fn advance(&mut self) {
        let from = self.stage.kind();
        let next = self.next_stage();
        tracing::debug!("{}: {:?} -> {:?}", self.ctx.username, from, next);

        let ctx = &mut self.ctx;
        let entered = match next {
            StageKind::Gravity => Gravity::enter(ctx).map(Stage::Gravity),
            StageKind::Vehicle => Vehicle::enter(ctx).map(Stage::Vehicle),
            StageKind::Replay => Replay::enter(ctx).map(Stage::Replay),
            StageKind::Captcha => {
                let Some(captcha) = ctx.verifier.next_captcha() else {
                    self.abort(Rejection::CurrentlyPreparing);
                    return;
                };
                Captcha::enter(ctx, captcha).map(Stage::Captcha)
            }
            StageKind::Success => {
                dispatcher::succeed(ctx);
                self.stage = Stage::Finished(Ending::Verified);
                return;
            }
            StageKind::PreJoin | StageKind::Failed => return,
        };
        match entered {
            Ok(stage) => self.stage = stage,
            Err(error) => self.fail(error),
        }
    }

    fn fail(&mut self, error: VerificationError) {
        dispatcher::fail(&mut self.ctx, &error);
        self.stage = Stage::Finished(Ending::Failed(error));
    }

    fn abort(&mut self, rejection: Rejection) {
        dispatcher::abort(&mut self.ctx, rejection);
        self.stage = Stage::Finished(Ending::Aborted(rejection));
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> StageKind {
        self.stage.kind()
    }

    /// Whether the session reached `SUCCESS` or `FAILED`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.stage().is_terminal()
    }

    /// How the session ended, once it has.
    #[must_use]
    pub fn ending(&self) -> Option<&Ending> {
        match &self.stage {
            Stage::Finished(ending) => Some(ending),
            _ => None,
        }
    }

    /// Peer address.
    #[must_use]
    pub fn address(&self) -> IpAddr {
        self.ctx.address
    }

    /// Claimed username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.ctx.username
    }

    /// Identity key of this session.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.ctx.fingerprint
    }

    /// Client dialect.
    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        self.ctx.version()
    }

    /// Whether a lenient physics failure routed this session to the CAPTCHA.
    #[must_use]
    pub fn force_captcha(&self) -> bool {
        self.ctx.force_captcha
    }

    /// Inbound packets processed so far.
    #[must_use]
    pub fn packets_received(&self) -> u32 {
        self.ctx.packets
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.ctx.username)
            .field("address", &self.ctx.address)
            .field("version", &self.ctx.version())
            .field("stage", &self.stage())
            .finish_non_exhaustive()
    }
}
