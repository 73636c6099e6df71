//! End-to-end verification tests: a scripted client walks real sessions
//! through every stage over a loopback channel and answers the
//! challenges it reads from the clientbound frames.

use std::net::IpAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bastion::{
    Admission, BastionConfig, Captcha, Ending, EventBus, EventReceiver, Gatekeeper, LoginAttempt, LoginReader,
    LoopbackChannel, Rejection, Session, StageKind, StaticCaptchaProvider, Timing, VerificationError,
    VerificationEvent, Verifier,
};
use bastion_protocol::codec::FrameDecoder;
use bastion_protocol::packets::{
    Animation, BlockKind, Chat, ClientInformation, ConfirmTeleportation, Handshake, KeepAlive, LoginStart,
    PaddleBoat, PlayerInput, PluginMessage, SetHeldItem, SetPlayerPosition, SetPlayerPositionRotation,
    SetPlayerRotation, Transaction, VehicleMove,
};
use bastion_protocol::{Direction, Packet, PacketDeserializer, PacketKind, PacketRegistry, Phase, ProtocolVersion};
use crossbeam_channel::Receiver;

const ADDRESS: &str = "10.20.30.40";

/// Motion a vanilla client reports on the tick after `last`.
fn next_motion(last: f64) -> f64 {
    (last - 0.08) * f64::from(0.98_f32)
}

fn address() -> IpAddr {
    ADDRESS.parse().unwrap()
}

/// Defaults with the parts a scripted client cannot see turned off.
fn config() -> BastionConfig {
    let mut config = BastionConfig::default();
    config.verification.gravity.check_collisions = false;
    config.verification.vehicle.enabled = false;
    config
}

fn verifier(config: BastionConfig) -> (Arc<Verifier>, EventReceiver) {
    let (sender, receiver) = EventBus::create_pair(64);
    (Arc::new(Verifier::builder(config).seed(11).events(sender).build()), receiver)
}

fn attempt(version: ProtocolVersion) -> LoginAttempt {
    LoginAttempt {
        address: address(),
        version,
        hostname: "play.example.net".into(),
        login: LoginStart { username: "Steve".into(), uuid: None },
        reduced_protocol: false,
        pending: Vec::new(),
    }
}

fn decode_clientbound(phase: Phase, version: ProtocolVersion, frame: &[u8]) -> (PacketKind, Vec<u8>) {
    let mut decoder = FrameDecoder::new();
    decoder.push(frame);
    let body = decoder.next_frame().unwrap().unwrap();
    let mut input = PacketDeserializer::new(&body);
    let id = input.read_varint().unwrap();
    let kind = PacketRegistry::global().packet_kind(phase, Direction::Clientbound, version, id).unwrap();
    (kind, input.rest().to_vec())
}

/// The scripted side of one session.
struct Client {
    session: Session,
    version: ProtocolVersion,
    frames: Receiver<Vec<u8>>,
    clock: Instant,
    platform: Option<BlockKind>,
}

impl Client {
    fn connect(verifier: &Arc<Verifier>, version: ProtocolVersion) -> Self {
        let (channel, frames) = LoopbackChannel::pair();
        let clock = Instant::now();
        let session = Session::start(Arc::clone(verifier), attempt(version), Box::new(channel), 7, clock);
        Self::attach(session, frames, clock)
    }

    /// Wraps a session started elsewhere; consumes its login success.
    fn attach(session: Session, frames: Receiver<Vec<u8>>, clock: Instant) -> Self {
        let version = session.version();
        let first = frames.try_recv().unwrap();
        assert_eq!(decode_clientbound(Phase::Login, version, &first).0, PacketKind::LoginSuccess);
        Self { session, version, frames, clock, platform: None }
    }

    fn received(&self) -> Vec<(PacketKind, Vec<u8>)> {
        self.received_in(Phase::Game)
    }

    fn received_in(&self, phase: Phase) -> Vec<(PacketKind, Vec<u8>)> {
        self.frames.try_iter().map(|frame| decode_clientbound(phase, self.version, &frame)).collect()
    }

    fn send(&mut self, packets: &[Packet]) -> StageKind {
        self.send_in(Phase::Game, packets)
    }

    fn send_in(&mut self, phase: Phase, packets: &[Packet]) -> StageKind {
        let registry = PacketRegistry::global();
        let mut bytes = Vec::new();
        for packet in packets {
            bytes.extend(registry.encode_frame(phase, Direction::Serverbound, self.version, packet).unwrap());
        }
        self.clock += Duration::from_millis(50);
        self.session.feed(&bytes, self.clock)
    }

    fn brand(&self) -> Packet {
        let channel = if self.version.less_than(ProtocolVersion::V1_13) { "MC|Brand" } else { "minecraft:brand" };
        Packet::PluginMessage(PluginMessage { channel: channel.into(), data: b"\x07vanilla".to_vec() })
    }

    fn keep_alive_id(&self, payload: &[u8]) -> i64 {
        let mut input = PacketDeserializer::new(payload);
        if self.version.greater_or_equal(ProtocolVersion::V1_12_2) {
            input.read_i64().unwrap()
        } else {
            i64::from(input.read_varint().unwrap())
        }
    }

    /// Echoes the last keep-alive in `frames`.
    fn echo_keep_alive(&mut self, frames: &[(PacketKind, Vec<u8>)]) -> StageKind {
        let payload = last_of(frames, PacketKind::KeepAlive);
        let id = self.keep_alive_id(&payload);
        self.send(&[Packet::KeepAlive(KeepAlive { id })])
    }

    fn pass_prejoin(&mut self) -> StageKind {
        let frames = self.received();
        let payload = last_of(&frames, PacketKind::KeepAlive);
        let id = self.keep_alive_id(&payload);
        let brand = self.brand();
        self.send(&[
            Packet::KeepAlive(KeepAlive { id }),
            Packet::ClientInformation(ClientInformation::default()),
            brand,
        ])
    }

    /// Confirms the teleports and falls; `deviation` is added to the
    /// motion of the given tick.
    fn fall(&mut self, verifier: &Verifier, deviation: Option<(u32, f64)>) -> StageKind {
        let frames = self.received();
        self.platform = platform_block(self.version, &frames);
        if self.version.greater_or_equal(ProtocolVersion::V1_9) {
            let confirms: Vec<Packet> = all_of(&frames, PacketKind::SynchronizePlayerPosition)
                .iter()
                .map(|payload| {
                    let mut input = PacketDeserializer::new(payload);
                    for _ in 0..3 {
                        input.read_f64().unwrap();
                    }
                    input.read_f32().unwrap();
                    input.read_f32().unwrap();
                    input.read_u8().unwrap();
                    Packet::ConfirmTeleportation(ConfirmTeleportation { teleport_id: input.read_varint().unwrap() })
                })
                .collect();
            assert_eq!(confirms.len(), 2);
            self.send(&confirms);
        }

        let world = verifier.world();
        let start = f64::from(world.dynamic_spawn_y);
        let rotated = |y| {
            Packet::SetPlayerPositionRotation(SetPlayerPositionRotation {
                x: 8.0,
                y,
                z: 8.0,
                yaw: 0.0,
                pitch: -90.0,
                on_ground: false,
            })
        };
        let mut stage = self.send(&[rotated(start), rotated(start)]);

        let mut y = start;
        let mut motion = 0.0;
        for tick in 1..=world.max_movement_ticks {
            motion = next_motion(motion);
            if let Some((at, offset)) = deviation {
                if at == tick {
                    motion += offset;
                }
            }
            y += motion;
            stage = self.send(&[Packet::SetPlayerPosition(SetPlayerPosition { x: 8.0, y, z: 8.0, on_ground: false })]);
            if stage != StageKind::Gravity {
                break;
            }
        }
        stage
    }

    /// Touches down at `offset` above the platform surface.
    fn land(&mut self, verifier: &Verifier, x: f64, offset: f64) -> StageKind {
        let block = self.platform.expect("platform was sent");
        let y = verifier.world().landing_y(block) + offset;
        self.send(&[Packet::SetPlayerPosition(SetPlayerPosition { x, y, z: 8.0, on_ground: true })])
    }

    fn echo_transaction(&mut self) -> StageKind {
        let frames = self.received();
        let payload = last_of(&frames, PacketKind::Transaction);
        let mut input = PacketDeserializer::new(&payload);
        assert_eq!(input.read_i8().unwrap(), 0);
        let id = i32::from(input.read_i16().unwrap());
        self.send(&[Packet::Transaction(Transaction { window_id: 0, id, accepted: true })])
    }

    fn pass_replay(&mut self, verifier: &Verifier) -> StageKind {
        assert_eq!(self.echo_transaction(), StageKind::Replay);

        let frames = self.received();
        let slots = all_of(&frames, PacketKind::SetHeldSlot);
        assert_eq!(slots.len(), 3);
        let expected = PacketDeserializer::new(&slots[2]).read_i8().unwrap();
        assert_eq!(self.send(&[Packet::SetHeldItem(SetHeldItem { slot: i16::from(expected) })]), StageKind::Replay);

        assert_eq!(self.echo_transaction(), StageKind::Replay);
        assert_eq!(all_of(&self.received(), PacketKind::EntityAnimation).len(), 1);
        self.send(&[Packet::Animation(Animation::swing(verifier.world().player_entity_id))])
    }
}

/// Block of the landing platform, read from the 1.8-1.16.1 multi-block change.
fn platform_block(version: ProtocolVersion, frames: &[(PacketKind, Vec<u8>)]) -> Option<BlockKind> {
    let payload = all_of(frames, PacketKind::UpdateSectionBlocks).pop()?;
    let mut input = PacketDeserializer::new(&payload);
    input.read_i32().unwrap();
    input.read_i32().unwrap();
    assert!(input.read_varint().unwrap() > 0);
    input.read_i16().unwrap();
    let state = input.read_varint().unwrap() >> 4;
    BlockKind::ALL.into_iter().find(|block| block.state_id(version) == state)
}

fn all_of(frames: &[(PacketKind, Vec<u8>)], kind: PacketKind) -> Vec<Vec<u8>> {
    frames.iter().filter(|(frame_kind, _)| *frame_kind == kind).map(|(_, payload)| payload.clone()).collect()
}

fn last_of(frames: &[(PacketKind, Vec<u8>)], kind: PacketKind) -> Vec<u8> {
    all_of(frames, kind).pop().unwrap_or_else(|| panic!("no {kind:?} in {frames:?}"))
}

#[test]
fn test_genuine_client_is_verified() {
    let (verifier, events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    assert_eq!(client.pass_prejoin(), StageKind::Gravity);
    assert_eq!(client.fall(&verifier, None), StageKind::Replay);
    assert_eq!(client.pass_replay(&verifier), StageKind::Success);

    assert_eq!(client.session.ending(), Some(&Ending::Verified));
    assert!(verifier.is_verified(&client.session.fingerprint()));
    assert_eq!(verifier.blacklist().score(address()), 0);
    // no transfer host configured
    assert_eq!(all_of(&client.received(), PacketKind::Disconnect).len(), 1);

    let succeeded = events.drain().into_iter().filter(|event| matches!(event, VerificationEvent::Succeeded { .. }));
    assert_eq!(succeeded.count(), 1);
}

#[test]
fn test_wrong_fall_fails_and_penalizes() {
    let (verifier, events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    assert_eq!(client.fall(&verifier, Some((2, 0.01))), StageKind::Failed);
    assert!(matches!(client.session.ending(), Some(Ending::Failed(VerificationError::Physics(_)))));
    assert_eq!(verifier.blacklist().score(address()), 1);
    assert!(!verifier.is_verified(&client.session.fingerprint()));
    assert_eq!(all_of(&client.received(), PacketKind::Disconnect).len(), 1);

    let failed: Vec<VerificationEvent> = events.drain();
    assert!(failed.iter().any(|event| matches!(event, VerificationEvent::Failed { score: 1, .. })));

    // terminal: later input changes nothing and sends nothing
    assert_eq!(client.send(&[Packet::KeepAlive(KeepAlive { id: 1 })]), StageKind::Failed);
    assert!(client.received().is_empty());
}

#[test]
fn test_lenient_policy_routes_to_captcha() {
    let mut config = config();
    config.verification.gravity.captcha_on_fail = true;
    let (verifier, _events) = verifier(config);
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    assert_eq!(client.fall(&verifier, Some((3, 0.5))), StageKind::Replay);
    assert!(client.session.force_captcha());

    // no provider configured, so the session ends without a verdict
    assert_eq!(client.pass_replay(&verifier), StageKind::Failed);
    assert_eq!(client.session.ending(), Some(&Ending::Aborted(Rejection::CurrentlyPreparing)));
    assert_eq!(verifier.blacklist().score(address()), 0);
}

#[test]
fn test_captcha_accepts_the_answer_after_a_wrong_try() {
    let mut config = config();
    config.verification.captcha.timing = Timing::Always;
    let provider = Arc::new(StaticCaptchaProvider::new(vec![Captcha::new("K7mzq", Vec::new())]));
    let (sender, _events) = EventBus::create_pair(64);
    let verifier = Arc::new(Verifier::builder(config).seed(5).events(sender).captcha_provider(provider).build());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    client.fall(&verifier, None);
    assert_eq!(client.pass_replay(&verifier), StageKind::Captcha);
    let frames = client.received();
    assert_eq!(all_of(&frames, PacketKind::MapData).len(), 1);
    assert_eq!(all_of(&frames, PacketKind::SetContainerSlot).len(), 1);

    assert_eq!(client.send(&[Packet::Chat(Chat { message: "nope".into() })]), StageKind::Captcha);
    assert_eq!(all_of(&client.received(), PacketKind::SystemChat).len(), 1);
    assert_eq!(client.send(&[Packet::Chat(Chat { message: "k7MZQ".into() })]), StageKind::Success);
}

#[test]
fn test_captcha_runs_out_of_tries() {
    let mut config = config();
    config.verification.captcha.timing = Timing::Always;
    config.verification.captcha.max_tries = 1;
    let provider = Arc::new(StaticCaptchaProvider::new(vec![Captcha::new("abc", Vec::new())]));
    let verifier = Arc::new(Verifier::builder(config).seed(5).captcha_provider(provider).build());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    client.fall(&verifier, None);
    assert_eq!(client.pass_replay(&verifier), StageKind::Captcha);

    let wrong = Packet::Chat(Chat { message: "xyz".into() });
    assert_eq!(client.send(&[wrong.clone()]), StageKind::Captcha);
    assert_eq!(client.send(&[wrong]), StageKind::Failed);
    assert_eq!(verifier.blacklist().score(address()), 1);
}

#[test]
fn test_vehicle_rides_on_1_8() {
    let mut config = config();
    config.verification.vehicle.enabled = true;
    let (verifier, _events) = verifier(config);
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_8);

    assert_eq!(client.pass_prejoin(), StageKind::Gravity);
    assert_eq!(client.fall(&verifier, None), StageKind::Vehicle);

    let airborne = f64::from(verifier.world().in_air_y - 1);
    let steer = [
        Packet::SetPlayerRotation(SetPlayerRotation { yaw: 0.0, pitch: 0.0, on_ground: false }),
        Packet::PlayerInput(PlayerInput { sideways: 0.0, forward: 0.98, jump: false, sneak: false }),
    ];
    let leave = Packet::SetPlayerPosition(SetPlayerPosition { x: 8.0, y: airborne, z: 8.0, on_ground: false });

    for _vehicle in 0..2 {
        // seated once the spawn keep-alive is echoed
        let frames = client.received();
        assert_eq!(all_of(&frames, PacketKind::SpawnEntity).len(), 1);
        assert_eq!(client.echo_keep_alive(&frames), StageKind::Vehicle);

        for _ in 0..3 {
            assert_eq!(client.send(&steer), StageKind::Vehicle);
        }
        let frames = client.received();
        assert_eq!(all_of(&frames, PacketKind::RemoveEntities).len(), 1);
        assert_eq!(client.echo_keep_alive(&frames), StageKind::Vehicle);
        client.send(&[leave.clone()]);
    }

    assert_eq!(client.session.stage(), StageKind::Replay);
    assert_eq!(client.pass_replay(&verifier), StageKind::Success);
}

#[test]
fn test_second_failure_blacklists_the_address() {
    let (verifier, events) = verifier(config());
    let gatekeeper = Gatekeeper::with_seed(Arc::clone(&verifier), 3);

    for _ in 0..2 {
        let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);
        client.pass_prejoin();
        assert_eq!(client.fall(&verifier, Some((1, 0.2))), StageKind::Failed);
    }
    assert_eq!(verifier.blacklist().score(address()), 2);
    assert!(events.drain().iter().any(|event| matches!(event, VerificationEvent::Blacklisted { score: 2, .. })));

    let (channel, frames) = LoopbackChannel::pair();
    let admission = gatekeeper.login(attempt(ProtocolVersion::V1_12_2), Box::new(channel), Instant::now());
    assert!(matches!(admission, Admission::Rejected(Rejection::Blacklisted)));
    assert_eq!(frames.try_iter().count(), 1);
}

#[test]
fn test_simultaneous_logins_queue_once() {
    let (verifier, _events) = verifier(config());
    let gatekeeper = Gatekeeper::with_seed(verifier, 3);

    let admissions: Vec<Admission> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let (channel, _frames) = LoopbackChannel::pair();
                    gatekeeper.login(attempt(ProtocolVersion::V1_20_5), Box::new(channel), Instant::now())
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let queued = admissions.iter().filter(|admission| matches!(admission, Admission::Queued(_))).count();
    let refused = admissions
        .iter()
        .filter(|admission| matches!(admission, Admission::Rejected(Rejection::AlreadyQueued)))
        .count();
    assert_eq!(queued, 1);
    assert_eq!(refused, 7);
    assert_eq!(gatekeeper.queued(), 1);
}

#[test]
fn test_verified_player_skips_the_next_check() {
    let (verifier, _events) = verifier(config());
    let gatekeeper = Gatekeeper::with_seed(Arc::clone(&verifier), 3);
    let version = ProtocolVersion::V1_12_2;

    let registry = PacketRegistry::global();
    let mut bytes = registry
        .encode_frame(
            Phase::Handshake,
            Direction::Serverbound,
            version,
            &Packet::Handshake(Handshake {
                protocol_version: version.id(),
                hostname: "play.example.net".into(),
                port: 25565,
                intent: 2,
            }),
        )
        .unwrap();
    bytes.extend(
        registry
            .encode_frame(
                Phase::Login,
                Direction::Serverbound,
                version,
                &Packet::LoginStart(LoginStart { username: "Steve".into(), uuid: None }),
            )
            .unwrap(),
    );

    let mut reader = LoginReader::new(address(), false);
    let login = reader.feed(&bytes).unwrap().unwrap();
    let (channel, frames) = LoopbackChannel::pair();
    let now = Instant::now();
    let admission = gatekeeper.login(login.clone(), Box::new(channel), now);
    let Admission::Queued(ticket) = admission else { panic!("expected to be queued, got {admission:?}") };

    let mut sessions = gatekeeper.tick(now);
    assert_eq!(sessions.len(), 1);
    let (started, session) = sessions.remove(0);
    assert_eq!(started, ticket);
    let mut client = Client::attach(session, frames, now);
    client.pass_prejoin();
    client.fall(&verifier, None);
    assert_eq!(client.pass_replay(&verifier), StageKind::Success);
    gatekeeper.disconnected(ticket);
    assert_eq!(gatekeeper.verifying(), 0);

    let (channel, _frames) = LoopbackChannel::pair();
    match gatekeeper.login(login, Box::new(channel), now + Duration::from_secs(1)) {
        Admission::PassThrough(handoff) => assert_eq!(handoff.attempt.username(), "Steve"),
        other => panic!("expected a pass-through, got {other:?}"),
    }
    assert_eq!(gatekeeper.online(address()), 1);
}

fn collisions_config() -> BastionConfig {
    let mut config = config();
    config.verification.gravity.check_collisions = true;
    config
}

#[test]
fn test_exact_platform_landing_passes() {
    let (verifier, _events) = verifier(collisions_config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    // the fall alone does not finish the stage while collisions are checked
    assert_eq!(client.fall(&verifier, None), StageKind::Gravity);
    assert!(client.platform.is_some());
    assert_eq!(client.land(&verifier, 8.0, 0.0), StageKind::Replay);
}

#[test]
fn test_landing_off_the_platform_surface_fails() {
    let (verifier, _events) = verifier(collisions_config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    assert_eq!(client.fall(&verifier, None), StageKind::Gravity);
    assert_eq!(client.land(&verifier, 8.0, 0.25), StageKind::Failed);
    assert!(matches!(client.session.ending(), Some(Ending::Failed(VerificationError::Physics(_)))));
}

#[test]
fn test_leaving_the_spawn_chunk_fails_even_when_lenient() {
    let mut config = collisions_config();
    config.verification.gravity.captcha_on_fail = true;
    let (verifier, _events) = verifier(config);
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    assert_eq!(client.fall(&verifier, None), StageKind::Gravity);
    assert_eq!(client.land(&verifier, 16.5, 0.0), StageKind::Failed);
    assert!(matches!(client.session.ending(), Some(Ending::Failed(VerificationError::Physics(_)))));
    assert!(!client.session.force_captcha());
}

#[test]
fn test_configuration_round_trip() {
    let (verifier, _events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_20_5);
    // nothing is sent before the login is acknowledged
    assert!(client.frames.try_recv().is_err());

    assert_eq!(client.send_in(Phase::Login, &[Packet::LoginAcknowledged]), StageKind::PreJoin);
    let frames = client.received_in(Phase::Config);
    let id = client.keep_alive_id(&last_of(&frames, PacketKind::KeepAlive));

    assert_eq!(client.send_in(Phase::Config, &[Packet::KeepAlive(KeepAlive { id })]), StageKind::PreJoin);
    let frames = client.received_in(Phase::Config);
    assert!(!all_of(&frames, PacketKind::RegistryData).is_empty());
    assert_eq!(all_of(&frames, PacketKind::FinishConfiguration).len(), 1);

    let brand = client.brand();
    let finish = [Packet::ClientInformation(ClientInformation::default()), brand, Packet::FinishConfiguration];
    assert_eq!(client.send_in(Phase::Config, &finish), StageKind::Gravity);
    assert_eq!(client.fall(&verifier, None), StageKind::Replay);
}

#[test]
fn test_finishing_configuration_before_the_keep_alive_fails() {
    let (verifier, _events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_20_5);

    client.send_in(Phase::Login, &[Packet::LoginAcknowledged]);
    assert_eq!(client.send_in(Phase::Config, &[Packet::FinishConfiguration]), StageKind::Failed);
    assert!(matches!(client.session.ending(), Some(Ending::Failed(VerificationError::ProtocolViolation(_)))));
}

#[test]
fn test_repeated_login_acknowledgement_fails() {
    let (verifier, _events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_20_5);

    let acknowledged = [Packet::LoginAcknowledged, Packet::LoginAcknowledged];
    assert_eq!(client.send_in(Phase::Login, &acknowledged), StageKind::Failed);
    assert!(matches!(client.session.ending(), Some(Ending::Failed(VerificationError::ProtocolViolation(_)))));
    assert_eq!(verifier.blacklist().score(address()), 1);
}

/// Answers the pre-join keep-alive followed by `announcements`.
fn announce(client: &mut Client, announcements: Vec<Packet>) -> StageKind {
    let frames = client.received();
    let id = client.keep_alive_id(&last_of(&frames, PacketKind::KeepAlive));
    let mut packets = vec![Packet::KeepAlive(KeepAlive { id })];
    packets.extend(announcements);
    client.send(&packets)
}

fn assert_protocol_violation(client: &Client) {
    assert!(
        matches!(client.session.ending(), Some(Ending::Failed(VerificationError::ProtocolViolation(_)))),
        "{:?}",
        client.session.ending()
    );
}

#[test]
fn test_duplicate_brand_fails() {
    let (verifier, _events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);
    let brand = client.brand();

    let sent = vec![Packet::ClientInformation(ClientInformation::default()), brand.clone(), brand];
    assert_eq!(announce(&mut client, sent), StageKind::Failed);
    assert_protocol_violation(&client);
}

#[test]
fn test_duplicate_client_information_fails() {
    let (verifier, _events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    let information = Packet::ClientInformation(ClientInformation::default());
    assert_eq!(announce(&mut client, vec![information.clone(), information]), StageKind::Failed);
    assert_protocol_violation(&client);
}

#[test]
fn test_tiny_view_distance_fails() {
    let (verifier, _events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    let information = ClientInformation { view_distance: 1, ..ClientInformation::default() };
    assert_eq!(announce(&mut client, vec![Packet::ClientInformation(information)]), StageKind::Failed);
    assert_protocol_violation(&client);
}

#[test]
fn test_missing_announcements_fail_when_gravity_passes() {
    let (verifier, _events) = verifier(config());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    assert_eq!(announce(&mut client, Vec::new()), StageKind::Gravity);
    assert_eq!(client.fall(&verifier, None), StageKind::Failed);
    assert_protocol_violation(&client);
}

fn vehicle_config() -> BastionConfig {
    let mut config = config();
    config.verification.vehicle.enabled = true;
    config
}

/// Joins a 1.12.2 session and sits down in the boat.
fn seated_in_boat(verifier: &Arc<Verifier>) -> Client {
    let mut client = Client::connect(verifier, ProtocolVersion::V1_12_2);
    client.pass_prejoin();
    assert_eq!(client.fall(verifier, None), StageKind::Vehicle);
    let frames = client.received();
    assert_eq!(all_of(&frames, PacketKind::SpawnEntity).len(), 1);
    assert_eq!(client.echo_keep_alive(&frames), StageKind::Vehicle);
    client
}

fn rotation() -> Packet {
    Packet::SetPlayerRotation(SetPlayerRotation { yaw: 0.0, pitch: 0.0, on_ground: false })
}

fn input(forward: f32) -> Packet {
    Packet::PlayerInput(PlayerInput { sideways: 0.0, forward, jump: false, sneak: false })
}

fn paddle() -> Packet {
    Packet::PaddleBoat(PaddleBoat { left: true, right: false })
}

fn vehicle_move(y: f64) -> Packet {
    Packet::VehicleMove(VehicleMove { x: 8.0, y, z: 8.0, yaw: 0.0, pitch: 0.0, on_ground: false })
}

/// Gravity constant of a vehicle, computed the way the client does.
fn vehicle_gravity() -> f64 {
    f64::from(0.04_f32)
}

#[test]
fn test_boat_and_minecart_on_1_12_2() {
    let (verifier, _events) = verifier(vehicle_config());
    let mut client = seated_in_boat(&verifier);

    let mut boat_y = f64::from(verifier.world().in_air_y);
    let mut motion = 0.0;
    for _ in 0..3 {
        let y = boat_y + (motion - vehicle_gravity());
        motion = y - boat_y;
        boat_y = y;
        assert_eq!(client.send(&[rotation(), paddle(), vehicle_move(y), input(0.98)]), StageKind::Vehicle);
    }
    let frames = client.received();
    assert_eq!(all_of(&frames, PacketKind::RemoveEntities).len(), 1);
    assert_eq!(client.echo_keep_alive(&frames), StageKind::Vehicle);

    let airborne = f64::from(verifier.world().in_air_y - 1);
    let leave = Packet::SetPlayerPosition(SetPlayerPosition { x: 8.0, y: airborne, z: 8.0, on_ground: false });
    assert_eq!(client.send(&[leave.clone()]), StageKind::Vehicle);

    // minecarts report neither paddles nor vehicle moves
    let frames = client.received();
    assert_eq!(all_of(&frames, PacketKind::SpawnEntity).len(), 1);
    assert_eq!(client.echo_keep_alive(&frames), StageKind::Vehicle);
    for _ in 0..3 {
        assert_eq!(client.send(&[rotation(), input(-0.5)]), StageKind::Vehicle);
    }
    let frames = client.received();
    assert_eq!(all_of(&frames, PacketKind::RemoveEntities).len(), 1);
    assert_eq!(client.echo_keep_alive(&frames), StageKind::Vehicle);
    assert_eq!(client.send(&[leave]), StageKind::Replay);
}

#[test]
fn test_floating_boat_fails() {
    let (verifier, _events) = verifier(vehicle_config());
    let mut client = seated_in_boat(&verifier);

    let hover = f64::from(verifier.world().in_air_y);
    assert_eq!(client.send(&[rotation(), paddle(), vehicle_move(hover)]), StageKind::Failed);
    assert!(matches!(client.session.ending(), Some(Ending::Failed(VerificationError::Physics(_)))));
}

#[test]
fn test_steering_without_paddling_fails() {
    let (verifier, _events) = verifier(vehicle_config());
    let mut client = seated_in_boat(&verifier);

    assert_eq!(client.send(&[rotation(), input(0.98)]), StageKind::Vehicle);
    assert_eq!(client.send(&[rotation(), input(0.98)]), StageKind::Failed);
    assert_protocol_violation(&client);
}

#[test]
fn test_steering_input_above_the_client_limit_fails() {
    let (verifier, _events) = verifier(vehicle_config());
    let mut client = seated_in_boat(&verifier);

    let y = f64::from(verifier.world().in_air_y) - vehicle_gravity();
    assert_eq!(client.send(&[rotation(), paddle(), vehicle_move(y), input(1.0)]), StageKind::Failed);
    assert_protocol_violation(&client);
}

#[test]
fn test_captcha_keep_alive_every_22nd_report() {
    let mut config = config();
    config.verification.captcha.timing = Timing::Always;
    let provider = Arc::new(StaticCaptchaProvider::new(vec![Captcha::new("abc", Vec::new())]));
    let verifier = Arc::new(Verifier::builder(config).seed(5).captcha_provider(provider).build());
    let mut client = Client::connect(&verifier, ProtocolVersion::V1_12_2);

    client.pass_prejoin();
    client.fall(&verifier, None);
    assert_eq!(client.pass_replay(&verifier), StageKind::Captcha);
    client.received();

    let report = Packet::SetPlayerPosition(SetPlayerPosition { x: 8.0, y: 10_000.0, z: 8.0, on_ground: false });
    for _ in 0..21 {
        assert_eq!(client.send(&[report.clone()]), StageKind::Captcha);
    }
    assert!(all_of(&client.received(), PacketKind::KeepAlive).is_empty());

    assert_eq!(client.send(&[report]), StageKind::Captcha);
    assert_eq!(all_of(&client.received(), PacketKind::KeepAlive).len(), 1);
}
