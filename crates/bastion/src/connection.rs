//! # Login Reader
//!
//! Turns the first bytes of a connection into a [`LoginAttempt`].
//!
//! ```text
//! HANDSHAKE ──(handshake, login intent)──► LOGIN ──(login start)──► LoginAttempt
//!     │                                      │
//!     └─ anything else: HandshakeRequired    └─ second login start: DuplicateLogin
//! ```
//!
//! The handshake layout never changed, so it is decoded with the oldest
//! dialect; everything after it uses the version the client announced.
//! Bytes that arrive behind the login packet are kept for the session.

use std::net::IpAddr;

use bastion_protocol::codec::{encode_frame, FrameDecoder};
use bastion_protocol::packets::{Handshake, Intent, LoginStart};
use bastion_protocol::{
    Direction, FrameError, Packet, PacketDeserializer, PacketKind, PacketRegistry, Phase, ProtocolVersion,
};
use bastion_security::Fingerprint;
use thiserror::Error;

use crate::error::Rejection;

/// A complete login request, ready for admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginAttempt {
    /// Peer address.
    pub address: IpAddr,
    /// Dialect announced in the handshake.
    pub version: ProtocolVersion,
    /// Hostname the client connected to.
    pub hostname: String,
    /// The login packet.
    pub login: LoginStart,
    /// The client arrived through an alternate transport.
    pub reduced_protocol: bool,
    /// Bytes received after the login packet.
    pub pending: Vec<u8>,
}

impl LoginAttempt {
    /// Identity key of this attempt.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.login.username, self.address)
    }

    /// Claimed username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.login.username
    }
}

/// Why the login sequence could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Malformed bytes.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Well-formed but refused.
    #[error("login refused: {0}")]
    Rejected(Rejection),
}

/// Incremental reader for the handshake and login packets.
#[derive(Debug)]
pub struct LoginReader {
    address: IpAddr,
    reduced_protocol: bool,
    frames: FrameDecoder,
    handshake: Option<Handshake>,
}

impl LoginReader {
    /// Creates a reader for a fresh connection.
    #[must_use]
    pub fn new(address: IpAddr, reduced_protocol: bool) -> Self {
        Self { address, reduced_protocol, frames: FrameDecoder::new(), handshake: None }
    }

    /// Version announced so far.
    #[must_use]
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.handshake.as_ref().map(Handshake::version)
    }

    /// Feeds bytes; returns the attempt once the login packet arrived.
    ///
    /// # Errors
    ///
    /// A [`LoginError`]; the connection must be closed, after sending the
    /// rejection message if it has one.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<LoginAttempt>, LoginError> {
        let registry = PacketRegistry::global();
        self.frames.push(bytes);

        while let Some(body) = self.frames.next_frame()? {
            let Some(handshake) = &self.handshake else {
                self.handshake = Some(read_handshake(registry, &body)?);
                continue;
            };

            let version = handshake.version();
            let hostname = handshake.hostname.clone();
            match registry.decode_frame(Phase::Login, Direction::Serverbound, version, &body)? {
                Some(Packet::LoginStart(login)) => {
                    let pending = self.drain_pending(registry, version)?;
                    return Ok(Some(LoginAttempt {
                        address: self.address,
                        version,
                        hostname,
                        login,
                        reduced_protocol: self.reduced_protocol,
                        pending,
                    }));
                }
                Some(other) => {
                    tracing::debug!("dropping {:?} before login start", other.kind());
                }
                None => {}
            }
        }
        Ok(None)
    }

    /// Re-frames everything after the login packet, refusing a second one.
    fn drain_pending(&mut self, registry: &PacketRegistry, version: ProtocolVersion) -> Result<Vec<u8>, LoginError> {
        let mut pending = Vec::new();
        while let Some(body) = self.frames.next_frame()? {
            let id = PacketDeserializer::new(&body).read_varint()?;
            if registry.packet_kind(Phase::Login, Direction::Serverbound, version, id) == Some(PacketKind::LoginStart) {
                return Err(LoginError::Rejected(Rejection::DuplicateLogin));
            }
            pending.extend(encode_frame(&body));
        }
        pending.extend(self.frames.take_buffered());
        Ok(pending)
    }
}

fn read_handshake(registry: &PacketRegistry, body: &[u8]) -> Result<Handshake, LoginError> {
    let decoded = registry.decode_frame(Phase::Handshake, Direction::Serverbound, ProtocolVersion::OLDEST, body)?;
    let Some(Packet::Handshake(handshake)) = decoded else {
        return Err(LoginError::Rejected(Rejection::HandshakeRequired));
    };
    if !matches!(handshake.intent(), Some(Intent::Login | Intent::Transfer)) {
        return Err(LoginError::Rejected(Rejection::HandshakeRequired));
    }
    if !handshake.version().is_supported() {
        return Err(LoginError::Rejected(Rejection::UnsupportedVersion));
    }
    Ok(handshake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));

    fn handshake(version: ProtocolVersion, intent: i32) -> Vec<u8> {
        let packet = Packet::Handshake(Handshake {
            protocol_version: version.id(),
            hostname: "play.example.net".into(),
            port: 25565,
            intent,
        });
        PacketRegistry::global()
            .encode_frame(Phase::Handshake, Direction::Serverbound, ProtocolVersion::OLDEST, &packet)
            .unwrap()
    }

    fn login(version: ProtocolVersion, username: &str) -> Vec<u8> {
        let packet = Packet::LoginStart(LoginStart { username: username.into(), uuid: None });
        PacketRegistry::global().encode_frame(Phase::Login, Direction::Serverbound, version, &packet).unwrap()
    }

    #[test]
    fn test_handshake_and_login_in_separate_reads() {
        let version = ProtocolVersion::V1_12_2;
        let mut reader = LoginReader::new(ADDRESS, false);

        assert_eq!(reader.feed(&handshake(version, 2)), Ok(None));
        assert_eq!(reader.version(), Some(version));

        let attempt = reader.feed(&login(version, "Steve")).unwrap().unwrap();
        assert_eq!(attempt.version, version);
        assert_eq!(attempt.username(), "Steve");
        assert_eq!(attempt.hostname, "play.example.net");
        assert!(attempt.pending.is_empty());
        assert_eq!(attempt.fingerprint(), Fingerprint::of("Steve", ADDRESS));
    }

    #[test]
    fn test_trailing_bytes_are_kept_for_the_session() {
        let version = ProtocolVersion::V1_21_4;
        let acknowledged = PacketRegistry::global()
            .encode_frame(Phase::Login, Direction::Serverbound, version, &Packet::LoginAcknowledged)
            .unwrap();

        let mut bytes = handshake(version, 2);
        bytes.extend(login(version, "Alex"));
        bytes.extend(&acknowledged);
        bytes.push(0x05); // start of another frame

        let attempt = LoginReader::new(ADDRESS, true).feed(&bytes).unwrap().unwrap();
        assert!(attempt.reduced_protocol);
        let mut expected = acknowledged;
        expected.push(0x05);
        assert_eq!(attempt.pending, expected);
    }

    #[test]
    fn test_duplicate_login_is_refused() {
        let version = ProtocolVersion::V1_8;
        let mut bytes = handshake(version, 2);
        bytes.extend(login(version, "Steve"));
        bytes.extend(login(version, "Steve"));

        let result = LoginReader::new(ADDRESS, false).feed(&bytes);
        assert_eq!(result, Err(LoginError::Rejected(Rejection::DuplicateLogin)));
    }

    #[test]
    fn test_status_intent_is_not_a_login() {
        let result = LoginReader::new(ADDRESS, false).feed(&handshake(ProtocolVersion::V1_20_5, 1));
        assert_eq!(result, Err(LoginError::Rejected(Rejection::HandshakeRequired)));
    }

    #[test]
    fn test_unknown_version_is_refused() {
        let packet = Packet::Handshake(Handshake {
            protocol_version: 12_345,
            hostname: "localhost".into(),
            port: 25565,
            intent: 2,
        });
        let bytes = PacketRegistry::global()
            .encode_frame(Phase::Handshake, Direction::Serverbound, ProtocolVersion::OLDEST, &packet)
            .unwrap();
        let result = LoginReader::new(ADDRESS, false).feed(&bytes);
        assert_eq!(result, Err(LoginError::Rejected(Rejection::UnsupportedVersion)));
    }
}
