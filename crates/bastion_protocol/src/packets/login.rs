//! # Handshake & Login Packets

use uuid::Uuid;

use crate::codec::{PacketDeserializer, PacketSerializer, TextComponent};
use crate::error::{FrameError, FrameResult};
use crate::version::ProtocolVersion as V;

const FORGE_TOKEN: &str = "\0FML\0";

/// Longest hostname a handshake may carry, Forge marker included.
pub const MAX_HOSTNAME_LEN: usize = 255 + FORGE_TOKEN.len() + 1;

/// Longest username a client may log in with.
pub const MAX_USERNAME_LEN: usize = 16;

/// What the client intends to do after the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Server list ping.
    Status,
    /// Regular login.
    Login,
    /// Login after a server-initiated transfer (1.20.5+).
    Transfer,
}

impl Intent {
    /// Resolves the raw intent id.
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::Status),
            2 => Some(Self::Login),
            3 => Some(Self::Transfer),
            _ => None,
        }
    }

    /// Raw intent id.
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::Status => 1,
            Self::Login => 2,
            Self::Transfer => 3,
        }
    }
}

/// First packet of every connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handshake {
    /// Raw protocol id the client announced.
    pub protocol_version: i32,
    /// Hostname the client connected to.
    pub hostname: String,
    /// Port the client connected to.
    pub port: u16,
    /// Raw next-state id.
    pub intent: i32,
}

impl Handshake {
    /// Resolves the announced protocol version.
    #[must_use]
    pub const fn version(&self) -> V {
        V::from_id(self.protocol_version)
    }

    /// Returns the parsed intent.
    #[must_use]
    pub const fn intent(&self) -> Option<Intent> {
        Intent::from_id(self.intent)
    }

    pub(crate) fn encode(&self, out: &mut PacketSerializer) {
        out.write_varint(self.protocol_version);
        out.write_string(&self.hostname);
        out.write_u16(self.port);
        out.write_varint(self.intent);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>) -> FrameResult<Self> {
        Ok(Self {
            protocol_version: input.read_varint()?,
            hostname: input.read_string(MAX_HOSTNAME_LEN)?,
            port: input.read_u16()?,
            intent: input.read_varint()?,
        })
    }
}

/// Login request carrying the username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginStart {
    /// Requested username.
    pub username: String,
    /// Profile id sent by 1.19.1+ clients.
    pub uuid: Option<Uuid>,
}

impl LoginStart {
    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        out.write_string(&self.username);
        if version.greater_or_equal(V::V1_19) {
            if version.less_than(V::V1_19_3) {
                // no signature data
                out.write_bool(false);
            }
            if version.greater_or_equal(V::V1_20_2) {
                out.write_uuid(self.uuid.unwrap_or_default());
            } else if version.greater_or_equal(V::V1_19_1) {
                out.write_bool(self.uuid.is_some());
                if let Some(uuid) = self.uuid {
                    out.write_uuid(uuid);
                }
            }
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let username = input.read_string(MAX_USERNAME_LEN)?;
        let mut uuid = None;
        if version.greater_or_equal(V::V1_19) {
            if version.less_than(V::V1_19_3) && input.read_bool()? {
                let _expiry = input.read_i64()?;
                if input.read_byte_array(512)?.is_empty() {
                    return Err(FrameError::InvalidValue("empty public key"));
                }
                if input.read_byte_array(4096)?.is_empty() {
                    return Err(FrameError::InvalidValue("empty key signature"));
                }
            }
            if version.greater_or_equal(V::V1_19_1)
                && (version.greater_or_equal(V::V1_20_2) || input.read_bool()?)
            {
                uuid = Some(input.read_uuid()?);
            }
        }
        Ok(Self { username, uuid })
    }
}

/// Accepts the login and moves the client on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginSuccess {
    /// Profile id.
    pub uuid: Uuid,
    /// Accepted username.
    pub username: String,
}

impl LoginSuccess {
    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        if version.greater_or_equal(V::V1_16) {
            out.write_uuid(self.uuid);
        } else if version.greater_or_equal(V::V1_7_6) {
            out.write_string(&self.uuid.hyphenated().to_string());
        } else {
            out.write_string(&self.uuid.simple().to_string());
        }
        out.write_string(&self.username);
        if version.greater_or_equal(V::V1_19) {
            // no properties
            out.write_varint(0);
        }
        if version.in_between(V::V1_20_5, V::V1_21) {
            // strict error handling
            out.write_bool(true);
        }
    }
}

/// Closes the connection with a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disconnect {
    /// Reason shown to the player.
    pub reason: TextComponent,
    /// Login disconnects always use the JSON form.
    pub during_login: bool,
}

impl Disconnect {
    /// Creates a disconnect packet.
    #[must_use]
    pub fn new(reason: impl Into<String>, during_login: bool) -> Self {
        Self { reason: TextComponent::new(reason), during_login }
    }

    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        let version = if self.during_login { V::V1_20_2 } else { version };
        self.reason.write(out, version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_start_uuid_eras() {
        let uuid = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
        for (version, expected) in [
            (V::V1_8, None),
            (V::V1_19, None),
            (V::V1_19_1, Some(uuid)),
            (V::V1_20_2, Some(uuid)),
        ] {
            let packet = LoginStart { username: "Steve".into(), uuid: Some(uuid) };
            let mut out = PacketSerializer::new();
            packet.encode(&mut out, version);
            let mut input = PacketDeserializer::new(out.as_slice());
            let decoded = LoginStart::decode(&mut input, version).unwrap();
            assert_eq!(decoded.username, "Steve");
            assert_eq!(decoded.uuid, expected, "{version}");
            assert_eq!(input.remaining(), 0);
        }
    }

    #[test]
    fn test_login_success_uuid_forms() {
        let packet = LoginSuccess { uuid: Uuid::nil(), username: "a".into() };

        let mut legacy = PacketSerializer::new();
        packet.encode(&mut legacy, V::V1_8);
        // string uuid (36 chars + prefix) then username
        assert_eq!(legacy.len(), 1 + 36 + 1 + 1);

        let mut modern = PacketSerializer::new();
        packet.encode(&mut modern, V::V1_19);
        assert_eq!(modern.len(), 16 + 2 + 1);
    }

    #[test]
    fn test_intent_ids() {
        assert_eq!(Intent::from_id(2), Some(Intent::Login));
        assert_eq!(Intent::from_id(9), None);
        assert_eq!(Intent::Transfer.id(), 3);
    }
}
