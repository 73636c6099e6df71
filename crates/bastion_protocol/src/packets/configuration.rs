//! # Shared Session Packets
//!
//! Packets that appear in both the configuration and the play phase:
//! keep-alives, plugin messages, client settings and registry sync.

use crate::codec::{Compound, PacketDeserializer, PacketSerializer};
use crate::error::{FrameError, FrameResult};
use crate::version::ProtocolVersion as V;

/// Longest plugin channel identifier.
pub const MAX_CHANNEL_LEN: usize = 48;

/// Largest plugin payload a 1.7 client may announce.
const FORGE_MAX_ARRAY_LEN: i32 = i32::MAX & 0x1F_FF9A;

/// Longest locale string a client may send.
pub const MAX_LOCALE_LEN: usize = 16;

/// Liveness ping with an opaque id the client must echo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeepAlive {
    /// Challenge id.
    pub id: i64,
}

impl KeepAlive {
    pub(crate) fn encode(self, out: &mut PacketSerializer, version: V) {
        if version.greater_or_equal(V::V1_12_2) {
            out.write_i64(self.id);
        } else if version.greater_or_equal(V::V1_8) {
            out.write_varint(self.id as i32);
        } else {
            out.write_i32(self.id as i32);
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let id = if version.greater_or_equal(V::V1_12_2) {
            input.read_i64()?
        } else if version.greater_or_equal(V::V1_8) {
            i64::from(input.read_varint()?)
        } else {
            i64::from(input.read_i32()?)
        };
        Ok(Self { id })
    }
}

/// Custom payload on a named channel, used here for the client brand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginMessage {
    /// Channel identifier.
    pub channel: String,
    /// Raw payload.
    pub data: Vec<u8>,
}

impl PluginMessage {
    /// Returns true for the brand channel of any era.
    #[must_use]
    pub fn is_brand(&self) -> bool {
        self.channel == "minecraft:brand" || self.channel == "MC|Brand"
    }

    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        out.write_string(&self.channel);
        if version.less_than(V::V1_8) {
            out.write_extended_forge_short(self.data.len() as i32);
        }
        out.write_bytes(&self.data);
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let channel = input.read_string(MAX_CHANNEL_LEN)?;
        let length = if version.greater_or_equal(V::V1_8) {
            let length = input.remaining();
            if length > i16::MAX as usize {
                return Err(FrameError::TooLarge { length, max: i16::MAX as usize });
            }
            length
        } else {
            let length = input.read_extended_forge_short()?;
            if !(0..=FORGE_MAX_ARRAY_LEN).contains(&length) {
                return Err(FrameError::InvalidArrayLength(length));
            }
            length as usize
        };
        let data = input.read_bytes(length)?.to_vec();
        Ok(Self { channel, data })
    }
}

/// Client settings sent once after joining.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientInformation {
    /// Locale such as `en_us`.
    pub locale: String,
    /// Render distance in chunks.
    pub view_distance: i8,
    /// Chat visibility mode.
    pub chat_visibility: i32,
    /// Whether chat colours are shown.
    pub chat_colors: bool,
    /// Difficulty (1.7 only).
    pub difficulty: i8,
    /// Displayed skin parts bitmask.
    pub skin_parts: u8,
    /// Main hand (1.9+).
    pub main_hand: i32,
    /// Chat filtering (1.17+).
    pub text_filtering: bool,
    /// Server listing opt-in (1.18+).
    pub allow_listing: bool,
    /// Particle setting (1.21.2+).
    pub particle_status: i32,
}

impl Default for ClientInformation {
    fn default() -> Self {
        Self {
            locale: String::from("en_us"),
            view_distance: 10,
            chat_visibility: 0,
            chat_colors: true,
            difficulty: 0,
            skin_parts: 0x7F,
            main_hand: 1,
            text_filtering: false,
            allow_listing: true,
            particle_status: 0,
        }
    }
}

impl ClientInformation {
    pub(crate) fn encode(&self, out: &mut PacketSerializer, version: V) {
        out.write_string(&self.locale);
        out.write_i8(self.view_distance);
        out.write_varint(self.chat_visibility);
        out.write_bool(self.chat_colors);
        if version.less_than(V::V1_8) {
            out.write_i8(self.difficulty);
        }
        out.write_u8(self.skin_parts);
        if version.greater_or_equal(V::V1_9) {
            out.write_varint(self.main_hand);
            if version.greater_or_equal(V::V1_17) {
                out.write_bool(self.text_filtering);
                if version.greater_or_equal(V::V1_18) {
                    out.write_bool(self.allow_listing);
                    if version.greater_or_equal(V::V1_21_2) {
                        out.write_varint(self.particle_status);
                    }
                }
            }
        }
    }

    pub(crate) fn decode(input: &mut PacketDeserializer<'_>, version: V) -> FrameResult<Self> {
        let mut info = Self {
            locale: input.read_string(MAX_LOCALE_LEN)?,
            view_distance: input.read_i8()?,
            chat_visibility: input.read_varint()?,
            chat_colors: input.read_bool()?,
            ..Self::default()
        };
        if version.less_than(V::V1_8) {
            info.difficulty = input.read_i8()?;
        }
        info.skin_parts = input.read_u8()?;
        if version.greater_or_equal(V::V1_9) {
            info.main_hand = input.read_varint()?;
            if version.greater_or_equal(V::V1_17) {
                info.text_filtering = input.read_bool()?;
                if version.greater_or_equal(V::V1_18) {
                    info.allow_listing = input.read_bool()?;
                    if version.greater_or_equal(V::V1_21_2) {
                        info.particle_status = input.read_varint()?;
                    }
                }
            }
        }
        Ok(info)
    }
}

/// One named entry of a registry sync.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryEntry {
    /// Entry identifier.
    pub name: String,
    /// Inline element data, absent when the client knows it already.
    pub element: Option<Compound>,
}

/// Registry synchronisation during configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryData {
    /// 1.20.2-1.20.3: the whole codec as one compound.
    Codec(Compound),
    /// 1.20.5+: one registry per packet.
    Registry {
        /// Registry identifier, e.g. `minecraft:dimension_type`.
        id: String,
        /// Entries in network order.
        entries: Vec<RegistryEntry>,
    },
}

impl RegistryData {
    pub(crate) fn encode(&self, out: &mut PacketSerializer) {
        match self {
            Self::Codec(codec) => codec.write_nameless(out),
            Self::Registry { id, entries } => {
                out.write_string(id);
                out.write_varint(entries.len() as i32);
                for entry in entries {
                    out.write_string(&entry.name);
                    out.write_bool(entry.element.is_some());
                    if let Some(element) = &entry.element {
                        element.write_nameless(out);
                    }
                }
            }
        }
    }
}

/// Sends the client to another server (1.20.5+).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Destination host.
    pub host: String,
    /// Destination port.
    pub port: i32,
}

impl Transfer {
    pub(crate) fn encode(&self, out: &mut PacketSerializer) {
        out.write_string(&self.host);
        out.write_varint(self.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_alive_width_per_era() {
        let packet = KeepAlive { id: 300 };
        for (version, width) in [(V::V1_7_6, 4), (V::V1_8, 2), (V::V1_12_1, 2), (V::V1_12_2, 8)] {
            let mut out = PacketSerializer::new();
            packet.encode(&mut out, version);
            assert_eq!(out.len(), width, "{version}");
            let decoded = KeepAlive::decode(&mut PacketDeserializer::new(out.as_slice()), version);
            assert_eq!(decoded, Ok(packet));
        }
    }

    #[test]
    fn test_brand_channel_names() {
        let modern = PluginMessage { channel: "minecraft:brand".into(), data: vec![] };
        let legacy = PluginMessage { channel: "MC|Brand".into(), data: vec![] };
        let other = PluginMessage { channel: "fabric:registry".into(), data: vec![] };
        assert!(modern.is_brand());
        assert!(legacy.is_brand());
        assert!(!other.is_brand());
    }

    #[test]
    fn test_legacy_plugin_message_uses_forge_short() {
        let packet = PluginMessage { channel: "MC|Brand".into(), data: b"vanilla".to_vec() };
        let mut out = PacketSerializer::new();
        packet.encode(&mut out, V::V1_7_6);
        let decoded = PluginMessage::decode(&mut PacketDeserializer::new(out.as_slice()), V::V1_7_6);
        assert_eq!(decoded, Ok(packet));
    }

    #[test]
    fn test_client_information_fields_by_era() {
        let info = ClientInformation { particle_status: 2, ..ClientInformation::default() };
        let mut out = PacketSerializer::new();
        info.encode(&mut out, V::V1_21_2);
        let mut input = PacketDeserializer::new(out.as_slice());
        assert_eq!(ClientInformation::decode(&mut input, V::V1_21_2), Ok(info.clone()));
        assert_eq!(input.remaining(), 0);

        let mut legacy = PacketSerializer::new();
        info.encode(&mut legacy, V::V1_8);
        // locale(6) + view(1) + visibility(1) + colors(1) + skin(1)
        assert_eq!(legacy.len(), 10);
    }
}
