//! # Text Components
//!
//! Chat/disconnect text. Serialized as a JSON string before 1.20.3 and as a
//! nameless compound tag from 1.20.3 on.

use serde::{Deserialize, Serialize};

use super::buffer::PacketSerializer;
use super::nbt::{Compound, Tag};
use crate::version::ProtocolVersion;

/// A plain text component.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextComponent {
    /// Literal text, may contain legacy `§` colour codes.
    pub text: String,
}

impl TextComponent {
    /// Creates a component from literal text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Serializes to the JSON form.
    #[must_use]
    pub fn to_json(&self) -> String {
        // A struct with one string field always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"text\":\"\"}"))
    }

    /// Converts to the binary tag form.
    #[must_use]
    pub fn to_compound(&self) -> Compound {
        Compound::new().with("text", Tag::String(self.text.clone()))
    }

    /// Writes the component in the form `version` expects.
    pub fn write(&self, out: &mut PacketSerializer, version: ProtocolVersion) {
        if version.greater_or_equal(ProtocolVersion::V1_20_3) {
            self.to_compound().write_nameless(out);
        } else {
            out.write_string(&self.to_json());
        }
    }
}

impl From<&str> for TextComponent {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::buffer::PacketDeserializer;

    #[test]
    fn test_json_form() {
        let component = TextComponent::new("Verification \"ok\"");
        assert_eq!(component.to_json(), r#"{"text":"Verification \"ok\""}"#);

        let mut out = PacketSerializer::new();
        component.write(&mut out, ProtocolVersion::V1_20_2);
        let mut reader = PacketDeserializer::new(out.as_slice());
        let json = reader.read_string(262_144).unwrap();
        let parsed: TextComponent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, component);
    }

    #[test]
    fn test_nbt_form_from_1_20_3() {
        let mut out = PacketSerializer::new();
        TextComponent::new("x").write(&mut out, ProtocolVersion::V1_20_3);
        assert_eq!(out.as_slice()[0], 10);
        assert_eq!(*out.as_slice().last().unwrap(), 0);
    }
}
