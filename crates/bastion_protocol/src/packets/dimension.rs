//! # Dimension Codec
//!
//! A minimal registry codec describing one overworld-like dimension and one
//! biome. JoinGame embeds it for 1.16-1.20.1, configuration-phase clients
//! receive it through [`RegistryData`].
//!
//! ## Design
//!
//! - Built on demand per version; only the fields the era expects are set
//! - 1.16/1.16.1 use the flat `dimension` list, later eras the keyed form

use crate::codec::{Compound, Tag};
use crate::packets::configuration::{RegistryData, RegistryEntry};
use crate::version::ProtocolVersion as V;

/// Identifier of the only dimension.
pub const OVERWORLD: &str = "minecraft:overworld";

const DIMENSION_TYPE: &str = "minecraft:dimension_type";
const BIOME: &str = "minecraft:worldgen/biome";
const PLAINS: &str = "minecraft:plains";

fn byte(value: bool) -> Tag {
    Tag::Byte(i8::from(value))
}

/// Dimension type element for `version`.
#[must_use]
pub fn dimension_element(version: V) -> Compound {
    let mut element = Compound::new()
        .with("piglin_safe", byte(false))
        .with("natural", byte(true))
        .with("ambient_light", Tag::Float(0.0))
        .with("respawn_anchor_works", byte(false))
        .with("has_skylight", byte(true))
        .with("bed_works", byte(true))
        .with("has_raids", byte(false))
        .with("logical_height", Tag::Int(256))
        .with("ultrawarm", byte(false))
        .with("has_ceiling", byte(false));

    let infiniburn = if version.greater_or_equal(V::V1_18_2) {
        "#minecraft:infiniburn_overworld"
    } else {
        "minecraft:infiniburn_overworld"
    };
    element.put("infiniburn", Tag::String(infiniburn.into()));

    if version.less_than(V::V1_16_2) {
        element.put("name", Tag::String(OVERWORLD.into()));
        element.put("shrunk", byte(false));
    } else {
        element.put("effects", Tag::String(OVERWORLD.into()));
        element.put("coordinate_scale", Tag::Double(1.0));
    }
    if version.greater_or_equal(V::V1_17) {
        element.put("min_y", Tag::Int(0));
        element.put("height", Tag::Int(256));
    }
    if version.greater_or_equal(V::V1_19) {
        element.put("monster_spawn_block_light_limit", Tag::Int(0));
        element.put("monster_spawn_light_level", Tag::Int(0));
    }
    element
}

fn biome_element(version: V) -> Compound {
    let effects = Compound::new()
        .with("sky_color", Tag::Int(7_907_327))
        .with("water_fog_color", Tag::Int(329_011))
        .with("fog_color", Tag::Int(12_638_463))
        .with("water_color", Tag::Int(4_159_204));
    let mut element = Compound::new()
        .with("temperature", Tag::Float(0.8))
        .with("downfall", Tag::Float(0.4))
        .with("effects", Tag::Compound(effects));
    if version.greater_or_equal(V::V1_19_4) {
        element.put("has_precipitation", byte(false));
    } else {
        element.put("precipitation", Tag::String("none".into()));
        if version.less_than(V::V1_19) {
            element.put("category", Tag::String("plains".into()));
            element.put("depth", Tag::Float(0.125));
            element.put("scale", Tag::Float(0.05));
        }
    }
    element
}

fn registry(id: &str, entry: &str, element: Compound) -> Tag {
    let value = Compound::new()
        .with("name", Tag::String(entry.into()))
        .with("id", Tag::Int(0))
        .with("element", Tag::Compound(element));
    Tag::Compound(
        Compound::new()
            .with("type", Tag::String(id.into()))
            .with("value", Tag::List(vec![Tag::Compound(value)])),
    )
}

/// The full codec compound for JoinGame (1.16-1.20.1) and the single
/// RegistryData packet of 1.20.2-1.20.3.
#[must_use]
pub fn codec(version: V) -> Compound {
    if version.less_than(V::V1_16_2) {
        return Compound::new().with(
            "dimension",
            Tag::List(vec![Tag::Compound(dimension_element(version))]),
        );
    }
    Compound::new()
        .with(DIMENSION_TYPE, registry(DIMENSION_TYPE, OVERWORLD, dimension_element(version)))
        .with(BIOME, registry(BIOME, PLAINS, biome_element(version)))
}

/// Registry packets for a configuration-phase client.
#[must_use]
pub fn registry_data(version: V) -> Vec<RegistryData> {
    if version.less_than(V::V1_20_5) {
        return vec![RegistryData::Codec(codec(version))];
    }
    let entry = |name: &str, element: Compound| RegistryEntry { name: name.into(), element: Some(element) };
    vec![
        RegistryData::Registry {
            id: DIMENSION_TYPE.into(),
            entries: vec![entry(OVERWORLD, dimension_element(version))],
        },
        RegistryData::Registry { id: BIOME.into(), entries: vec![entry(PLAINS, biome_element(version))] },
    ]
}
