//! # Per-Version Game Ids
//!
//! Numeric ids of the handful of entities, blocks and items the synthetic
//! world uses. Ids shift between releases, so each lookup walks the eras
//! oldest first and returns the first whose upper bound covers the version.

use crate::version::ProtocolVersion as V;

/// Picks the id of the first era whose inclusive upper bound is at or
/// above `version`, falling back to `latest`.
fn by_era(version: V, eras: &[(V, i32)], latest: i32) -> i32 {
    eras.iter()
        .find(|(upper, _)| version.less_or_equal(*upper))
        .map_or(latest, |&(_, id)| id)
}

/// Entities the vehicle check spawns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Rideable boat.
    Boat,
    /// Rideable minecart.
    Minecart,
}

impl EntityKind {
    /// Network id for `version`.
    #[must_use]
    pub fn id(self, version: V) -> i32 {
        match self {
            Self::Boat => by_era(
                version,
                &[(V::V1_13_2, 1), (V::V1_14_4, 5), (V::V1_16_4, 6), (V::V1_18_2, 7), (V::V1_19_3, 8), (V::V1_20_3, 9)],
                10,
            ),
            Self::Minecart => by_era(
                version,
                &[
                    (V::V1_13_2, 10),
                    (V::V1_14_4, 41),
                    (V::V1_15_2, 42),
                    (V::V1_16_4, 45),
                    (V::V1_18_2, 50),
                    (V::V1_19_1, 53),
                    (V::V1_19_3, 54),
                    (V::V1_20_2, 64),
                    (V::V1_20_3, 65),
                ],
                69,
            ),
        }
    }
}

/// Blocks the collision platform may be built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Enchanting table.
    EnchantingTable,
    /// Trapdoor (wooden on 1.7).
    Trapdoor,
    /// End portal frame.
    EndPortalFrame,
    /// Daylight detector.
    DaylightSensor,
    /// Bottom stone slab.
    StoneSlab,
}

impl BlockKind {
    /// Every platform block, in selection order.
    pub const ALL: [Self; 5] = [
        Self::EnchantingTable,
        Self::Trapdoor,
        Self::EndPortalFrame,
        Self::DaylightSensor,
        Self::StoneSlab,
    ];

    /// Block state id for `version`. Before 1.13 this is the legacy block
    /// id without metadata.
    #[must_use]
    pub fn state_id(self, version: V) -> i32 {
        match self {
            Self::EnchantingTable => by_era(
                version,
                &[
                    (V::V1_12_2, 116),
                    (V::V1_13_1, 4612),
                    (V::V1_13_2, 4613),
                    (V::V1_15_2, 5116),
                    (V::V1_16_1, 5132),
                    (V::V1_16_4, 5136),
                    (V::V1_18_2, 5333),
                    (V::V1_19_1, 5719),
                    (V::V1_19_3, 7159),
                    (V::V1_19_4, 7385),
                ],
                7389,
            ),
            Self::Trapdoor => by_era(
                version,
                &[
                    (V::V1_7_6, 96),
                    (V::V1_12_2, 167),
                    (V::V1_13_1, 6509),
                    (V::V1_13_2, 6510),
                    (V::V1_15_2, 7016),
                    (V::V1_16_1, 7552),
                    (V::V1_16_4, 7556),
                    (V::V1_18_2, 7802),
                    (V::V1_19_1, 8293),
                    (V::V1_19_3, 9937),
                    (V::V1_19_4, 10269),
                    (V::V1_20, 10273),
                ],
                10414,
            ),
            Self::EndPortalFrame => by_era(
                version,
                &[
                    (V::V1_12_2, 120),
                    (V::V1_13_1, 4633),
                    (V::V1_13_2, 4634),
                    (V::V1_15_2, 5137),
                    (V::V1_16_1, 5153),
                    (V::V1_16_4, 5157),
                    (V::V1_18_2, 5358),
                    (V::V1_19_1, 5744),
                    (V::V1_19_3, 7184),
                    (V::V1_19_4, 7410),
                ],
                7414,
            ),
            Self::DaylightSensor => by_era(
                version,
                &[
                    (V::V1_12_2, 151),
                    (V::V1_13_1, 5651),
                    (V::V1_13_2, 5652),
                    (V::V1_15_2, 6158),
                    (V::V1_16_1, 6694),
                    (V::V1_16_4, 6698),
                    (V::V1_18_2, 6916),
                    (V::V1_19_1, 7327),
                    (V::V1_19_3, 8811),
                    (V::V1_19_4, 9063),
                    (V::V1_20, 9067),
                ],
                9207,
            ),
            Self::StoneSlab => by_era(
                version,
                &[
                    (V::V1_12_2, 44),
                    (V::V1_13_1, 7296),
                    (V::V1_13_2, 7297),
                    (V::V1_15_2, 7809),
                    (V::V1_16_1, 8345),
                    (V::V1_16_4, 8349),
                    (V::V1_18_2, 8595),
                    (V::V1_19_1, 9092),
                    (V::V1_19_3, 10748),
                    (V::V1_19_4, 11086),
                    (V::V1_20, 11090),
                ],
                11231,
            ),
        }
    }

    /// Top of the block's collision box above its base.
    #[must_use]
    pub fn collision_height(self) -> f64 {
        match self {
            Self::EnchantingTable => f64::from(0.75_f32),
            Self::Trapdoor => 0.1875,
            Self::EndPortalFrame => 0.8125,
            Self::DaylightSensor => 0.375,
            Self::StoneSlab => 0.5,
        }
    }
}

/// Filled map item id for `version`.
#[must_use]
pub fn filled_map_item(version: V) -> i32 {
    by_era(
        version,
        &[
            (V::V1_12_2, 358),
            (V::V1_13_1, 608),
            (V::V1_13_2, 613),
            (V::V1_15_2, 671),
            (V::V1_16_4, 733),
            (V::V1_18_2, 847),
            (V::V1_19_1, 886),
            (V::V1_19_3, 914),
            (V::V1_19_4, 937),
            (V::V1_20_2, 941),
            (V::V1_20_3, 979),
            (V::V1_21, 982),
            (V::V1_21_2, 1022),
            (V::V1_21_4, 1031),
            (V::V1_21_5, 1042),
            (V::V1_21_7, 1059),
        ],
        1104,
    )
}

/// Data component id of `minecraft:map_id` (1.20.5+).
#[must_use]
pub fn map_id_component(version: V) -> i32 {
    by_era(version, &[(V::V1_21, 26), (V::V1_21_4, 36)], 37)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_era_boundaries_are_inclusive() {
        assert_eq!(EntityKind::Boat.id(V::V1_13_2), 1);
        assert_eq!(EntityKind::Boat.id(V::V1_14), 5);
        assert_eq!(EntityKind::Boat.id(V::LATEST), 10);
        assert_eq!(EntityKind::Minecart.id(V::V1_20_3), 65);
        assert_eq!(EntityKind::Minecart.id(V::V1_20_5), 69);
    }

    #[test]
    fn test_trapdoor_falls_back_to_wood_on_1_7() {
        assert_eq!(BlockKind::Trapdoor.state_id(V::V1_7_2), 96);
        assert_eq!(BlockKind::Trapdoor.state_id(V::V1_8), 167);
    }

    #[test]
    fn test_map_component_per_era() {
        assert_eq!(map_id_component(V::V1_20_5), 26);
        assert_eq!(map_id_component(V::V1_21_2), 36);
        assert_eq!(map_id_component(V::V1_21_5), 37);
        assert_eq!(filled_map_item(V::V1_8), 358);
    }
}
