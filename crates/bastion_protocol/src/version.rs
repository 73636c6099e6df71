//! # Protocol Versions
//!
//! Every client dialect the verification engine can speak, totally ordered
//! by release.
//!
//! ## Design
//!
//! - Variants are declared oldest-first, so the derived `Ord` is the release order
//! - Raw ids that are not listed resolve to [`ProtocolVersion::Unknown`], which sorts
//!   before everything and is never supported
//! - Era checks are always written as closed ranges against named versions

use std::fmt;

macro_rules! protocol_versions {
    ($($variant:ident = $id:literal => $name:literal),+ $(,)?) => {
        /// A client protocol dialect.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ProtocolVersion {
            /// Raw id that no known client uses.
            Unknown,
            $(
                #[doc = concat!("Minecraft ", $name, " (protocol ", $id, ").")]
                $variant,
            )+
        }

        impl ProtocolVersion {
            /// All supported versions, oldest first.
            pub const ALL: &'static [ProtocolVersion] = &[$(ProtocolVersion::$variant),+];

            /// Resolves a raw protocol id.
            #[must_use]
            pub const fn from_id(id: i32) -> Self {
                match id {
                    $($id => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }

            /// Returns the raw protocol id (`-1` for unknown).
            #[inline]
            #[must_use]
            pub const fn id(self) -> i32 {
                match self {
                    Self::Unknown => -1,
                    $(Self::$variant => $id,)+
                }
            }

            /// Returns the human readable release name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    Self::Unknown => "unknown",
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

protocol_versions! {
    V1_7_2 = 4 => "1.7.2",
    V1_7_6 = 5 => "1.7.6",
    V1_8 = 47 => "1.8",
    V1_9 = 107 => "1.9",
    V1_9_1 = 108 => "1.9.1",
    V1_9_2 = 109 => "1.9.2",
    V1_9_4 = 110 => "1.9.4",
    V1_10 = 210 => "1.10",
    V1_11 = 315 => "1.11",
    V1_11_1 = 316 => "1.11.1",
    V1_12 = 335 => "1.12",
    V1_12_1 = 338 => "1.12.1",
    V1_12_2 = 340 => "1.12.2",
    V1_13 = 393 => "1.13",
    V1_13_1 = 401 => "1.13.1",
    V1_13_2 = 404 => "1.13.2",
    V1_14 = 477 => "1.14",
    V1_14_1 = 480 => "1.14.1",
    V1_14_2 = 485 => "1.14.2",
    V1_14_3 = 490 => "1.14.3",
    V1_14_4 = 498 => "1.14.4",
    V1_15 = 573 => "1.15",
    V1_15_1 = 575 => "1.15.1",
    V1_15_2 = 578 => "1.15.2",
    V1_16 = 735 => "1.16",
    V1_16_1 = 736 => "1.16.1",
    V1_16_2 = 751 => "1.16.2",
    V1_16_3 = 753 => "1.16.3",
    V1_16_4 = 754 => "1.16.4",
    V1_17 = 755 => "1.17",
    V1_17_1 = 756 => "1.17.1",
    V1_18 = 757 => "1.18",
    V1_18_2 = 758 => "1.18.2",
    V1_19 = 759 => "1.19",
    V1_19_1 = 760 => "1.19.1",
    V1_19_3 = 761 => "1.19.3",
    V1_19_4 = 762 => "1.19.4",
    V1_20 = 763 => "1.20",
    V1_20_2 = 764 => "1.20.2",
    V1_20_3 = 765 => "1.20.3",
    V1_20_5 = 766 => "1.20.5",
    V1_21 = 767 => "1.21",
    V1_21_2 = 768 => "1.21.2",
    V1_21_4 = 769 => "1.21.4",
    V1_21_5 = 770 => "1.21.5",
    V1_21_6 = 771 => "1.21.6",
    V1_21_7 = 772 => "1.21.7",
    V1_21_9 = 773 => "1.21.9",
}

impl ProtocolVersion {
    /// Oldest supported dialect.
    pub const OLDEST: Self = Self::V1_7_2;
    /// Newest supported dialect.
    pub const LATEST: Self = Self::V1_21_9;

    /// Returns true for every listed dialect.
    #[inline]
    #[must_use]
    pub fn is_supported(self) -> bool {
        self != Self::Unknown
    }

    /// `self > other`
    #[inline]
    #[must_use]
    pub fn greater_than(self, other: Self) -> bool {
        self > other
    }

    /// `self >= other`
    #[inline]
    #[must_use]
    pub fn greater_or_equal(self, other: Self) -> bool {
        self >= other
    }

    /// `self < other`
    #[inline]
    #[must_use]
    pub fn less_than(self, other: Self) -> bool {
        self < other
    }

    /// `self <= other`
    #[inline]
    #[must_use]
    pub fn less_or_equal(self, other: Self) -> bool {
        self <= other
    }

    /// Closed range check: `low <= self <= high`.
    #[inline]
    #[must_use]
    pub fn in_between(self, low: Self, high: Self) -> bool {
        self >= low && self <= high
    }

    /// Position of this version inside [`ProtocolVersion::ALL`].
    #[must_use]
    pub fn ordinal(self) -> Option<usize> {
        Self::ALL.iter().position(|v| *v == self)
    }

    /// Iterates all supported versions in `[from, to)`.
    pub fn range(from: Self, to: Self) -> impl Iterator<Item = Self> {
        Self::ALL.iter().copied().filter(move |v| *v >= from && *v < to)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id_round_trip() {
        for version in ProtocolVersion::ALL {
            assert_eq!(ProtocolVersion::from_id(version.id()), *version);
        }
        assert_eq!(ProtocolVersion::from_id(47), ProtocolVersion::V1_8);
        assert_eq!(ProtocolVersion::from_id(773), ProtocolVersion::LATEST);
    }

    #[test]
    fn test_unknown_is_rejected() {
        let unknown = ProtocolVersion::from_id(1234);
        assert_eq!(unknown, ProtocolVersion::Unknown);
        assert!(!unknown.is_supported());
        assert_eq!(unknown.id(), -1);
        assert!(unknown < ProtocolVersion::OLDEST);
    }

    #[test]
    fn test_ordering_follows_release_order() {
        let ids: Vec<i32> = ProtocolVersion::ALL.iter().map(|v| v.id()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_range_comparisons() {
        let v = ProtocolVersion::V1_16_2;
        assert!(v.in_between(ProtocolVersion::V1_16_2, ProtocolVersion::V1_17_1));
        assert!(!v.in_between(ProtocolVersion::V1_16, ProtocolVersion::V1_16_1));
        assert!(v.greater_than(ProtocolVersion::V1_16_1));
        assert!(v.greater_or_equal(ProtocolVersion::V1_16_2));
        assert!(v.less_than(ProtocolVersion::V1_17));
        assert!(v.less_or_equal(ProtocolVersion::V1_16_2));
    }

    #[test]
    fn test_half_open_range() {
        let versions: Vec<_> =
            ProtocolVersion::range(ProtocolVersion::V1_19, ProtocolVersion::V1_19_4).collect();
        assert_eq!(
            versions,
            vec![ProtocolVersion::V1_19, ProtocolVersion::V1_19_1, ProtocolVersion::V1_19_3]
        );
    }
}
