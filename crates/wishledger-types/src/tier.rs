//! The three ordered currency tiers of the wish economy.
//!
//! Green is the base denomination; Blue and Red are progressively scarcer.
//! Conversion only ever moves value upward (Green → Blue → Red), at the
//! fixed ratio in [`crate::constants::CONVERSION_RATIO`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A currency tier. Ordered: `Green < Blue < Red`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Base tier ("tier0").
    Green,
    /// Middle tier ("tier1").
    Blue,
    /// Top tier ("tier2").
    Red,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 3] = [Tier::Green, Tier::Blue, Tier::Red];

    /// Zero-based position in the tier ordering.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Tier::Green => 0,
            Tier::Blue => 1,
            Tier::Red => 2,
        }
    }

    /// Tier at the given index, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Tier> {
        Tier::ALL.get(index).copied()
    }

    /// The adjacent higher tier, or `None` for the top tier.
    ///
    /// Conversions are only legal from a tier to its `next_up`.
    #[must_use]
    pub fn next_up(self) -> Option<Tier> {
        match self {
            Tier::Green => Some(Tier::Blue),
            Tier::Blue => Some(Tier::Red),
            Tier::Red => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Green => "green",
            Tier::Blue => "blue",
            Tier::Red => "red",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Green < Tier::Blue);
        assert!(Tier::Blue < Tier::Red);
    }

    #[test]
    fn next_up_chain() {
        assert_eq!(Tier::Green.next_up(), Some(Tier::Blue));
        assert_eq!(Tier::Blue.next_up(), Some(Tier::Red));
        assert_eq!(Tier::Red.next_up(), None);
    }

    #[test]
    fn index_roundtrip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_index(tier.index()), Some(tier));
        }
        assert_eq!(Tier::from_index(3), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(Tier::Green.to_string(), "green");
        assert_eq!(Tier::Blue.to_string(), "blue");
        assert_eq!(Tier::Red.to_string(), "red");
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&Tier::Blue).unwrap();
        assert_eq!(json, "\"blue\"");
        let back: Tier = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(back, Tier::Red);
    }
}
