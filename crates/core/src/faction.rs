//! The two opposing sides of an encounter.

use strum::{EnumIter, IntoStaticStr};

/// One of the two sides taking turns in an encounter.
///
/// Phases alternate between factions; during a faction's phase only its
/// combatants may start a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum Faction {
    Allied,
    Enemy,
}

impl Faction {
    /// Returns the other faction.
    pub const fn opposite(self) -> Self {
        match self {
            Faction::Allied => Faction::Enemy,
            Faction::Enemy => Faction::Allied,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Label shown when asking which faction acts first.
    pub const fn phase_label(self) -> &'static str {
        match self {
            Faction::Allied => "Ally Phase",
            Faction::Enemy => "Enemy Phase",
        }
    }
}

impl core::fmt::Display for Faction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn opposite_is_an_involution() {
        for faction in Faction::iter() {
            assert_ne!(faction, faction.opposite());
            assert_eq!(faction, faction.opposite().opposite());
        }
    }

    #[test]
    fn allied_sorts_before_enemy() {
        assert!(Faction::Allied < Faction::Enemy);
        assert_eq!(Faction::Enemy.as_str(), "enemy");
    }
}
