use crate::faction::Faction;

use super::{ActorId, CombatantId};

/// One participant of an encounter.
///
/// Combatants are created and destroyed by the host. Eligibility to act is
/// never stored here: it is derived from the ledger and the host's status
/// data every time it is needed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    /// Actor document this combatant represents, if any.
    pub actor: Option<ActorId>,
    /// `None` for observers, which take no part in phase logic.
    pub faction: Option<Faction>,
    /// How many turns this combatant may take in one round.
    pub total_turns_per_round: u32,
    pub is_defeated: bool,
    /// Set from turn start until turn end.
    pub is_active_turn: bool,
}

impl Combatant {
    /// Creates a single-turn combatant for the given faction.
    pub fn new(id: impl Into<CombatantId>, name: impl Into<String>, faction: Faction) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            actor: None,
            faction: Some(faction),
            total_turns_per_round: 1,
            is_defeated: false,
            is_active_turn: false,
        }
    }

    /// Creates a combatant without a faction.
    pub fn observer(id: impl Into<CombatantId>, name: impl Into<String>) -> Self {
        Self {
            faction: None,
            ..Self::new(id, name, Faction::Allied)
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    #[must_use]
    pub fn with_turns(mut self, total_turns_per_round: u32) -> Self {
        self.total_turns_per_round = total_turns_per_round;
        self
    }

    #[must_use]
    pub fn defeated(mut self) -> Self {
        self.is_defeated = true;
        self
    }

    /// Returns true if this combatant takes part in phase logic.
    pub fn has_faction(&self) -> bool {
        self.faction.is_some()
    }

    pub fn is_in(&self, faction: Faction) -> bool {
        self.faction == Some(faction)
    }
}

impl From<String> for CombatantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
