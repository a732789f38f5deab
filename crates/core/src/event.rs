//! Values emitted at state-machine transitions.

use std::sync::Arc;

use crate::faction::Faction;
use crate::state::{ActorId, Combatant, CombatantId};

/// Kind of lifecycle boundary a [`CombatEvent`] marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum CombatEventKind {
    StartOfCombat,
    EndOfCombat,
    StartOfRound,
    EndOfRound,
    StartOfTurn,
    EndOfTurn,
    /// Fired once per completed turn, before effect durations tick, so
    /// condition handlers can clear their "damage already applied" flags.
    TurnDamageReset,
    /// Fired once when an encounter ends so once-per-encounter resources
    /// can be reset.
    EncounterCleanup,
}

impl CombatEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StartOfCombat => "startOfCombat",
            Self::EndOfCombat => "endOfCombat",
            Self::StartOfRound => "startOfRound",
            Self::EndOfRound => "endOfRound",
            Self::StartOfTurn => "startOfTurn",
            Self::EndOfTurn => "endOfTurn",
            Self::TurnDamageReset => "turnDamageReset",
            Self::EncounterCleanup => "encounterCleanup",
        }
    }

    /// Returns true for events scoped to a single combatant.
    pub const fn is_turn_scoped(&self) -> bool {
        matches!(
            self,
            Self::StartOfTurn | Self::EndOfTurn | Self::TurnDamageReset
        )
    }
}

/// Immutable notification of a lifecycle boundary.
///
/// `combatants` is a snapshot taken at emission time; consumers must treat it
/// as read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatEvent {
    pub kind: CombatEventKind,
    pub round: u32,
    pub combatants: Arc<[Combatant]>,
    /// The combatant a turn-scoped event is about.
    pub combatant: Option<Combatant>,
}

impl CombatEvent {
    pub fn new(kind: CombatEventKind, round: u32, combatants: Arc<[Combatant]>) -> Self {
        Self {
            kind,
            round,
            combatants,
            combatant: None,
        }
    }

    #[must_use]
    pub fn for_combatant(mut self, combatant: Combatant) -> Self {
        self.combatant = Some(combatant);
        self
    }

    pub fn combatant_id(&self) -> Option<&CombatantId> {
        self.combatant.as_ref().map(|c| &c.id)
    }

    pub fn actor(&self) -> Option<&ActorId> {
        self.combatant.as_ref().and_then(|c| c.actor.as_ref())
    }

    pub fn actors(&self) -> impl Iterator<Item = &ActorId> + '_ {
        self.combatants.iter().filter_map(|c| c.actor.as_ref())
    }
}

/// Requests to the host and its UI that accompany a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnNotice {
    /// Observers should re-render turn state.
    TurnChanged {
        round: u32,
        current_phase: Option<Faction>,
        active: Option<CombatantId>,
    },
    /// The host turn pointer moved forward within the round.
    TurnAdvanced {
        round: u32,
        turn: u32,
        advance_time: u32,
    },
    /// A new round began; the host clock advances by `advance_time` seconds.
    RoundAdvanced {
        round: u32,
        turn: Option<u32>,
        advance_time: u32,
    },
}
