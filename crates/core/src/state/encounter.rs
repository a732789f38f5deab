use std::sync::Arc;

use crate::env::StatusOracle;
use crate::error::SetupError;
use crate::faction::Faction;

use super::{Combatant, CombatantId, EncounterId, TurnLedger};

/// Lifecycle of an encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EncounterStatus {
    #[default]
    NotStarted,
    /// Waiting for someone to choose which faction acts first.
    AwaitingFirstPhaseSelection,
    InProgress,
    Ended,
}

impl EncounterStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::AwaitingFirstPhaseSelection => "awaiting_first_phase_selection",
            Self::InProgress => "in_progress",
            Self::Ended => "ended",
        }
    }
}

/// What is happening inside an in-progress encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncounterSubState<'a> {
    /// The faction's phase is open and nobody is mid-turn.
    PhaseOpen(Faction),
    /// A combatant is taking its turn.
    TurnActive(&'a Combatant),
}

/// Root aggregate for one combat instance.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Encounter {
    pub id: EncounterId,
    pub status: EncounterStatus,
    /// 0 before combat starts, 1 for the first round.
    pub round: u32,
    /// Host turn pointer, advanced by the automatic turn path.
    pub turn: Option<u32>,
    pub current_phase: Option<Faction>,
    /// Faction that opens every round.
    pub first_phase: Option<Faction>,
    pub active_combatant: Option<CombatantId>,
    pub ledger: TurnLedger,
    combatants: Vec<Combatant>,
}

impl Encounter {
    pub fn new(id: impl Into<EncounterId>) -> Self {
        Self {
            id: id.into(),
            status: EncounterStatus::NotStarted,
            round: 0,
            turn: None,
            current_phase: None,
            first_phase: None,
            active_combatant: None,
            ledger: TurnLedger::new(),
            combatants: Vec::new(),
        }
    }

    /// Adds a combatant joining the encounter.
    ///
    /// # Errors
    ///
    /// Rejects duplicate ids and combatants entitled to zero turns per round.
    pub fn add_combatant(&mut self, combatant: Combatant) -> Result<(), SetupError> {
        if combatant.total_turns_per_round == 0 {
            return Err(SetupError::InvalidTurnAllotment {
                combatant: combatant.id,
            });
        }
        if self.combatant(&combatant.id).is_some() {
            return Err(SetupError::DuplicateCombatant(combatant.id));
        }
        self.combatants.push(combatant);
        Ok(())
    }

    /// Removes a combatant leaving the encounter, ending its turn implicitly.
    pub fn remove_combatant(&mut self, id: &CombatantId) -> Option<Combatant> {
        let index = self.combatants.iter().position(|c| &c.id == id)?;
        if self.active_combatant.as_ref() == Some(id) {
            self.active_combatant = None;
        }
        Some(self.combatants.remove(index))
    }

    pub fn combatant(&self, id: &CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| &c.id == id)
    }

    pub fn combatant_mut(&mut self, id: &CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| &c.id == id)
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub(crate) fn combatants_mut(&mut self) -> impl Iterator<Item = &mut Combatant> {
        self.combatants.iter_mut()
    }

    /// Combatant currently mid-turn.
    pub fn active(&self) -> Option<&Combatant> {
        self.active_combatant
            .as_ref()
            .and_then(|id| self.combatant(id))
    }

    pub fn is_started(&self) -> bool {
        self.status == EncounterStatus::InProgress
    }

    pub fn sub_state(&self) -> Option<EncounterSubState<'_>> {
        if !self.is_started() {
            return None;
        }
        match self.active() {
            Some(active) => Some(EncounterSubState::TurnActive(active)),
            None => self.current_phase.map(EncounterSubState::PhaseOpen),
        }
    }

    /// Completed turns of the current round in chronological order.
    pub fn current_round_turns_taken(&self) -> &[CombatantId] {
        self.ledger.taken_in(self.round)
    }

    /// Turns `combatant` completed in the current round.
    pub fn turns_taken(&self, combatant: &CombatantId) -> u32 {
        self.ledger.count(self.round, combatant)
    }

    /// Turns `combatant` may still take in the current round.
    pub fn turns_left(&self, combatant: &Combatant) -> u32 {
        combatant
            .total_turns_per_round
            .saturating_sub(self.turns_taken(&combatant.id))
    }

    /// Returns true once the combatant used its whole allotment this round.
    pub fn is_exhausted(&self, combatant: &Combatant) -> bool {
        self.turns_left(combatant) == 0
    }

    /// Returns true if the combatant has a side, can act and has turns left.
    ///
    /// Status data is read on every call.
    pub fn can_take_turn(&self, combatant: &Combatant, status: &dyn StatusOracle) -> bool {
        combatant.has_faction()
            && !status.is_incapacitated(combatant)
            && self.turns_left(combatant) > 0
    }

    /// Sum of per-round turn allotments over every combatant.
    pub fn total_turns(&self) -> u32 {
        self.combatants
            .iter()
            .map(|c| c.total_turns_per_round)
            .sum()
    }

    /// Combatants sorted for display: allies, enemies, observers; then by name.
    ///
    /// This ordering has no bearing on who may act.
    pub fn display_order(&self) -> Vec<&Combatant> {
        let mut ordered: Vec<&Combatant> = self.combatants.iter().collect();
        ordered.sort_by(|a, b| {
            let rank = |c: &Combatant| c.faction.map_or(2, |f| f as u8);
            rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
        });
        ordered
    }

    /// Immutable copy of the participants for event payloads.
    pub fn snapshot(&self) -> Arc<[Combatant]> {
        self.combatants.clone().into()
    }

    /// Number of combatants flagged as mid-turn.
    pub fn active_turn_count(&self) -> usize {
        self.combatants.iter().filter(|c| c.is_active_turn).count()
    }
}
