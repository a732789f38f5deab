//! Faction-phase turn state machine.
//!
//! [`PhaseEngine`] is the only code that mutates [`Encounter`] turn state. It
//! borrows the encounter for the duration of one transition, checks every
//! precondition, applies the change and reports what happened as a
//! [`TransitionOutcome`]. It never performs I/O; publishing the outcome is the
//! caller's job.

mod lifecycle;
mod rounds;
mod turns;

use crate::config::EncounterSettings;
use crate::env::{DurationPhase, EncounterEnv, ExpiredEffect};
use crate::error::{SetupError, TurnError};
use crate::event::{CombatEvent, CombatEventKind, TurnNotice};
use crate::faction::Faction;
use crate::state::{Combatant, Encounter, EncounterStatus};

/// Everything a successful transition produced, in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionOutcome {
    pub events: Vec<CombatEvent>,
    /// Requests to the host and its observers.
    pub notices: Vec<TurnNotice>,
    /// Effects that ran out during duration processing.
    pub expired: Vec<ExpiredEffect>,
}

impl TransitionOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.notices.is_empty() && self.expired.is_empty()
    }

    /// Returns true if an event of the given kind was emitted.
    pub fn emitted(&self, kind: CombatEventKind) -> bool {
        self.events.iter().any(|event| event.kind == kind)
    }

    pub fn event_kinds(&self) -> Vec<CombatEventKind> {
        self.events.iter().map(|event| event.kind).collect()
    }

    fn push_event(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    fn push_notice(&mut self, notice: TurnNotice) {
        self.notices.push(notice);
    }
}

/// Drives one [`Encounter`] through its lifecycle.
pub struct PhaseEngine<'a> {
    encounter: &'a mut Encounter,
    settings: &'a EncounterSettings,
    env: EncounterEnv<'a>,
}

impl<'a> PhaseEngine<'a> {
    pub fn new(
        encounter: &'a mut Encounter,
        settings: &'a EncounterSettings,
        env: EncounterEnv<'a>,
    ) -> Self {
        Self {
            encounter,
            settings,
            env,
        }
    }

    pub fn encounter(&self) -> &Encounter {
        self.encounter
    }

    pub fn settings(&self) -> &EncounterSettings {
        self.settings
    }

    /// Phase currently open for action, if combat is running.
    pub fn current_phase(&self) -> Option<Faction> {
        if self.encounter.is_started() {
            self.encounter.current_phase
        } else {
            None
        }
    }

    /// Event stamped with the current round and a fresh roster snapshot.
    fn event(&self, kind: CombatEventKind) -> CombatEvent {
        CombatEvent::new(kind, self.encounter.round, self.encounter.snapshot())
    }

    fn turn_event(&self, kind: CombatEventKind, combatant: &Combatant) -> CombatEvent {
        self.event(kind).for_combatant(combatant.clone())
    }

    fn turn_changed(&self) -> TurnNotice {
        TurnNotice::TurnChanged {
            round: self.encounter.round,
            current_phase: self.encounter.current_phase,
            active: self.encounter.active_combatant.clone(),
        }
    }

    fn process_durations(
        &self,
        combatant: &Combatant,
        phase: DurationPhase,
        outcome: &mut TransitionOutcome,
    ) {
        let expired = self.env.durations().process_durations(combatant, phase);
        outcome.expired.extend(expired);
    }

    /// Fails unless combat is running with both phases set.
    ///
    /// Returns the phase currently open.
    fn require_running(&self, operation: &'static str) -> Result<Faction, TurnError> {
        if self.encounter.status != EncounterStatus::InProgress {
            return Err(TurnError::invalid(operation, self.encounter.status));
        }
        if self.encounter.combatants().is_empty() {
            return Err(SetupError::NoCombatants.into());
        }
        if self.encounter.first_phase.is_none() {
            return Err(SetupError::PhaseUnset("first").into());
        }
        self.encounter
            .current_phase
            .ok_or_else(|| SetupError::PhaseUnset("current").into())
    }

    fn debug_check_invariants(&self) {
        debug_assert!(
            self.encounter.active_turn_count() <= 1,
            "more than one combatant is mid-turn"
        );
        debug_assert_eq!(
            self.encounter
                .combatants()
                .iter()
                .find(|c| c.is_active_turn)
                .map(|c| &c.id),
            self.encounter.active_combatant.as_ref(),
            "active flag disagrees with the active slot"
        );
    }
}
