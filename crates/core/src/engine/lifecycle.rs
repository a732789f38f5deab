use crate::error::{SetupError, TurnError};
use crate::event::CombatEventKind;
use crate::faction::Faction;
use crate::state::EncounterStatus;

use super::{PhaseEngine, TransitionOutcome};

/// Combat start/end and authority overrides of the phase fields.
impl<'a> PhaseEngine<'a> {
    /// Opens combat and waits for the first phase to be chosen.
    ///
    /// # Errors
    ///
    /// [`TurnError::InvalidTransition`] unless combat has not started yet;
    /// [`SetupError::NoCombatants`] for an empty roster.
    pub fn begin_combat(&mut self) -> Result<TransitionOutcome, TurnError> {
        if self.encounter.status != EncounterStatus::NotStarted {
            return Err(TurnError::invalid("start combat", self.encounter.status));
        }
        if self.encounter.combatants().is_empty() {
            return Err(SetupError::NoCombatants.into());
        }

        self.encounter.status = EncounterStatus::AwaitingFirstPhaseSelection;
        Ok(TransitionOutcome::new())
    }

    /// Applies the first-phase choice made after [`begin_combat`](Self::begin_combat).
    ///
    /// # Errors
    ///
    /// [`TurnError::MissingSelection`] when `choice` is `None`; the encounter
    /// returns to [`EncounterStatus::NotStarted`].
    pub fn select_first_phase(
        &mut self,
        choice: Option<Faction>,
    ) -> Result<TransitionOutcome, TurnError> {
        if self.encounter.status != EncounterStatus::AwaitingFirstPhaseSelection {
            return Err(TurnError::invalid(
                "select the first phase",
                self.encounter.status,
            ));
        }
        let Some(first) = choice else {
            self.encounter.status = EncounterStatus::NotStarted;
            return Err(TurnError::MissingSelection);
        };

        self.encounter.ledger.clear();
        self.encounter.round = 1;
        self.encounter.turn = Some(0);
        self.encounter.first_phase = Some(first);
        self.encounter.current_phase = Some(first);
        self.encounter.status = EncounterStatus::InProgress;
        self.pass_stalled_phase();

        let mut outcome = TransitionOutcome::new();
        outcome.push_event(self.event(CombatEventKind::StartOfCombat));
        outcome.push_notice(self.turn_changed());
        Ok(outcome)
    }

    /// Ends combat, telling consumers to drop per-encounter resources.
    ///
    /// # Errors
    ///
    /// [`TurnError::InvalidTransition`] unless combat is running, so a second
    /// call emits nothing.
    pub fn end_combat(&mut self) -> Result<TransitionOutcome, TurnError> {
        if self.encounter.status != EncounterStatus::InProgress {
            return Err(TurnError::invalid("end combat", self.encounter.status));
        }

        let mut outcome = TransitionOutcome::new();
        outcome.push_event(self.event(CombatEventKind::EndOfCombat));
        outcome.push_event(self.event(CombatEventKind::EncounterCleanup));

        self.encounter.ledger.clear();
        self.encounter.active_combatant = None;
        for combatant in self.encounter.combatants_mut() {
            combatant.is_active_turn = false;
        }
        self.encounter.current_phase = None;
        self.encounter.turn = None;
        self.encounter.status = EncounterStatus::Ended;
        outcome.push_notice(self.turn_changed());

        self.debug_check_invariants();
        Ok(outcome)
    }

    /// Opens `phase` directly, regardless of who has acted.
    pub fn override_phase(&mut self, phase: Faction) -> Result<TransitionOutcome, TurnError> {
        if self.encounter.status != EncounterStatus::InProgress {
            return Err(TurnError::invalid("change the phase", self.encounter.status));
        }
        self.encounter.current_phase = Some(phase);

        let mut outcome = TransitionOutcome::new();
        outcome.push_notice(self.turn_changed());
        Ok(outcome)
    }

    /// Changes which faction opens each following round.
    pub fn override_first_phase(
        &mut self,
        phase: Faction,
    ) -> Result<TransitionOutcome, TurnError> {
        if self.encounter.status != EncounterStatus::InProgress {
            return Err(TurnError::invalid(
                "change the first phase",
                self.encounter.status,
            ));
        }
        self.encounter.first_phase = Some(phase);

        let mut outcome = TransitionOutcome::new();
        outcome.push_notice(self.turn_changed());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EncounterSettings;
    use crate::env::EncounterEnv;
    use crate::error::{SetupError, TurnError};
    use crate::event::CombatEventKind;
    use crate::faction::Faction;
    use crate::state::{Combatant, CombatantId, Encounter, EncounterStatus};

    use super::PhaseEngine;

    fn roster() -> Encounter {
        let mut encounter = Encounter::new("enc");
        encounter
            .add_combatant(Combatant::new("a1", "Aria", Faction::Allied))
            .unwrap();
        encounter
            .add_combatant(Combatant::new("b1", "Goblin", Faction::Enemy))
            .unwrap();
        encounter
    }

    #[test]
    fn start_combat_sets_round_and_phases() {
        let settings = EncounterSettings::default();
        let mut encounter = roster();
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        engine.begin_combat().unwrap();
        let outcome = engine.select_first_phase(Some(Faction::Enemy)).unwrap();

        assert_eq!(outcome.event_kinds(), vec![CombatEventKind::StartOfCombat]);
        let encounter = engine.encounter();
        assert_eq!(encounter.status, EncounterStatus::InProgress);
        assert_eq!(encounter.round, 1);
        assert_eq!(encounter.first_phase, Some(Faction::Enemy));
        assert_eq!(encounter.current_phase, Some(Faction::Enemy));
    }

    #[test]
    fn cancelled_selection_returns_to_not_started() {
        let settings = EncounterSettings::default();
        let mut encounter = roster();
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        engine.begin_combat().unwrap();
        assert_eq!(
            engine.select_first_phase(None),
            Err(TurnError::MissingSelection)
        );
        assert_eq!(engine.encounter().status, EncounterStatus::NotStarted);
        assert_eq!(engine.encounter().round, 0);
        assert!(engine.begin_combat().is_ok());
    }

    #[test]
    fn starting_twice_is_an_invalid_transition() {
        let settings = EncounterSettings::default();
        let mut encounter = roster();
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        engine.begin_combat().unwrap();
        engine.select_first_phase(Some(Faction::Allied)).unwrap();
        assert!(matches!(
            engine.begin_combat(),
            Err(TurnError::InvalidTransition {
                status: EncounterStatus::InProgress,
                ..
            })
        ));
    }

    #[test]
    fn empty_roster_is_a_setup_error() {
        let settings = EncounterSettings::default();
        let mut encounter = Encounter::new("empty");
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());
        let err = engine.begin_combat().unwrap_err();
        assert_eq!(err, TurnError::Setup(SetupError::NoCombatants));
        assert!(err.severity().is_internal());
    }

    #[test]
    fn end_combat_cleans_up_exactly_once() {
        let settings = EncounterSettings::default();
        let mut encounter = roster();
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());
        engine.begin_combat().unwrap();
        engine.select_first_phase(Some(Faction::Allied)).unwrap();
        engine.start_turn(&CombatantId::from("a1")).unwrap();

        let outcome = engine.end_combat().unwrap();
        assert_eq!(
            outcome.event_kinds(),
            vec![CombatEventKind::EndOfCombat, CombatEventKind::EncounterCleanup]
        );
        assert_eq!(engine.encounter().status, EncounterStatus::Ended);
        assert_eq!(engine.encounter().active_turn_count(), 0);
        assert!(engine.encounter().ledger.is_empty());

        assert!(matches!(
            engine.end_combat(),
            Err(TurnError::InvalidTransition {
                status: EncounterStatus::Ended,
                ..
            })
        ));
    }

    #[test]
    fn overrides_require_running_combat() {
        let settings = EncounterSettings::default();
        let mut encounter = roster();
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());
        assert!(engine.override_phase(Faction::Enemy).is_err());

        engine.begin_combat().unwrap();
        engine.select_first_phase(Some(Faction::Allied)).unwrap();
        engine.override_phase(Faction::Enemy).unwrap();
        engine.override_first_phase(Faction::Enemy).unwrap();
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
        assert_eq!(engine.encounter().first_phase, Some(Faction::Enemy));
    }
}
