use crate::env::DurationPhase;
use crate::error::{Ineligible, TurnError};
use crate::event::CombatEventKind;
use crate::faction::Faction;
use crate::state::{Combatant, CombatantId, EncounterStatus};

use super::{PhaseEngine, TransitionOutcome};

/// Manual turn start/end and the eligibility queries behind them.
impl<'a> PhaseEngine<'a> {
    /// Returns true if the combatant could start a turn were its phase open.
    pub fn can_take_turn(&self, combatant: &Combatant) -> bool {
        self.encounter.can_take_turn(combatant, self.env.status())
    }

    /// Returns true if the combatant takes part in hand-off and round
    /// completion under the current settings.
    pub(super) fn counts_for_phase(&self, combatant: &Combatant) -> bool {
        combatant.has_faction() && !(self.settings.skip_defeated && combatant.is_defeated)
    }

    /// Returns true once every member of `faction` that counts this round
    /// is exhausted or unable to act.
    pub fn faction_done(&self, faction: Faction) -> bool {
        self.encounter
            .combatants()
            .iter()
            .filter(|c| c.is_in(faction) && self.counts_for_phase(c))
            .all(|c| {
                self.encounter.is_exhausted(c) || self.env.status().is_incapacitated(c)
            })
    }

    /// Returns true once every combatant able to act has used all its turns.
    pub fn round_complete(&self) -> bool {
        self.encounter
            .combatants()
            .iter()
            .filter(|c| self.counts_for_phase(c) && !self.env.status().is_incapacitated(c))
            .all(|c| self.encounter.is_exhausted(c))
    }

    /// Hands an open phase that nobody in it can use to the other faction,
    /// provided someone there still can.
    pub(super) fn pass_stalled_phase(&mut self) {
        if self.encounter.active_combatant.is_some() {
            return;
        }
        let Some(phase) = self.encounter.current_phase else {
            return;
        };
        if self.faction_done(phase) && !self.faction_done(phase.opposite()) {
            self.encounter.current_phase = Some(phase.opposite());
        }
    }

    /// Re-evaluates the open phase after something outside a turn changed
    /// who can act: a combatant left, was defeated or became incapacitated.
    ///
    /// Rolls the round over once everyone able to act is spent, otherwise
    /// hands a stalled phase over. Outside of a running encounter or while a
    /// turn is active nothing changes.
    pub fn recheck_phase(&mut self) -> Result<TransitionOutcome, TurnError> {
        let mut outcome = TransitionOutcome::new();
        if self.encounter.status != EncounterStatus::InProgress
            || self.encounter.active_combatant.is_some()
        {
            return Ok(outcome);
        }

        let before = (self.encounter.round, self.encounter.current_phase);
        // An untouched round that nobody can act in would roll over forever.
        if !self.encounter.current_round_turns_taken().is_empty() && self.round_complete() {
            self.advance_round(&mut outcome);
        } else {
            self.pass_stalled_phase();
        }
        if before != (self.encounter.round, self.encounter.current_phase) {
            outcome.push_notice(self.turn_changed());
        }

        self.debug_check_invariants();
        Ok(outcome)
    }

    /// Opens a turn for `id`.
    ///
    /// # Errors
    ///
    /// [`TurnError::Ineligible`] when another turn is running, the combatant is
    /// unknown, its phase is not open or it cannot act. No state changes.
    pub fn start_turn(&mut self, id: &CombatantId) -> Result<TransitionOutcome, TurnError> {
        let phase = self.require_running("start a turn")?;

        if let Some(active) = &self.encounter.active_combatant {
            return Err(Ineligible::TurnInProgress {
                active: active.clone(),
            }
            .into());
        }
        let combatant = self
            .encounter
            .combatant(id)
            .ok_or_else(|| Ineligible::UnknownCombatant(id.clone()))?;
        if combatant.faction != Some(phase) {
            return Err(Ineligible::NotThisPhase {
                faction: combatant.faction,
            }
            .into());
        }
        if !self.can_take_turn(combatant) {
            return Err(Ineligible::CannotTakeTurn {
                name: combatant.name.clone(),
            }
            .into());
        }

        let mut outcome = TransitionOutcome::new();
        self.encounter.active_combatant = Some(id.clone());
        let started = match self.encounter.combatant_mut(id) {
            Some(combatant) => {
                combatant.is_active_turn = true;
                combatant.clone()
            }
            None => return Err(Ineligible::UnknownCombatant(id.clone()).into()),
        };

        self.process_durations(&started, DurationPhase::TurnStart, &mut outcome);
        outcome.push_event(self.turn_event(CombatEventKind::StartOfTurn, &started));
        outcome.push_notice(self.turn_changed());

        self.debug_check_invariants();
        Ok(outcome)
    }

    /// Closes the running turn of `id`, handing the phase over and rolling
    /// the round when appropriate.
    ///
    /// # Errors
    ///
    /// [`Ineligible::NotActive`] unless `id` is the active combatant. A
    /// replayed end for a turn that already ended lands here, so it records
    /// nothing and emits nothing.
    pub fn end_turn(&mut self, id: &CombatantId) -> Result<TransitionOutcome, TurnError> {
        let phase = self.require_running("end a turn")?;

        let combatant = self
            .encounter
            .combatant(id)
            .ok_or_else(|| Ineligible::UnknownCombatant(id.clone()))?
            .clone();
        if self.encounter.active_combatant.as_ref() != Some(id) {
            return Err(Ineligible::NotActive {
                combatant: id.clone(),
            }
            .into());
        }

        let mut outcome = TransitionOutcome::new();
        outcome.push_event(self.turn_event(CombatEventKind::TurnDamageReset, &combatant));
        self.process_durations(&combatant, DurationPhase::TurnEnd, &mut outcome);

        let round = self.encounter.round;
        self.encounter.ledger.record(round, id.clone());
        self.encounter.active_combatant = None;
        let ended = match self.encounter.combatant_mut(id) {
            Some(combatant) => {
                combatant.is_active_turn = false;
                combatant.clone()
            }
            None => combatant,
        };
        outcome.push_event(self.turn_event(CombatEventKind::EndOfTurn, &ended));

        if self.faction_done(phase) {
            self.encounter.current_phase = Some(phase.opposite());
        }
        if self.round_complete() {
            self.advance_round(&mut outcome);
        }
        outcome.push_notice(self.turn_changed());

        self.debug_check_invariants();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EncounterSettings;
    use crate::engine::test_support::{DurationLog, Stunned};
    use crate::env::{DurationPhase, EncounterEnv, NoDurations};
    use crate::error::{Ineligible, TurnError};
    use crate::event::CombatEventKind;
    use crate::faction::Faction;
    use crate::state::{Combatant, CombatantId, Encounter};

    use super::PhaseEngine;

    fn id(raw: &str) -> CombatantId {
        CombatantId::from(raw)
    }

    fn encounter(combatants: Vec<Combatant>) -> Encounter {
        let mut encounter = Encounter::new("enc");
        for combatant in combatants {
            encounter.add_combatant(combatant).unwrap();
        }
        encounter
    }

    fn started(combatants: Vec<Combatant>, settings: &EncounterSettings) -> Encounter {
        let mut encounter = encounter(combatants);
        let mut engine = PhaseEngine::new(&mut encounter, settings, EncounterEnv::empty());
        engine.begin_combat().unwrap();
        engine.select_first_phase(Some(Faction::Allied)).unwrap();
        encounter
    }

    fn party() -> Vec<Combatant> {
        vec![
            Combatant::new("a1", "Aria", Faction::Allied),
            Combatant::new("a2", "Bram", Faction::Allied),
            Combatant::new("b1", "Goblin", Faction::Enemy),
        ]
    }

    fn take_turn(engine: &mut PhaseEngine<'_>, raw: &str) {
        engine.start_turn(&id(raw)).unwrap();
        engine.end_turn(&id(raw)).unwrap();
    }

    #[test]
    fn hand_off_and_round_rollover() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        take_turn(&mut engine, "a1");
        assert_eq!(engine.current_phase(), Some(Faction::Allied));
        take_turn(&mut engine, "a2");
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));

        engine.start_turn(&id("b1")).unwrap();
        let outcome = engine.end_turn(&id("b1")).unwrap();
        assert_eq!(
            outcome.event_kinds(),
            vec![
                CombatEventKind::TurnDamageReset,
                CombatEventKind::EndOfTurn,
                CombatEventKind::EndOfRound,
                CombatEventKind::StartOfRound,
            ]
        );
        assert_eq!(engine.encounter().round, 2);
        assert_eq!(engine.current_phase(), Some(Faction::Allied));
    }

    #[test]
    fn wrong_phase_and_double_start_are_warnings() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let before = encounter.clone();
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        let err = engine.start_turn(&id("b1")).unwrap_err();
        assert_eq!(
            err,
            TurnError::Ineligible(Ineligible::NotThisPhase {
                faction: Some(Faction::Enemy)
            })
        );
        assert!(err.is_warning());
        assert_eq!(engine.encounter(), &before);

        engine.start_turn(&id("a1")).unwrap();
        assert!(matches!(
            engine.start_turn(&id("a2")),
            Err(TurnError::Ineligible(Ineligible::TurnInProgress { .. }))
        ));
        assert_eq!(engine.encounter().active_turn_count(), 1);
    }

    #[test]
    fn only_one_combatant_is_ever_active() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        for raw in ["a1", "a2", "a1", "b1", "a2", "b1", "a1", "a2", "b1"] {
            let _ = engine.start_turn(&id(raw));
            assert!(engine.encounter().active_turn_count() <= 1);
            let _ = engine.end_turn(&id(raw));
            assert_eq!(engine.encounter().active_turn_count(), 0);
        }
    }

    #[test]
    fn multi_turn_combatant_acts_twice_before_hand_off() {
        let settings = EncounterSettings::default();
        let mut encounter = started(
            vec![
                Combatant::new("ogre", "Ogre", Faction::Allied).with_turns(2),
                Combatant::new("imp", "Imp", Faction::Enemy),
            ],
            &settings,
        );
        let durations = DurationLog::default();
        let env = EncounterEnv::new(&crate::env::NoStatus, &durations);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, env);

        take_turn(&mut engine, "ogre");
        assert_eq!(engine.current_phase(), Some(Faction::Allied));
        let ogre = engine.encounter().combatant(&id("ogre")).unwrap().clone();
        assert!(engine.can_take_turn(&ogre));

        take_turn(&mut engine, "ogre");
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
        let ogre = engine.encounter().combatant(&id("ogre")).unwrap().clone();
        assert!(!engine.can_take_turn(&ogre));
        assert!(matches!(
            engine.start_turn(&id("ogre")),
            Err(TurnError::Ineligible(Ineligible::NotThisPhase { .. }))
        ));

        // each turn of the round counts as its own start
        assert_eq!(
            durations.calls(DurationPhase::TurnStart),
            vec![id("ogre"), id("ogre")]
        );
    }

    #[test]
    fn skip_defeated_excludes_the_fallen() {
        let settings = EncounterSettings::default().with_skip_defeated(true);
        let mut encounter = started(
            vec![
                Combatant::new("a1", "Aria", Faction::Allied),
                Combatant::new("a2", "Bram", Faction::Allied).defeated(),
                Combatant::new("b1", "Goblin", Faction::Enemy),
                Combatant::new("b2", "Orc", Faction::Enemy).defeated(),
            ],
            &settings,
        );
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        take_turn(&mut engine, "a1");
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
        take_turn(&mut engine, "b1");
        assert_eq!(engine.encounter().round, 2);
    }

    #[test]
    fn defeated_still_count_without_skip() {
        let settings = EncounterSettings::default();
        let mut encounter = started(
            vec![
                Combatant::new("a1", "Aria", Faction::Allied),
                Combatant::new("a2", "Bram", Faction::Allied).defeated(),
                Combatant::new("b1", "Goblin", Faction::Enemy),
            ],
            &settings,
        );
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        take_turn(&mut engine, "a1");
        assert_eq!(engine.current_phase(), Some(Faction::Allied));
    }

    #[test]
    fn incapacitation_is_read_on_every_check() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let status = Stunned::default();
        let env = EncounterEnv::new(&status, &NoDurations);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, env);

        take_turn(&mut engine, "a1");
        status.stun("a2");
        assert_eq!(
            engine.start_turn(&id("a2")),
            Err(TurnError::Ineligible(Ineligible::CannotTakeTurn {
                name: "Bram".into()
            }))
        );
    }

    #[test]
    fn stunned_faction_member_hands_off_early() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let status = Stunned::default();
        status.stun("a2");
        let env = EncounterEnv::new(&status, &NoDurations);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, env);

        take_turn(&mut engine, "a1");
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
        take_turn(&mut engine, "b1");
        assert_eq!(engine.encounter().round, 2);
    }

    #[test]
    fn first_phase_nobody_can_use_is_handed_over() {
        let settings = EncounterSettings::default();
        let mut encounter = encounter(vec![
            Combatant::new("a1", "Aria", Faction::Allied),
            Combatant::new("b1", "Goblin", Faction::Enemy),
        ]);
        let status = Stunned::default();
        status.stun("a1");
        let env = EncounterEnv::new(&status, &NoDurations);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, env);

        engine.begin_combat().unwrap();
        engine.select_first_phase(Some(Faction::Allied)).unwrap();
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
        assert_eq!(engine.encounter().first_phase, Some(Faction::Allied));
        engine.start_turn(&id("b1")).unwrap();
    }

    #[test]
    fn new_round_skips_a_phase_nobody_can_use() {
        let settings = EncounterSettings::default();
        let mut encounter = started(
            vec![
                Combatant::new("a1", "Aria", Faction::Allied),
                Combatant::new("b1", "Goblin", Faction::Enemy),
            ],
            &settings,
        );
        let status = Stunned::default();
        let env = EncounterEnv::new(&status, &NoDurations);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, env);

        take_turn(&mut engine, "a1");
        engine.start_turn(&id("b1")).unwrap();
        status.stun("a1");
        engine.end_turn(&id("b1")).unwrap();

        assert_eq!(engine.encounter().round, 2);
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
    }

    #[test]
    fn next_turn_moves_past_an_incapacitated_phase() {
        let settings = EncounterSettings::default();
        let mut encounter = started(
            vec![
                Combatant::new("a1", "Aria", Faction::Allied),
                Combatant::new("b1", "Goblin", Faction::Enemy),
            ],
            &settings,
        );
        let status = Stunned::default();
        let env = EncounterEnv::new(&status, &NoDurations);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, env);

        status.stun("a1");
        engine.next_turn().unwrap();
        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
        assert_eq!(engine.encounter().round, 1);
        engine.start_turn(&id("b1")).unwrap();
    }

    #[test]
    fn recheck_hands_off_when_the_last_actor_leaves() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        take_turn(&mut engine, "a1");
        engine.encounter.remove_combatant(&id("a2"));
        let outcome = engine.recheck_phase().unwrap();

        assert_eq!(engine.current_phase(), Some(Faction::Enemy));
        assert_eq!(outcome.notices.len(), 1);
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn recheck_rolls_the_round_when_the_active_combatant_leaves() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        take_turn(&mut engine, "a1");
        take_turn(&mut engine, "a2");
        engine.start_turn(&id("b1")).unwrap();
        engine.encounter.remove_combatant(&id("b1"));
        let outcome = engine.recheck_phase().unwrap();

        assert_eq!(
            outcome.event_kinds(),
            vec![CombatEventKind::EndOfRound, CombatEventKind::StartOfRound]
        );
        assert_eq!(engine.encounter().round, 2);
        assert_eq!(engine.current_phase(), Some(Faction::Allied));
    }

    #[test]
    fn recheck_leaves_a_playable_phase_alone() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        take_turn(&mut engine, "a1");
        assert!(engine.recheck_phase().unwrap().is_empty());
        assert_eq!(engine.current_phase(), Some(Faction::Allied));
    }

    #[test]
    fn end_turn_is_not_replayable() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        take_turn(&mut engine, "a1");
        assert_eq!(
            engine.end_turn(&id("a1")),
            Err(TurnError::Ineligible(Ineligible::NotActive {
                combatant: id("a1")
            }))
        );
        assert_eq!(engine.encounter().current_round_turns_taken(), &[id("a1")]);
    }

    #[test]
    fn end_turn_processes_durations_before_recording() {
        let settings = EncounterSettings::default();
        let mut encounter = started(party(), &settings);
        let durations = DurationLog::default();
        let env = EncounterEnv::new(&crate::env::NoStatus, &durations);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, env);

        engine.start_turn(&id("a1")).unwrap();
        let outcome = engine.end_turn(&id("a1")).unwrap();
        assert_eq!(durations.calls(DurationPhase::TurnEnd), vec![id("a1")]);

        let reset = &outcome.events[0];
        assert_eq!(reset.kind, CombatEventKind::TurnDamageReset);
        assert!(reset.combatant.as_ref().unwrap().is_active_turn);
        let end = &outcome.events[1];
        assert!(!end.combatant.as_ref().unwrap().is_active_turn);
    }

    #[test]
    fn observers_never_act() {
        let settings = EncounterSettings::default();
        let mut combatants = party();
        combatants.push(Combatant::observer("owl", "Owl"));
        let mut encounter = started(combatants, &settings);
        let mut engine = PhaseEngine::new(&mut encounter, &settings, EncounterEnv::empty());

        assert_eq!(
            engine.start_turn(&id("owl")),
            Err(TurnError::Ineligible(Ineligible::NotThisPhase { faction: None }))
        );
        take_turn(&mut engine, "a1");
        take_turn(&mut engine, "a2");
        take_turn(&mut engine, "b1");
        assert_eq!(engine.encounter().round, 2);
    }
}
