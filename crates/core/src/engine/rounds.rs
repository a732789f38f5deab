use crate::env::DurationPhase;
use crate::error::{Ineligible, TurnError};
use crate::event::{CombatEventKind, TurnNotice};
use crate::faction::Faction;

use super::{PhaseEngine, TransitionOutcome};

/// Automatic turn advance and round rollover.
impl<'a> PhaseEngine<'a> {
    /// Faction that should act next.
    ///
    /// The most recent actor with a faction decides: play passes to the
    /// opposite faction only while it still has turns left, otherwise stays.
    /// With nobody having acted this round the first phase opens. Returns
    /// `None` outside of combat.
    pub fn determine_next_turn(&self) -> Option<Faction> {
        if !self.encounter.is_started() {
            return None;
        }

        let last = self
            .encounter
            .current_round_turns_taken()
            .iter()
            .rev()
            .filter_map(|id| self.encounter.combatant(id))
            .find_map(|c| c.faction);

        let Some(last) = last else {
            return self.encounter.first_phase;
        };
        let next = last.opposite();
        let next_has_turns = self.encounter.combatants().iter().any(|c| {
            c.is_in(next) && self.counts_for_phase(c) && !self.encounter.is_exhausted(c)
        });
        Some(if next_has_turns { next } else { last })
    }

    /// Advances the host turn pointer without an explicit start/end pair.
    ///
    /// Rolls the round over when nobody has turns left.
    ///
    /// # Errors
    ///
    /// [`Ineligible::TurnInProgress`] while a combatant is mid-turn.
    pub fn next_turn(&mut self) -> Result<TransitionOutcome, TurnError> {
        self.require_running("advance the turn")?;
        self.require_no_active_turn()?;

        let mut outcome = TransitionOutcome::new();
        if let Some(phase) = self.determine_next_turn() {
            self.encounter.current_phase = Some(phase);
        }
        self.pass_stalled_phase();

        let remaining = self
            .encounter
            .combatants()
            .iter()
            .any(|c| self.counts_for_phase(c) && self.can_take_turn(c));
        if !remaining {
            self.advance_round(&mut outcome);
        } else {
            let turn = u32::try_from(self.encounter.current_round_turns_taken().len())
                .unwrap_or(u32::MAX);
            self.encounter.turn = Some(turn);
            outcome.push_notice(TurnNotice::TurnAdvanced {
                round: self.encounter.round,
                turn,
                advance_time: self.settings.turn_time,
            });
        }
        outcome.push_notice(self.turn_changed());

        self.debug_check_invariants();
        Ok(outcome)
    }

    /// Concludes the current round and opens the next one.
    ///
    /// # Errors
    ///
    /// [`Ineligible::TurnInProgress`] while a combatant is mid-turn.
    pub fn next_round(&mut self) -> Result<TransitionOutcome, TurnError> {
        self.require_running("advance the round")?;
        self.require_no_active_turn()?;

        let mut outcome = TransitionOutcome::new();
        self.advance_round(&mut outcome);
        outcome.push_notice(self.turn_changed());

        self.debug_check_invariants();
        Ok(outcome)
    }

    /// Game-clock seconds elapsed by the round now ending.
    ///
    /// Unused turns are charged as if they had been taken.
    pub fn round_advance_time(&self) -> u32 {
        let consumed = u32::try_from(self.encounter.current_round_turns_taken().len())
            .unwrap_or(u32::MAX);
        self.encounter
            .total_turns()
            .saturating_sub(consumed)
            .saturating_mul(self.settings.turn_time)
            .saturating_add(self.settings.round_time)
    }

    pub(super) fn advance_round(&mut self, outcome: &mut TransitionOutcome) {
        for combatant in self.encounter.combatants() {
            self.process_durations(combatant, DurationPhase::RoundEnd, outcome);
        }

        let advance_time = self.round_advance_time();
        outcome.push_event(self.event(CombatEventKind::EndOfRound));

        self.encounter.round += 1;
        self.encounter.current_phase = self.encounter.first_phase;
        self.encounter.turn = Some(0);
        self.pass_stalled_phase();

        outcome.push_event(self.event(CombatEventKind::StartOfRound));
        outcome.push_notice(TurnNotice::RoundAdvanced {
            round: self.encounter.round,
            turn: self.encounter.turn,
            advance_time,
        });
    }

    fn require_no_active_turn(&self) -> Result<(), TurnError> {
        match &self.encounter.active_combatant {
            Some(active) => Err(Ineligible::TurnInProgress {
                active: active.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }
}
