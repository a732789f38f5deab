//! Traits describing the host data the engine consults but does not own.
//!
//! The [`EncounterEnv`] aggregate bundles them so the engine can read status
//! data and trigger duration bookkeeping without coupling to a concrete
//! document store.

use crate::state::Combatant;

/// Point in the turn cycle at which effect durations are processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DurationPhase {
    TurnStart,
    TurnEnd,
    RoundEnd,
}

/// An effect that ran out while durations were processed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpiredEffect {
    pub combatant: crate::state::CombatantId,
    pub label: String,
}

/// Read access to the host's live status data.
///
/// Consulted on every eligibility check, so effects applied by the host
/// (a stun, unconsciousness) are observed immediately.
pub trait StatusOracle {
    /// Returns true if the combatant cannot act at all right now.
    fn is_incapacitated(&self, combatant: &Combatant) -> bool;
}

/// Decrements round- and turn-scoped effect counters.
///
/// Implementations report which effects expired so the caller can surface
/// them for confirmation.
pub trait DurationProcessor {
    fn process_durations(&self, combatant: &Combatant, phase: DurationPhase)
    -> Vec<ExpiredEffect>;
}

/// Status oracle for hosts without incapacitating effects.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStatus;

impl StatusOracle for NoStatus {
    fn is_incapacitated(&self, _combatant: &Combatant) -> bool {
        false
    }
}

/// Duration processor that never expires anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDurations;

impl DurationProcessor for NoDurations {
    fn process_durations(
        &self,
        _combatant: &Combatant,
        _phase: DurationPhase,
    ) -> Vec<ExpiredEffect> {
        Vec::new()
    }
}

/// Aggregates the collaborators required by the phase engine.
#[derive(Clone, Copy)]
pub struct EncounterEnv<'a> {
    status: &'a dyn StatusOracle,
    durations: &'a dyn DurationProcessor,
}

impl<'a> EncounterEnv<'a> {
    pub fn new(status: &'a dyn StatusOracle, durations: &'a dyn DurationProcessor) -> Self {
        Self { status, durations }
    }

    /// Environment whose collaborators never incapacitate or expire anything.
    pub fn empty() -> EncounterEnv<'static> {
        EncounterEnv {
            status: &NoStatus,
            durations: &NoDurations,
        }
    }

    pub fn status(&self) -> &'a dyn StatusOracle {
        self.status
    }

    pub fn durations(&self) -> &'a dyn DurationProcessor {
        self.durations
    }
}

impl core::fmt::Debug for EncounterEnv<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EncounterEnv").finish_non_exhaustive()
    }
}
