//! Turn state exposed to roll evaluation.
//!
//! Dice are rolled by the host. What it needs from here is a read-only view
//! of where the roller stands in the encounter, and a place to park rolls
//! that wait for the player's confirmation. The authority worker owns the
//! only [`PendingRolls`]; hosts reach it through
//! [`EncounterHandle::begin_roll`](crate::EncounterHandle::begin_roll).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use encounter_core::{ActorId, Combatant, Encounter, Faction, StatusOracle, TurnError};

use crate::store::{ActorStore, Condition};

/// Flat adjustment the host adds to a roll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollModifier {
    pub source: String,
    pub value: i32,
}

/// Conditions that make a roll wait for the player to confirm it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationReason {
    Blinded,
    Confused,
}

/// Encounter state queried when a combatant rolls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollContext {
    pub actor: Option<ActorId>,
    pub round: u32,
    pub current_phase: Option<Faction>,
    pub is_active_turn: bool,
    pub turns_left: u32,
    pub conditions: Vec<Condition>,
    pub modifiers: Vec<RollModifier>,
    pub confirmation: Option<ConfirmationReason>,
}

impl RollContext {
    pub const POISON_PENALTY: i32 = -1;

    pub fn build(encounter: &Encounter, combatant: &Combatant, store: &ActorStore) -> Self {
        let conditions = combatant
            .actor
            .as_ref()
            .map(|actor| store.conditions(actor))
            .unwrap_or_default();

        let mut modifiers = Vec::new();
        if conditions
            .iter()
            .any(|c| matches!(c, Condition::Poisoned { .. }))
        {
            modifiers.push(RollModifier {
                source: "poison".into(),
                value: Self::POISON_PENALTY,
            });
        }

        let confirmation = conditions.iter().find_map(|c| match c {
            Condition::Blinded => Some(ConfirmationReason::Blinded),
            Condition::Confused => Some(ConfirmationReason::Confused),
            _ => None,
        });

        Self {
            actor: combatant.actor.clone(),
            round: encounter.round,
            current_phase: encounter
                .current_phase
                .filter(|_| encounter.is_started()),
            is_active_turn: encounter.active_combatant.as_ref() == Some(&combatant.id),
            turns_left: if encounter.can_take_turn(combatant, store as &dyn StatusOracle) {
                encounter.turns_left(combatant)
            } else {
                0
            },
            conditions,
            modifiers,
            confirmation,
        }
    }

    pub fn penalty(&self) -> i32 {
        self.modifiers.iter().map(|m| m.value).sum()
    }
}

/// Why a roll could not be opened or answered.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RollError {
    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error("{0} already has a roll waiting for confirmation")]
    AlreadyPending(ActorId),
}

/// What a roller gets back when a roll begins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollTicket {
    pub context: RollContext,
    /// Set when the roll waits for confirmation; answer with this id.
    pub pending: Option<CorrelationId>,
}

/// Identifies one pending confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(pub u64);

#[derive(Debug)]
struct PendingRoll {
    id: CorrelationId,
    reason: ConfirmationReason,
}

/// Rolls waiting for a player's confirmation, at most one per actor.
#[derive(Debug, Default)]
pub struct PendingRolls {
    next_id: AtomicU64,
    slots: Mutex<HashMap<ActorId, PendingRoll>>,
}

impl PendingRolls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a confirmation slot for `actor`.
    ///
    /// Returns `None` while the actor already has one open.
    pub fn begin(&self, actor: &ActorId, reason: ConfirmationReason) -> Option<CorrelationId> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.contains_key(actor) {
            return None;
        }
        let id = CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        slots.insert(actor.clone(), PendingRoll { id, reason });
        Some(id)
    }

    /// Closes the slot if `id` is the one currently open for `actor`.
    pub fn resolve(&self, actor: &ActorId, id: CorrelationId) -> Option<ConfirmationReason> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(actor) {
            Some(pending) if pending.id == id => slots.remove(actor).map(|p| p.reason),
            _ => None,
        }
    }

    pub fn cancel(&self, actor: &ActorId) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(actor)
            .is_some()
    }

    /// Drops every open slot, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let open = slots.len();
        slots.clear();
        open
    }

    pub fn is_pending(&self, actor: &ActorId) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ActiveEffect, ActorRecord};

    #[test]
    fn poisoned_and_blinded_rolls() {
        let store = ActorStore::new();
        store.insert(ActorRecord::new("hero", "Hero", 10));
        let hero = ActorId::from("hero");
        store
            .apply(&hero, ActiveEffect::permanent(Condition::poisoned(1)))
            .unwrap();
        store
            .apply(&hero, ActiveEffect::permanent(Condition::Blinded))
            .unwrap();

        let mut encounter = Encounter::new("enc");
        let combatant = Combatant::new("c-hero", "Hero", Faction::Allied).with_actor("hero");
        encounter.add_combatant(combatant.clone()).unwrap();

        let context = RollContext::build(&encounter, &combatant, &store);
        assert_eq!(context.penalty(), -1);
        assert_eq!(context.confirmation, Some(ConfirmationReason::Blinded));
        assert_eq!(context.current_phase, None);
        assert_eq!(context.turns_left, 1);
        assert!(!context.is_active_turn);
    }

    #[test]
    fn one_pending_roll_per_actor() {
        let pending = PendingRolls::new();
        let hero = ActorId::from("hero");
        let other = ActorId::from("other");

        let first = pending.begin(&hero, ConfirmationReason::Confused).unwrap();
        assert!(pending.begin(&hero, ConfirmationReason::Blinded).is_none());
        assert!(pending.begin(&other, ConfirmationReason::Blinded).is_some());

        assert_eq!(pending.resolve(&hero, CorrelationId(first.0 + 100)), None);
        assert_eq!(
            pending.resolve(&hero, first),
            Some(ConfirmationReason::Confused)
        );
        assert!(!pending.is_pending(&hero));
        assert!(pending.cancel(&other));
        assert!(!pending.cancel(&other));
    }

    #[test]
    fn clearing_closes_every_slot() {
        let pending = PendingRolls::new();
        let hero = ActorId::from("hero");
        let stale = pending.begin(&hero, ConfirmationReason::Blinded).unwrap();
        pending.begin(&ActorId::from("other"), ConfirmationReason::Confused);

        assert_eq!(pending.clear(), 2);
        assert_eq!(pending.resolve(&hero, stale), None);
        assert!(pending.begin(&hero, ConfirmationReason::Blinded).is_some());
    }
}
