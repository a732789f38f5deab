//! Condition handlers reacting to combat events.
//!
//! Handlers never touch encounter state. They read the event's combatant
//! snapshot and communicate side effects (damage, new conditions) through the
//! [`ActorStore`].
//!
//! Handlers that apply once-per-turn damage remember that in the store and
//! forget it on [`CombatEventKind::TurnDamageReset`], which fires exactly once
//! per completed turn.

mod bleeding;
mod bloodloss;
mod burning;
mod poison;
mod registry;

pub use bleeding::BleedingHandler;
pub use bloodloss::BloodlossResetHandler;
pub use burning::BurningHandler;
pub use poison::PoisonHandler;
pub use registry::HandlerRegistry;

use async_trait::async_trait;
use thiserror::Error;

use encounter_core::{CombatEvent, CombatEventKind};

use crate::store::{ActorStore, StoreError};

/// Defines the criticality level of a handler for error handling.
///
/// - Critical handlers stop the remaining handlers for that event
/// - Important handlers log errors but allow continuation
/// - Optional handlers can fail silently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerCriticality {
    Critical,
    Important,
    Optional,
}

impl HandlerCriticality {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Optional => "optional",
        }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Consumer of combat events.
#[async_trait]
pub trait ConditionHandler: Send + Sync {
    /// Returns a human-readable name for this handler (used in logging).
    fn name(&self) -> &'static str;

    fn criticality(&self) -> HandlerCriticality {
        HandlerCriticality::Important
    }

    /// Returns true if [`handle`](Self::handle) should see events of `kind`.
    fn interested_in(&self, kind: CombatEventKind) -> bool;

    async fn handle(&self, event: &CombatEvent, store: &ActorStore) -> Result<(), HandlerError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use encounter_core::{ActorId, CombatEvent, CombatEventKind, Combatant, Faction};

    use crate::store::{ActorRecord, ActorStore};

    pub(crate) fn wounded_store(health: u32) -> (ActorStore, ActorId) {
        let store = ActorStore::new();
        let actor = ActorId::from("hero");
        store.insert(ActorRecord::new(actor.clone(), "Hero", health));
        (store, actor)
    }

    /// Event about the hero's combatant, with the hero as the only
    /// participant.
    pub(crate) fn turn_event(kind: CombatEventKind) -> CombatEvent {
        let hero = Combatant::new("c-hero", "Hero", Faction::Allied).with_actor("hero");
        let event = CombatEvent::new(kind, 1, vec![hero.clone()].into());
        if kind.is_turn_scoped() {
            event.for_combatant(hero)
        } else {
            event
        }
    }
}
