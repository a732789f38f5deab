//! In-memory stand-in for the host's actor documents.
//!
//! [`ActorStore`] holds the resources condition handlers mutate (health,
//! aegis, bloodloss, active effects) and answers the status and duration
//! queries the phase engine makes through [`StatusOracle`] and
//! [`DurationProcessor`].

mod conditions;

pub use conditions::{ActiveEffect, Condition, Expiry};

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use encounter_core::{
    ActorId, Combatant, DurationPhase, DurationProcessor, ExpiredEffect, StatusOracle, UserId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by actor store operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("actor {0} does not exist")]
    UnknownActor(ActorId),

    #[error("{actor} cannot receive {condition}: {reason}")]
    Blocked {
        actor: ActorId,
        condition: &'static str,
        reason: &'static str,
    },
}

/// Persistent damage sources limited to once per turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    Bleeding,
    Burning,
    Poison,
}

/// One actor document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub id: ActorId,
    pub name: String,
    pub owner: Option<UserId>,
    pub health: u32,
    pub base_max_health: u32,
    /// Maximum health lost to burning this encounter.
    pub burning_health_reduction: u32,
    pub aegis: u32,
    /// Health lost to bleeding since the encounter started.
    pub bloodloss: u32,
    pub effects: Vec<ActiveEffect>,
    #[serde(default)]
    damaged_this_turn: HashSet<DamageSource>,
}

impl ActorRecord {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>, max_health: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: None,
            health: max_health,
            base_max_health: max_health,
            burning_health_reduction: 0,
            aegis: 0,
            bloodloss: 0,
            effects: Vec::new(),
            damaged_this_turn: HashSet::new(),
        }
    }

    #[must_use]
    pub fn owned_by(mut self, user: impl Into<UserId>) -> Self {
        self.owner = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_aegis(mut self, aegis: u32) -> Self {
        self.aegis = aegis;
        self
    }

    pub fn max_health(&self) -> u32 {
        self.base_max_health
            .saturating_sub(self.burning_health_reduction)
    }

    pub fn has(&self, condition: &Condition) -> bool {
        self.effects
            .iter()
            .any(|effect| effect.condition.same_kind(condition))
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> + '_ {
        self.effects.iter().map(|effect| &effect.condition)
    }

    pub fn is_incapacitated(&self) -> bool {
        self.conditions().any(Condition::is_incapacitating)
    }

    /// Highest bleeding stage among the actor's wounds.
    pub fn bleeding_stage(&self) -> Option<u8> {
        self.conditions()
            .filter_map(|condition| match condition {
                Condition::BleedingWound { stage } => Some(*stage),
                _ => None,
            })
            .max()
    }

    pub fn poison_stage(&self) -> Option<u8> {
        self.conditions()
            .filter_map(|condition| match condition {
                Condition::Poisoned { stage, .. } => Some(*stage),
                _ => None,
            })
            .max()
    }
}

/// Actor documents shared between the authority worker and the handlers.
#[derive(Debug, Default)]
pub struct ActorStore {
    actors: Mutex<HashMap<ActorId, ActorRecord>>,
    bloodloss_resets: Mutex<u32>,
}

impl ActorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ActorId, ActorRecord>> {
        self.actors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the actor's record.
    pub fn with_actor<R>(
        &self,
        actor: &ActorId,
        f: impl FnOnce(&mut ActorRecord) -> R,
    ) -> Result<R, StoreError> {
        let mut actors = self.lock();
        let record = actors
            .get_mut(actor)
            .ok_or_else(|| StoreError::UnknownActor(actor.clone()))?;
        Ok(f(record))
    }

    pub fn insert(&self, record: ActorRecord) {
        self.lock().insert(record.id.clone(), record);
    }

    pub fn get(&self, actor: &ActorId) -> Option<ActorRecord> {
        self.lock().get(actor).cloned()
    }

    pub fn owner(&self, actor: &ActorId) -> Option<UserId> {
        self.lock().get(actor).and_then(|record| record.owner.clone())
    }

    pub fn conditions(&self, actor: &ActorId) -> Vec<Condition> {
        self.lock()
            .get(actor)
            .map(|record| record.conditions().copied().collect())
            .unwrap_or_default()
    }

    /// Applies a condition, enforcing the protections between conditions.
    ///
    /// Aegis blocks bleeding wounds and poison, soaked actors cannot burn and
    /// getting soaked puts burning out.
    pub fn apply(&self, actor: &ActorId, effect: ActiveEffect) -> Result<(), StoreError> {
        let condition = effect.condition;
        let blocked = |reason| StoreError::Blocked {
            actor: actor.clone(),
            condition: condition.name(),
            reason,
        };

        self.with_actor(actor, |record| {
            match condition {
                Condition::BleedingWound { .. } | Condition::Poisoned { .. }
                    if record.aegis > 0 =>
                {
                    return Err(blocked("positive aegis"));
                }
                Condition::Burning if record.has(&Condition::Soaked) => {
                    return Err(blocked("soaked"));
                }
                Condition::Soaked => {
                    record
                        .effects
                        .retain(|e| e.condition != Condition::Burning);
                }
                _ => {}
            }
            if !record.has(&condition) || condition.is_staged() {
                record.effects.push(effect);
            }
            Ok(())
        })?
    }

    /// Removes every effect of the same kind as `condition`.
    pub fn remove(&self, actor: &ActorId, condition: &Condition) -> Result<bool, StoreError> {
        self.with_actor(actor, |record| {
            let before = record.effects.len();
            record.effects.retain(|e| !e.condition.same_kind(condition));
            record.effects.len() != before
        })
    }

    /// Deals damage, knocking the actor out at zero health.
    ///
    /// Returns the damage actually dealt.
    pub fn damage(&self, actor: &ActorId, amount: u32) -> Result<u32, StoreError> {
        self.with_actor(actor, |record| {
            let dealt = amount.min(record.health);
            record.health -= dealt;
            if record.health == 0 && !record.has(&Condition::Unconscious) {
                record
                    .effects
                    .push(ActiveEffect::permanent(Condition::Unconscious));
            }
            dealt
        })
    }

    /// Marks `source` as having dealt damage this turn.
    ///
    /// Returns false if it already had.
    pub fn mark_turn_damage(
        &self,
        actor: &ActorId,
        source: DamageSource,
    ) -> Result<bool, StoreError> {
        self.with_actor(actor, |record| record.damaged_this_turn.insert(source))
    }

    pub fn clear_turn_damage(&self, actor: &ActorId, source: DamageSource) {
        // Unknown actors carry no flags.
        let _ = self.with_actor(actor, |record| record.damaged_this_turn.remove(&source));
    }

    /// Resets the bloodloss of every listed actor.
    pub fn reset_bloodloss<'a>(&self, actors: impl IntoIterator<Item = &'a ActorId>) {
        let mut records = self.lock();
        for actor in actors {
            if let Some(record) = records.get_mut(actor) {
                record.bloodloss = 0;
            }
        }
        drop(records);
        *self
            .bloodloss_resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
    }

    /// How many times bloodloss was reset.
    pub fn bloodloss_resets(&self) -> u32 {
        *self
            .bloodloss_resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusOracle for ActorStore {
    fn is_incapacitated(&self, combatant: &Combatant) -> bool {
        combatant
            .actor
            .as_ref()
            .and_then(|actor| self.lock().get(actor).map(ActorRecord::is_incapacitated))
            .unwrap_or(false)
    }
}

impl DurationProcessor for ActorStore {
    fn process_durations(
        &self,
        combatant: &Combatant,
        phase: DurationPhase,
    ) -> Vec<ExpiredEffect> {
        let Some(actor) = &combatant.actor else {
            return Vec::new();
        };
        let mut actors = self.lock();
        let Some(record) = actors.get_mut(actor) else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        record.effects.retain_mut(|effect| {
            if effect.tick(phase) {
                expired.push(ExpiredEffect {
                    combatant: combatant.id.clone(),
                    label: effect.condition.label(),
                });
                false
            } else {
                true
            }
        });
        expired
    }
}
