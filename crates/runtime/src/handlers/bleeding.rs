use async_trait::async_trait;
use tracing::info;

use encounter_core::{CombatEvent, CombatEventKind};

use super::{ConditionHandler, HandlerError};
use crate::store::{ActorStore, DamageSource};

/// Bleeding wounds hurt at the start of every turn.
///
/// The highest stage among the actor's wounds is dealt as damage, at most
/// once per turn, and adds to the actor's bloodloss.
pub struct BleedingHandler;

#[async_trait]
impl ConditionHandler for BleedingHandler {
    fn name(&self) -> &'static str {
        "bleeding"
    }

    fn interested_in(&self, kind: CombatEventKind) -> bool {
        matches!(
            kind,
            CombatEventKind::StartOfTurn | CombatEventKind::TurnDamageReset
        )
    }

    async fn handle(&self, event: &CombatEvent, store: &ActorStore) -> Result<(), HandlerError> {
        let Some(actor) = event.actor() else {
            return Ok(());
        };

        if event.kind == CombatEventKind::TurnDamageReset {
            store.clear_turn_damage(actor, DamageSource::Bleeding);
            return Ok(());
        }

        let stage = store.with_actor(actor, |record| {
            record.bleeding_stage().filter(|_| record.health > 0)
        })?;
        let Some(stage) = stage else {
            return Ok(());
        };
        if !store.mark_turn_damage(actor, DamageSource::Bleeding)? {
            return Ok(());
        }

        let dealt = store.damage(actor, u32::from(stage))?;
        store.with_actor(actor, |record| record.bloodloss += dealt)?;
        info!(
            target: "runtime::handlers",
            actor = %actor,
            stage,
            damage = dealt,
            "Bleeding wound damage"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{turn_event, wounded_store};
    use crate::store::{ActiveEffect, Condition};

    #[tokio::test]
    async fn highest_stage_bleeds_once_per_turn() {
        let (store, actor) = wounded_store(10);
        store
            .apply(&actor, ActiveEffect::permanent(Condition::bleeding(2)))
            .unwrap();
        store
            .apply(&actor, ActiveEffect::permanent(Condition::bleeding(4)))
            .unwrap();

        let start = turn_event(CombatEventKind::StartOfTurn);
        BleedingHandler.handle(&start, &store).await.unwrap();
        BleedingHandler.handle(&start, &store).await.unwrap();
        let record = store.get(&actor).unwrap();
        assert_eq!(record.health, 6);
        assert_eq!(record.bloodloss, 4);

        BleedingHandler
            .handle(&turn_event(CombatEventKind::TurnDamageReset), &store)
            .await
            .unwrap();
        BleedingHandler.handle(&start, &store).await.unwrap();
        assert_eq!(store.get(&actor).unwrap().health, 2);
    }

    #[tokio::test]
    async fn bleeding_out_knocks_the_actor_out() {
        let (store, actor) = wounded_store(3);
        store
            .apply(&actor, ActiveEffect::permanent(Condition::bleeding(5)))
            .unwrap();

        BleedingHandler
            .handle(&turn_event(CombatEventKind::StartOfTurn), &store)
            .await
            .unwrap();
        let record = store.get(&actor).unwrap();
        assert_eq!((record.health, record.bloodloss), (0, 3));
        assert!(record.has(&Condition::Unconscious));
    }
}
