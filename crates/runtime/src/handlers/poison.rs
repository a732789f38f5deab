use async_trait::async_trait;
use tracing::{info, warn};

use encounter_core::{CombatEvent, CombatEventKind};

use super::{ConditionHandler, HandlerError};
use crate::store::{ActiveEffect, ActorStore, Condition, DamageSource};

/// Poison from stage 2 deals damage each turn; stage 4 knocks the actor out
/// after three rounds.
pub struct PoisonHandler;

impl PoisonHandler {
    pub const TURN_DAMAGE: u32 = 2;
    pub const DAMAGING_STAGE: u8 = 2;
    pub const LETHAL_ROUNDS: u32 = 3;
}

#[async_trait]
impl ConditionHandler for PoisonHandler {
    fn name(&self) -> &'static str {
        "poison"
    }

    fn interested_in(&self, kind: CombatEventKind) -> bool {
        matches!(
            kind,
            CombatEventKind::StartOfTurn
                | CombatEventKind::TurnDamageReset
                | CombatEventKind::EndOfRound
        )
    }

    async fn handle(&self, event: &CombatEvent, store: &ActorStore) -> Result<(), HandlerError> {
        match event.kind {
            CombatEventKind::EndOfRound => {
                for actor in event.actors() {
                    let knocked_out = store
                        .with_actor(actor, |record| {
                            let mut lethal = false;
                            for effect in &mut record.effects {
                                if let Condition::Poisoned {
                                    stage: Condition::MAX_POISON_STAGE,
                                    rounds_passed,
                                } = &mut effect.condition
                                {
                                    *rounds_passed += 1;
                                    lethal |= *rounds_passed >= Self::LETHAL_ROUNDS;
                                }
                            }
                            lethal && !record.has(&Condition::Unconscious)
                        })
                        .unwrap_or(false);

                    if knocked_out {
                        if let Err(error) =
                            store.apply(actor, ActiveEffect::permanent(Condition::Unconscious))
                        {
                            warn!(
                                target: "runtime::handlers",
                                actor = %actor,
                                error = %error,
                                "Failed to apply poison knockout"
                            );
                        } else {
                            info!(
                                target: "runtime::handlers",
                                actor = %actor,
                                "Poison knocked the actor out"
                            );
                        }
                    }
                }
            }
            CombatEventKind::TurnDamageReset => {
                if let Some(actor) = event.actor() {
                    store.clear_turn_damage(actor, DamageSource::Poison);
                }
            }
            _ => {
                let Some(actor) = event.actor() else {
                    return Ok(());
                };
                let damaging = store.with_actor(actor, |record| {
                    record.health > 0
                        && record
                            .poison_stage()
                            .is_some_and(|stage| stage >= Self::DAMAGING_STAGE)
                })?;
                if damaging && store.mark_turn_damage(actor, DamageSource::Poison)? {
                    let dealt = store.damage(actor, Self::TURN_DAMAGE)?;
                    info!(
                        target: "runtime::handlers",
                        actor = %actor,
                        damage = dealt,
                        "Poison damage"
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{turn_event, wounded_store};

    #[tokio::test]
    async fn stage_one_does_not_hurt() {
        let (store, actor) = wounded_store(10);
        store
            .apply(&actor, ActiveEffect::permanent(Condition::poisoned(1)))
            .unwrap();
        PoisonHandler
            .handle(&turn_event(CombatEventKind::StartOfTurn), &store)
            .await
            .unwrap();
        assert_eq!(store.get(&actor).unwrap().health, 10);
    }

    #[tokio::test]
    async fn stage_two_hurts_once_per_turn() {
        let (store, actor) = wounded_store(10);
        store
            .apply(&actor, ActiveEffect::permanent(Condition::poisoned(2)))
            .unwrap();
        let start = turn_event(CombatEventKind::StartOfTurn);
        PoisonHandler.handle(&start, &store).await.unwrap();
        PoisonHandler.handle(&start, &store).await.unwrap();
        assert_eq!(store.get(&actor).unwrap().health, 8);
    }

    #[tokio::test]
    async fn stage_four_knocks_out_after_three_rounds() {
        let (store, actor) = wounded_store(30);
        store
            .apply(&actor, ActiveEffect::permanent(Condition::poisoned(4)))
            .unwrap();
        let end_of_round = turn_event(CombatEventKind::EndOfRound);

        PoisonHandler.handle(&end_of_round, &store).await.unwrap();
        PoisonHandler.handle(&end_of_round, &store).await.unwrap();
        assert!(!store.get(&actor).unwrap().is_incapacitated());

        PoisonHandler.handle(&end_of_round, &store).await.unwrap();
        assert!(store.get(&actor).unwrap().has(&Condition::Unconscious));
    }
}
