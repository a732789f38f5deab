use async_trait::async_trait;
use tracing::info;

use encounter_core::{CombatEvent, CombatEventKind};

use super::{ConditionHandler, HandlerError};
use crate::store::{ActorStore, Condition, DamageSource};

/// Burning deals 3 damage each turn and eats 1 maximum health each round.
pub struct BurningHandler;

impl BurningHandler {
    pub const TURN_DAMAGE: u32 = 3;
}

#[async_trait]
impl ConditionHandler for BurningHandler {
    fn name(&self) -> &'static str {
        "burning"
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
                    let reduced = store
                        .with_actor(actor, |record| {
                            if !record.has(&Condition::Burning) {
                                return None;
                            }
                            record.burning_health_reduction += 1;
                            record.health = record.health.min(record.max_health());
                            Some(record.burning_health_reduction)
                        })
                        .ok()
                        .flatten();
                    if let Some(total) = reduced {
                        info!(
                            target: "runtime::handlers",
                            actor = %actor,
                            total_lost = total,
                            "Burning reduced maximum health"
                        );
                    }
                }
            }
            CombatEventKind::TurnDamageReset => {
                if let Some(actor) = event.actor() {
                    store.clear_turn_damage(actor, DamageSource::Burning);
                }
            }
            _ => {
                let Some(actor) = event.actor() else {
                    return Ok(());
                };
                let burning = store.with_actor(actor, |record| {
                    record.has(&Condition::Burning) && record.health > 0
                })?;
                if burning && store.mark_turn_damage(actor, DamageSource::Burning)? {
                    let dealt = store.damage(actor, Self::TURN_DAMAGE)?;
                    info!(
                        target: "runtime::handlers",
                        actor = %actor,
                        damage = dealt,
                        "Burning damage"
                    );
                }
            }
        }
        Ok(())
    }
}
