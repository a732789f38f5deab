use async_trait::async_trait;
use tracing::debug;

use encounter_core::{CombatEvent, CombatEventKind};

use super::{ConditionHandler, HandlerError};
use crate::store::ActorStore;

/// Resets accumulated bloodloss when an encounter is cleaned up.
pub struct BloodlossResetHandler;

#[async_trait]
impl ConditionHandler for BloodlossResetHandler {
    fn name(&self) -> &'static str {
        "bloodloss_reset"
    }

    fn interested_in(&self, kind: CombatEventKind) -> bool {
        kind == CombatEventKind::EncounterCleanup
    }

    async fn handle(&self, event: &CombatEvent, store: &ActorStore) -> Result<(), HandlerError> {
        store.reset_bloodloss(event.actors());
        debug!(
            target: "runtime::handlers",
            actors = event.actors().count(),
            "Bloodloss reset"
        );
        Ok(())
    }
}
