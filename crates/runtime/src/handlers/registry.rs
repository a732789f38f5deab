//! Handler registry fanning combat events out to condition handlers.

use std::sync::Arc;

use tracing::{debug, error};

use encounter_core::CombatEvent;

use super::{
    BleedingHandler, BloodlossResetHandler, BurningHandler, ConditionHandler, HandlerCriticality,
    HandlerError, PoisonHandler,
};
use crate::store::ActorStore;

/// Ordered set of condition handlers.
///
/// Handlers run one after another in registration order, each seeing the
/// store as left by the previous one.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<[Arc<dyn ConditionHandler>]>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn ConditionHandler>>) -> Self {
        Self {
            handlers: handlers.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Registry with the built-in condition handlers.
    pub fn default_handlers() -> Self {
        Self::new(vec![
            Arc::new(BleedingHandler) as Arc<dyn ConditionHandler>,
            Arc::new(BurningHandler) as Arc<dyn ConditionHandler>,
            Arc::new(PoisonHandler) as Arc<dyn ConditionHandler>,
            Arc::new(BloodlossResetHandler) as Arc<dyn ConditionHandler>,
        ])
    }

    /// Returns a registry with `handler` appended.
    #[must_use]
    pub fn with(self, handler: Arc<dyn ConditionHandler>) -> Self {
        let mut handlers = self.handlers.to_vec();
        handlers.push(handler);
        Self::new(handlers)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|h| h.name())
    }

    /// Delivers `event` to every interested handler.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing critical handler; handlers
    /// after it do not see the event.
    pub async fn dispatch(
        &self,
        event: &CombatEvent,
        store: &ActorStore,
    ) -> Result<usize, HandlerError> {
        let mut ran = 0;
        for handler in self.handlers.iter() {
            if !handler.interested_in(event.kind) {
                continue;
            }
            ran += 1;
            if let Err(error) = handler.handle(event, store).await {
                self.handle_error(handler.as_ref(), event, error)?;
            }
        }
        Ok(ran)
    }

    fn handle_error(
        &self,
        handler: &dyn ConditionHandler,
        event: &CombatEvent,
        error: HandlerError,
    ) -> Result<(), HandlerError> {
        let criticality = handler.criticality();
        match criticality {
            HandlerCriticality::Critical => {
                error!(
                    target: "runtime::handlers",
                    handler = handler.name(),
                    criticality = criticality.as_str(),
                    event = event.kind.as_str(),
                    error = %error,
                    "Critical handler failed, skipping remaining handlers"
                );
                return Err(error);
            }
            HandlerCriticality::Important => error!(
                target: "runtime::handlers",
                handler = handler.name(),
                criticality = criticality.as_str(),
                event = event.kind.as_str(),
                error = %error,
                "Handler failed, continuing"
            ),
            HandlerCriticality::Optional => debug!(
                target: "runtime::handlers",
                handler = handler.name(),
                criticality = criticality.as_str(),
                event = event.kind.as_str(),
                error = %error,
                "Optional handler failed"
            ),
        }
        Ok(())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::default_handlers()
    }
}
