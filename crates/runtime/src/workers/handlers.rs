//! Handler worker that feeds combat events to the condition handlers.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use encounter_core::CombatEvent;

use crate::handlers::HandlerRegistry;
use crate::store::ActorStore;

/// Commands that can be sent to the handler worker
pub enum HandlerCommand {
    /// Run every interested handler for this event.
    Dispatch(CombatEvent),
    /// Reply once every earlier event has been handled.
    Flush(oneshot::Sender<()>),
}

/// Background task that applies condition side effects in event order.
pub struct HandlerWorker {
    registry: HandlerRegistry,
    store: Arc<ActorStore>,
    command_rx: mpsc::Receiver<HandlerCommand>,
}

impl HandlerWorker {
    pub fn new(
        registry: HandlerRegistry,
        store: Arc<ActorStore>,
        command_rx: mpsc::Receiver<HandlerCommand>,
    ) -> Self {
        debug!(
            target: "runtime::handlers",
            handlers = ?registry.names().collect::<Vec<_>>(),
            "HandlerWorker initialized"
        );

        Self {
            registry,
            store,
            command_rx,
        }
    }

    /// Main worker loop. Ends once the authority worker is gone.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    self.handle_command(cmd).await;
                }
                else => break,
            }
        }
    }

    async fn handle_command(&mut self, cmd: HandlerCommand) {
        match cmd {
            HandlerCommand::Dispatch(event) => {
                match self.registry.dispatch(&event, &self.store).await {
                    Ok(ran) => trace!(
                        target: "runtime::handlers",
                        event = event.kind.as_str(),
                        round = event.round,
                        handlers = ran,
                        "Event handled"
                    ),
                    Err(error) => debug!(
                        target: "runtime::handlers",
                        event = event.kind.as_str(),
                        error = %error,
                        "Event handling stopped early"
                    ),
                }
            }
            HandlerCommand::Flush(reply) => {
                if reply.send(()).is_err() {
                    debug!("Flush reply channel closed (caller dropped)");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ActiveEffect, ActorRecord, Condition};
    use encounter_core::{ActorId, CombatEventKind, Combatant, Faction};

    #[tokio::test]
    async fn flush_waits_for_earlier_events() {
        let store = Arc::new(ActorStore::new());
        store.insert(ActorRecord::new("hero", "Hero", 10));
        let hero = ActorId::from("hero");
        store
            .apply(&hero, ActiveEffect::permanent(Condition::Burning))
            .unwrap();

        let (tx, rx) = mpsc::channel(8);
        let worker = HandlerWorker::new(HandlerRegistry::default(), Arc::clone(&store), rx);
        let task = tokio::spawn(worker.run());

        let combatant = Combatant::new("c-hero", "Hero", Faction::Allied).with_actor("hero");
        let event = CombatEvent::new(CombatEventKind::StartOfTurn, 1, vec![combatant.clone()].into())
            .for_combatant(combatant);
        tx.send(HandlerCommand::Dispatch(event)).await.unwrap();

        let (flush_tx, flush_rx) = oneshot::channel();
        tx.send(HandlerCommand::Flush(flush_tx)).await.unwrap();
        flush_rx.await.unwrap();
        assert_eq!(store.get(&hero).unwrap().health, 7);

        drop(tx);
        task.await.unwrap();
    }
}
