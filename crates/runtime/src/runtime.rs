//! High-level runtime orchestrator.
//!
//! The runtime owns background workers, wires up command/event channels, and
//! exposes a builder-based API for clients to obtain encounter handles.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use encounter_core::{Encounter, EncounterId, UserId};

use crate::api::{AuthorityOracle, EncounterHandle, Result, RuntimeError};
use crate::config::RuntimeConfig;
use crate::events::EventBus;
use crate::handlers::HandlerRegistry;
use crate::relay::{LocalRelay, RelayChannel, RelayReceiver};
use crate::store::ActorStore;
use crate::workers::{AuthorityWorker, Command, HandlerWorker};

/// Main runtime that hosts one authoritative encounter
///
/// Design: Runtime owns workers and coordinates execution.
/// [`EncounterHandle`] provides a cloneable façade per participant.
pub struct Runtime {
    config: RuntimeConfig,
    encounter: EncounterId,
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    store: Arc<ActorStore>,
    relay: LocalRelay,

    // Background workers
    authority_worker_handle: JoinHandle<()>,
    handler_worker_handle: JoinHandle<()>,
    relay_listener_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Handle for `user` on this process.
    ///
    /// Applies changes directly when this process is the authority and
    /// forwards them through the relay otherwise.
    pub fn handle(&self, user: impl Into<UserId>) -> EncounterHandle {
        if self.config.is_authority {
            EncounterHandle::authority(
                user.into(),
                self.encounter.clone(),
                self.command_tx.clone(),
                self.event_bus.clone(),
            )
        } else {
            self.participant(user)
        }
    }

    /// Handle for a participant without authority, connected through the
    /// relay.
    pub fn participant(&self, user: impl Into<UserId>) -> EncounterHandle {
        let relay: Arc<dyn RelayChannel> = Arc::new(self.relay.clone());
        EncounterHandle::participant(
            user.into(),
            self.encounter.clone(),
            Some(relay),
            self.command_tx.clone(),
            self.event_bus.clone(),
        )
    }

    /// Handle for a participant with neither authority nor a relay path.
    pub fn detached(&self, user: impl Into<UserId>) -> EncounterHandle {
        EncounterHandle::participant(
            user.into(),
            self.encounter.clone(),
            None,
            self.command_tx.clone(),
            self.event_bus.clone(),
        )
    }

    /// Sending half of the relay, for transports bridging remote participants.
    pub fn relay(&self) -> &LocalRelay {
        &self.relay
    }

    /// Actor documents the condition handlers act on.
    pub fn store(&self) -> &Arc<ActorStore> {
        &self.store
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Shutdown the runtime gracefully
    pub async fn shutdown(self) -> Result<()> {
        if self.command_tx.send(Command::Shutdown).await.is_err() {
            debug!(target: "runtime::worker", "Authority worker already stopped");
        }
        self.relay_listener_handle.abort();

        self.authority_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        // Ends once the authority worker dropped its sender.
        self.handler_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    encounter: Option<Encounter>,
    store: Option<Arc<ActorStore>>,
    authority: Option<Arc<dyn AuthorityOracle>>,
    handlers: Option<HandlerRegistry>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            encounter: None,
            store: None,
            authority: None,
            handlers: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Provide the encounter to host (required)
    pub fn encounter(mut self, encounter: Encounter) -> Self {
        self.encounter = Some(encounter);
        self
    }

    /// Share an existing actor store (default: empty store)
    pub fn store(mut self, store: Arc<ActorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the permission oracle (required)
    pub fn authority(mut self, authority: impl AuthorityOracle + 'static) -> Self {
        self.authority = Some(Arc::new(authority));
        self
    }

    /// Set custom condition handlers.
    ///
    /// If not provided, the built-in handlers (bleeding, burning, poison,
    /// bloodloss reset) are used.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Build the runtime
    pub fn build(self) -> Result<Runtime> {
        let encounter = self.encounter.ok_or(RuntimeError::MissingEncounter)?;
        let authority = self.authority.ok_or(RuntimeError::MissingAuthority)?;
        let store = self.store.unwrap_or_default();
        let handlers = self.handlers.unwrap_or_default();
        let config = self.config;

        let encounter_id = encounter.id.clone();
        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel::<Command>(config.command_buffer_size.max(1));
        let (handler_tx, handler_rx) = mpsc::channel(config.event_buffer_size.max(1));
        let (relay, relay_rx) = LocalRelay::channel(config.relay_buffer_size);

        let handler_worker = HandlerWorker::new(handlers, Arc::clone(&store), handler_rx);
        let handler_worker_handle = tokio::spawn(async move {
            handler_worker.run().await;
        });

        let authority_worker = AuthorityWorker::new(
            encounter,
            config.settings.clone(),
            Arc::clone(&store),
            authority,
            command_rx,
            event_bus.clone(),
            handler_tx,
        );
        let authority_worker_handle = tokio::spawn(async move {
            authority_worker.run().await;
        });

        let relay_listener_handle = tokio::spawn(listen(relay_rx, command_tx.clone()));

        Ok(Runtime {
            config,
            encounter: encounter_id,
            command_tx,
            event_bus,
            store,
            relay,
            authority_worker_handle,
            handler_worker_handle,
            relay_listener_handle,
        })
    }
}

/// Decodes relayed requests and queues them for the authority worker.
async fn listen(mut receiver: RelayReceiver, command_tx: mpsc::Sender<Command>) {
    while let Some(message) = receiver.recv().await {
        match message {
            Ok(message) => {
                if command_tx.send(Command::Relay(message)).await.is_err() {
                    break;
                }
            }
            Err(error) => warn!(
                target: "runtime::relay",
                error = %error,
                "Dropping undecodable relay message"
            ),
        }
    }
}
