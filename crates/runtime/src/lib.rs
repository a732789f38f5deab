//! Runtime orchestration for faction-phase encounters.
//!
//! This crate wires the pure rules of `encounter-core` into an authoritative
//! runtime. Consumers embed [`Runtime`] to host an encounter, hand each
//! participant an [`EncounterHandle`] and subscribe to what happens through
//! the [`EventBus`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`relay`] carries requests from participants to the authority
//! - [`handlers`] reacts to combat events with condition side effects
//! - [`store`] holds the actor documents those handlers mutate
//! - [`rolls`] answers roll-time queries about turn state
//! - [`workers`] keeps background tasks internal to the crate
pub mod api;
pub mod config;
pub mod events;
pub mod handlers;
pub mod relay;
pub mod rolls;
pub mod runtime;
pub mod store;

mod workers;

pub use api::{
    AuthorityOracle, Dispatch, EncounterHandle, FirstPhasePrompt, FixedPrompt, Permissions,
    PhaseOption, Result, RuntimeError,
};
pub use config::RuntimeConfig;
pub use events::{Event, EventBus, RelayEvent, Topic, TurnEvent};
pub use handlers::{
    BleedingHandler, BloodlossResetHandler, BurningHandler, ConditionHandler, HandlerCriticality,
    HandlerError, HandlerRegistry, PoisonHandler,
};
pub use relay::{CombatFlag, LocalRelay, RelayChannel, RelayError, RelayKind, RelayMessage};
pub use rolls::{
    ConfirmationReason, CorrelationId, PendingRolls, RollContext, RollError, RollModifier,
    RollTicket,
};
pub use runtime::{Runtime, RuntimeBuilder};
pub use store::{ActiveEffect, ActorRecord, ActorStore, Condition, DamageSource, StoreError};
