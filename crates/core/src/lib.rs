//! Faction-phase encounter rules shared by every participant.
//!
//! `encounter-core` holds the canonical turn/phase state machine and the data
//! it operates on. It is synchronous and free of I/O so the authoritative
//! runtime, tests and offline tools run the exact same rules. All turn state
//! mutation flows through [`engine::PhaseEngine`]; host data the rules consult
//! is reached through the traits in [`env`].
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod event;
pub mod faction;
pub mod state;
pub mod tracker;
pub use config::{EncounterSettings, NpcTurnsVisibility};
pub use engine::{PhaseEngine, TransitionOutcome};
pub use env::{
    DurationPhase, DurationProcessor, EncounterEnv, ExpiredEffect, NoDurations, NoStatus,
    StatusOracle,
};
pub use error::{ErrorSeverity, Ineligible, SetupError, TurnError};
pub use event::{CombatEvent, CombatEventKind, TurnNotice};
pub use faction::Faction;
pub use state::{
    ActorId, Combatant, CombatantId, Encounter, EncounterId, EncounterStatus, EncounterSubState,
    TurnLedger, UserId,
};
pub use tracker::{TrackerRow, TrackerView};
