//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration, workers, or transport.

pub mod authority;
pub mod errors;
pub mod handle;
pub mod prompt;

pub use authority::{AuthorityOracle, Permissions};
pub use errors::{Result, RuntimeError};
pub use handle::{Dispatch, EncounterHandle};
pub use prompt::{FirstPhasePrompt, FixedPrompt, PhaseOption};
