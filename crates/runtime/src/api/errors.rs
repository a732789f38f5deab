//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the relay and the actor store so
//! clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use encounter_core::TurnError;

use crate::relay::RelayError;
use crate::rolls::RollError;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("authority worker command channel closed")]
    CommandChannelClosed,

    #[error("authority worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires an encounter to be configured before building")]
    MissingEncounter,

    #[error("runtime requires an authority oracle to be configured before building")]
    MissingAuthority,

    /// A transition failed in a way the caller cannot recover from.
    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Roll(#[from] RollError),
}
