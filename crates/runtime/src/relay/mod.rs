//! Remote-authority relay.
//!
//! Participants without authority never mutate turn state themselves. They
//! describe the change they want as a [`RelayMessage`] and send it over a
//! [`RelayChannel`] to the authoritative runtime, which re-validates and
//! applies it.

mod local;
mod message;

pub use local::{LocalRelay, RelayReceiver};
pub use message::{CombatFlag, RelayKind, RelayMessage};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while moving relay messages.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to encode relay message")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode relay message")]
    Decode(#[source] serde_json::Error),

    #[error("relay channel closed")]
    ChannelClosed,
}

/// Shared channel towards the authoritative participant.
#[async_trait]
pub trait RelayChannel: Send + Sync {
    /// Sends a request without waiting for it to be applied.
    async fn send(&self, message: RelayMessage) -> Result<(), RelayError>;
}
