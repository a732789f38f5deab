//! In-process relay transport.
//!
//! Messages travel as JSON text, exactly as they would over a socket.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{RelayChannel, RelayError, RelayMessage};

/// Sending half of an in-process relay.
#[derive(Clone, Debug)]
pub struct LocalRelay {
    tx: mpsc::Sender<String>,
}

/// Receiving half of an in-process relay, held by the authority.
#[derive(Debug)]
pub struct RelayReceiver {
    rx: mpsc::Receiver<String>,
}

impl LocalRelay {
    pub fn channel(buffer: usize) -> (Self, RelayReceiver) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, RelayReceiver { rx })
    }

    /// Sends pre-encoded wire text.
    pub async fn send_raw(&self, raw: impl Into<String>) -> Result<(), RelayError> {
        self.tx
            .send(raw.into())
            .await
            .map_err(|_| RelayError::ChannelClosed)
    }
}

#[async_trait]
impl RelayChannel for LocalRelay {
    async fn send(&self, message: RelayMessage) -> Result<(), RelayError> {
        self.send_raw(message.to_json()?).await
    }
}

impl RelayReceiver {
    /// Waits for the next message. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Result<RelayMessage, RelayError>> {
        let raw = self.rx.recv().await?;
        Some(RelayMessage::from_json(&raw))
    }
}
