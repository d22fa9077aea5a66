//! PluginHandle - Public API for the PluginActor
//!
//! Fire-and-forget methods for events and broadcasts, and an async snapshot
//! query answered through a oneshot channel.

use tokio::sync::{mpsc, oneshot};

use super::commands::{PluginCommand, PluginSnapshot};
use crate::error::PluginError;
use crate::protocol::InboundEvent;
use crate::state::ApplicationState;

/// Handle for interacting with the PluginActor
#[derive(Clone)]
pub struct PluginHandle {
    /// Command channel to the PluginActor
    cmd_tx: mpsc::UnboundedSender<PluginCommand>,
}

impl PluginHandle {
    /// Create a new PluginHandle with the given command sender
    pub fn new(cmd_tx: mpsc::UnboundedSender<PluginCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Forward an event from the Stream Deck application
    ///
    /// Fails only when the actor has stopped.
    pub fn inbound(&self, event: InboundEvent) -> Result<(), PluginError> {
        self.cmd_tx
            .send(PluginCommand::Inbound(event))
            .map_err(|_| PluginError::ChannelClosed)
    }

    /// Push `state` to every registered context
    ///
    /// Fire-and-forget: Does not wait for delivery.
    pub fn broadcast(&self, state: ApplicationState) {
        let _ = self.cmd_tx.send(PluginCommand::Broadcast(state));
    }

    /// Push `state` to a single context
    ///
    /// Fire-and-forget: The actor drops it if the context has disappeared.
    pub fn set_state(&self, context: impl Into<String>, state: ApplicationState) {
        let _ = self.cmd_tx.send(PluginCommand::SetState {
            context: context.into(),
            state,
        });
    }

    /// Get the registered contexts and pending presses
    ///
    /// Returns None if the actor has stopped.
    pub async fn snapshot(&self) -> Option<PluginSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(PluginCommand::Snapshot {
                response: response_tx,
            })
            .is_err()
        {
            return None;
        }

        response_rx.await.ok()
    }

    /// Check if the actor is still alive
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Signal the actor to shut down gracefully
    ///
    /// Fire-and-forget: Does not wait for confirmation.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(PluginCommand::Shutdown);
    }
}
