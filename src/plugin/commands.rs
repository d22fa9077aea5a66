//! Command enum for the plugin actor
//!
//! Fire-and-forget commands carry events into the actor; the snapshot query
//! answers through a oneshot channel.

use tokio::sync::oneshot;

use super::classifier::LongPressElapsed;
use crate::protocol::{ContextSettings, InboundEvent};
use crate::state::ApplicationState;

/// Commands processed sequentially by [`super::PluginActor`]
#[derive(Debug)]
pub enum PluginCommand {
    /// An event received from the Stream Deck application
    Inbound(InboundEvent),

    /// A long-press timer ran out
    LongPressElapsed(LongPressElapsed),

    /// Push a freshly probed state to every registered context
    Broadcast(ApplicationState),

    /// Show a state on one context; dropped if the context is gone
    SetState {
        context: String,
        state: ApplicationState,
    },

    /// Report the registry and pending presses
    Snapshot {
        response: oneshot::Sender<PluginSnapshot>,
    },

    /// Cancel all timers, forget all contexts and stop the actor
    Shutdown,
}

/// Point-in-time view of the actor's state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginSnapshot {
    /// Registered contexts and their settings, sorted by context id
    pub contexts: Vec<(String, ContextSettings)>,
    /// Contexts with a key currently held, sorted
    pub pending_presses: Vec<String>,
}

impl PluginSnapshot {
    pub fn context_ids(&self) -> Vec<&str> {
        self.contexts.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn settings(&self, context: &str) -> Option<&ContextSettings> {
        self.contexts
            .iter()
            .find(|(id, _)| id == context)
            .map(|(_, settings)| settings)
    }
}
