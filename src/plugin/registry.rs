//! Registry of live button contexts and their settings

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::protocol::{ContextSettings, OutboundMessage};
use crate::state::ApplicationState;
use crate::transport::Outbound;

/// Result of pushing one state to every context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Live contexts keyed by id
///
/// A context exists from `willAppear` until `willDisappear`. Settings of
/// contexts that are not registered are never stored.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: HashMap<String, ContextSettings>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a context
    ///
    /// Returns true if the context was not registered before. The caller is
    /// responsible for the state broadcast that follows a registration.
    pub fn register(&mut self, context: &str, settings: ContextSettings) -> bool {
        let added = self.contexts.insert(context.to_string(), settings).is_none();
        debug!(context, added, total = self.contexts.len(), "Context registered");
        added
    }

    /// Remove a context; a no-op if it is unknown
    pub fn unregister(&mut self, context: &str) -> bool {
        let removed = self.contexts.remove(context).is_some();
        debug!(context, removed, total = self.contexts.len(), "Context unregistered");
        removed
    }

    /// Replace a registered context's settings without broadcasting
    pub fn update_settings(&mut self, context: &str, settings: ContextSettings) -> bool {
        match self.contexts.get_mut(context) {
            Some(current) => {
                if *current != settings {
                    trace!(context, ?settings, "Settings updated");
                }
                *current = settings;
                true
            }
            None => {
                debug!(context, "Ignoring settings for unregistered context");
                false
            }
        }
    }

    pub fn settings(&self, context: &str) -> Option<&ContextSettings> {
        self.contexts.get(context)
    }

    pub fn contains(&self, context: &str) -> bool {
        self.contexts.contains_key(context)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Registered contexts with their settings, sorted by id
    pub fn entries(&self) -> Vec<(String, ContextSettings)> {
        let mut entries: Vec<_> = self
            .contexts
            .iter()
            .map(|(id, settings)| (id.clone(), settings.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn clear(&mut self) {
        self.contexts.clear();
    }

    /// Push `state` to every registered context
    ///
    /// A failed push is logged and counted; the remaining contexts still
    /// receive the state.
    pub fn broadcast_state(&self, state: ApplicationState, outbound: &dyn Outbound) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for context in self.contexts.keys() {
            match outbound.push(OutboundMessage::set_state(context.as_str(), state)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(context = %context, %state, "Failed to push state: {}", e);
                }
            }
        }

        trace!(%state, ?report, "Broadcast complete");
        report
    }
}
