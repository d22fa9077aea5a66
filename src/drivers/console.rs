//! Console driver - logs all actions and simulates Steam in memory
//!
//! Used when the plugin runs off Windows (`--simulate`) and as the driver
//! behind the plugin tests. Every action moves the simulated state the way
//! the real application would, so the button cycles visibly.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use super::{ActionDriver, StateProber};
use crate::state::ApplicationState;

/// A driver action as recorded by [`ConsoleDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    Launch { direct_to_presentation: bool },
    EnterPresentation,
    ExitPresentation,
    Minimize,
    Terminate,
}

/// ConsoleDriver logs all driver actions and keeps a simulated state
///
/// This is useful for:
/// - Running the plugin on a machine without Steam
/// - Exercising the press handlers in tests
/// - Injecting probe/action failures and slow probes
pub struct ConsoleDriver {
    name: String,
    state: Mutex<ApplicationState>,
    actions: Mutex<Vec<ConsoleAction>>,
    probe_count: AtomicU64,
    fail_actions: AtomicBool,
    fail_probes: AtomicBool,
    probe_delay: Mutex<Duration>,
}

impl ConsoleDriver {
    /// Create a new ConsoleDriver with a given name and initial state
    pub fn new(name: impl Into<String>, initial: ApplicationState) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(initial),
            actions: Mutex::new(Vec::new()),
            probe_count: AtomicU64::new(0),
            fail_actions: AtomicBool::new(false),
            fail_probes: AtomicBool::new(false),
            probe_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Current simulated state
    pub fn state(&self) -> ApplicationState {
        *self.state.lock()
    }

    /// Overwrite the simulated state, as if the user changed it outside the plugin
    pub fn set_state(&self, state: ApplicationState) {
        *self.state.lock() = state;
    }

    /// Actions executed so far, oldest first
    pub fn actions(&self) -> Vec<ConsoleAction> {
        self.actions.lock().clone()
    }

    pub fn probe_count(&self) -> u64 {
        self.probe_count.load(Ordering::SeqCst)
    }

    /// Make every action report failure without changing state
    pub fn set_fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_probes(&self, fail: bool) {
        self.fail_probes.store(fail, Ordering::SeqCst);
    }

    /// Make each probe take `delay` before answering
    pub fn set_probe_delay(&self, delay: Duration) {
        *self.probe_delay.lock() = delay;
    }

    fn perform(&self, action: ConsoleAction, next: Option<ApplicationState>) -> Result<()> {
        let exec_num = {
            let mut actions = self.actions.lock();
            actions.push(action);
            actions.len()
        };

        if self.fail_actions.load(Ordering::SeqCst) {
            bail!("simulated failure for {:?}", action);
        }

        let mut state = self.state.lock();
        let previous = *state;
        if let Some(next) = next {
            *state = next;
        }

        info!(
            "🎮 Driver '{}' → {:?} ({} → {}) [exec #{}]",
            self.name, action, previous, *state, exec_num
        );
        Ok(())
    }
}

#[async_trait]
impl StateProber for ConsoleDriver {
    async fn probe(&self) -> Result<ApplicationState> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);

        let delay = *self.probe_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_probes.load(Ordering::SeqCst) {
            bail!("simulated probe failure");
        }

        let state = self.state();
        debug!(driver = %self.name, %state, "Simulated probe");
        Ok(state)
    }
}

#[async_trait]
impl ActionDriver for ConsoleDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn launch(&self, direct_to_presentation: bool) -> Result<()> {
        let next = if direct_to_presentation {
            ApplicationState::PresentationMode
        } else {
            ApplicationState::Running
        };
        self.perform(ConsoleAction::Launch { direct_to_presentation }, Some(next))
    }

    async fn enter_presentation_mode(&self) -> Result<()> {
        self.perform(
            ConsoleAction::EnterPresentation,
            Some(ApplicationState::PresentationMode),
        )
    }

    async fn exit_presentation_mode(&self) -> Result<()> {
        self.perform(ConsoleAction::ExitPresentation, Some(ApplicationState::Running))
    }

    async fn minimize_to_tray(&self) -> Result<()> {
        // Closing the window leaves Steam running
        self.perform(ConsoleAction::Minimize, None)
    }

    async fn terminate(&self) -> Result<()> {
        self.perform(ConsoleAction::Terminate, Some(ApplicationState::Off))
    }
}
