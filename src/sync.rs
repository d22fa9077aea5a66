//! Keeps every button in step with Steam's actual state
//!
//! While the Stream Deck connection is up, [`SyncLoop`] probes Steam every
//! [`POLL_INTERVAL`] and broadcasts the result. A tick that arrives while the
//! previous probe is still running is skipped, so a slow probe never piles
//! up concurrent queries.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Fuse, FusedFuture, FutureExt};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::drivers::StateProber;
use crate::plugin::PluginHandle;
use crate::state::ApplicationState;

/// Time between two background probes
pub const POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Probe Steam, reading any failure as `Off`
///
/// Every failed query in the field means Steam could not be found, so `Off`
/// is the state the button should show.
pub async fn probe_or_off(prober: &dyn StateProber) -> ApplicationState {
    match prober.probe().await {
        Ok(state) => {
            trace!(%state, "Probe complete");
            state
        }
        Err(e) => {
            warn!("State probe failed, reporting off: {:#}", e);
            ApplicationState::Off
        }
    }
}

/// Probe once and push the result to every registered context
pub async fn resync(prober: &dyn StateProber, plugin: &PluginHandle) {
    let state = probe_or_off(prober).await;
    plugin.broadcast(state);
}

/// Periodic probe-and-broadcast driver
pub struct SyncLoop {
    prober: Arc<dyn StateProber>,
    plugin: PluginHandle,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl SyncLoop {
    pub fn new(prober: Arc<dyn StateProber>, plugin: PluginHandle) -> Self {
        Self::with_interval(prober, plugin, POLL_INTERVAL)
    }

    pub fn with_interval(
        prober: Arc<dyn StateProber>,
        plugin: PluginHandle,
        interval: Duration,
    ) -> Self {
        Self {
            prober,
            plugin,
            interval,
            task: None,
        }
    }

    /// Start polling; a no-op if already running
    ///
    /// The first probe happens one interval after starting.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let prober = Arc::clone(&self.prober);
        let plugin = self.plugin.clone();
        let interval = self.interval;
        self.task = Some(tokio::spawn(poll(prober, plugin, interval)));
        info!(interval_ms = interval.as_millis() as u64, "State polling started");
    }

    /// Stop polling, abandoning any probe in flight
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("State polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll(prober: Arc<dyn StateProber>, plugin: PluginHandle, interval: Duration) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let in_flight: Fuse<BoxFuture<'static, ApplicationState>> = Fuse::terminated();
    tokio::pin!(in_flight);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !in_flight.is_terminated() {
                    debug!("Previous probe still running, skipping tick");
                    continue;
                }
                let prober = Arc::clone(&prober);
                in_flight.set(
                    async move { probe_or_off(prober.as_ref()).await }
                        .boxed()
                        .fuse(),
                );
            }
            state = &mut in_flight => {
                plugin.broadcast(state);
                if !plugin.is_alive() {
                    debug!("Plugin actor gone, polling ends");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ConsoleDriver;
    use crate::plugin::PluginCommand;
    use tokio::sync::mpsc;
    use tokio::time::sleep;

    fn drain_broadcasts(rx: &mut mpsc::UnboundedReceiver<PluginCommand>) -> Vec<ApplicationState> {
        let mut states = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            if let PluginCommand::Broadcast(state) = cmd {
                states.push(state);
            }
        }
        states
    }

    #[tokio::test]
    async fn test_probe_failure_reads_as_off() {
        let driver = ConsoleDriver::new("test", ApplicationState::PresentationMode);
        assert_eq!(probe_or_off(&driver).await, ApplicationState::PresentationMode);

        driver.set_fail_probes(true);
        assert_eq!(probe_or_off(&driver).await, ApplicationState::Off);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_every_interval() {
        let driver = Arc::new(ConsoleDriver::new("test", ApplicationState::Running));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = SyncLoop::new(driver.clone(), PluginHandle::new(tx));

        sync.start();
        sync.start();
        assert!(sync.is_running());

        sleep(Duration::from_millis(2900)).await;
        assert!(drain_broadcasts(&mut rx).is_empty());

        sleep(Duration::from_millis(6200)).await;
        assert_eq!(
            drain_broadcasts(&mut rx),
            vec![ApplicationState::Running; 3]
        );
        assert_eq!(driver.probe_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_coalesces_ticks() {
        let driver = Arc::new(ConsoleDriver::new("slow", ApplicationState::Off));
        driver.set_probe_delay(Duration::from_millis(4000));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = SyncLoop::new(driver.clone(), PluginHandle::new(tx));

        sync.start();

        // Probe starts at 3000 and ends at 7000; the tick at 6000 is skipped
        sleep(Duration::from_millis(8000)).await;
        assert_eq!(driver.probe_count(), 1);
        assert_eq!(drain_broadcasts(&mut rx), vec![ApplicationState::Off]);

        // Next probe starts at 9000
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(driver.probe_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_broadcasts() {
        let driver = Arc::new(ConsoleDriver::new("test", ApplicationState::Running));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = SyncLoop::new(driver.clone(), PluginHandle::new(tx));

        sync.start();
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(drain_broadcasts(&mut rx).len(), 1);

        sync.stop();
        assert!(!sync.is_running());
        sleep(Duration::from_secs(30)).await;
        assert!(drain_broadcasts(&mut rx).is_empty());
        assert_eq!(driver.probe_count(), 1);
    }
}
