//! Fixed-period driver for the pickup loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::runtime::PickupRuntime;

/// Background task that owns the runtime and ticks it until shut down.
pub struct TickWorker {
    runtime: PickupRuntime,
    period: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl TickWorker {
    pub fn new(runtime: PickupRuntime, period: Duration, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            runtime,
            period,
            shutdown_rx,
        }
    }

    /// Spawns the worker and returns the controls for it.
    pub fn spawn(runtime: PickupRuntime, period: Duration) -> TickLoop {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.handle();
        let worker = Self::new(runtime, period, shutdown_rx);
        TickLoop {
            handle,
            shutdown_tx,
            join: tokio::spawn(worker.run()),
        }
    }

    /// Main worker loop; hands the runtime back once shut down.
    pub async fn run(mut self) -> PickupRuntime {
        let mut interval = tokio::time::interval(self.period);
        // A slow host tick should not be followed by a burst of catch-up ticks.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(target: "pickup::worker", period = ?self.period, "tick worker started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.runtime.on_tick();
                }
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(target: "pickup::worker", "tick worker stopped");

        self.runtime
    }
}

/// A runtime ticking on a background task.
pub struct TickLoop {
    handle: RuntimeHandle,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<PickupRuntime>,
}

impl TickLoop {
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Stops ticking and returns the runtime, e.g. to call
    /// [`PickupRuntime::shutdown`] on it.
    pub async fn stop(self) -> Result<PickupRuntime> {
        self.shutdown_tx.send_replace(true);
        self.join.await.map_err(RuntimeError::WorkerJoin)
    }
}
