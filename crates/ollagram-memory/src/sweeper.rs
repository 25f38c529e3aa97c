//! Periodic cleanup task.
//!
//! Owns the interval timer that runs [`MemoryStore::cleanup`]. The task is
//! held by handle and stopped deterministically on shutdown, so tests never
//! need to wait on wall-clock intervals (they call `cleanup()` directly).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Handle to the background cleanup sweep.
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a sweep that runs `store.cleanup()` every `interval`.
    pub fn spawn(store: Arc<MemoryStore>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so the sweep only
            // runs after a full interval has elapsed.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Running scheduled memory cleanup");
                        store.cleanup();
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Memory sweeper stopped");
        });

        Self { shutdown, handle }
    }

    /// Spawn with the store's configured interval.
    pub fn spawn_for(store: Arc<MemoryStore>) -> Self {
        let interval = store.cleanup_interval();
        Self::spawn(store, interval)
    }

    /// Signal the sweep to stop and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
