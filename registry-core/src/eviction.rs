use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::registry::RegistryCore;

/// Periodic task driving `RegistryCore::sweep_expired_leases` (spec §2, §4.8,
/// §5 — "the sweeper... must not hold the global lock across the whole
/// sweep"). Modeled on `ExpirationManager::start`/`stop`: a fixed-interval
/// ticker raced against a shutdown signal, so `stop()` is graceful rather
/// than aborting the task mid-sweep.
pub struct EvictionSweeper {
    registry: Arc<RegistryCore>,
    interval: Duration,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<mpsc::Receiver<()>>,
}

impl EvictionSweeper {
    #[must_use]
    pub fn new(registry: Arc<RegistryCore>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Self {
            registry,
            interval,
            shutdown_tx,
            shutdown_rx: Mutex::new(shutdown_rx),
        }
    }

    /// Runs until `stop()` is called. Intended to be spawned on its own
    /// task by the embedder.
    pub async fn start(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut shutdown_rx = self.shutdown_rx.lock().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.registry.sweep_expired_leases();
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("eviction sweeper shutting down");
                    break;
                }
            }
        }
    }

    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
