use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::registry::RegistryCore;

/// Periodic task driving `RegistryCore::prune_change_log` (spec §2, §4.10).
/// Same start/stop shape as [`crate::eviction::EvictionSweeper`]; kept as a
/// separate task so the two timers can run on independent intervals, as
/// spec §6's configuration (`evictionIntervalMs` vs
/// `deltaRetentionIntervalMs`) implies.
pub struct ChangeLogPruner {
    registry: Arc<RegistryCore>,
    interval: Duration,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<mpsc::Receiver<()>>,
}

impl ChangeLogPruner {
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

    pub async fn start(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut shutdown_rx = self.shutdown_rx.lock().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pruned = self.registry.prune_change_log();
                    if pruned > 0 {
                        tracing::debug!(count = pruned, "pruned stale change-log entries");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("change-log pruner shutting down");
                    break;
                }
            }
        }
    }

    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
