//! Background task that periodically snapshots the projection.

use std::sync::Arc;
use std::time::Duration;

use event_store::EventStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::projection::PortfolioProjection;

/// Saves the projection snapshot on a fixed interval until told to stop.
///
/// A failed save is logged and retried on the next tick. One last snapshot
/// is written on shutdown.
pub struct SnapshotWorker<S: EventStore> {
    projection: Arc<PortfolioProjection<S>>,
    interval: Duration,
}

impl<S: EventStore + 'static> SnapshotWorker<S> {
    pub fn new(projection: Arc<PortfolioProjection<S>>, interval: Duration) -> Self {
        Self {
            projection,
            interval,
        }
    }

    /// Spawns the worker onto the runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "snapshot worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => self.save().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.save().await;
        tracing::info!("snapshot worker stopped");
    }

    async fn save(&self) {
        if let Err(e) = self.projection.save_snapshot().await {
            tracing::error!(error = %e, "failed to save projection snapshot");
        }
    }
}
