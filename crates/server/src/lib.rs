//! Composition root for the portfolio event log.
//!
//! Wires the store, dispatcher, projection, service and buses together
//! and runs the projection snapshot worker until shutdown.

pub mod config;

use std::sync::Arc;

use application::{CommandBus, QueryProcessor};
use domain::{EventBus, PortfolioService, StoreWriter};
use event_store::{EventStore, EventStoreError};
use projections::{PortfolioProjection, ProjectionError, SnapshotFile, SnapshotWorker};
use thiserror::Error;
use tokio::sync::watch;

pub use config::Config;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Every long-lived component, constructed once.
pub struct App<S: EventStore> {
    pub store: S,
    pub projection: Arc<PortfolioProjection<S>>,
    pub service: Arc<PortfolioService>,
    pub commands: CommandBus,
    pub queries: QueryProcessor,
}

impl<S: EventStore + Clone + 'static> App<S> {
    /// Wires the components without touching the store or the snapshot.
    pub fn new(store: S, snapshot: SnapshotFile) -> Self {
        let projection =
            Arc::new(PortfolioProjection::new(store.clone()).with_snapshot_file(snapshot));

        let dispatcher = EventBus::new()
            .with_handler(Arc::new(StoreWriter::new(store.clone())))
            .with_handler(projection.clone());

        let service = Arc::new(PortfolioService::new(
            Arc::new(dispatcher),
            projection.clone(),
            Arc::new(store.clone()),
        ));

        Self {
            store,
            projection,
            commands: CommandBus::new(service.clone()),
            queries: QueryProcessor::new(service.clone()),
            service,
        }
    }

    /// Wires the components and brings the projection current.
    #[tracing::instrument(skip_all, fields(projection_file = %config.projection_file.display()))]
    pub async fn bootstrap(store: S, config: &Config) -> Result<Self, ServerError> {
        let app = Self::new(store, SnapshotFile::new(&config.projection_file));
        app.projection.initialize().await?;
        Ok(app)
    }

    /// Runs the snapshot worker until `shutdown` resolves.
    pub async fn run_until(
        self,
        config: &Config,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = SnapshotWorker::new(self.projection.clone(), config.snapshot_interval)
            .spawn(shutdown_rx);

        tracing::info!(portfolios = self.projection.portfolios().await.len(), "service ready");
        shutdown.await;

        let _ = shutdown_tx.send(true);
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "snapshot worker panicked");
        }
        Ok(())
    }
}
