//! Read seams the service validates against.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::PortfolioId;
use event_store::{EventEnvelope, EventStore, EventStoreExt};

use super::{Address, Portfolio};

/// Current portfolio state, as materialized by the read model.
///
/// Returned values are shared immutable snapshots; holding one never
/// exposes the read model's internals to mutation.
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn get(&self, id: PortfolioId) -> Option<Arc<Portfolio>>;

    async fn all(&self) -> Vec<Arc<Portfolio>>;

    /// Every address currently held by a building.
    async fn addresses(&self) -> Arc<BTreeSet<Address>>;

    async fn exists(&self, id: PortfolioId) -> bool {
        self.get(id).await.is_some()
    }
}

/// The recorded history of a portfolio.
#[async_trait]
pub trait PortfolioHistory: Send + Sync {
    /// Every event of the portfolio, ascending by timestamp.
    async fn events(&self, id: PortfolioId) -> event_store::Result<Vec<EventEnvelope>>;
}

#[async_trait]
impl<S: EventStore> PortfolioHistory for S {
    async fn events(&self, id: PortfolioId) -> event_store::Result<Vec<EventEnvelope>> {
        self.history(id.aggregate_id()).await
    }
}
