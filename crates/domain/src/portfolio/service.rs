//! Portfolio service: validates requests against the read model and emits events.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::PortfolioId;
use event_store::{EventEnvelope, EventStoreError};
use tokio::sync::Mutex;

use crate::clock::EventClock;
use crate::dispatcher::DomainEventDispatcher;
use crate::error::{PortfolioError, Result};

use super::{
    Address, Asset, Building, Portfolio, PortfolioEvent, PortfolioHistory, PortfolioRepository,
};

/// Service for managing portfolios.
///
/// Validations read the repository, never the store. Validation and
/// emission run under one lock, so two requests cannot both pass a
/// uniqueness check and both emit, and events leave the service in
/// timestamp order.
pub struct PortfolioService {
    dispatcher: Arc<dyn DomainEventDispatcher>,
    repository: Arc<dyn PortfolioRepository>,
    history: Arc<dyn PortfolioHistory>,
    clock: Mutex<EventClock>,
}

impl PortfolioService {
    pub fn new(
        dispatcher: Arc<dyn DomainEventDispatcher>,
        repository: Arc<dyn PortfolioRepository>,
        history: Arc<dyn PortfolioHistory>,
    ) -> Self {
        Self {
            dispatcher,
            repository,
            history,
            clock: Mutex::new(EventClock::new()),
        }
    }

    /// Returns the portfolio with the given id.
    #[tracing::instrument(skip(self))]
    pub async fn get_portfolio(&self, id: PortfolioId) -> Result<Arc<Portfolio>> {
        self.existing(id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all_portfolios(&self) -> Vec<Arc<Portfolio>> {
        self.repository.all().await
    }

    /// Returns every recorded event of the portfolio, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_portfolio_history(&self, id: PortfolioId) -> Result<Vec<EventEnvelope>> {
        Ok(self.history.events(id).await?)
    }

    /// Creates a portfolio under a freshly drawn id.
    #[tracing::instrument(skip(self))]
    pub async fn create_portfolio(&self, name: String) -> Result<PortfolioId> {
        let mut clock = self.clock.lock().await;

        let mut id = PortfolioId::generate();
        while self.repository.exists(id).await {
            tracing::debug!(%id, "portfolio id collision, drawing again");
            id = PortfolioId::generate();
        }

        self.emit(&mut clock, id, PortfolioEvent::portfolio_created(name))
            .await?;
        Ok(id)
    }

    /// Adds an empty asset to a portfolio.
    #[tracing::instrument(skip(self))]
    pub async fn create_asset(&self, portfolio_id: PortfolioId, name: String) -> Result<Asset> {
        let mut clock = self.clock.lock().await;

        let portfolio = self.existing(portfolio_id).await?;
        if portfolio.has_asset(&name) {
            return Err(PortfolioError::AssetAlreadyExists { portfolio_id, name });
        }

        self.emit(&mut clock, portfolio_id, PortfolioEvent::asset_created(name.clone()))
            .await?;
        Ok(Asset::new(name))
    }

    /// Adds a building to an asset, claiming its addresses.
    #[tracing::instrument(skip(self))]
    pub async fn create_building(
        &self,
        portfolio_id: PortfolioId,
        asset_name: String,
        addresses: BTreeSet<Address>,
    ) -> Result<Building> {
        let mut clock = self.clock.lock().await;

        let portfolio = self.existing(portfolio_id).await?;
        if !portfolio.has_asset(&asset_name) {
            return Err(PortfolioError::AssetNotFound {
                portfolio_id,
                name: asset_name,
            });
        }

        let taken = self.repository.addresses().await;
        let conflicting: BTreeSet<Address> = addresses.intersection(&taken).cloned().collect();
        if !conflicting.is_empty() {
            return Err(PortfolioError::AddressAlreadyTaken {
                addresses: conflicting,
            });
        }

        self.emit(
            &mut clock,
            portfolio_id,
            PortfolioEvent::building_created(asset_name, addresses.clone()),
        )
        .await?;
        Ok(Building::new(addresses))
    }

    /// Resets a portfolio to its state as of `timestamp`.
    ///
    /// The read model performs the reconstruction when it applies the
    /// emitted event.
    #[tracing::instrument(skip(self))]
    pub async fn rollback_portfolio(
        &self,
        portfolio_id: PortfolioId,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let mut clock = self.clock.lock().await;

        self.existing(portfolio_id).await?;
        if timestamp > Utc::now() {
            return Err(PortfolioError::InvalidRollbackTimestamp { timestamp });
        }

        self.emit(
            &mut clock,
            portfolio_id,
            PortfolioEvent::portfolio_rollbacked(timestamp),
        )
        .await
    }

    async fn existing(&self, id: PortfolioId) -> Result<Arc<Portfolio>> {
        self.repository
            .get(id)
            .await
            .ok_or(PortfolioError::PortfolioNotFound(id))
    }

    async fn emit(
        &self,
        clock: &mut EventClock,
        portfolio_id: PortfolioId,
        event: PortfolioEvent,
    ) -> Result<()> {
        let envelope = event
            .to_envelope(portfolio_id, clock.next())
            .map_err(EventStoreError::from)?;
        self.dispatcher.dispatch(envelope).await?;
        Ok(())
    }
}
