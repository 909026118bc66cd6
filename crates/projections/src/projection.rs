//! The portfolio read model.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::PortfolioId;
use domain::{
    Address, Asset, AssetCreatedData, Building, BuildingCreatedData, EventHandler, Portfolio,
    PortfolioCreatedData, PortfolioEvent, PortfolioRepository, PortfolioRollbackedData,
};
use event_store::{EventEnvelope, EventStore, FindQuery};
use tokio::sync::RwLock;

use crate::Result;
use crate::snapshot::{ProjectionState, SnapshotFile};

/// In-memory mirror of the portfolio state recorded in the store.
///
/// Every mutation happens under the write lock, one event at a time, so
/// applications never interleave. Events older than the last applied one
/// are dropped; every handler tolerates seeing the same event twice.
pub struct PortfolioProjection<S: EventStore> {
    store: S,
    snapshot: Option<SnapshotFile>,
    state: RwLock<ProjectionState>,
}

impl<S: EventStore> PortfolioProjection<S> {
    /// Creates an empty projection over `store` with no snapshot file.
    pub fn new(store: S) -> Self {
        Self {
            store,
            snapshot: None,
            state: RwLock::new(ProjectionState::new()),
        }
    }

    /// Persists snapshots to (and restores them from) `file`.
    pub fn with_snapshot_file(mut self, file: SnapshotFile) -> Self {
        self.snapshot = Some(file);
        self
    }

    pub fn snapshot_file(&self) -> Option<&SnapshotFile> {
        self.snapshot.as_ref()
    }

    pub async fn portfolio(&self, id: PortfolioId) -> Option<Arc<Portfolio>> {
        self.state.read().await.portfolios.get(&id).cloned()
    }

    pub async fn portfolios(&self) -> BTreeMap<PortfolioId, Arc<Portfolio>> {
        self.state.read().await.portfolios.clone()
    }

    pub async fn addresses(&self) -> Arc<BTreeSet<Address>> {
        self.state.read().await.addresses.clone()
    }

    pub async fn last_timestamp(&self) -> DateTime<Utc> {
        self.state.read().await.last_timestamp
    }

    /// Returns a point-in-time copy of the whole state.
    pub async fn state(&self) -> ProjectionState {
        self.state.read().await.clone()
    }

    /// Applies one event.
    ///
    /// Fails only when a rollback cannot read the portfolio's history.
    pub async fn apply(&self, event: &EventEnvelope) -> event_store::Result<()> {
        let mut state = self.state.write().await;
        self.apply_to(&mut state, event).await
    }

    /// Applies events in order.
    pub async fn apply_all<'a>(
        &self,
        events: impl IntoIterator<Item = &'a EventEnvelope>,
    ) -> event_store::Result<usize> {
        let mut state = self.state.write().await;
        let mut count = 0;
        for event in events {
            self.apply_to(&mut state, event).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Restores the snapshot, if any, then catches up with the store.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let restored = match &self.snapshot {
            Some(file) => file.load().await?,
            None => None,
        };

        let mut state = self.state.write().await;
        if let Some(snapshot) = restored {
            tracing::info!(
                last_timestamp = %snapshot.last_timestamp,
                portfolios = snapshot.portfolios.len(),
                "restored projection snapshot"
            );
            *state = snapshot;
        }

        let events = self
            .store
            .find(FindQuery::since(state.last_timestamp))
            .await?;
        for event in &events {
            self.apply_to(&mut state, event).await?;
        }

        tracing::info!(
            events_applied = events.len(),
            portfolios = state.portfolios.len(),
            "projection initialized"
        );
        Ok(())
    }

    /// Discards all state and rebuilds it from the full store.
    #[tracing::instrument(skip(self))]
    pub async fn replay(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = ProjectionState::new();

        let events = self.store.find(FindQuery::all()).await?;
        for event in &events {
            self.apply_to(&mut state, event).await?;
        }

        tracing::info!(events_applied = events.len(), "projection replayed");
        Ok(())
    }

    /// Writes the current state to the snapshot file.
    pub async fn save_snapshot(&self) -> Result<()> {
        let Some(file) = &self.snapshot else {
            return Ok(());
        };
        let state = self.state().await;
        file.save(&state).await?;
        tracing::debug!(
            path = %file.path().display(),
            last_timestamp = %state.last_timestamp,
            "projection snapshot saved"
        );
        Ok(())
    }

    async fn apply_to(
        &self,
        state: &mut ProjectionState,
        event: &EventEnvelope,
    ) -> event_store::Result<()> {
        if event.timestamp < state.last_timestamp {
            tracing::debug!(
                name = %event.name,
                timestamp = %event.timestamp,
                last_timestamp = %state.last_timestamp,
                "dropping out-of-order event"
            );
            metrics::counter!("projection_events_dropped").increment(1);
            return Ok(());
        }

        let id = PortfolioId::from(event.aggregate_id);
        // The first event read back after a snapshot shares its timestamp.
        let reapplied = event.timestamp == state.last_timestamp;
        match PortfolioEvent::from_envelope(event) {
            Ok(Some(PortfolioEvent::PortfolioCreated(data))) => {
                portfolio_created(state, id, data, reapplied)
            }
            Ok(Some(PortfolioEvent::AssetCreated(data))) => {
                asset_created(state, id, data, reapplied)
            }
            Ok(Some(PortfolioEvent::BuildingCreated(data))) => {
                building_created(state, id, data, reapplied)
            }
            Ok(Some(PortfolioEvent::PortfolioRollbacked(data))) => {
                self.rollback(state, id, event.timestamp, data).await?
            }
            Ok(None) => tracing::warn!(name = %event.name, "ignoring unknown event"),
            Err(e) => {
                tracing::error!(name = %event.name, %id, error = %e, "ignoring malformed event");
            }
        }

        state.last_timestamp = event.timestamp;
        metrics::counter!("projection_events_applied").increment(1);
        Ok(())
    }

    /// Resets one portfolio to its state as of `data.timestamp`.
    ///
    /// The portfolio's events strictly before the rollback event and not
    /// after the target are folded into a fresh portfolio. Other portfolios
    /// are untouched.
    async fn rollback(
        &self,
        state: &mut ProjectionState,
        id: PortfolioId,
        rollback_at: DateTime<Utc>,
        data: PortfolioRollbackedData,
    ) -> event_store::Result<()> {
        if let Some(current) = state.portfolios.remove(&id) {
            let addresses = Arc::make_mut(&mut state.addresses);
            for address in current.addresses() {
                addresses.remove(address);
            }
        }

        let history = self
            .store
            .find(FindQuery::by_aggregate_up_to(id.aggregate_id(), data.timestamp))
            .await?;
        let end = history.partition_point(|e| e.timestamp < rollback_at);

        match fold_history(id, &history[..end]) {
            Some(portfolio) => install(state, portfolio),
            None => tracing::info!(%id, "rollback removed portfolio"),
        }

        tracing::info!(%id, target = %data.timestamp, events = end, "portfolio rolled back");
        metrics::counter!("projection_rollbacks").increment(1);
        Ok(())
    }
}

fn portfolio_created(
    state: &mut ProjectionState,
    id: PortfolioId,
    data: PortfolioCreatedData,
    reapplied: bool,
) {
    if let Some(existing) = state.portfolios.get(&id) {
        if reapplied && existing.name == data.name {
            tracing::debug!(%id, "portfolio already applied");
        } else {
            tracing::error!(%id, "portfolio already exists");
        }
        return;
    }
    state
        .portfolios
        .insert(id, Arc::new(Portfolio::new(id, data.name)));
}

fn asset_created(
    state: &mut ProjectionState,
    id: PortfolioId,
    data: AssetCreatedData,
    reapplied: bool,
) {
    let Some(portfolio) = state.portfolios.get_mut(&id) else {
        tracing::error!(%id, asset = %data.name, "asset for unknown portfolio");
        return;
    };
    if portfolio.has_asset(&data.name) {
        if reapplied {
            tracing::debug!(%id, asset = %data.name, "asset already applied");
        } else {
            tracing::error!(%id, asset = %data.name, "asset already exists");
        }
        return;
    }
    Arc::make_mut(portfolio)
        .assets
        .push(Asset::new(data.name));
}

fn building_created(
    state: &mut ProjectionState,
    id: PortfolioId,
    data: BuildingCreatedData,
    reapplied: bool,
) {
    let Some(portfolio) = state.portfolios.get_mut(&id) else {
        tracing::error!(%id, asset = %data.asset_name, "building for unknown portfolio");
        return;
    };
    let building = Building::new(data.addresses);
    let Some(asset) = portfolio.assets.iter().find(|a| a.name == data.asset_name) else {
        tracing::error!(%id, asset = %data.asset_name, "building for unknown asset");
        return;
    };
    // An asset's buildings form a set.
    if asset.buildings.contains(&building) {
        if reapplied {
            tracing::debug!(%id, asset = %data.asset_name, "building already applied");
        } else {
            tracing::warn!(%id, asset = %data.asset_name, "building already exists");
        }
        return;
    }
    if let Some(taken) = building.addresses.iter().find(|a| state.addresses.contains(*a)) {
        tracing::error!(%id, address = %taken, "building address already taken");
        return;
    }

    Arc::make_mut(&mut state.addresses).extend(building.addresses.iter().cloned());
    if let Some(asset) = Arc::make_mut(portfolio).asset_mut(&data.asset_name) {
        asset.buildings.push(building);
    }
}

/// Installs a rebuilt portfolio, dropping buildings whose addresses are
/// now held elsewhere.
fn install(state: &mut ProjectionState, mut portfolio: Portfolio) {
    let id = portfolio.id;
    let addresses = Arc::make_mut(&mut state.addresses);
    for Asset { name, buildings } in &mut portfolio.assets {
        buildings.retain(|building| {
            if let Some(taken) = building.addresses.iter().find(|a| addresses.contains(*a)) {
                tracing::error!(
                    %id,
                    asset = %name,
                    address = %taken,
                    "dropping restored building, address taken by another portfolio"
                );
                return false;
            }
            addresses.extend(building.addresses.iter().cloned());
            true
        });
    }
    state.portfolios.insert(id, Arc::new(portfolio));
}

/// Folds one portfolio's events, oldest first, into its resulting state.
///
/// A nested rollback restarts from the fold of the events before it that
/// are not after its target.
fn fold_history(id: PortfolioId, events: &[EventEnvelope]) -> Option<Portfolio> {
    let mut portfolio: Option<Portfolio> = None;

    for (index, event) in events.iter().enumerate() {
        let Ok(Some(decoded)) = PortfolioEvent::from_envelope(event) else {
            continue;
        };
        match decoded {
            PortfolioEvent::PortfolioCreated(data) => {
                if portfolio.is_none() {
                    portfolio = Some(Portfolio::new(id, data.name));
                }
            }
            PortfolioEvent::AssetCreated(data) => {
                if let Some(p) = portfolio.as_mut()
                    && !p.has_asset(&data.name)
                {
                    p.assets.push(Asset::new(data.name));
                }
            }
            PortfolioEvent::BuildingCreated(data) => {
                if let Some(p) = portfolio.as_mut() {
                    let owned: BTreeSet<&Address> = p.addresses().collect();
                    let clashes = data.addresses.iter().any(|a| owned.contains(a));
                    let building = Building::new(data.addresses);
                    if !clashes
                        && let Some(asset) = p.asset_mut(&data.asset_name)
                        && !asset.buildings.contains(&building)
                    {
                        asset.buildings.push(building);
                    }
                }
            }
            PortfolioEvent::PortfolioRollbacked(data) => {
                let before = &events[..index];
                let end = before.partition_point(|e| e.timestamp <= data.timestamp);
                portfolio = fold_history(id, &before[..end]);
            }
        }
    }

    portfolio
}

#[async_trait]
impl<S: EventStore> EventHandler for PortfolioProjection<S> {
    fn name(&self) -> &'static str {
        "PortfolioProjection"
    }

    fn matches(&self, _event: &EventEnvelope) -> bool {
        true
    }

    async fn handle(&self, event: &EventEnvelope) -> event_store::Result<()> {
        self.apply(event).await
    }
}

#[async_trait]
impl<S: EventStore> PortfolioRepository for PortfolioProjection<S> {
    async fn get(&self, id: PortfolioId) -> Option<Arc<Portfolio>> {
        self.portfolio(id).await
    }

    async fn all(&self) -> Vec<Arc<Portfolio>> {
        self.state.read().await.portfolios.values().cloned().collect()
    }

    async fn addresses(&self) -> Arc<BTreeSet<Address>> {
        PortfolioProjection::addresses(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    fn envelope(id: PortfolioId, seconds: i64, event: PortfolioEvent) -> EventEnvelope {
        event.to_envelope(id, at(seconds)).unwrap()
    }

    fn addresses(items: &[&str]) -> BTreeSet<Address> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn out_of_order_event_is_dropped() {
        let projection = PortfolioProjection::new(InMemoryEventStore::new());
        let id = PortfolioId::generate();

        projection
            .apply(&envelope(id, 5, PortfolioEvent::portfolio_created("Acme")))
            .await
            .unwrap();
        projection
            .apply(&envelope(id, 3, PortfolioEvent::asset_created("Tower")))
            .await
            .unwrap();

        assert_eq!(projection.last_timestamp().await, at(5));
        assert!(projection.portfolio(id).await.unwrap().assets.is_empty());
    }

    #[tokio::test]
    async fn applying_the_same_event_twice_is_a_no_op() {
        let projection = PortfolioProjection::new(InMemoryEventStore::new());
        let id = PortfolioId::generate();
        let events = [
            envelope(id, 1, PortfolioEvent::portfolio_created("Acme")),
            envelope(id, 2, PortfolioEvent::asset_created("Tower")),
            envelope(
                id,
                3,
                PortfolioEvent::building_created("Tower", addresses(&["1 Main St"])),
            ),
        ];

        for event in &events {
            projection.apply(event).await.unwrap();
            let before = projection.state().await;
            projection.apply(event).await.unwrap();
            assert_eq!(projection.state().await, before);
        }
    }

    #[tokio::test]
    async fn events_for_missing_portfolio_or_asset_are_ignored() {
        let projection = PortfolioProjection::new(InMemoryEventStore::new());
        let id = PortfolioId::generate();

        projection
            .apply(&envelope(id, 1, PortfolioEvent::asset_created("Tower")))
            .await
            .unwrap();
        projection
            .apply(&envelope(id, 2, PortfolioEvent::portfolio_created("Acme")))
            .await
            .unwrap();
        projection
            .apply(&envelope(
                id,
                3,
                PortfolioEvent::building_created("Missing", addresses(&["1 Main St"])),
            ))
            .await
            .unwrap();

        let portfolio = projection.portfolio(id).await.unwrap();
        assert!(portfolio.assets.is_empty());
        assert!(projection.addresses().await.is_empty());
        assert_eq!(projection.last_timestamp().await, at(3));
    }

    #[tokio::test]
    async fn unknown_events_advance_the_timestamp() {
        let projection = PortfolioProjection::new(InMemoryEventStore::new());
        let event = EventEnvelope::new(
            "PortfolioRenamed",
            PortfolioId::generate().aggregate_id(),
            at(7),
            serde_json::json!({"name": "New"}),
        );

        projection.apply(&event).await.unwrap();

        assert_eq!(projection.last_timestamp().await, at(7));
        assert!(projection.state().await.is_empty());
    }

    #[tokio::test]
    async fn readers_keep_their_copy() {
        let projection = PortfolioProjection::new(InMemoryEventStore::new());
        let id = PortfolioId::generate();
        projection
            .apply(&envelope(id, 1, PortfolioEvent::portfolio_created("Acme")))
            .await
            .unwrap();

        let held = projection.portfolio(id).await.unwrap();
        let held_addresses = projection.addresses().await;
        projection
            .apply(&envelope(id, 2, PortfolioEvent::asset_created("Tower")))
            .await
            .unwrap();
        projection
            .apply(&envelope(
                id,
                3,
                PortfolioEvent::building_created("Tower", addresses(&["1 Main St"])),
            ))
            .await
            .unwrap();

        assert!(held.assets.is_empty());
        assert!(held_addresses.is_empty());
        assert_eq!(projection.portfolio(id).await.unwrap().assets.len(), 1);
    }

    #[test]
    fn fold_applies_nested_rollbacks() {
        let id = PortfolioId::generate();
        let events = vec![
            envelope(id, 1, PortfolioEvent::portfolio_created("Acme")),
            envelope(id, 2, PortfolioEvent::asset_created("Tower")),
            envelope(
                id,
                3,
                PortfolioEvent::building_created("Tower", addresses(&["1 Main St"])),
            ),
            envelope(id, 4, PortfolioEvent::portfolio_rollbacked(at(2))),
            envelope(id, 5, PortfolioEvent::asset_created("Annex")),
        ];

        let portfolio = fold_history(id, &events).unwrap();

        let names: Vec<_> = portfolio.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Tower", "Annex"]);
        assert!(portfolio.asset("Tower").unwrap().buildings.is_empty());
    }

    #[test]
    fn fold_before_creation_is_empty() {
        let id = PortfolioId::generate();
        let events = vec![
            envelope(id, 1, PortfolioEvent::portfolio_created("Acme")),
            envelope(id, 2, PortfolioEvent::portfolio_rollbacked(at(0))),
        ];

        assert_eq!(fold_history(id, &events), None);
    }

    #[tokio::test]
    async fn building_without_addresses_applies_once() {
        let projection = PortfolioProjection::new(InMemoryEventStore::new());
        let id = PortfolioId::generate();
        let building = envelope(id, 3, PortfolioEvent::building_created("Tower", BTreeSet::new()));
        projection
            .apply(&envelope(id, 1, PortfolioEvent::portfolio_created("Acme")))
            .await
            .unwrap();
        projection
            .apply(&envelope(id, 2, PortfolioEvent::asset_created("Tower")))
            .await
            .unwrap();

        projection.apply(&building).await.unwrap();
        let before = projection.state().await;
        projection.apply(&building).await.unwrap();

        assert_eq!(projection.state().await, before);
        let portfolio = projection.portfolio(id).await.unwrap();
        assert_eq!(portfolio.asset("Tower").unwrap().buildings.len(), 1);
    }

    #[test]
    fn fold_keeps_one_copy_of_a_repeated_building() {
        let id = PortfolioId::generate();
        let events = vec![
            envelope(id, 1, PortfolioEvent::portfolio_created("Acme")),
            envelope(id, 2, PortfolioEvent::asset_created("Tower")),
            envelope(id, 3, PortfolioEvent::building_created("Tower", BTreeSet::new())),
            envelope(id, 4, PortfolioEvent::building_created("Tower", BTreeSet::new())),
        ];

        let portfolio = fold_history(id, &events).unwrap();

        assert_eq!(portfolio.asset("Tower").unwrap().buildings.len(), 1);
    }
}
