//! Domain layer for the portfolio event log.
//!
//! This crate provides:
//! - the portfolio model (portfolios, assets, buildings, addresses)
//! - typed [`PortfolioEvent`]s and their mapping onto store envelopes
//! - the [`DomainEventDispatcher`] fan-out seam and its in-memory bus
//! - [`PortfolioService`], which validates against the read model and emits events

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod portfolio;

pub use clock::EventClock;
pub use dispatcher::{DomainEventDispatcher, EventBus, EventHandler, StoreWriter};
pub use error::{ErrorKind, PortfolioError, Result};
pub use event::DomainEvent;
pub use portfolio::{
    Address, Asset, AssetCreatedData, Building, BuildingCreatedData, Portfolio,
    PortfolioCreatedData, PortfolioEvent, PortfolioHistory, PortfolioRepository,
    PortfolioRollbackedData, PortfolioService,
};

pub use common::PortfolioId;
