//! Read side of the portfolio event log.
//!
//! This crate provides:
//! - [`PortfolioProjection`], the in-memory read model kept current by
//!   applying events and rebuilt from the store on demand
//! - [`SnapshotFile`], the on-disk snapshot of [`ProjectionState`]
//! - [`SnapshotWorker`], which writes that snapshot periodically

pub mod error;
pub mod projection;
pub mod snapshot;
pub mod worker;

pub use error::{ProjectionError, Result};
pub use projection::PortfolioProjection;
pub use snapshot::{ProjectionState, SnapshotFile};
pub use worker::SnapshotWorker;
