//! Projection state and its snapshot file.
//!
//! The snapshot is a single JSON document holding the full projection
//! state. Writes go to a sibling temp file which is then renamed over the
//! target, so a reader never sees a half-written snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::PortfolioId;
use domain::{Address, Portfolio};
use serde::{Deserialize, Serialize};

use crate::Result;

/// The materialized read model.
///
/// Portfolios and the address index are shared behind `Arc`s and mutated
/// copy-on-write, so handing a clone to a reader is cheap and can never
/// expose a later mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionState {
    /// Timestamp of the last applied event; the epoch when nothing was applied.
    pub last_timestamp: DateTime<Utc>,

    pub portfolios: BTreeMap<PortfolioId, Arc<Portfolio>>,

    /// Every address held by a building, across all portfolios.
    pub addresses: Arc<BTreeSet<Address>>,
}

impl ProjectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }
}

/// Location of the projection snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Loads the snapshot.
    ///
    /// Returns `Ok(None)` when the file is missing or does not decode;
    /// both mean a cold start. Other I/O failures are errors.
    pub async fn load(&self) -> Result<Option<ProjectionState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.path.display(),
                    "no projection snapshot, starting cold"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<ProjectionState>(&bytes) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt projection snapshot, starting cold"
                );
                Ok(None)
            }
        }
    }

    /// Writes the snapshot atomically.
    pub async fn save(&self, state: &ProjectionState) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }

        let json = serde_json::to_vec(state)?;
        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Asset, Building};

    fn sample_state() -> ProjectionState {
        let id = PortfolioId::generate();
        let mut portfolio = Portfolio::new(id, "Acme");
        let mut tower = Asset::new("Tower");
        tower
            .buildings
            .push(Building::new(["1 Main St".to_string()].into()));
        portfolio.assets.push(tower);

        ProjectionState {
            last_timestamp: Utc::now(),
            portfolios: [(id, Arc::new(portfolio))].into(),
            addresses: Arc::new(["1 Main St".to_string()].into()),
        }
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("projection.json"));
        let state = sample_state();

        file.save(&state).await.unwrap();
        let loaded = file.load().await.unwrap();

        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn missing_file_is_a_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("missing.json"));

        assert_eq!(file.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projection.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert_eq!(SnapshotFile::new(path).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested/state/projection.json"));

        file.save(&ProjectionState::new()).await.unwrap();

        assert!(file.path().exists());
        assert!(!file.tmp_path().exists());
    }

    #[test]
    fn portfolios_are_keyed_by_id_string() {
        let state = sample_state();
        let (id, _) = state.portfolios.iter().next().unwrap();

        let json = serde_json::to_value(&state).unwrap();

        assert!(json["portfolios"].get(id.to_string()).is_some());
        assert_eq!(json["addresses"], serde_json::json!(["1 Main St"]));
    }
}
