//! fcx-cache
//!
//! Single-file snapshot store for computed feature datasets.
//!
//! - One JSON envelope per configured path; a save overwrites it in one shot
//!   (temp file in the same directory, then rename). Never appended.
//! - A missing file is an empty cache. An unreadable or undecodable file is
//!   also an empty cache: the error is logged, never returned from [`CacheStore::load`].
//! - Datasets are written column-oriented (name -> ordered values) so the file
//!   does not depend on the in-memory matrix layout.
//!
//! The store is an explicit handle; several stores in one process can target
//! independent paths. No locking: concurrent passes on the same path race.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use fcx_schemas::{CacheSnapshot, ColumnarDataset, Dataset, FeatureCombination};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Envelope layout version written by this crate.
pub const SNAPSHOT_SCHEMA_VERSION: i32 = 1;

// ---------------------------------------------------------------------------
// On-disk envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFile {
    schema_version: i32,
    snapshot_id: Uuid,
    saved_at_utc: DateTime<Utc>,
    combinations: Vec<StoredCombination>,
    datasets: Vec<ColumnarDataset>,
}

/// A combination as found on disk: a token array, or a single comma-joined
/// string written by older tooling. Both decode to the same tuple form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredCombination {
    Tokens(Vec<String>),
    Joined(String),
}

impl StoredCombination {
    fn into_combination(self) -> FeatureCombination {
        match self {
            StoredCombination::Tokens(t) => FeatureCombination::from_tokens(t),
            StoredCombination::Joined(s) => FeatureCombination::parse_joined(&s),
        }
    }
}

/// Metadata about the snapshot currently on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub schema_version: i32,
    pub snapshot_id: Uuid,
    pub saved_at_utc: DateTime<Utc>,
    pub combinations: usize,
    pub datasets: usize,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSnapshotInfo {
    pub path: PathBuf,
    pub snapshot_id: Uuid,
    pub entries: usize,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot; `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<CacheSnapshot>> {
        let Some(file) = self.read_envelope()? else {
            return Ok(None);
        };

        let combinations: Vec<FeatureCombination> = file
            .combinations
            .into_iter()
            .map(StoredCombination::into_combination)
            .collect();

        let mut datasets = Vec::with_capacity(file.datasets.len());
        for (i, stored) in file.datasets.into_iter().enumerate() {
            let d = Dataset::from_columnar(stored)
                .with_context(|| format!("decode dataset #{i} failed: {}", self.path.display()))?;
            datasets.push(d);
        }

        if combinations.len() != datasets.len() {
            warn!(
                path = %self.path.display(),
                combinations = combinations.len(),
                datasets = datasets.len(),
                "cache snapshot is not aligned"
            );
        }

        Ok(Some(CacheSnapshot::new(combinations, datasets)))
    }

    /// Load the snapshot, treating a missing or corrupt file as empty.
    pub fn load(&self) -> CacheSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => CacheSnapshot::empty(),
            Err(e) => {
                error!(path = %self.path.display(), error = %format!("{e:#}"), "load cache snapshot failed");
                CacheSnapshot::empty()
            }
        }
    }

    /// Overwrite the file with `snapshot`.
    pub fn try_save(&self, snapshot: &CacheSnapshot) -> Result<SavedSnapshotInfo> {
        if snapshot.combinations.len() != snapshot.datasets.len() {
            warn!(
                path = %self.path.display(),
                combinations = snapshot.combinations.len(),
                datasets = snapshot.datasets.len(),
                "saving a cache snapshot that is not aligned"
            );
        }

        let file = SnapshotFile {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            snapshot_id: Uuid::new_v4(),
            saved_at_utc: Utc::now(),
            combinations: snapshot
                .combinations
                .iter()
                .map(|c| StoredCombination::Tokens(c.tokens().to_vec()))
                .collect(),
            datasets: snapshot.datasets.iter().map(Dataset::to_columnar).collect(),
        };

        let json = serde_json::to_string_pretty(&file).context("serialize cache snapshot failed")?;
        self.write_atomically(format!("{json}\n").as_bytes())?;

        Ok(SavedSnapshotInfo {
            path: self.path.clone(),
            snapshot_id: file.snapshot_id,
            entries: snapshot.len(),
        })
    }

    /// Overwrite the file with `snapshot`; `false` (and a logged error) on failure.
    ///
    /// After a failure the previous file may or may not still be in place.
    pub fn save(&self, snapshot: &CacheSnapshot) -> bool {
        match self.try_save(snapshot) {
            Ok(saved) => {
                info!(
                    path = %saved.path.display(),
                    snapshot_id = %saved.snapshot_id,
                    entries = saved.entries,
                    "cache snapshot saved"
                );
                true
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %format!("{e:#}"), "save cache snapshot failed");
                false
            }
        }
    }

    /// Envelope metadata, without decoding datasets into matrices.
    pub fn inspect(&self) -> Result<Option<SnapshotInfo>> {
        Ok(self.read_envelope()?.map(|file| SnapshotInfo {
            schema_version: file.schema_version,
            snapshot_id: file.snapshot_id,
            saved_at_utc: file.saved_at_utc,
            combinations: file.combinations.len(),
            datasets: file.datasets.len(),
        }))
    }

    /// Remove the file. Returns whether something was removed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("remove cache snapshot failed: {}", self.path.display()))?;
        Ok(true)
    }

    fn read_envelope(&self) -> Result<Option<SnapshotFile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path)
            .with_context(|| format!("read cache snapshot failed: {}", self.path.display()))?;
        let file: SnapshotFile = serde_json::from_slice(&raw)
            .with_context(|| format!("decode cache snapshot failed: {}", self.path.display()))?;
        if file.schema_version > SNAPSHOT_SCHEMA_VERSION {
            bail!(
                "unsupported cache snapshot schema_version={} (max {}): {}",
                file.schema_version,
                SNAPSHOT_SCHEMA_VERSION,
                self.path.display()
            );
        }
        Ok(Some(file))
    }

    fn write_atomically(&self, bytes: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("create cache dir failed: {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("create temp file failed in: {}", dir.display()))?;
        tmp.write_all(bytes).context("write cache temp file failed")?;
        tmp.as_file().sync_all().context("sync cache temp file failed")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("replace cache snapshot failed: {}", self.path.display()))?;
        Ok(())
    }
}
