// src/store/mod.rs
//! Persisted set of accepted listings, keyed by `IdentityKey`.
//!
//! The whole map is read once at start and written whole at checkpoints. Reads
//! never fail: a missing file is an empty store, an unreadable or corrupt one is
//! logged and also treated as empty (every listing in that run counts as new).
//! Writes go to `<path>.tmp` and are renamed over the target so an interrupted
//! run cannot truncate the previous state.

pub mod lock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::classify::Verdict;
use crate::ingest::identity::IdentityKey;
use crate::ingest::types::Listing;

pub use lock::RunLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("another run holds the lock at {path} (since {since})")]
    Locked { path: PathBuf, since: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One accepted listing with its verdict. Written once, never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub key: IdentityKey,
    pub listing: Listing,
    pub verdict: Verdict,
    pub first_seen_at: DateTime<Utc>,
}

impl SeenRecord {
    pub fn new(listing: Listing, verdict: Verdict, first_seen_at: DateTime<Utc>) -> Self {
        Self {
            key: IdentityKey::of(&listing),
            listing,
            verdict,
            first_seen_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
    records: HashMap<IdentityKey, SeenRecord>,
}

impl SeenStore {
    /// Empty store backed by `path` (nothing is read).
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: HashMap::new(),
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no seen-store yet, starting empty");
                return Self::empty(path);
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "seen-store unreadable, starting empty"
                );
                return Self::empty(path);
            }
        };

        match serde_json::from_str::<HashMap<IdentityKey, SeenRecord>>(&content) {
            Ok(records) => {
                tracing::info!(path = %path.display(), count = records.len(), "loaded seen-store");
                Self { path, records }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "seen-store corrupt, starting empty"
                );
                Self::empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&SeenRecord> {
        self.records.get(key)
    }

    /// Upsert by `record.key`.
    pub fn insert(&mut self, record: SeenRecord) {
        self.records.insert(record.key.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New store holding only records with `now - first_seen_at <= max_age_days`.
    pub fn prune(&self, max_age_days: i64, now: DateTime<Utc>) -> SeenStore {
        // a window too large for `Duration` keeps everything
        let max_age = Duration::try_days(max_age_days.max(0));
        let records: HashMap<_, _> = self
            .records
            .iter()
            .filter(|(_, r)| {
                max_age.map_or(true, |max| now.signed_duration_since(r.first_seen_at) <= max)
            })
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();
        let removed = self.records.len() - records.len();
        if removed > 0 {
            tracing::info!(removed, kept = records.len(), "pruned old listings");
        }
        SeenStore {
            path: self.path.clone(),
            records,
        }
    }

    /// Records first seen within the last `days` days.
    pub fn recent(&self, days: i64, now: DateTime<Utc>) -> Vec<&SeenRecord> {
        let cutoff = Duration::try_days(days.max(0)).and_then(|d| now.checked_sub_signed(d));
        self.records
            .values()
            .filter(|r| cutoff.map_or(true, |c| r.first_seen_at >= c))
            .collect()
    }

    /// All records, highest score first, then newest first.
    pub fn records(&self) -> Vec<&SeenRecord> {
        let mut v: Vec<_> = self.records.values().collect();
        v.sort_by(|a, b| {
            b.verdict
                .score
                .cmp(&a.verdict.score)
                .then(b.first_seen_at.cmp(&a.first_seen_at))
                .then(a.key.cmp(&b.key))
        });
        v
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        let json = serde_json::to_vec_pretty(&self.records)?;
        let tmp = tmp_path(&self.path);
        {
            let mut f = fs::File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
            f.write_all(&json).map_err(|e| StoreError::io(&tmp, e))?;
            f.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        tracing::debug!(
            path = %self.path.display(),
            count = self.records.len(),
            "seen-store persisted"
        );
        Ok(())
    }
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
