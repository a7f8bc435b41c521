//! In-memory validated catalog
//!
//! Holds every known catalog version, sorted by `valid_from`. Versions are
//! never mutated once stored: updates swap in a new list, so a run holding a
//! snapshot keeps a consistent view.
//!
//! A version that failed validation keeps its slot in the timeline. Selecting
//! it yields its [`ConfigurationError`] instead of falling back to a neighbour.

use super::document::CatalogDocument;
use super::selector::select_version_by;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rating_common::{ConfigurationError, Result, RuleCatalogVersion};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One slot of the version timeline
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    Valid(Arc<RuleCatalogVersion>),
    Rejected {
        valid_from: DateTime<Utc>,
        error: ConfigurationError,
    },
}

impl CatalogEntry {
    pub fn valid_from(&self) -> &DateTime<Utc> {
        match self {
            CatalogEntry::Valid(version) => &version.valid_from,
            CatalogEntry::Rejected { valid_from, .. } => valid_from,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, CatalogEntry::Valid(_))
    }

    /// The version, or the error that rejected it
    pub fn version(&self) -> std::result::Result<Arc<RuleCatalogVersion>, ConfigurationError> {
        match self {
            CatalogEntry::Valid(version) => Ok(version.clone()),
            CatalogEntry::Rejected { error, .. } => Err(error.clone()),
        }
    }
}

impl From<RuleCatalogVersion> for CatalogEntry {
    fn from(version: RuleCatalogVersion) -> Self {
        CatalogEntry::Valid(Arc::new(version))
    }
}

/// Immutable view of the catalog at a point in time
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: Arc<Vec<CatalogEntry>>,
}

impl CatalogSnapshot {
    /// Select the version applying to `target`.
    ///
    /// `Ok(None)` on an empty catalog; the stored error when the selected
    /// version was rejected.
    pub fn select(
        &self,
        target: &DateTime<Utc>,
    ) -> std::result::Result<Option<Arc<RuleCatalogVersion>>, ConfigurationError> {
        select_version_by(target, self.entries.as_slice(), CatalogEntry::valid_from)
            .and_then(|index| self.entries.get(index))
            .map(CatalogEntry::version)
            .transpose()
    }

    /// Effective timestamps, ascending
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.entries.iter().map(|e| *e.valid_from()).collect()
    }

    /// Validated versions, ascending
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RuleCatalogVersion>> {
        self.entries.iter().filter_map(|entry| match entry {
            CatalogEntry::Valid(version) => Some(version),
            CatalogEntry::Rejected { .. } => None,
        })
    }

    /// Number of rejected versions
    pub fn rejected(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_valid()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared catalog of rule versions
#[derive(Debug, Default)]
pub struct RatingCatalog {
    current: RwLock<CatalogSnapshot>,
}

impl RatingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a raw document and store the resulting version
    #[instrument(skip(self, raw))]
    pub fn load_document(&self, raw: &Value) -> Result<DateTime<Utc>> {
        let version = CatalogDocument::from_json(raw)?.into_version()?;
        let valid_from = version.valid_from;
        self.upsert(version);
        Ok(valid_from)
    }

    /// Insert a version, replacing any version with the same `valid_from`.
    ///
    /// Returns true when an existing version was replaced.
    pub fn upsert(&self, version: RuleCatalogVersion) -> bool {
        let mut guard = self.current.write();
        let mut entries: Vec<CatalogEntry> = guard.entries.as_ref().clone();

        let valid_from = version.valid_from;
        let position = entries.partition_point(|e| *e.valid_from() < valid_from);
        let replaced = entries
            .get(position)
            .map(|e| *e.valid_from() == valid_from)
            .unwrap_or(false);

        if replaced {
            entries[position] = version.into();
        } else {
            entries.insert(position, version.into());
        }
        *guard = CatalogSnapshot {
            entries: Arc::new(entries),
        };

        debug!(%valid_from, replaced, "Catalog version stored");
        replaced
    }

    /// Remove the version effective from `valid_from`
    pub fn remove(&self, valid_from: &DateTime<Utc>) -> bool {
        let mut guard = self.current.write();
        if !guard.entries.iter().any(|e| e.valid_from() == valid_from) {
            warn!(%valid_from, "Catalog version does not exist, ignoring");
            return false;
        }

        let entries: Vec<_> = guard
            .entries
            .iter()
            .filter(|e| e.valid_from() != valid_from)
            .cloned()
            .collect();
        *guard = CatalogSnapshot {
            entries: Arc::new(entries),
        };
        info!(%valid_from, "Catalog version removed");
        true
    }

    /// Replace the whole catalog, rejected versions included
    pub fn replace_all(&self, mut entries: Vec<CatalogEntry>) {
        entries.sort_by_key(|e| *e.valid_from());
        entries.dedup_by_key(|e| *e.valid_from());
        let snapshot = CatalogSnapshot {
            entries: Arc::new(entries),
        };
        info!(
            versions = snapshot.len(),
            rejected = snapshot.rejected(),
            "Catalog replaced"
        );
        *self.current.write() = snapshot;
    }

    /// Current immutable view
    pub fn snapshot(&self) -> CatalogSnapshot {
        self.current.read().clone()
    }

    /// Select the version applying to `target` in the current view
    pub fn select(
        &self,
        target: &DateTime<Utc>,
    ) -> std::result::Result<Option<Arc<RuleCatalogVersion>>, ConfigurationError> {
        self.snapshot().select(target)
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }
}
