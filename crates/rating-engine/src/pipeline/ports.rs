//! Collaborator interfaces
//!
//! The engine performs no I/O itself. Label discovery, frame loading, rated
//! output and last-rated history are reached through these traits; their
//! failures come back as `anyhow::Error` and are propagated unchanged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rating_common::{FrameRow, RatedBatch};
use serde::Serialize;

/// Frame selection for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameQuery {
    /// Source table
    pub table: String,
    /// Metric column
    pub column: String,
    /// Label columns to return alongside the fixed ones
    pub labels: Vec<String>,
    /// Window start (inclusive)
    pub begin: DateTime<Utc>,
    /// Window end (exclusive)
    pub end: DateTime<Utc>,
}

/// Column listing for source tables
#[async_trait]
pub trait LabelSource: Send + Sync {
    /// All column names of `table`, in table order
    async fn table_columns(&self, table: &str) -> anyhow::Result<Vec<String>>;
}

/// Usage frame loading
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn frames(&self, query: &FrameQuery) -> anyhow::Result<Vec<FrameRow>>;
}

/// Destination of rated batches
#[async_trait]
pub trait RatedSink: Send + Sync {
    /// Store a complete batch. Called at most once per run.
    async fn emit(&self, batch: RatedBatch) -> anyhow::Result<()>;
}

/// Last-rated bookkeeping, owned outside the engine
#[async_trait]
pub trait RatingHistory: Send + Sync {
    /// End of the last rated window for a report, `None` if never rated
    async fn last_rated(&self, report_name: &str) -> anyhow::Result<Option<DateTime<Utc>>>;
}
