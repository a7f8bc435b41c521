//! In-memory collaborators
//!
//! Used by tests, benchmarks and local dry runs.

use super::ports::{FrameQuery, FrameSource, LabelSource, RatedSink, RatingHistory};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rating_common::{FrameRow, RatedBatch};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<FrameRow>,
}

/// Tables of frame rows, served as both label and frame source
#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    tables: RwLock<HashMap<String, Table>>,
    queries: RwLock<Vec<FrameQuery>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Columns are the row keys in order of first appearance.
    pub fn insert_table(&self, table: impl Into<String>, rows: Vec<FrameRow>) {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.keys() {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        self.tables
            .write()
            .insert(table.into(), Table { columns, rows });
    }

    /// Frame queries received so far
    pub fn queries(&self) -> Vec<FrameQuery> {
        self.queries.read().clone()
    }
}

#[async_trait]
impl LabelSource for InMemoryWarehouse {
    async fn table_columns(&self, table: &str) -> anyhow::Result<Vec<String>> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| anyhow!("table {} does not exist", table))
    }
}

#[async_trait]
impl FrameSource for InMemoryWarehouse {
    async fn frames(&self, query: &FrameQuery) -> anyhow::Result<Vec<FrameRow>> {
        self.queries.write().push(query.clone());
        self.tables
            .read()
            .get(&query.table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| anyhow!("table {} does not exist", query.table))
    }
}

/// Sink keeping every emitted batch
#[derive(Debug, Default)]
pub struct InMemorySink {
    batches: RwLock<Vec<RatedBatch>>,
    failure: Option<String>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink rejecting every batch with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            batches: RwLock::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn batches(&self) -> Vec<RatedBatch> {
        self.batches.read().clone()
    }
}

#[async_trait]
impl RatedSink for InMemorySink {
    async fn emit(&self, batch: RatedBatch) -> anyhow::Result<()> {
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }
        self.batches.write().push(batch);
        Ok(())
    }
}

/// Last-rated timestamps by report
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    last_rated: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, report_name: impl Into<String>, at: DateTime<Utc>) {
        self.last_rated.write().insert(report_name.into(), at);
    }
}

#[async_trait]
impl RatingHistory for InMemoryHistory {
    async fn last_rated(&self, report_name: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.last_rated.read().get(report_name).copied())
    }
}
