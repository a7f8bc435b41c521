//! Metric definitions
//!
//! A metric definition tells the engine where a metric lives (table and
//! column), which report produces it, and which unit it is measured in.

use super::units::MetricUnit;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A validated metric definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Report producing this metric
    pub report_name: String,
    /// Table holding the frames
    pub source_table: String,
    /// Column holding the measured quantity
    pub source_column: String,
    /// Unit of the measured quantity
    pub unit: MetricUnit,
}

/// Ordered collection of metric definitions keyed by metric name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricDefinitions {
    entries: Vec<(String, MetricDefinition)>,
}

impl MetricDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition. Callers are expected to have rejected duplicates.
    pub fn push(&mut self, metric: impl Into<String>, definition: MetricDefinition) {
        self.entries.push((metric.into(), definition));
    }

    pub fn get(&self, metric: &str) -> Option<&MetricDefinition> {
        self.entries
            .iter()
            .find(|(name, _)| name == metric)
            .map(|(_, def)| def)
    }

    /// Find the first metric produced by the given report
    pub fn find_by_report(&self, report_name: &str) -> Option<(&str, &MetricDefinition)> {
        self.entries
            .iter()
            .find(|(_, def)| def.report_name == report_name)
            .map(|(name, def)| (name.as_str(), def))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricDefinition)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetricDefinitions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, def) in &self.entries {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

/// Fully merged configuration for one rating run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricConfig {
    /// Metric name being rated
    pub metric: String,
    /// Report the metric belongs to
    pub report_name: String,
    /// Table to read frames from
    pub source_table: String,
    /// Column holding the quantity
    pub source_column: String,
    /// Unit of the quantity
    pub unit: MetricUnit,
    /// Window start (inclusive)
    pub begin: DateTime<Utc>,
    /// Window end (exclusive)
    pub end: DateTime<Utc>,
}

impl MetricConfig {
    /// Merge a definition with a run window
    pub fn from_definition(
        metric: &str,
        definition: &MetricDefinition,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            metric: metric.to_string(),
            report_name: definition.report_name.clone(),
            source_table: definition.source_table.clone(),
            source_column: definition.source_column.clone(),
            unit: definition.unit,
            begin,
            end,
        }
    }

    /// Override the source table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.source_table = table.into();
        self
    }
}
