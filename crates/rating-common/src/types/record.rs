//! Rated output records

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// A frame after pricing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedRecord {
    pub frame_begin: String,
    pub frame_end: String,
    pub namespace: String,
    pub node: String,
    pub metric: String,
    pub pod: String,
    /// Quantity in the rating unit
    pub converted_quantity: f64,
    /// `None` when no rate applies. Not the same as zero.
    pub rated_amount: Option<f64>,
    /// JSON descriptor of the matched label set
    pub matched_label_set: String,
}

impl RatedRecord {
    pub fn is_priced(&self) -> bool {
        self.rated_amount.is_some()
    }
}

/// Output of one rating run, handed to the sink in a single call
#[derive(Debug, Clone, Serialize)]
pub struct RatedBatch {
    /// Batch ID
    pub batch_id: Uuid,
    pub rated_records: Vec<RatedRecord>,
    /// Namespaces in order of first appearance
    pub distinct_namespaces: Vec<String>,
    pub report_name: String,
    pub metric_name: String,
    pub run_timestamp: DateTime<Utc>,
    #[serde(skip)]
    seen_namespaces: HashSet<String>,
}

impl RatedBatch {
    pub fn new(
        report_name: impl Into<String>,
        metric_name: impl Into<String>,
        run_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            rated_records: Vec::new(),
            distinct_namespaces: Vec::new(),
            report_name: report_name.into(),
            metric_name: metric_name.into(),
            run_timestamp,
            seen_namespaces: HashSet::new(),
        }
    }

    /// Append a record and track its namespace
    pub fn push(&mut self, record: RatedRecord) {
        if self.seen_namespaces.insert(record.namespace.clone()) {
            self.distinct_namespaces.push(record.namespace.clone());
        }
        self.rated_records.push(record);
    }

    /// Number of records without a rate
    pub fn unpriced(&self) -> usize {
        self.rated_records.iter().filter(|r| !r.is_priced()).count()
    }

    pub fn len(&self) -> usize {
        self.rated_records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rated_records.is_empty()
    }
}
