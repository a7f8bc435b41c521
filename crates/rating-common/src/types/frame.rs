//! Usage frames
//!
//! A frame is one row of metered usage for a time window and a
//! namespace/node/pod, plus an open set of dimension labels.

use super::labels::{LabelSet, LabelValue};
use crate::error::{RatingError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Columns present on every source table. Never treated as labels.
pub const FIXED_COLUMNS: [&str; 5] = ["period_start", "period_end", "pod", "namespace", "node"];

/// Raw frame row as returned by the frame source, in column order
pub type FrameRow = Map<String, Value>;

/// Whether a column is a fixed column or the metric column itself
pub fn is_reserved_column(name: &str, metric_column: &str) -> bool {
    name == metric_column || FIXED_COLUMNS.contains(&name)
}

/// A typed usage frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageFrame {
    pub period_start: String,
    pub period_end: String,
    pub namespace: String,
    pub node: String,
    pub pod: String,
    /// Raw measured quantity, in the metric's unit
    pub quantity: f64,
    /// Dimension labels, restricted to the discovered label names
    pub labels: LabelSet,
}

impl UsageFrame {
    /// Type a raw row.
    ///
    /// Only columns listed in `label_names` (and neither fixed nor the metric
    /// column) become labels. Null label values are dropped.
    pub fn from_row(row: &FrameRow, metric_column: &str, label_names: &[String]) -> Result<Self> {
        let quantity = match row.get(metric_column) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            RatingError::Frame(format!(
                "column {} is missing or not numeric: {:?}",
                metric_column,
                row.get(metric_column)
            ))
        })?;

        let mut labels = LabelSet::new();
        for (name, value) in row {
            if is_reserved_column(name, metric_column) || !label_names.iter().any(|l| l == name) {
                continue;
            }
            match LabelValue::from_json(value) {
                Ok(Some(label)) => labels.insert(name.clone(), label),
                Ok(None) => {}
                Err(raw) => {
                    return Err(RatingError::Frame(format!(
                        "label {} is not a scalar: {}",
                        name, raw
                    )))
                }
            }
        }

        Ok(Self {
            period_start: text_column(row, "period_start")?,
            period_end: text_column(row, "period_end")?,
            namespace: text_column(row, "namespace")?,
            node: text_column(row, "node")?,
            pod: text_column(row, "pod")?,
            quantity,
            labels,
        })
    }
}

fn text_column(row: &FrameRow, name: &str) -> Result<String> {
    match row.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
        None => Err(RatingError::Frame(format!("missing column {}", name))),
    }
}
