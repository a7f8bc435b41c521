//! Catalog version documents
//!
//! The wire shape of one catalog version before validation.

use super::store::CatalogEntry;
use crate::validation::{validate_metric_definitions, validate_rule_catalog, RawMetricEntries};
use chrono::{DateTime, TimeZone, Utc};
use rating_common::{ConfigurationError, RuleCatalogVersion, OPEN_ENDED_VALID_TO};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Unvalidated catalog version
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    #[serde(deserialize_with = "de_timestamp")]
    pub valid_from: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: RawMetricEntries,
    #[serde(default)]
    pub rules: Vec<Value>,
}

impl CatalogDocument {
    /// Parse a raw JSON document
    pub fn from_json(raw: &Value) -> Result<Self, ConfigurationError> {
        Self::deserialize(raw).map_err(|e| ConfigurationError::MalformedDocument(e.to_string()))
    }

    /// Validate metrics and rules, producing an immutable version
    pub fn into_version(self) -> Result<RuleCatalogVersion, ConfigurationError> {
        let metrics = validate_metric_definitions(&self.metrics)?;
        let groups = validate_rule_catalog(&self.rules)?;

        // A window that ends where it starts, or at the far-future marker, is
        // open ended
        let valid_to = self.valid_to.filter(|to| {
            *to != self.valid_from && to.timestamp() != OPEN_ENDED_VALID_TO
        });

        Ok(RuleCatalogVersion {
            valid_from: self.valid_from,
            valid_to,
            metrics,
            groups,
        })
    }

    /// Validate into a timeline entry, keeping the error of a rejected version
    pub fn into_entry(self) -> CatalogEntry {
        let valid_from = self.valid_from;
        match self.into_version() {
            Ok(version) => version.into(),
            Err(error) => CatalogEntry::Rejected { valid_from, error },
        }
    }
}

/// Parse a timestamp given as Unix seconds (number or digit string) or RFC 3339
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => match s.parse::<i64>() {
            Ok(secs) => Utc.timestamp_opt(secs, 0).single(),
            Err(_) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
        },
        _ => None,
    }
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(None);
    }
    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}
