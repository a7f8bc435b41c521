//! Metric definition validation

use super::is_identifier;
use rating_common::{ConfigurationError, MetricDefinition, MetricDefinitions, MetricUnit};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, instrument};

/// Fields a metric definition must carry, no more, no fewer
pub const METRIC_FIELDS: [&str; 4] = ["report_name", "source_table", "source_column", "unit"];

/// Raw metric entries in document order, duplicates preserved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetricEntries(pub Vec<(String, Value)>);

impl RawMetricEntries {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawMetricEntries {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for RawMetricEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawMetricEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of metric name to definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    entries.push((key, value));
                }
                Ok(RawMetricEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Validate raw metric definitions.
///
/// On success the typed definitions serialize back to exactly the input.
#[instrument(skip(raw), fields(entries = raw.len()))]
pub fn validate_metric_definitions(
    raw: &RawMetricEntries,
) -> Result<MetricDefinitions, ConfigurationError> {
    let mut definitions = MetricDefinitions::new();

    for (metric, conf) in &raw.0 {
        if definitions.get(metric).is_some() {
            return Err(ConfigurationError::DuplicateMetricKey {
                metric: metric.clone(),
            });
        }

        let empty = Map::new();
        let fields = conf.as_object().unwrap_or(&empty);
        let keys: BTreeSet<&str> = fields.keys().map(String::as_str).collect();
        let found = || keys.iter().map(|k| k.to_string()).collect::<Vec<_>>();

        if keys.len() < METRIC_FIELDS.len() {
            return Err(ConfigurationError::MissingField {
                metric: metric.clone(),
                fields: found(),
            });
        }
        if keys != METRIC_FIELDS.iter().copied().collect::<BTreeSet<&str>>() {
            return Err(ConfigurationError::UnsupportedField {
                metric: metric.clone(),
                fields: found(),
            });
        }

        let text = |name: &str| -> Result<String, ConfigurationError> {
            match fields.get(name) {
                Some(Value::String(s)) if is_identifier(s) => Ok(s.clone()),
                other => Err(ConfigurationError::InvalidFieldValue {
                    metric: metric.clone(),
                    value: other.map(Value::to_string).unwrap_or_default(),
                }),
            }
        };

        // Every field is checked against the pattern before the unit itself
        let report_name = text("report_name")?;
        let source_table = text("source_table")?;
        let source_column = text("source_column")?;
        let unit_name = text("unit")?;

        let unit = unit_name
            .parse::<MetricUnit>()
            .map_err(|unit| ConfigurationError::UnsupportedUnit {
                metric: metric.clone(),
                unit,
            })?;

        definitions.push(
            metric.clone(),
            MetricDefinition {
                report_name,
                source_table,
                source_column,
                unit,
            },
        );
    }

    debug!(metrics = definitions.len(), "Metric definitions validated");
    Ok(definitions)
}
