//! Pricing rules and catalog versions

use super::labels::LabelSet;
use super::metric::MetricDefinitions;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single pricing rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    /// Metric this rule prices
    pub metric: String,
    /// Rating unit, e.g. `core-hours`
    pub unit: String,
    /// Rate per rating unit. `None` means "no price".
    pub value: Option<f64>,
}

impl Rule {
    pub fn new(metric: impl Into<String>, value: Option<f64>, unit: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            unit: unit.into(),
            value,
        }
    }
}

/// A label-gated group of rules
///
/// Group order inside a catalog encodes matching precedence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleGroup {
    /// Optional human name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Predicate; empty means unconditional
    #[serde(rename = "labelSet")]
    pub label_set: LabelSet,
    /// Never empty once validated
    #[serde(rename = "ruleset")]
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    pub fn new(label_set: LabelSet, rules: Vec<Rule>) -> Self {
        Self {
            name: None,
            label_set,
            rules,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this group has no label predicate
    pub fn is_default(&self) -> bool {
        self.label_set.is_empty()
    }
}

/// A timestamped snapshot of the whole pricing configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleCatalogVersion {
    /// Point in time this version applies from
    pub valid_from: DateTime<Utc>,
    /// End of validity; `None` when open ended
    pub valid_to: Option<DateTime<Utc>>,
    /// Metric definitions carried by this version
    pub metrics: MetricDefinitions,
    /// Rule groups in precedence order
    pub groups: Vec<RuleGroup>,
}

impl RuleCatalogVersion {
    /// End of the rating window for this version
    pub fn window_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.valid_to.unwrap_or(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_end() {
        let from = Utc.timestamp_opt(1_576_663_550, 0).unwrap();
        let to = Utc.timestamp_opt(1_576_675_754, 0).unwrap();
        let now = Utc.timestamp_opt(1_600_000_000, 0).unwrap();

        let mut version = RuleCatalogVersion {
            valid_from: from,
            valid_to: Some(to),
            metrics: MetricDefinitions::new(),
            groups: vec![],
        };
        assert_eq!(version.window_end(now), to);

        version.valid_to = None;
        assert_eq!(version.window_end(now), now);
    }

    #[test]
    fn test_group_serialization_names() {
        let group = RuleGroup::new(
            LabelSet::new().with("instance_type", "large"),
            vec![Rule::new("usage_cpu", Some(0.0026), "core-hours")],
        );
        let json = serde_json::to_value(&group).unwrap();
        assert!(json.get("labelSet").is_some());
        assert!(json.get("ruleset").is_some());
        assert!(json.get("name").is_none());
        assert!(!group.is_default());
    }
}
