//! Rule catalog validation

use super::is_identifier;
use rating_common::{ConfigurationError, LabelSet, LabelValue, Rule, RuleGroup};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

/// Fields a rule must carry, no more, no fewer
pub const RULE_FIELDS: [&str; 3] = ["metric", "value", "unit"];

/// Validate raw rule groups and type them.
///
/// Checks every group and every rule in order and stops at the first failure.
/// Per group: the ruleset must be non-empty, rules must be unique, carry
/// exactly `metric`, `value` and `unit`, and hold numeric or identifier
/// values; label values must be scalars.
#[instrument(skip(groups), fields(groups = groups.len()))]
pub fn validate_rule_catalog(groups: &[Value]) -> Result<Vec<RuleGroup>, ConfigurationError> {
    let mut validated = Vec::with_capacity(groups.len());

    for (index, group) in groups.iter().enumerate() {
        let name = group.get("name").and_then(Value::as_str).map(str::to_string);
        let group_id = name.clone().unwrap_or_else(|| format!("#{}", index));

        let rules = match group.get("ruleset") {
            Some(Value::Array(rules)) if !rules.is_empty() => rules,
            None | Some(Value::Null) | Some(Value::Array(_)) => {
                return Err(ConfigurationError::NoRules { group: group_id })
            }
            Some(other) => {
                return Err(ConfigurationError::MalformedDocument(format!(
                    "ruleset of group {} is not a list: {}",
                    group_id, other
                )))
            }
        };

        let mut seen: Vec<&Value> = Vec::with_capacity(rules.len());
        let mut typed_rules = Vec::with_capacity(rules.len());
        for rule in rules {
            if seen.iter().any(|prior| same_value(prior, rule)) {
                return Err(ConfigurationError::DuplicateRule {
                    group: group_id,
                    rule: rule.to_string(),
                });
            }

            let fields = match rule.as_object() {
                Some(fields) if has_rule_fields(fields) => fields,
                Some(fields) => {
                    return Err(ConfigurationError::WrongRuleKeys {
                        group: group_id,
                        fields: fields.keys().cloned().collect(),
                    })
                }
                None => {
                    return Err(ConfigurationError::WrongRuleKeys {
                        group: group_id,
                        fields: vec![],
                    })
                }
            };

            for value in fields.values() {
                let valid = match value {
                    Value::Number(_) => true,
                    Value::String(s) => is_identifier(s),
                    _ => false,
                };
                if !valid {
                    return Err(ConfigurationError::InvalidRuleValue {
                        group: group_id,
                        value: value.to_string(),
                    });
                }
            }

            typed_rules.push(type_rule(fields, &group_id));
            seen.push(rule);
        }

        let label_set = match group.get("labelSet") {
            None | Some(Value::Null) => LabelSet::new(),
            Some(Value::Object(labels)) => type_labels(labels, &group_id)?,
            Some(other) => {
                return Err(ConfigurationError::MalformedDocument(format!(
                    "labelSet of group {} is not a mapping: {}",
                    group_id, other
                )))
            }
        };

        validated.push(RuleGroup {
            name,
            label_set,
            rules: typed_rules,
        });
    }

    debug!(groups = validated.len(), "Rule catalog validated");
    Ok(validated)
}

/// JSON equality where numbers compare by value, so `1` equals `1.0`
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).map_or(false, |y| same_value(x, y)))
        }
        _ => a == b,
    }
}

fn has_rule_fields(fields: &Map<String, Value>) -> bool {
    let keys: BTreeSet<&str> = fields.keys().map(String::as_str).collect();
    keys == RULE_FIELDS.iter().copied().collect::<BTreeSet<&str>>()
}

fn type_labels(labels: &Map<String, Value>, group_id: &str) -> Result<LabelSet, ConfigurationError> {
    let mut set = LabelSet::new();
    for (label, value) in labels {
        match LabelValue::from_json(value) {
            Ok(Some(typed)) => set.insert(label.clone(), typed),
            _ => {
                return Err(ConfigurationError::InvalidLabelType {
                    group: group_id.to_string(),
                    label: label.clone(),
                    value: value.to_string(),
                })
            }
        }
    }
    Ok(set)
}

/// Type a rule whose fields already passed validation
fn type_rule(fields: &Map<String, Value>, group_id: &str) -> Rule {
    let text = |name: &str| match fields.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let value = match fields.get("value") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let parsed = s.parse::<f64>().ok();
            if parsed.is_none() {
                warn!(group = %group_id, value = %s, "Rule value is not numeric, frames will be unpriced");
            }
            parsed
        }
        _ => None,
    };

    Rule {
        metric: text("metric"),
        unit: text("unit"),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn groups(value: Value) -> Vec<Value> {
        match value {
            Value::Array(groups) => groups,
            _ => unreachable!(),
        }
    }

    fn base() -> Vec<Value> {
        groups(json!([
            {
                "name": "rules_large",
                "labelSet": {"instance_type": "large", "storage_type": "hdd", "gpu_accel": "false"},
                "ruleset": [
                    {"metric": "request_cpu", "value": 0.0009, "unit": "core-hours"},
                    {"metric": "usage_cpu", "value": 0.0026, "unit": "core-hours"},
                    {"metric": "request_memory", "value": 0.0008, "unit": "GiB-hours"},
                    {"metric": "usage_memory", "value": 0.0022, "unit": "GiB-hours"}
                ]
            },
            {
                "name": "rules_default",
                "ruleset": [
                    {"metric": "request_cpu", "value": 0.005, "unit": "core-hours"},
                    {"metric": "usage_cpu", "value": 0.015, "unit": "core-hours"}
                ]
            }
        ]))
    }

    #[test]
    fn test_valid_catalog() {
        let validated = validate_rule_catalog(&base()).unwrap();

        assert_eq!(validated.len(), 2);
        assert_eq!(validated[0].name.as_deref(), Some("rules_large"));
        assert_eq!(validated[0].label_set.len(), 3);
        assert_eq!(validated[0].rules[3], Rule::new("usage_memory", Some(0.0022), "GiB-hours"));
        assert!(validated[1].is_default());
    }

    #[test]
    fn test_no_rules() {
        let missing = groups(json!([{"name": "rules_default", "labelSet": {"thisis": "atest"}}]));
        assert!(matches!(
            validate_rule_catalog(&missing),
            Err(ConfigurationError::NoRules { .. })
        ));

        let empty = groups(json!([{"ruleset": []}]));
        assert_eq!(
            validate_rule_catalog(&empty).unwrap_err(),
            ConfigurationError::NoRules { group: "#0".into() }
        );
    }

    #[test]
    fn test_duplicate_rule() {
        let mut catalog = base();
        catalog[1]["ruleset"]
            .as_array_mut()
            .unwrap()
            .push(json!({"unit": "core-hours", "metric": "usage_cpu", "value": 0.015}));

        let err = validate_rule_catalog(&catalog).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateRule { ref group, .. } if group == "rules_default"));
    }

    #[test]
    fn test_same_metric_different_value_is_not_duplicate() {
        let mut catalog = base();
        catalog[1]["ruleset"]
            .as_array_mut()
            .unwrap()
            .push(json!({"metric": "usage_cpu", "value": 0.02, "unit": "core-hours"}));
        assert!(validate_rule_catalog(&catalog).is_ok());
    }

    #[test]
    fn test_wrong_rule_keys() {
        let mut catalog = base();
        catalog[0]["ruleset"][0] = json!({"pokemon": "ivysaur", "value": 0.0009, "unit": "core-hours"});
        assert!(matches!(
            validate_rule_catalog(&catalog),
            Err(ConfigurationError::WrongRuleKeys { .. })
        ));

        let mut catalog = base();
        catalog[0]["ruleset"][0] = json!({"metric": "request_cpu", "unit": "core-hours"});
        assert!(matches!(
            validate_rule_catalog(&catalog),
            Err(ConfigurationError::WrongRuleKeys { .. })
        ));
    }

    #[test]
    fn test_invalid_rule_value() {
        let catalog = groups(json!([
            {"ruleset": [{"metric": "request_memory;", "value": 0.012, "unit": "GiB-hours"}]}
        ]));
        assert!(matches!(
            validate_rule_catalog(&catalog),
            Err(ConfigurationError::InvalidRuleValue { .. })
        ));

        let catalog = groups(json!([
            {"ruleset": [{"metric": "request_memory", "value": null, "unit": "GiB-hours"}]}
        ]));
        assert!(matches!(
            validate_rule_catalog(&catalog),
            Err(ConfigurationError::InvalidRuleValue { .. })
        ));
    }

    #[test]
    fn test_identifier_value_is_unpriced() {
        let catalog = groups(json!([
            {"ruleset": [{"metric": "usage_cpu", "value": "free", "unit": "core-hours"}]}
        ]));
        let validated = validate_rule_catalog(&catalog).unwrap();
        assert_eq!(validated[0].rules[0].value, None);
    }

    #[test]
    fn test_duplicate_ignores_number_representation() {
        let catalog = groups(json!([{"ruleset": [
            {"metric": "a", "value": 1, "unit": "GiB"},
            {"unit": "GiB", "metric": "a", "value": 1.0}
        ]}]));
        assert!(matches!(
            validate_rule_catalog(&catalog),
            Err(ConfigurationError::DuplicateRule { .. })
        ));

        let catalog = groups(json!([{"ruleset": [
            {"metric": "a", "value": 1, "unit": "GiB"},
            {"metric": "a", "value": 1.5, "unit": "GiB"}
        ]}]));
        assert!(validate_rule_catalog(&catalog).is_ok());
    }

    #[test]
    fn test_label_types() {
        let mut catalog = base();
        catalog[0]["labelSet"]["gpu_accel"] = json!(false);
        catalog[0]["labelSet"]["cores"] = json!(8);
        catalog[0]["labelSet"]["ratio"] = json!(0.5);
        assert!(validate_rule_catalog(&catalog).is_ok());

        let mut catalog = base();
        catalog[0]["labelSet"]["zones"] = json!(["a", "b"]);
        assert!(matches!(
            validate_rule_catalog(&catalog),
            Err(ConfigurationError::InvalidLabelType { ref label, .. }) if label == "zones"
        ));

        let mut catalog = base();
        catalog[0]["labelSet"]["zone"] = Value::Null;
        assert!(matches!(
            validate_rule_catalog(&catalog),
            Err(ConfigurationError::InvalidLabelType { .. })
        ));
    }

    #[test]
    fn test_stops_at_first_failing_group() {
        let catalog = groups(json!([
            {"name": "first", "ruleset": []},
            {"name": "second", "ruleset": [{"metric": "x;", "value": 1, "unit": "GiB"}]}
        ]));
        assert_eq!(
            validate_rule_catalog(&catalog).unwrap_err(),
            ConfigurationError::NoRules { group: "first".into() }
        );
    }
}
