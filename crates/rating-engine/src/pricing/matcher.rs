//! Rule resolution
//!
//! Finds the rule pricing a frame. Groups are scanned in catalog order and
//! rules in group order; the first rule for the requested metric whose group
//! predicate is satisfied by the frame labels wins. There is no specificity
//! scoring, so catalogs must list specific groups before the default one.

use rating_common::{LabelSet, Rule, RuleGroup};

/// A resolved (label set, rule) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch<'a> {
    pub label_set: &'a LabelSet,
    pub rule: &'a Rule,
}

/// Resolve the rule for `metric` given a frame's labels.
///
/// Returns `None` when nothing matches; callers treat that as "no rate
/// available", not as an error.
pub fn find_match<'a>(
    metric: &str,
    frame_labels: &LabelSet,
    groups: &'a [RuleGroup],
) -> Option<RuleMatch<'a>> {
    groups.iter().find_map(|group| {
        group
            .rules
            .iter()
            .filter(|rule| rule.metric == metric)
            .find(|_| group.label_set.is_subset_of(frame_labels))
            .map(|rule| RuleMatch {
                label_set: &group.label_set,
                rule,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<RuleGroup> {
        vec![
            RuleGroup::new(
                LabelSet::new()
                    .with("instance_type", "small")
                    .with("storage_type", "ssd")
                    .with("gpu_accel", "false"),
                vec![
                    Rule::new("request_cpu", Some(0.00075), "core-hours"),
                    Rule::new("usage_memory", Some(0.0014), "GiB-hours"),
                ],
            )
            .named("rules_small"),
            RuleGroup::new(
                LabelSet::new()
                    .with("instance_type", "large")
                    .with("storage_type", "hdd")
                    .with("gpu_accel", "false"),
                vec![
                    Rule::new("request_cpu", Some(0.0009), "core-hours"),
                    Rule::new("usage_memory", Some(0.0022), "GiB-hours"),
                ],
            )
            .named("rules_large"),
            RuleGroup::new(
                LabelSet::new(),
                vec![
                    Rule::new("request_cpu", Some(0.005), "core-hours"),
                    Rule::new("usage_memory", Some(0.012), "GiB-hours"),
                ],
            )
            .named("rules_default"),
        ]
    }

    fn large() -> LabelSet {
        LabelSet::new()
            .with("instance_type", "large")
            .with("storage_type", "hdd")
            .with("gpu_accel", "false")
    }

    #[test]
    fn test_matches_labelled_group() {
        let groups = catalog();
        let found = find_match("usage_memory", &large(), &groups).unwrap();
        assert_eq!(found.rule.value, Some(0.0022));
        assert_eq!(found.label_set, &groups[1].label_set);
    }

    #[test]
    fn test_extra_frame_labels_are_ignored() {
        let groups = catalog();
        let labels = large().with("zone", "eu-west-1").with("team", "billing");
        let found = find_match("request_cpu", &labels, &groups).unwrap();
        assert_eq!(found.rule.value, Some(0.0009));
    }

    #[test]
    fn test_falls_back_to_default_group() {
        let groups = catalog();
        let labels = LabelSet::new().with("instance_type", "medium");
        let found = find_match("usage_memory", &labels, &groups).unwrap();
        assert_eq!(found.rule.value, Some(0.012));
        assert!(found.label_set.is_empty());
    }

    #[test]
    fn test_partial_labels_do_not_match() {
        let groups = catalog();
        let labels = LabelSet::new().with("instance_type", "large");
        let found = find_match("usage_memory", &labels, &groups).unwrap();
        assert!(found.label_set.is_empty());
    }

    #[test]
    fn test_unknown_metric() {
        assert!(find_match("pokemon", &LabelSet::new(), &catalog()).is_none());
    }

    #[test]
    fn test_first_match_wins_over_specificity() {
        let mut groups = catalog();
        groups.rotate_right(1); // default group first
        let found = find_match("usage_memory", &large(), &groups).unwrap();
        assert_eq!(found.rule.value, Some(0.012));
    }

    #[test]
    fn test_typed_label_comparison() {
        let groups = vec![RuleGroup::new(
            LabelSet::new().with("gpu_accel", false),
            vec![Rule::new("usage_cpu", Some(0.1), "core-hours")],
        )];

        let as_bool = LabelSet::new().with("gpu_accel", false);
        let as_text = LabelSet::new().with("gpu_accel", "false");
        assert!(find_match("usage_cpu", &as_bool, &groups).is_some());
        assert!(find_match("usage_cpu", &as_text, &groups).is_none());
    }
}
