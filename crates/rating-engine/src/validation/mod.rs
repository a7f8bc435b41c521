//! Configuration validation
//!
//! Metric definitions and rule catalogs arrive as loosely typed documents.
//! Nothing is trusted until it passes these checks, which fail fast on the
//! first offending entry in iteration order.

pub mod metrics;
pub mod rules;

pub use metrics::{validate_metric_definitions, RawMetricEntries};
pub use rules::validate_rule_catalog;

use lazy_static::lazy_static;
use rating_common::IDENTIFIER_PATTERN;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER: Option<Regex> = Regex::new(IDENTIFIER_PATTERN).ok();
}

/// Check a value against the identifier pattern
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER
        .as_ref()
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}
