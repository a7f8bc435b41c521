//! Rating calculation: amount = rate × converted quantity

use rating_common::Rule;

/// Price a converted quantity with a resolved rule.
///
/// `None` when there is no rule or the rule carries no value, which is
/// distinct from a zero price.
pub fn rate(rule: Option<&Rule>, converted_quantity: f64) -> Option<f64> {
    rule.and_then(|rule| rule.value).map(|value| value * converted_quantity)
}
