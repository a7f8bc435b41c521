//! # Rating Common
//!
//! Shared types and errors for the usage rating engine.
//!
//! ## Core Types
//!
//! - [`MetricDefinition`]: where a metric lives and which unit it is measured in
//! - [`RuleGroup`]/[`Rule`]: label-gated pricing rules
//! - [`RuleCatalogVersion`]: timestamped snapshot of the pricing configuration
//! - [`UsageFrame`]: one row of metered usage with dimension labels
//! - [`RatedRecord`]/[`RatedBatch`]: priced output handed to the sink

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigurationError, RatingError, Result};
pub use types::{
    frame::{is_reserved_column, FrameRow, UsageFrame, FIXED_COLUMNS},
    labels::{LabelSet, LabelValue},
    metric::{MetricConfig, MetricDefinition, MetricDefinitions},
    record::{RatedBatch, RatedRecord},
    rules::{Rule, RuleCatalogVersion, RuleGroup},
    units::{MetricUnit, RatingUnit},
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pattern every identifier-like configuration value must match
pub const IDENTIFIER_PATTERN: &str = "^[a-zA-Z0-9_-]+$";

/// Far-future `valid_to` used by catalog authors to mean "open ended"
/// (2100-01-01T01:01:00Z)
pub const OPEN_ENDED_VALID_TO: i64 = 4_102_448_460;
