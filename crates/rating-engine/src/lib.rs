//! # Rating Engine
//!
//! Prices metered usage against versioned, label-scoped pricing rules.
//!
//! ## Rating Formula
//!
//! ```text
//! rated_amount = rule.value × convert(quantity, metric.unit → rule.unit)
//! ```
//!
//! Where:
//! - the catalog version is the first one effective at or after the run's
//!   start, falling back to the latest
//! - the rule is the first one for the metric whose group labels are all
//!   present on the frame
//! - frames without a rule are kept with a null amount

pub mod catalog;
pub mod pipeline;
pub mod pricing;
pub mod telemetry;
pub mod validation;

pub use catalog::{select_version, CatalogDocument, CatalogEntry, CatalogSnapshot, RatingCatalog};
pub use pipeline::{
    FrameQuery, FrameSource, LabelSource, RatedSink, RatingHistory, RatingPipeline, ReportOutcome,
    ReportRater, RunOutcome, SkipReason,
};
pub use pricing::{convert, find_match, rate};
pub use telemetry::RatingMetrics;
pub use validation::{validate_metric_definitions, validate_rule_catalog};
