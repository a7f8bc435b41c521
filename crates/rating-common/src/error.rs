//! Error types for the rating system
//!
//! Provides a unified error type and the configuration error taxonomy

use thiserror::Error;

/// Result type alias using RatingError
pub type Result<T> = std::result::Result<T, RatingError>;

/// Unified error type for rating operations
#[derive(Debug, Error)]
pub enum RatingError {
    // Metric, rule or startup configuration errors. Fatal for the run.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    // Malformed frame row at ingestion
    #[error("Invalid frame: {0}")]
    Frame(String),

    // Collaborator failures, passed through as-is
    #[error(transparent)]
    Transport(anyhow::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RatingError {
    /// Whether this error comes from a collaborator call
    pub fn is_transport(&self) -> bool {
        matches!(self, RatingError::Transport(_))
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Duplicated key in metrics definition: {metric}")]
    DuplicateMetricKey { metric: String },

    #[error("Missing key in metrics definition {metric}: found {fields:?}")]
    MissingField { metric: String, fields: Vec<String> },

    #[error("Unsupported key in metrics definition {metric}: found {fields:?}")]
    UnsupportedField { metric: String, fields: Vec<String> },

    #[error("Invalid value in metrics definition {metric}: {value}")]
    InvalidFieldValue { metric: String, value: String },

    #[error("Unsupported unit in metrics definition {metric}: {unit}")]
    UnsupportedUnit { metric: String, unit: String },

    #[error("No rules provided in group {group}")]
    NoRules { group: String },

    #[error("Duplicated (metric, value, unit) in group {group}: {rule}")]
    DuplicateRule { group: String, rule: String },

    #[error("Wrong key in ruleset of group {group}: found {fields:?}")]
    WrongRuleKeys { group: String, fields: Vec<String> },

    #[error("Invalid value in ruleset of group {group}: {value}")]
    InvalidRuleValue { group: String, value: String },

    #[error("Wrong type for label {label} in group {group}: {value}")]
    InvalidLabelType {
        group: String,
        label: String,
        value: String,
    },

    #[error("Malformed catalog document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    #[error("Missing setting: {0}")]
    MissingSetting(String),

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },
}

impl From<serde_json::Error> for RatingError {
    fn from(err: serde_json::Error) -> Self {
        RatingError::Serialization(err.to_string())
    }
}
