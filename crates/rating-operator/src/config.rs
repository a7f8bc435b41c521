//! Operator settings
//!
//! Read once at startup from `.env` and `RATING_*` environment variables.
//! A missing or malformed setting is reported as a [`ConfigurationError`].

use config::{Config, ConfigError, Environment};
use rating_common::ConfigurationError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "RATING";

const DEFAULT_NAMESPACE: &str = "rating";
const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

/// A report the operator rates, with the table holding its frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    /// Namespace owning the report, when given
    pub namespace: Option<String>,
    pub report_name: String,
    /// Table reference as published by the report; `-` become `_` at query time
    pub table_ref: String,
}

impl ReportTarget {
    /// Whether the report belongs to the rated namespace
    pub fn is_covered_by(&self, namespace: &str) -> bool {
        self.namespace.as_deref().map_or(true, |ns| ns == namespace)
    }
}

impl FromStr for ReportTarget {
    type Err = String;

    /// Parse `[namespace/]report:table`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (report, table_ref) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected report:table, found {:?}", s))?;
        let (namespace, report_name) = match report.split_once('/') {
            Some((ns, name)) => (Some(ns.trim().to_string()), name.trim()),
            None => (None, report.trim()),
        };
        let table_ref = table_ref.trim();
        if report_name.is_empty() || table_ref.is_empty() {
            return Err(format!("empty report or table in {:?}", s));
        }
        Ok(Self {
            namespace,
            report_name: report_name.to_string(),
            table_ref: table_ref.to_string(),
        })
    }
}

/// Startup configuration of the operator
#[derive(Debug, Clone)]
pub struct OperatorSettings {
    /// Base URL of the rating API
    pub api_url: String,
    /// Admin token added to every API request
    pub admin_api_key: String,
    /// Namespace the operator rates for
    pub namespace: String,
    pub reports: Vec<ReportTarget>,
    /// Delay between two rating passes
    pub interval: Duration,
    /// Listen address of the metrics endpoint
    pub metrics_addr: SocketAddr,
}

impl OperatorSettings {
    /// Load settings from `.env` and the process environment
    pub fn load() -> Result<Self, ConfigurationError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let source = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| ConfigurationError::InvalidSetting {
                name: ENV_PREFIX.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_config(&source)
    }

    /// Build settings from an already assembled configuration
    pub fn from_config(source: &Config) -> Result<Self, ConfigurationError> {
        let api_url = required(source, "api_url")?
            .trim_end_matches('/')
            .to_string();
        let admin_api_key = required(source, "admin_api_key")?;
        let namespace =
            optional(source, "namespace")?.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let reports = required(source, "reports")?
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| {
                entry
                    .parse::<ReportTarget>()
                    .map_err(|reason| invalid("reports", reason))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let interval = match optional(source, "interval_secs")? {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| invalid("interval_secs", format!("not a positive integer: {}", raw)))?,
            None => Duration::from_secs(DEFAULT_INTERVAL_SECS),
        };

        let metrics_addr = optional(source, "metrics_addr")?
            .unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("metrics_addr", e.to_string()))?;

        Ok(Self {
            api_url,
            admin_api_key,
            namespace,
            reports,
            interval,
            metrics_addr,
        })
    }

    /// Reports belonging to the rated namespace
    pub fn covered_reports(&self) -> Vec<ReportTarget> {
        self.reports
            .iter()
            .filter(|r| r.is_covered_by(&self.namespace))
            .cloned()
            .collect()
    }
}

fn env_name(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key.to_uppercase())
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidSetting {
        name: env_name(key),
        reason: reason.into(),
    }
}

fn optional(source: &Config, key: &str) -> Result<Option<String>, ConfigurationError> {
    match source.get_string(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(invalid(key, e.to_string())),
    }
}

fn required(source: &Config, key: &str) -> Result<String, ConfigurationError> {
    optional(source, key)?.ok_or_else(|| ConfigurationError::MissingSetting(env_name(key)))
}
