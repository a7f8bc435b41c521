//! Report-driven rating
//!
//! Turns a "report refreshed" event into a pipeline run: picks the catalog
//! version for the report's unrated window, finds the metric the report
//! produces and rates it.

use super::orchestrator::{RatingPipeline, RunOutcome};
use super::ports::RatingHistory;
use crate::catalog::RatingCatalog;
use crate::telemetry::outcome;
use chrono::{DateTime, TimeZone, Utc};
use rating_common::{MetricConfig, RatingError, Result};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Why a report was not rated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The catalog holds no version
    NoCatalogVersion,
    /// No metric of the selected version is produced by the report
    UnknownReport,
}

/// Result of rating one report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Completed(RunOutcome),
    Skipped(SkipReason),
}

/// Rates reports against the shared catalog
pub struct ReportRater {
    catalog: Arc<RatingCatalog>,
    history: Arc<dyn RatingHistory>,
    pipeline: RatingPipeline,
}

impl ReportRater {
    pub fn new(
        catalog: Arc<RatingCatalog>,
        history: Arc<dyn RatingHistory>,
        pipeline: RatingPipeline,
    ) -> Self {
        Self {
            catalog,
            history,
            pipeline,
        }
    }

    pub fn catalog(&self) -> &Arc<RatingCatalog> {
        &self.catalog
    }

    /// Rate `report_name`, reading frames from `table_ref`
    #[instrument(skip(self))]
    pub async fn rate_report(&self, report_name: &str, table_ref: &str) -> Result<ReportOutcome> {
        self.rate_report_at(report_name, table_ref, Utc::now()).await
    }

    /// Same as [`ReportRater::rate_report`] with an explicit "now"
    pub async fn rate_report_at(
        &self,
        report_name: &str,
        table_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome> {
        let begin = self
            .history
            .last_rated(report_name)
            .await
            .map_err(RatingError::Transport)?
            .unwrap_or_else(epoch);

        let selected = self.catalog.select(&begin).map_err(|e| {
            error!(report = report_name, %begin, error = %e, "Selected catalog version is invalid");
            if let Some(metrics) = self.pipeline.metrics() {
                metrics.record_run(outcome::FAILED);
            }
            RatingError::from(e)
        })?;
        let Some(version) = selected else {
            info!(report = report_name, "No catalog version, skipping report");
            return Ok(self.skipped(SkipReason::NoCatalogVersion));
        };

        let Some((metric, definition)) = version.metrics.find_by_report(report_name) else {
            info!(
                report = report_name,
                valid_from = %version.valid_from,
                "Report produces no rated metric, skipping"
            );
            return Ok(self.skipped(SkipReason::UnknownReport));
        };

        let config = MetricConfig::from_definition(
            metric,
            definition,
            begin,
            version.window_end(now),
        )
        .with_table(table_ref.replace('-', "_"));

        info!(
            report = report_name,
            metric,
            valid_from = %version.valid_from,
            begin = %config.begin,
            end = %config.end,
            "Rating report"
        );
        let run = self.pipeline.run(&config, &version.groups).await?;
        Ok(ReportOutcome::Completed(run))
    }

    fn skipped(&self, reason: SkipReason) -> ReportOutcome {
        if let Some(metrics) = self.pipeline.metrics() {
            metrics.record_run(outcome::SKIPPED);
        }
        ReportOutcome::Skipped(reason)
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogDocument;
    use crate::pipeline::memory::{InMemoryHistory, InMemorySink, InMemoryWarehouse};
    use rating_common::ConfigurationError;
    use serde_json::json;

    fn rater(catalog: RatingCatalog, history: InMemoryHistory) -> ReportRater {
        let warehouse = Arc::new(InMemoryWarehouse::new());
        let pipeline = RatingPipeline::new(
            warehouse.clone(),
            warehouse,
            Arc::new(InMemorySink::new()),
        );
        ReportRater::new(Arc::new(catalog), Arc::new(history), pipeline)
    }

    #[tokio::test]
    async fn test_empty_catalog_skips() {
        let rater = rater(RatingCatalog::new(), InMemoryHistory::new());
        let outcome = rater.rate_report("pod-cpu-usage-hourly", "t").await.unwrap();
        assert_eq!(outcome, ReportOutcome::Skipped(SkipReason::NoCatalogVersion));
    }

    #[tokio::test]
    async fn test_unknown_report_skips() {
        let catalog = RatingCatalog::new();
        catalog
            .load_document(&json!({
                "valid_from": 0,
                "metrics": {
                    "usage_cpu": {
                        "report_name": "pod-cpu-usage-hourly",
                        "source_table": "report_metering_pod_cpu_usage_hourly",
                        "source_column": "pod_usage_cpu_core_seconds",
                        "unit": "core-seconds"
                    }
                },
                "rules": []
            }))
            .unwrap();

        let rater = rater(catalog, InMemoryHistory::new());
        let outcome = rater.rate_report("node-cpu-hourly", "t").await.unwrap();
        assert_eq!(outcome, ReportOutcome::Skipped(SkipReason::UnknownReport));
    }

    #[tokio::test]
    async fn test_rejected_version_fails_the_run() {
        let catalog = RatingCatalog::new();
        catalog.replace_all(vec![
            CatalogDocument::from_json(&json!({
                "valid_from": 0,
                "metrics": {},
                "rules": [{"ruleset": [{"metric": "usage_cpu", "value": 0.5, "unit": "core-hours"}]}]
            }))
            .unwrap()
            .into_entry(),
            CatalogDocument::from_json(&json!({"valid_from": 100, "rules": [{"ruleset": []}]}))
                .unwrap()
                .into_entry(),
        ]);
        let history = InMemoryHistory::new();
        history.set("pod-cpu-usage-hourly", Utc.timestamp_opt(50, 0).unwrap());

        let err = rater(catalog, history)
            .rate_report("pod-cpu-usage-hourly", "t")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RatingError::Configuration(ConfigurationError::NoRules { .. })
        ));
    }

    #[test]
    fn test_epoch() {
        assert_eq!(epoch().timestamp(), 0);
    }
}
