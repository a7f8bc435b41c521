//! Periodic rating passes
//!
//! Each pass reloads the catalog from the API, then rates every configured
//! report in turn. A failing report is logged and the pass moves on. A report
//! whose window selects a rejected catalog version fails with that version's
//! validation error.

use crate::client::RatingApiClient;
use crate::config::ReportTarget;
use async_trait::async_trait;
use rating_engine::catalog::parse_timestamp;
use rating_engine::{
    CatalogDocument, CatalogEntry, CatalogSnapshot, RatingCatalog, ReportOutcome, ReportRater,
    RunOutcome,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

/// Source of raw catalog documents
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn configurations(&self) -> anyhow::Result<Vec<Value>>;
}

#[async_trait]
impl CatalogSource for RatingApiClient {
    async fn configurations(&self) -> anyhow::Result<Vec<Value>> {
        self.list_configurations().await
    }
}

/// Summary of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub versions: usize,
    /// Versions that failed validation
    pub rejected: usize,
    pub rated: usize,
    pub empty: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct RatingScheduler {
    source: Arc<dyn CatalogSource>,
    rater: ReportRater,
    reports: Vec<ReportTarget>,
    interval: Duration,
}

impl RatingScheduler {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        rater: ReportRater,
        reports: Vec<ReportTarget>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            rater,
            reports,
            interval,
        }
    }

    /// Run passes until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.run_pass().await;
                    info!(?summary, "Rating pass finished");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Scheduler stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Reload the catalog and rate every report once
    #[instrument(skip(self))]
    pub async fn run_pass(&self) -> PassSummary {
        let mut summary = PassSummary::default();

        match self.refresh_catalog().await {
            Ok(snapshot) if snapshot.is_empty() => {
                warn!("No catalog version available, nothing to rate");
                return summary;
            }
            Ok(snapshot) => {
                summary.versions = snapshot.len();
                summary.rejected = snapshot.rejected();
            }
            Err(e) => {
                error!(error = %e, "Failed to load catalog");
                return summary;
            }
        }

        for report in &self.reports {
            match self
                .rater
                .rate_report(&report.report_name, &report.table_ref)
                .await
            {
                Ok(ReportOutcome::Completed(RunOutcome::Rated { .. })) => summary.rated += 1,
                Ok(ReportOutcome::Completed(RunOutcome::Empty)) => summary.empty += 1,
                Ok(ReportOutcome::Skipped(reason)) => {
                    info!(report = %report.report_name, ?reason, "Report skipped");
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(report = %report.report_name, error = %e, "Rating failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Replace the catalog with every version from the source.
    ///
    /// Rejected versions, malformed ones included, keep their slot so that
    /// selecting them fails. Documents without a readable `valid_from` are
    /// dropped.
    async fn refresh_catalog(&self) -> anyhow::Result<CatalogSnapshot> {
        let documents = self.source.configurations().await?;
        let total = documents.len();

        let entries: Vec<_> = documents
            .iter()
            .filter_map(|raw| match CatalogDocument::from_json(raw) {
                Ok(document) => Some(document.into_entry()),
                Err(error) => {
                    let valid_from = raw.get("valid_from").cloned().unwrap_or_default();
                    match parse_timestamp(&valid_from) {
                        Some(valid_from) => Some(CatalogEntry::Rejected { valid_from, error }),
                        None => {
                            warn!(%valid_from, %error, "Dropping unreadable catalog document");
                            None
                        }
                    }
                }
            })
            .collect();

        for entry in &entries {
            if let CatalogEntry::Rejected { valid_from, error } = entry {
                warn!(%valid_from, %error, "Catalog version failed validation");
            }
        }

        let kept = entries.len();
        self.catalog().replace_all(entries);
        info!(kept, dropped = total - kept, "Catalog refreshed");
        Ok(self.catalog().snapshot())
    }

    pub fn catalog(&self) -> &Arc<RatingCatalog> {
        self.rater.catalog()
    }
}
