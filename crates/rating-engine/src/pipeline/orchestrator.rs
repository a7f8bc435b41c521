//! Rating run orchestration
//!
//! One run rates one metric over one window:
//!
//! ```text
//! Idle -> LoadingFrames -> Processing -> Emitting -> Done
//!               |               |            |
//!               +---------------+------------+--> Failed
//! ```
//!
//! A run either emits one complete batch or fails; nothing is emitted for a
//! failed run.

use super::ports::{FrameQuery, FrameSource, LabelSource, RatedSink};
use crate::pricing::{convert, convert_to, find_match, rate};
use crate::telemetry::{outcome, RatingMetrics};
use chrono::Utc;
use rating_common::{
    is_reserved_column, MetricConfig, RatedBatch, RatedRecord, RatingError, Result, RuleGroup,
    UsageFrame,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Run lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    LoadingFrames,
    Processing,
    Emitting,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::LoadingFrames => "loading_frames",
            RunState::Processing => "processing",
            RunState::Emitting => "emitting",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A batch was emitted
    Rated { records: usize, unpriced: usize },
    /// The window held no frames; nothing was emitted
    Empty,
}

/// Rates usage frames for one metric and emits the result
pub struct RatingPipeline {
    labels: Arc<dyn LabelSource>,
    frames: Arc<dyn FrameSource>,
    sink: Arc<dyn RatedSink>,
    metrics: Option<RatingMetrics>,
}

impl RatingPipeline {
    pub fn new(
        labels: Arc<dyn LabelSource>,
        frames: Arc<dyn FrameSource>,
        sink: Arc<dyn RatedSink>,
    ) -> Self {
        Self {
            labels,
            frames,
            sink,
            metrics: None,
        }
    }

    /// Record runs on Prometheus instruments
    pub fn with_metrics(mut self, metrics: RatingMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&RatingMetrics> {
        self.metrics.as_ref()
    }

    /// Run the pipeline for `config` against the rule groups of the selected
    /// catalog version.
    #[instrument(
        skip(self, config, groups),
        fields(metric = %config.metric, table = %config.source_table)
    )]
    pub async fn run(&self, config: &MetricConfig, groups: &[RuleGroup]) -> Result<RunOutcome> {
        let started = Instant::now();
        let result = self.execute(config, groups).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_duration(&config.metric, started.elapsed().as_secs_f64());
            match &result {
                Ok(RunOutcome::Rated { records, unpriced }) => {
                    metrics.record_run(outcome::RATED);
                    metrics.record_frames(&config.metric, *records, *unpriced);
                }
                Ok(RunOutcome::Empty) => metrics.record_run(outcome::EMPTY),
                Err(_) => metrics.record_run(outcome::FAILED),
            }
        }

        if let Err(e) = &result {
            warn!(state = %RunState::Failed, error = %e, "Rating run failed");
        }
        result
    }

    async fn execute(&self, config: &MetricConfig, groups: &[RuleGroup]) -> Result<RunOutcome> {
        debug!(state = %RunState::Idle, begin = %config.begin, end = %config.end, "Starting run");

        let label_names = self
            .discover_labels(&config.source_table, &config.source_column)
            .await?;
        info!(labels = ?label_names, "Labels discovered");

        debug!(state = %RunState::LoadingFrames, "Loading frames");
        let query = FrameQuery {
            table: config.source_table.clone(),
            column: config.source_column.clone(),
            labels: label_names.clone(),
            begin: config.begin,
            end: config.end,
        };
        let rows = self
            .frames
            .frames(&query)
            .await
            .map_err(RatingError::Transport)?;
        info!(frames = rows.len(), "Frames loaded");

        if rows.is_empty() {
            info!(state = %RunState::Done, "No frames to rate");
            return Ok(RunOutcome::Empty);
        }

        debug!(state = %RunState::Processing, "Rating frames");
        let frames = rows
            .iter()
            .map(|row| UsageFrame::from_row(row, &config.source_column, &label_names))
            .collect::<Result<Vec<_>>>()?;
        let batch = rate_frames(config, groups, &frames)?;
        let (records, unpriced) = (batch.len(), batch.unpriced());
        info!(records, unpriced, "Frames processed");

        debug!(state = %RunState::Emitting, batch_id = %batch.batch_id, "Emitting batch");
        self.sink.emit(batch).await.map_err(RatingError::Transport)?;
        info!(state = %RunState::Done, records, "Batch sent");

        Ok(RunOutcome::Rated { records, unpriced })
    }

    /// Label columns of `table`: every column except the fixed ones and the
    /// metric column
    #[instrument(skip(self))]
    pub async fn discover_labels(&self, table: &str, metric_column: &str) -> Result<Vec<String>> {
        let columns = self
            .labels
            .table_columns(table)
            .await
            .map_err(RatingError::Transport)?;
        Ok(columns
            .into_iter()
            .filter(|name| !is_reserved_column(name, metric_column))
            .collect())
    }
}

/// Rate typed frames into a batch.
///
/// Fails on the first unsupported unit conversion, discarding everything
/// rated so far.
pub fn rate_frames(
    config: &MetricConfig,
    groups: &[RuleGroup],
    frames: &[UsageFrame],
) -> Result<RatedBatch> {
    let mut batch = RatedBatch::new(&config.report_name, &config.metric, Utc::now());
    for frame in frames {
        batch.push(rate_frame(config, groups, frame)?);
    }
    Ok(batch)
}

/// Rate a single frame
pub fn rate_frame(config: &MetricConfig, groups: &[RuleGroup], frame: &UsageFrame) -> Result<RatedRecord> {
    let resolved = find_match(&config.metric, &frame.labels, groups);

    let (converted_quantity, rated_amount, matched_label_set) = match resolved {
        Some(found) => {
            let converted = convert_to(config.unit, &found.rule.unit, frame.quantity)?;
            (
                converted,
                rate(Some(found.rule), converted),
                found.label_set.descriptor(),
            )
        }
        None => {
            debug!(pod = %frame.pod, namespace = %frame.namespace, "No rule matches frame");
            let converted = convert(config.unit, config.unit.canonical_rating_unit(), frame.quantity)?;
            (converted, None, "{}".to_string())
        }
    };

    Ok(RatedRecord {
        frame_begin: frame.period_start.clone(),
        frame_end: frame.period_end.clone(),
        namespace: frame.namespace.clone(),
        node: frame.node.clone(),
        metric: config.metric.clone(),
        pod: frame.pod.clone(),
        converted_quantity,
        rated_amount,
        matched_label_set,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::memory::{InMemorySink, InMemoryWarehouse};
    use chrono::TimeZone;
    use rating_common::{ConfigurationError, LabelSet, MetricUnit, Rule};
    use serde_json::json;

    fn config() -> MetricConfig {
        MetricConfig {
            metric: "usage_memory".into(),
            report_name: "pod-memory-usage-hourly".into(),
            source_table: "report_metering_pod_memory_usage_hourly".into(),
            source_column: "pod_usage_memory_byte_seconds".into(),
            unit: MetricUnit::ByteSeconds,
            begin: Utc.timestamp_opt(0, 0).unwrap(),
            end: Utc.timestamp_opt(1_576_675_754, 0).unwrap(),
        }
    }

    fn groups() -> Vec<RuleGroup> {
        vec![RuleGroup::new(
            LabelSet::new().with("instance_type", "large"),
            vec![Rule::new("usage_memory", Some(0.0022), "GiB-hours")],
        )]
    }

    fn frame(instance_type: &str) -> UsageFrame {
        UsageFrame {
            period_start: "2019-12-18 10:00:00.000".into(),
            period_end: "2019-12-18 11:00:00.000".into(),
            namespace: "ns1".into(),
            node: "node-a".into(),
            pod: "web-1".into(),
            quantity: 7e12,
            labels: LabelSet::new().with("instance_type", instance_type),
        }
    }

    #[test]
    fn test_rate_frame_matched() {
        let record = rate_frame(&config(), &groups(), &frame("large")).unwrap();
        assert!((record.converted_quantity - 1.810_905_006_1).abs() < 1e-6);
        assert!((record.rated_amount.unwrap() - 1.810_905_006_1 * 0.0022).abs() < 1e-9);
        assert_eq!(record.matched_label_set, r#"{"instance_type":"large"}"#);
    }

    #[test]
    fn test_rate_frame_unmatched() {
        let record = rate_frame(&config(), &groups(), &frame("small")).unwrap();
        assert_eq!(record.rated_amount, None);
        assert_eq!(record.matched_label_set, "{}");
        assert!((record.converted_quantity - 1.810_905_006_1).abs() < 1e-6);
    }

    #[test]
    fn test_unsupported_conversion_aborts_batch() {
        let groups = vec![RuleGroup::new(
            LabelSet::new(),
            vec![Rule::new("usage_memory", Some(1.0), "core-hours")],
        )];
        let err = rate_frames(&config(), &groups, &[frame("large"), frame("small")]).unwrap_err();
        assert!(matches!(
            err,
            RatingError::Configuration(ConfigurationError::UnsupportedConversion { .. })
        ));
    }

    #[tokio::test]
    async fn test_discover_labels_excludes_reserved() {
        let warehouse = Arc::new(InMemoryWarehouse::new());
        warehouse.insert_table(
            "usage",
            vec![json!({
                "period_start": "a", "period_end": "b", "pod": "p", "namespace": "n",
                "node": "x", "pod_usage_memory_byte_seconds": 1, "instance_type": "large"
            })
            .as_object()
            .cloned()
            .unwrap()],
        );
        let pipeline = RatingPipeline::new(
            warehouse.clone(),
            warehouse,
            Arc::new(InMemorySink::new()),
        );

        let labels = pipeline
            .discover_labels("usage", "pod_usage_memory_byte_seconds")
            .await
            .unwrap();
        assert_eq!(labels, vec!["instance_type"]);
    }
}
