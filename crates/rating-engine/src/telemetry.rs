//! Prometheus instruments for rating runs

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Outcome label values for `rating_runs_total`
pub mod outcome {
    pub const RATED: &str = "rated";
    pub const EMPTY: &str = "empty";
    pub const SKIPPED: &str = "skipped";
    pub const FAILED: &str = "failed";
}

/// Prometheus metrics for the rating engine
#[derive(Debug, Clone)]
pub struct RatingMetrics {
    pub frames_rated: IntCounterVec,
    pub frames_unpriced: IntCounterVec,
    pub runs: IntCounterVec,
    pub run_duration_seconds: HistogramVec,
}

impl RatingMetrics {
    /// Create the instruments and register them with `registry`
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let frames_rated = IntCounterVec::new(
            Opts::new("rating_frames_rated_total", "Frames rated, priced or not"),
            &["metric"],
        )?;
        let frames_unpriced = IntCounterVec::new(
            Opts::new(
                "rating_frames_unpriced_total",
                "Frames emitted without a matching rule",
            ),
            &["metric"],
        )?;
        let runs = IntCounterVec::new(
            Opts::new("rating_runs_total", "Rating runs by outcome"),
            &["outcome"],
        )?;
        let run_duration_seconds = HistogramVec::new(
            HistogramOpts::new("rating_run_duration_seconds", "Rating run duration")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["metric"],
        )?;

        registry.register(Box::new(frames_rated.clone()))?;
        registry.register(Box::new(frames_unpriced.clone()))?;
        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        Ok(Self {
            frames_rated,
            frames_unpriced,
            runs,
            run_duration_seconds,
        })
    }

    pub fn record_run(&self, outcome: &str) {
        self.runs.with_label_values(&[outcome]).inc();
    }

    pub fn record_frames(&self, metric: &str, rated: usize, unpriced: usize) {
        self.frames_rated
            .with_label_values(&[metric])
            .inc_by(rated as u64);
        self.frames_unpriced
            .with_label_values(&[metric])
            .inc_by(unpriced as u64);
    }

    pub fn observe_duration(&self, metric: &str, seconds: f64) {
        self.run_duration_seconds
            .with_label_values(&[metric])
            .observe(seconds);
    }
}
