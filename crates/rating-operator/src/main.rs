//! Rating Operator - periodic rating of metering reports

mod client;
mod config;
mod scheduler;
mod server;

use client::RatingApiClient;
use config::OperatorSettings;
use prometheus::Registry;
use rating_engine::{RatingCatalog, RatingMetrics, RatingPipeline, ReportRater};
use scheduler::RatingScheduler;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = rating_common::VERSION, "Starting Rating Operator...");

    let settings = OperatorSettings::load()?;
    let reports = settings.covered_reports();
    if reports.len() < settings.reports.len() {
        tracing::info!(
            namespace = %settings.namespace,
            discarded = settings.reports.len() - reports.len(),
            "Ignoring reports outside the rated namespace"
        );
    }

    let registry = Registry::new();
    let metrics = RatingMetrics::new(&registry)?;

    let client = Arc::new(RatingApiClient::new(
        &settings.api_url,
        &settings.admin_api_key,
    )?);
    let pipeline = RatingPipeline::new(client.clone(), client.clone(), client.clone())
        .with_metrics(metrics);
    let rater = ReportRater::new(Arc::new(RatingCatalog::new()), client.clone(), pipeline);
    let scheduler = RatingScheduler::new(client, rater, reports, settings.interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(server::serve(
        settings.metrics_addr,
        registry,
        shutdown_rx.clone(),
    ));

    tracing::info!(
        api = %settings.api_url,
        interval_secs = settings.interval.as_secs(),
        "Rating Operator started successfully"
    );

    tokio::select! {
        _ = scheduler.run(shutdown_rx) => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down...");
        }
        served = &mut server => {
            served??;
            anyhow::bail!("Metrics endpoint stopped unexpectedly");
        }
    }

    let _ = shutdown_tx.send(true);
    server.await??;

    Ok(())
}
