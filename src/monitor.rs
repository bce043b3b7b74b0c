// src/monitor.rs
//! One full monitoring run: lock, load, prune, ingest, persist, route, notify, dashboard.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::alert::AlertRouter;
use crate::classify::{build_completion_client, Classifier};
use crate::config::{AiConfig, MonitorConfig};
use crate::dashboard::DashboardRenderer;
use crate::ingest::providers::{FixtureSource, GreenhouseBoardSource};
use crate::ingest::types::JobSource;
use crate::ingest::{IngestionPipeline, PipelineOptions};
use crate::notify::NotifierMux;
use crate::store::{RunLock, SeenStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: usize,
    pub fetched: usize,
    pub new: usize,
    pub duplicates: usize,
    pub fallback_used: usize,
    pub accepted: usize,
    pub immediate: usize,
    pub failed_sources: usize,
    /// Checkpoint and final persist failures.
    pub persist_failures: usize,
    pub notify_failures: usize,
    pub pruned: usize,
    pub store_size: usize,
    pub dashboard_written: bool,
}

/// Fixture files first, then one source per configured Greenhouse board.
pub fn build_sources(cfg: &MonitorConfig) -> Vec<Arc<dyn JobSource>> {
    let mut out: Vec<Arc<dyn JobSource>> = Vec::new();
    for p in &cfg.fixture_paths {
        out.push(Arc::new(FixtureSource::from_path(p)));
    }
    for slug in &cfg.greenhouse_companies {
        match GreenhouseBoardSource::new(slug.clone()) {
            Ok(s) => out.push(Arc::new(s)),
            Err(e) => tracing::warn!(company = %slug, error = %format!("{e:#}"), "skipping board"),
        }
    }
    out
}

pub async fn run_monitor(
    cfg: &MonitorConfig,
    ai: &AiConfig,
    sources: &[Arc<dyn JobSource>],
    notifier: &NotifierMux,
    dashboard: &dyn DashboardRenderer,
) -> Result<RunSummary> {
    let client = build_completion_client(ai);
    tracing::info!(provider = client.provider_name(), "classifier ready");
    let classifier = Arc::new(Classifier::new(client, Arc::new(cfg.profile.clone())));
    run_monitor_with(cfg, classifier, sources, notifier, dashboard, Utc::now()).await
}

/// Same as `run_monitor` with an explicit classifier and clock.
///
/// Only the lock can fail the run. Everything after it degrades: store read problems
/// mean an empty store, persist/notify/dashboard failures are logged and counted.
pub async fn run_monitor_with(
    cfg: &MonitorConfig,
    classifier: Arc<Classifier>,
    sources: &[Arc<dyn JobSource>],
    notifier: &NotifierMux,
    dashboard: &dyn DashboardRenderer,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    let _lock = RunLock::acquire(&cfg.lock_path, Duration::from_secs(cfg.lock_stale_secs))
        .context("acquiring run lock")?;

    let loaded = SeenStore::load(&cfg.store_path);
    let mut store = loaded.prune(cfg.retention_days, now);
    let pruned = loaded.len() - store.len();
    drop(loaded);

    let pipeline = IngestionPipeline::new(
        classifier,
        PipelineOptions {
            threshold: cfg.digest_threshold,
            fetch_concurrency: cfg.fetch_concurrency,
            classify_concurrency: cfg.classify_concurrency,
        },
    );
    let report = pipeline.run(sources, &mut store, now).await;

    let mut persist_failures = report.persist_failures;
    if let Err(e) = store.persist() {
        tracing::error!(path = %store.path().display(), error = %e, "final persist failed");
        metrics::counter!("store_persist_errors_total").increment(1);
        persist_failures += 1;
    }

    let batch = AlertRouter::new(cfg.immediate_threshold).route(&report.accepted);
    let notify_failures = notifier.notify(&batch, &report).await;

    let dashboard_written = match dashboard.render(&store, now) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "dashboard render failed");
            false
        }
    };

    let summary = RunSummary {
        sources: sources.len(),
        fetched: report.all_fetched,
        new: report.all_new,
        duplicates: report.duplicates,
        fallback_used: report.fallback_used,
        accepted: batch.digest.len(),
        immediate: batch.immediate.len(),
        failed_sources: report.failed_sources,
        persist_failures,
        notify_failures,
        pruned,
        store_size: store.len(),
        dashboard_written,
    };
    tracing::info!(
        sources = summary.sources,
        fetched = summary.fetched,
        new = summary.new,
        accepted = summary.accepted,
        immediate = summary.immediate,
        failed_sources = summary.failed_sources,
        store_size = summary.store_size,
        "run complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_follow_config_order() {
        let cfg = MonitorConfig {
            greenhouse_companies: vec!["khanacademy".into(), "duolingo".into()],
            fixture_paths: vec!["fixtures/a.json".into()],
            ..MonitorConfig::default()
        };
        let names: Vec<_> = build_sources(&cfg).iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["fixture:fixtures/a.json", "greenhouse:khanacademy", "greenhouse:duolingo"]
        );
    }
}
