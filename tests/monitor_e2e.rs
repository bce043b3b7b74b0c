// tests/monitor_e2e.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex};

use job_monitor::classify::client::MockClient;
use job_monitor::config::{AiConfig, MatchProfile, MonitorConfig};
use job_monitor::dashboard::HtmlDashboard;
use job_monitor::ingest::providers::FixtureSource;
use job_monitor::{
    run_monitor, run_monitor_with, AlertBatch, Classifier, JobSource, Notifier, NotifierMux,
    RunLock, RunReport, SeenStore,
};

const LISTINGS: &str = r#"[
  {"title": "Senior Learning Designer", "company": "Khan Academy", "location": "Remote, USA",
   "description": "Design K-12 learning with AI for underserved students.", "url": "https://example.test/1", "source": "Fixture"},
  {"title": "Curriculum Developer", "company": "Duolingo", "location": "Pittsburgh, PA",
   "description": "Write education content.", "url": "https://example.test/2", "source": "Fixture"},
  {"title": "Software Engineer", "company": "Acme", "location": "Remote",
   "description": "Build learning platforms for students.", "url": "https://example.test/3", "source": "Fixture"}
]"#;

#[derive(Default)]
struct Recorder(Mutex<Vec<(usize, usize)>>);

#[async_trait]
impl Notifier for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }
    async fn notify(&self, batch: &AlertBatch, _report: &RunReport) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .push((batch.immediate.len(), batch.digest.len()));
        Ok(())
    }
}

struct Broken;

#[async_trait]
impl Notifier for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }
    async fn notify(&self, _batch: &AlertBatch, _report: &RunReport) -> Result<()> {
        anyhow::bail!("smtp relay refused connection")
    }
}

fn config(dir: &Path) -> MonitorConfig {
    MonitorConfig {
        store_path: dir.join("state/seen.json"),
        dashboard_path: dir.join("state/dashboard.html"),
        lock_path: dir.join("state/run.lock"),
        greenhouse_companies: vec![],
        fixture_paths: vec![],
        ..MonitorConfig::default()
    }
}

fn sources() -> Vec<Arc<dyn JobSource>> {
    vec![Arc::new(FixtureSource::from_json("fixture", LISTINGS)) as Arc<dyn JobSource>]
}

#[tokio::test]
async fn full_run_then_rerun_alerts_once() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let recorder = Arc::new(Recorder::default());
    let mux = NotifierMux::new(vec![recorder.clone() as Arc<dyn Notifier>]);
    let dashboard = HtmlDashboard::new(&cfg.dashboard_path, cfg.immediate_threshold);

    // disabled AI config: keyword fallback decides
    let first = run_monitor(&cfg, &AiConfig::default(), &sources(), &mux, &dashboard)
        .await
        .unwrap();
    assert_eq!(first.fetched, 3);
    assert_eq!(first.new, 3);
    assert_eq!(first.fallback_used, 3);
    // Khan (9) and Duolingo (4 + 3 = 7) accepted; the engineer is excluded
    assert_eq!(first.accepted, 2);
    assert_eq!(first.immediate, 1);
    assert_eq!(first.store_size, 2);
    assert!(first.dashboard_written);
    assert!(!cfg.lock_path.exists());

    let html = std::fs::read_to_string(&cfg.dashboard_path).unwrap();
    assert!(html.contains("Senior Learning Designer"));
    assert!(!html.contains("Software Engineer"));

    let second = run_monitor(&cfg, &AiConfig::default(), &sources(), &mux, &dashboard)
        .await
        .unwrap();
    assert_eq!(second.new, 1);
    assert_eq!(second.duplicates, 2);
    assert_eq!(second.accepted, 0);

    // second run had nothing to send
    assert_eq!(*recorder.0.lock().unwrap(), vec![(1, 2)]);
}

#[tokio::test]
async fn held_lock_refuses_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let _held = RunLock::acquire(&cfg.lock_path, std::time::Duration::from_secs(3600)).unwrap();

    let mux = NotifierMux::new(vec![]);
    let dashboard = HtmlDashboard::new(&cfg.dashboard_path, 8);
    let r = run_monitor(&cfg, &AiConfig::default(), &sources(), &mux, &dashboard).await;
    assert!(r.is_err());
    assert!(!cfg.store_path.exists());
}

#[tokio::test]
async fn old_records_are_pruned_and_can_alert_again() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = MonitorConfig {
        retention_days: 30,
        ..config(dir.path())
    };
    let mux = NotifierMux::new(vec![]);
    let dashboard = HtmlDashboard::new(&cfg.dashboard_path, 8);
    let reply = r#"{"is_match": true, "score": 7, "reasoning": "ok", "role_category": "edtech"}"#;
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

    let classifier = |mock: &Arc<MockClient>| {
        Arc::new(Classifier::new(mock.clone(), Arc::new(MatchProfile::default())))
    };

    let mock = Arc::new(MockClient::new(reply));
    let first = run_monitor_with(&cfg, classifier(&mock), &sources(), &mux, &dashboard, start)
        .await
        .unwrap();
    assert_eq!(first.accepted, 3);

    let later = start + Duration::days(31);
    let second = run_monitor_with(&cfg, classifier(&mock), &sources(), &mux, &dashboard, later)
        .await
        .unwrap();
    assert_eq!(second.pruned, 3);
    assert_eq!(second.accepted, 3);
    assert_eq!(mock.calls(), 6);

    let store = SeenStore::load(&cfg.store_path);
    assert!(store.records().iter().all(|r| r.first_seen_at == later));
}

#[tokio::test]
async fn failing_channel_does_not_block_other_channels_or_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let recorder = Arc::new(Recorder::default());
    let mux = NotifierMux::new(vec![
        Arc::new(Broken) as Arc<dyn Notifier>,
        recorder.clone() as Arc<dyn Notifier>,
    ]);
    let dashboard = HtmlDashboard::new(&cfg.dashboard_path, cfg.immediate_threshold);

    let summary = run_monitor(&cfg, &AiConfig::default(), &sources(), &mux, &dashboard)
        .await
        .unwrap();
    assert_eq!(summary.notify_failures, 1);
    assert!(summary.dashboard_written);
    assert!(cfg.dashboard_path.exists());
    assert_eq!(recorder.0.lock().unwrap().len(), 1);
    assert_eq!(SeenStore::load(&cfg.store_path).len(), 2);
}

#[tokio::test]
async fn unwritable_store_is_counted_and_run_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let cfg = MonitorConfig {
        store_path: blocker.join("seen.json"),
        ..config(dir.path())
    };
    let recorder = Arc::new(Recorder::default());
    let mux = NotifierMux::new(vec![recorder.clone() as Arc<dyn Notifier>]);
    let dashboard = HtmlDashboard::new(&cfg.dashboard_path, cfg.immediate_threshold);

    let summary = run_monitor(&cfg, &AiConfig::default(), &sources(), &mux, &dashboard)
        .await
        .unwrap();
    // one checkpoint for the fixture batch plus the final write
    assert_eq!(summary.persist_failures, 2);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.store_size, 2);
    assert!(summary.dashboard_written);
    assert_eq!(*recorder.0.lock().unwrap(), vec![(1, 2)]);
    assert!(!cfg.lock_path.exists());
}
