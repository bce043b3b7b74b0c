// src/notify/mod.rs
//! Outbound notifications for a finished run.
//!
//! Every channel is best-effort: `NotifierMux` logs a failing channel and moves on,
//! so a broken SMTP relay never blocks the dashboard or the store.

pub mod email;
pub mod slack;

use anyhow::Result;
use std::sync::Arc;

use crate::alert::AlertBatch;
use crate::ingest::RunReport;
use crate::store::SeenRecord;

pub use email::EmailNotifier;
pub use slack::SlackNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn notify(&self, batch: &AlertBatch, report: &RunReport) -> Result<()>;
}

/// One line per listing, shared by the text channels.
pub fn listing_line(r: &SeenRecord) -> String {
    format!(
        "[{}/10] {} @ {} ({}) [{}] {}",
        r.verdict.score,
        r.listing.title,
        r.listing.company,
        r.listing.location,
        r.verdict.category.label(),
        r.listing.url
    )
}

/// Writes the batch to the log. Always on.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, batch: &AlertBatch, report: &RunReport) -> Result<()> {
        for r in &batch.immediate {
            tracing::info!(
                target: "alerts",
                score = r.verdict.score,
                "HIGH MATCH {}",
                listing_line(r)
            );
        }
        tracing::info!(
            target: "alerts",
            matches = batch.digest.len(),
            immediate = batch.immediate.len(),
            fetched = report.all_fetched,
            new = report.all_new,
            "digest ready"
        );
        Ok(())
    }
}

/// Fan-out to all configured channels.
#[derive(Clone, Default)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Log always; email and Slack when their env vars are present.
    pub fn from_env() -> Self {
        let mut channels: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
        if let Some(email) = EmailNotifier::from_env() {
            channels.push(Arc::new(email));
        }
        if let Some(slack) = SlackNotifier::from_env() {
            channels.push(Arc::new(slack));
        }
        Self { channels }
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Returns how many channels failed.
    pub async fn notify(&self, batch: &AlertBatch, report: &RunReport) -> usize {
        if batch.is_empty() {
            tracing::info!("no new matches, nothing to send");
            return 0;
        }
        let mut failures = 0;
        for ch in &self.channels {
            if let Err(e) = ch.notify(batch, report).await {
                failures += 1;
                tracing::warn!(
                    channel = ch.name(),
                    error = %format!("{e:#}"),
                    "notification failed"
                );
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>, bool);

    #[async_trait::async_trait]
    impl Notifier for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }
        async fn notify(&self, _b: &AlertBatch, _r: &RunReport) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1 {
                anyhow::bail!("down");
            }
            Ok(())
        }
    }

    fn batch_with_one() -> AlertBatch {
        use crate::classify::{RoleCategory, Verdict};
        use crate::ingest::types::{Listing, SourceKind};
        let r = SeenRecord::new(
            Listing {
                title: "Learning Designer".into(),
                company: "Acme".into(),
                location: "Remote".into(),
                description: String::new(),
                url: "https://x.test".into(),
                source: SourceKind::Fixture,
                search_category: None,
            },
            Verdict {
                is_match: true,
                score: 7,
                reasoning: String::new(),
                category: RoleCategory::LearningDesign,
                strengths: vec![],
                concerns: vec![],
            },
            chrono::Utc::now(),
        );
        AlertBatch {
            immediate: vec![],
            digest: vec![r],
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_stop_others() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mux = NotifierMux::new(vec![
            Arc::new(Counting(hits.clone(), true)) as Arc<dyn Notifier>,
            Arc::new(Counting(hits.clone(), false)),
        ]);
        let failed = mux.notify(&batch_with_one(), &RunReport::default()).await;
        assert_eq!(failed, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mux = NotifierMux::new(vec![
            Arc::new(Counting(hits.clone(), false)) as Arc<dyn Notifier>
        ]);
        mux.notify(&AlertBatch::default(), &RunReport::default()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listing_line_has_score_and_category() {
        let b = batch_with_one();
        let line = listing_line(&b.digest[0]);
        assert!(line.starts_with("[7/10] Learning Designer @ Acme"));
        assert!(line.contains("[Learning Design]"));
    }
}
