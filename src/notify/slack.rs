use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;

use super::{listing_line, Notifier};
use crate::alert::AlertBatch;
use crate::ingest::RunReport;

const MAX_LINES: usize = 20;

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl SlackNotifier {
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

/// Slack mrkdwn text for one run.
pub fn render_text(batch: &AlertBatch, report: &RunReport) -> String {
    let mut text = format!(
        "*Job monitor:* {} new matches, {} high priority ({} listings checked, {} new)\n",
        batch.digest.len(),
        batch.immediate.len(),
        report.all_fetched,
        report.all_new,
    );
    for r in &batch.immediate {
        text.push_str(&format!(":star: {}\n", listing_line(r)));
    }
    let rest: Vec<_> = batch
        .digest
        .iter()
        .filter(|r| !batch.immediate.iter().any(|i| i.key == r.key))
        .collect();
    for r in rest.iter().take(MAX_LINES) {
        text.push_str(&format!("• {}\n", listing_line(r)));
    }
    if rest.len() > MAX_LINES {
        text.push_str(&format!("…and {} more\n", rest.len() - MAX_LINES));
    }
    text
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn notify(&self, batch: &AlertBatch, report: &RunReport) -> Result<()> {
        let body = serde_json::json!({ "text": render_text(batch, report) });

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook_url)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await
                .and_then(|rsp| rsp.error_for_status());

            match res {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    tracing::debug!(attempt, error = %e, "slack post failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                }
                Err(e) => return Err(anyhow!("slack webhook failed after {attempt} attempts: {e}")),
            }
        }
    }
}
