use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{listing_line, Notifier};
use crate::alert::AlertBatch;
use crate::ingest::RunReport;
use crate::store::SeenRecord;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl EmailNotifier {
    /// `None` (email off) unless SMTP_HOST, SMTP_USER, SMTP_PASS, NOTIFY_EMAIL_FROM and
    /// NOTIFY_EMAIL_TO are all set and valid.
    pub fn from_env() -> Option<Self> {
        let host = env_nonempty("SMTP_HOST")?;
        let (Some(user), Some(pass), Some(from_addr), Some(to_addr)) = (
            env_nonempty("SMTP_USER"),
            env_nonempty("SMTP_PASS"),
            env_nonempty("NOTIFY_EMAIL_FROM"),
            env_nonempty("NOTIFY_EMAIL_TO"),
        ) else {
            tracing::warn!("SMTP_HOST set but email settings incomplete, email disabled");
            return None;
        };

        match Self::new(&host, user, pass, &from_addr, &to_addr) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "email settings invalid, email disabled");
                None
            }
        }
    }

    pub fn new(host: &str, user: String, pass: String, from: &str, to: &str) -> Result<Self> {
        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();
        Ok(Self {
            mailer,
            from: from.parse().context("invalid NOTIFY_EMAIL_FROM")?,
            to: to.parse().context("invalid NOTIFY_EMAIL_TO")?,
        })
    }

    async fn send(&self, subject: String, body: String) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

pub fn immediate_subject(r: &SeenRecord) -> String {
    format!(
        "High match job ({}/10): {} @ {}",
        r.verdict.score, r.listing.title, r.listing.company
    )
}

pub fn immediate_body(r: &SeenRecord) -> String {
    let mut body = format!(
        "{}\n{}\nLocation: {}\nScore: {}/10\nCategory: {}\nSource: {}\n\nWhy this matches:\n{}\n",
        r.listing.title,
        r.listing.company,
        r.listing.location,
        r.verdict.score,
        r.verdict.category.label(),
        r.listing.source,
        r.verdict.reasoning
    );
    if !r.verdict.strengths.is_empty() {
        body.push_str(&format!("\nStrengths: {}\n", r.verdict.strengths.join("; ")));
    }
    if !r.verdict.concerns.is_empty() {
        body.push_str(&format!("Concerns: {}\n", r.verdict.concerns.join("; ")));
    }
    body.push_str(&format!("\nApply: {}\n", r.listing.url));
    body
}

pub fn digest_subject(batch: &AlertBatch) -> String {
    format!("Daily job digest - {} new matches", batch.digest.len())
}

pub fn digest_body(batch: &AlertBatch, report: &RunReport) -> String {
    let mut body = format!(
        "{} new matches ({} high priority)\nChecked {} sources: {} listings, {} new, {} failed sources.\n\n",
        batch.digest.len(),
        batch.immediate.len(),
        report.per_source.len(),
        report.all_fetched,
        report.all_new,
        report.failed_sources
    );
    for r in &batch.digest {
        body.push_str(&listing_line(r));
        body.push('\n');
        if !r.verdict.reasoning.is_empty() {
            body.push_str("    ");
            body.push_str(&r.verdict.reasoning);
            body.push('\n');
        }
    }
    body
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, batch: &AlertBatch, report: &RunReport) -> Result<()> {
        let mut first_err = None;
        for r in &batch.immediate {
            if let Err(e) = self.send(immediate_subject(r), immediate_body(r)).await {
                tracing::warn!(
                    title = %r.listing.title,
                    error = %format!("{e:#}"),
                    "immediate alert failed"
                );
                first_err.get_or_insert(e);
            }
        }
        self.send(digest_subject(batch), digest_body(batch, report))
            .await
            .context("digest email")?;
        match first_err {
            Some(e) => Err(e.context("one or more immediate alerts failed")),
            None => Ok(()),
        }
    }
}
