// src/ingest/mod.rs
pub mod identity;
pub mod providers;
pub mod types;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::classify::{fallback, Classifier, Strategy, Verdict};
use crate::ingest::identity::IdentityKey;
use crate::ingest::types::{JobSource, Listing};
use crate::store::{SeenRecord, SeenStore};

/// One-time metrics registration (so series show up once a recorder is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_listings_fetched_total",
            "Listings returned by all sources."
        );
        describe_counter!(
            "ingest_listings_new_total",
            "Listings whose identity key was not yet in the seen-store."
        );
        describe_counter!(
            "ingest_listings_duplicate_total",
            "Listings dropped because their key was already seen."
        );
        describe_counter!(
            "ingest_listings_accepted_total",
            "Listings that cleared the match threshold."
        );
        describe_counter!("ingest_source_errors_total", "Source fetch failures.");
        describe_counter!(
            "classify_fallback_total",
            "Classifications served by the keyword fallback."
        );
        describe_counter!("store_persist_errors_total", "Seen-store write failures.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode (twice: board APIs ship entity-escaped HTML)
    let once = html_escape::decode_html_entities(s).to_string();
    let mut out = html_escape::decode_html_entities(&once).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// `is_match` and at or above the threshold.
pub fn is_accepted(verdict: &Verdict, threshold: u8) -> bool {
    verdict.is_match && verdict.score >= threshold
}

/// Split fetched listings into (new, duplicate count). A key already in the store,
/// or already taken earlier in this run, is a duplicate.
pub fn partition_new(
    listings: Vec<Listing>,
    store: &SeenStore,
    taken_this_run: &mut HashSet<IdentityKey>,
) -> (Vec<(IdentityKey, Listing)>, usize) {
    let mut fresh = Vec::with_capacity(listings.len());
    let mut dups = 0usize;
    for l in listings {
        let key = IdentityKey::of(&l);
        if store.contains(&key) || !taken_this_run.insert(key.clone()) {
            dups += 1;
            continue;
        }
        fresh.push((key, l));
    }
    (fresh, dups)
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Minimum score for acceptance.
    pub threshold: u8,
    pub fetch_concurrency: usize,
    pub classify_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threshold: 6,
            fetch_concurrency: 4,
            classify_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub name: String,
    pub fetched: usize,
    pub new: usize,
    pub duplicates: usize,
    pub accepted: usize,
    pub failed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub all_fetched: usize,
    pub all_new: usize,
    pub duplicates: usize,
    pub classified: usize,
    pub fallback_used: usize,
    /// In source order, then fetch order within a source.
    pub accepted: Vec<SeenRecord>,
    pub failed_sources: usize,
    pub persist_failures: usize,
    pub per_source: Vec<SourceStats>,
}

pub struct IngestionPipeline {
    classifier: Arc<Classifier>,
    opts: PipelineOptions,
}

impl IngestionPipeline {
    pub fn new(classifier: Arc<Classifier>, opts: PipelineOptions) -> Self {
        Self { classifier, opts }
    }

    /// Fetch → dedupe → classify → accept → insert → checkpoint, one batch per source.
    ///
    /// Only accepted listings are inserted into `store`; rejected ones stay eligible
    /// for classification on a later run. Nothing here aborts the run: source
    /// failures count as empty batches and persist failures are logged.
    pub async fn run(
        &self,
        sources: &[Arc<dyn JobSource>],
        store: &mut SeenStore,
        now: DateTime<Utc>,
    ) -> RunReport {
        ensure_metrics_described();
        let mut report = RunReport::default();
        let mut taken_this_run: HashSet<IdentityKey> = HashSet::new();

        let fetched = self.fetch_all(sources).await;

        for (name, result) in fetched {
            let mut stats = SourceStats {
                name: name.clone(),
                ..Default::default()
            };

            let listings = match result {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        source = %name,
                        error = %format!("{e:#}"),
                        "source fetch failed"
                    );
                    counter!("ingest_source_errors_total").increment(1);
                    stats.failed = true;
                    report.failed_sources += 1;
                    report.per_source.push(stats);
                    continue;
                }
            };

            stats.fetched = listings.len();
            let (fresh, dups) = partition_new(listings, store, &mut taken_this_run);
            stats.new = fresh.len();
            stats.duplicates = dups;

            let classified = self.classify_batch(fresh).await;
            report.classified += classified.len();

            for (key, listing, verdict, strategy) in classified {
                if strategy == Strategy::Fallback {
                    report.fallback_used += 1;
                }
                if !is_accepted(&verdict, self.opts.threshold) {
                    tracing::debug!(
                        key = %key,
                        title = %listing.title,
                        score = verdict.score,
                        "rejected"
                    );
                    continue;
                }
                tracing::info!(
                    source = %name,
                    title = %listing.title,
                    company = %listing.company,
                    score = verdict.score,
                    category = verdict.category.as_str(),
                    "accepted"
                );
                let record = SeenRecord {
                    key,
                    listing,
                    verdict,
                    first_seen_at: now,
                };
                store.insert(record.clone());
                report.accepted.push(record);
                stats.accepted += 1;
            }

            if stats.accepted > 0 {
                if let Err(e) = store.persist() {
                    tracing::warn!(source = %name, error = %e, "checkpoint persist failed");
                    counter!("store_persist_errors_total").increment(1);
                    report.persist_failures += 1;
                }
            }

            tracing::info!(
                source = %name,
                fetched = stats.fetched,
                new = stats.new,
                duplicates = stats.duplicates,
                accepted = stats.accepted,
                "source batch done"
            );
            report.all_fetched += stats.fetched;
            report.all_new += stats.new;
            report.duplicates += stats.duplicates;
            report.per_source.push(stats);
        }

        // Telemetry
        counter!("ingest_listings_fetched_total").increment(report.all_fetched as u64);
        counter!("ingest_listings_new_total").increment(report.all_new as u64);
        counter!("ingest_listings_duplicate_total").increment(report.duplicates as u64);
        counter!("ingest_listings_accepted_total").increment(report.accepted.len() as u64);
        gauge!("ingest_last_run_ts").set(now.timestamp() as f64);

        report
    }

    /// Fetch every source concurrently (bounded); results come back in source order.
    async fn fetch_all(
        &self,
        sources: &[Arc<dyn JobSource>],
    ) -> Vec<(String, anyhow::Result<Vec<Listing>>)> {
        let permits = Arc::new(Semaphore::new(self.opts.fetch_concurrency.max(1)));
        let handles: Vec<_> = sources
            .iter()
            .map(|src| {
                let src = Arc::clone(src);
                let permits = Arc::clone(&permits);
                let name = src.name();
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    src.fetch().await
                });
                (name, handle)
            })
            .collect();

        let mut out = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let res = match handle.await {
                Ok(r) => r,
                Err(e) => Err(anyhow::anyhow!("source task aborted: {e}")),
            };
            out.push((name, res));
        }
        out
    }

    /// Classify listings concurrently (bounded); output keeps input order.
    async fn classify_batch(
        &self,
        fresh: Vec<(IdentityKey, Listing)>,
    ) -> Vec<(IdentityKey, Listing, Verdict, Strategy)> {
        let permits = Arc::new(Semaphore::new(self.opts.classify_concurrency.max(1)));
        let handles: Vec<_> = fresh
            .into_iter()
            .map(|(key, listing)| {
                let classifier = Arc::clone(&self.classifier);
                let permits = Arc::clone(&permits);
                let task_listing = listing.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    classifier.classify_detailed(&task_listing).await
                });
                (key, listing, handle)
            })
            .collect();

        let mut out = Vec::with_capacity(handles.len());
        for (key, listing, handle) in handles {
            let (verdict, strategy) = match handle.await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        error = %e,
                        "classification task aborted, using keyword fallback"
                    );
                    (
                        fallback::classify(&listing, self.classifier.profile()),
                        Strategy::Fallback,
                    )
                }
            };
            out.push((key, listing, verdict, strategy));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RoleCategory;
    use crate::ingest::types::SourceKind;

    fn listing(title: &str) -> Listing {
        Listing {
            title: title.into(),
            company: "Acme".into(),
            location: "Remote".into(),
            description: String::new(),
            url: String::new(),
            source: SourceKind::Fixture,
            search_category: None,
        }
    }

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "&lt;p&gt;Design&nbsp;<b>learning</b>\n\n  &ldquo;fast&rdquo;&lt;/p&gt;";
        assert_eq!(normalize_text(s, 1000), r#"Design learning "fast""#);
        assert_eq!(normalize_text("abcdef", 3), "abc");
    }

    #[test]
    fn acceptance_needs_match_and_threshold() {
        let mut v = Verdict {
            is_match: true,
            score: 6,
            reasoning: String::new(),
            category: RoleCategory::Other,
            strengths: vec![],
            concerns: vec![],
        };
        assert!(is_accepted(&v, 6));
        assert!(!is_accepted(&v, 7));
        v.is_match = false;
        assert!(!is_accepted(&v, 0));
    }

    #[test]
    fn partition_drops_store_hits_and_in_run_repeats() {
        let mut store = SeenStore::empty("unused.json");
        let known = listing("Known");
        store.insert(SeenRecord::new(
            known.clone(),
            Verdict {
                is_match: true,
                score: 9,
                reasoning: String::new(),
                category: RoleCategory::Other,
                strengths: vec![],
                concerns: vec![],
            },
            Utc::now(),
        ));

        let mut taken = HashSet::new();
        let (fresh, dups) = partition_new(
            vec![known, listing("New"), listing("new ")],
            &store,
            &mut taken,
        );
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].1.title, "New");
        assert_eq!(dups, 2);
    }
}
