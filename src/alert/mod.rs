// src/alert/mod.rs
//! Threshold routing for accepted listings.
//!
//! Every accepted listing goes to the digest; those at or above the immediate
//! threshold are also sent right away. `immediate` is always a subset of `digest`.

use crate::store::SeenRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTier {
    Immediate,
    DigestOnly,
}

#[derive(Debug, Clone, Default)]
pub struct AlertBatch {
    pub immediate: Vec<SeenRecord>,
    /// Score descending, then earliest first seen.
    pub digest: Vec<SeenRecord>,
}

impl AlertBatch {
    pub fn is_empty(&self) -> bool {
        self.digest.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertRouter {
    immediate_threshold: u8,
}

impl AlertRouter {
    pub fn new(immediate_threshold: u8) -> Self {
        Self {
            immediate_threshold,
        }
    }

    pub fn tier(&self, record: &SeenRecord) -> AlertTier {
        if record.verdict.score >= self.immediate_threshold {
            AlertTier::Immediate
        } else {
            AlertTier::DigestOnly
        }
    }

    pub fn route(&self, accepted: &[SeenRecord]) -> AlertBatch {
        let mut digest = accepted.to_vec();
        digest.sort_by(|a, b| {
            b.verdict
                .score
                .cmp(&a.verdict.score)
                .then(a.first_seen_at.cmp(&b.first_seen_at))
        });
        let immediate = digest
            .iter()
            .filter(|r| self.tier(r) == AlertTier::Immediate)
            .cloned()
            .collect();
        AlertBatch { immediate, digest }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{RoleCategory, Verdict};
    use crate::ingest::types::{Listing, SourceKind};
    use chrono::{Duration, TimeZone, Utc};

    fn rec(title: &str, score: u8, offset_secs: i64) -> SeenRecord {
        SeenRecord::new(
            Listing {
                title: title.into(),
                company: "Acme".into(),
                location: "Remote".into(),
                description: String::new(),
                url: String::new(),
                source: SourceKind::Fixture,
                search_category: None,
            },
            Verdict {
                is_match: true,
                score,
                reasoning: String::new(),
                category: RoleCategory::Other,
                strengths: vec![],
                concerns: vec![],
            },
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs),
        )
    }

    #[test]
    fn immediate_is_subset_and_digest_is_ordered() {
        let router = AlertRouter::new(8);
        let batch = router.route(&[
            rec("six", 6, 0),
            rec("nine-late", 9, 10),
            rec("eight", 8, 5),
            rec("nine-early", 9, 1),
        ]);
        let digest: Vec<_> = batch.digest.iter().map(|r| r.listing.title.as_str()).collect();
        assert_eq!(digest, vec!["nine-early", "nine-late", "eight", "six"]);
        let immediate: Vec<_> = batch.immediate.iter().map(|r| r.listing.title.as_str()).collect();
        assert_eq!(immediate, vec!["nine-early", "nine-late", "eight"]);
    }

    #[test]
    fn empty_input_is_empty_batch() {
        assert!(AlertRouter::new(8).route(&[]).is_empty());
    }
}
