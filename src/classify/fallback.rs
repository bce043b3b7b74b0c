// src/classify/fallback.rs
//! Keyword scoring used when the completion model is unavailable or unusable.
//!
//! Pure: no I/O, no randomness. Points:
//! - exclude keyword in title -> score 0, `excluded` (checked first, overrides all)
//! - any role group hit       -> +4, category = first matching group
//! - any education keyword    -> +3
//! - AI / equity / research   -> +1 each
//!
//! The final score is capped at 10 and `is_match` is `score >= 5`.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::classify::{RoleCategory, Verdict};
use crate::config::profile::MatchProfile;
use crate::ingest::types::Listing;

const ROLE_POINTS: u8 = 4;
const EDUCATION_POINTS: u8 = 3;
const MATCH_BAR: u8 = 5;

fn ai_term() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\bai\b|artificial intelligence").unwrap())
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .map(|n| n.trim().to_lowercase())
        .any(|n| !n.is_empty() && haystack.contains(&n))
}

pub fn classify(listing: &Listing, profile: &MatchProfile) -> Verdict {
    let title = listing.title.to_lowercase();

    for kw in &profile.exclude_keywords {
        let needle = kw.trim().to_lowercase();
        if !needle.is_empty() && title.contains(&needle) {
            return Verdict {
                is_match: false,
                score: 0,
                reasoning: format!("Excluded role type: {}", kw.trim()),
                category: RoleCategory::Excluded,
                strengths: Vec::new(),
                concerns: vec!["Not target role type".to_string()],
            };
        }
    }

    let combined = format!("{} {}", title, listing.description.to_lowercase());

    let role = profile
        .role_groups
        .iter()
        .find(|g| contains_any(&combined, &g.keywords))
        .map(|g| g.category);
    let education = contains_any(&combined, &profile.education_keywords);

    let mut score: u8 = 0;
    if role.is_some() {
        score += ROLE_POINTS;
    }
    if education {
        score += EDUCATION_POINTS;
    }
    if ai_term().is_match(&combined) {
        score += 1;
    }
    if contains_any(&combined, &profile.equity_keywords) {
        score += 1;
    }
    if contains_any(&combined, &profile.research_keywords) {
        score += 1;
    }
    let score = score.min(10);
    let is_match = score >= MATCH_BAR;

    Verdict {
        is_match,
        score,
        reasoning: format!(
            "Keyword match: role={}, education={}",
            role.is_some(),
            education
        ),
        category: role.unwrap_or(RoleCategory::Other),
        strengths: if role.is_some() {
            vec!["Role type match".to_string()]
        } else {
            Vec::new()
        },
        concerns: if is_match {
            Vec::new()
        } else {
            vec!["Weak keyword match".to_string()]
        },
    }
}
