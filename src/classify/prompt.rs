// src/classify/prompt.rs
use serde::Deserialize;

use crate::classify::{ClassifierError, RoleCategory, Verdict};
use crate::config::profile::MatchProfile;
use crate::ingest::types::Listing;

const MAX_DESCRIPTION_CHARS: usize = 2000;

pub fn build_prompt(listing: &Listing, profile: &MatchProfile) -> String {
    let description: String = if listing.description.trim().is_empty() {
        "No description".to_string()
    } else {
        listing.description.chars().take(MAX_DESCRIPTION_CHARS).collect()
    };
    let categories = [
        RoleCategory::LearningDesign,
        RoleCategory::InstructionalDesign,
        RoleCategory::ProductDesign,
        RoleCategory::UserResearch,
        RoleCategory::ProgramMgmt,
        RoleCategory::Edtech,
        RoleCategory::Consultant,
        RoleCategory::Other,
    ]
    .iter()
    .map(|c| c.as_str())
    .collect::<Vec<_>>()
    .join("|");

    format!(
        r#"You are deciding whether a job posting matches a candidate's profile.

CANDIDATE PROFILE:
{profile}

JOB TO ANALYZE:
Title: {title}
Company: {company}
Location: {location}
Description: {description}

SOURCE CONTEXT:
- Source: {source}
- Search Category: {category}

EVALUATION CRITERIA:
1. Role type match with the candidate's target roles.
2. Genuine education or learning focus.
3. Mission alignment: underserved populations, evidence-based or inclusive design.
4. Experience and skills fit.
5. Career growth.

SCORING GUIDE:
9-10 perfect match, 7-8 strong, 5-6 decent, 3-4 weak, 0-2 poor or wrong role type.
Exclude pure software engineering, sales and marketing unless learning-focused.

Respond ONLY with valid JSON (no markdown, no code fences, no preamble):
{{
  "is_match": true or false,
  "score": integer 0-10,
  "reasoning": "2-3 sentences",
  "role_category": "{categories}",
  "key_strengths": ["..."],
  "concerns": ["..."]
}}
"#,
        profile = profile.profile_text,
        title = listing.title,
        company = listing.company,
        location = listing.location,
        description = description,
        source = listing.source,
        category = listing.search_category.as_deref().unwrap_or("General"),
        categories = categories,
    )
}

/// Remove a wrapping ``` fence (with or without a language tag) and a bare
/// leading `json` tag.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // drop the rest of the opening fence line (e.g. "json")
        text = match rest.find('\n') {
            Some(i) => &rest[i + 1..],
            None => rest,
        };
        text = text.trim_end();
        if let Some(body) = text.strip_suffix("```") {
            text = body;
        }
        text = text.trim();
    }
    if let Some(rest) = text.strip_prefix("json") {
        text = rest.trim_start();
    }
    text
}

#[derive(Deserialize)]
struct RawVerdict {
    is_match: Option<bool>,
    score: Option<f64>,
    reasoning: Option<String>,
    role_category: Option<String>,
    #[serde(default)]
    key_strengths: Vec<String>,
    #[serde(default)]
    concerns: Vec<String>,
}

/// Parse a model reply into a `Verdict`. Fails on invalid JSON or when any of
/// `is_match`, `score`, `reasoning`, `role_category` is absent.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ClassifierError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ClassifierError::EmptyResponse);
    }
    let parsed: RawVerdict =
        serde_json::from_str(text).map_err(|e| ClassifierError::Parse(e.to_string()))?;

    let is_match = parsed
        .is_match
        .ok_or(ClassifierError::MissingField("is_match"))?;
    let score = parsed.score.ok_or(ClassifierError::MissingField("score"))?;
    let reasoning = parsed
        .reasoning
        .ok_or(ClassifierError::MissingField("reasoning"))?;
    let category = parsed
        .role_category
        .ok_or(ClassifierError::MissingField("role_category"))?;

    let score = if score.is_finite() {
        score.round().clamp(0.0, 10.0) as u8
    } else {
        0
    };

    Ok(Verdict {
        is_match,
        score,
        reasoning: reasoning.trim().to_string(),
        category: RoleCategory::parse_lenient(&category),
        strengths: parsed.key_strengths,
        concerns: parsed.concerns,
    })
}
