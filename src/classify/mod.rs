// src/classify/mod.rs
//! Listing classification: a completion-model verdict with a deterministic keyword fallback.
//!
//! `Classifier::classify` never fails. Any model problem (disabled, quota, transport,
//! unparseable or incomplete reply) degrades to `fallback::classify` for that one listing.

pub mod client;
pub mod fallback;
pub mod prompt;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::profile::MatchProfile;
use crate::ingest::types::Listing;

pub use client::{build_completion_client, DynCompletionClient, TextCompletionClient};

/// Role type assigned to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    LearningDesign,
    InstructionalDesign,
    ProductDesign,
    UserResearch,
    ProgramMgmt,
    Edtech,
    Consultant,
    Other,
    Excluded,
}

impl RoleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleCategory::LearningDesign => "learning_design",
            RoleCategory::InstructionalDesign => "instructional_design",
            RoleCategory::ProductDesign => "product_design",
            RoleCategory::UserResearch => "user_research",
            RoleCategory::ProgramMgmt => "program_mgmt",
            RoleCategory::Edtech => "edtech",
            RoleCategory::Consultant => "consultant",
            RoleCategory::Other => "other",
            RoleCategory::Excluded => "excluded",
        }
    }

    /// Lenient parse for model output; anything unrecognized is `Other`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "learning_design" => RoleCategory::LearningDesign,
            "instructional_design" => RoleCategory::InstructionalDesign,
            "product_design" => RoleCategory::ProductDesign,
            "user_research" => RoleCategory::UserResearch,
            "program_mgmt" | "program_management" => RoleCategory::ProgramMgmt,
            "edtech" => RoleCategory::Edtech,
            "consultant" => RoleCategory::Consultant,
            "excluded" => RoleCategory::Excluded,
            _ => RoleCategory::Other,
        }
    }

    /// "learning_design" -> "Learning Design"
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|w| {
                let mut c = w.chars();
                match c.next() {
                    Some(f) => f.to_ascii_uppercase().to_string() + c.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Structured judgment on one listing. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_match: bool,
    /// 0..=10
    pub score: u8,
    pub reasoning: String,
    pub category: RoleCategory,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("completion client disabled")]
    Disabled,
    #[error("daily completion limit reached ({0})")]
    QuotaExhausted(u32),
    #[error("completion transport error: {0}")]
    Transport(String),
    #[error("completion provider returned HTTP {0}")]
    Status(u16),
    #[error("completion response was empty")]
    EmptyResponse,
    #[error("completion response is not valid JSON: {0}")]
    Parse(String),
    #[error("completion response missing field `{0}`")]
    MissingField(&'static str),
}

/// Which strategy produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Model,
    Fallback,
}

pub struct Classifier {
    client: DynCompletionClient,
    profile: Arc<MatchProfile>,
}

impl Classifier {
    pub fn new(client: DynCompletionClient, profile: Arc<MatchProfile>) -> Self {
        Self { client, profile }
    }

    pub fn profile(&self) -> &MatchProfile {
        &self.profile
    }

    pub async fn classify(&self, listing: &Listing) -> Verdict {
        self.classify_detailed(listing).await.0
    }

    pub async fn classify_detailed(&self, listing: &Listing) -> (Verdict, Strategy) {
        let prompt = prompt::build_prompt(listing, &self.profile);
        let outcome = match self.client.complete(&prompt).await {
            Ok(text) => prompt::parse_verdict(&text),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(v) => (v, Strategy::Model),
            Err(ClassifierError::Disabled) => {
                tracing::debug!(title = %listing.title, "model disabled, keyword scoring");
                counter!("classify_fallback_total").increment(1);
                (fallback::classify(listing, &self.profile), Strategy::Fallback)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.client.provider_name(),
                    title = %listing.title,
                    company = %listing.company,
                    error = %e,
                    "model classification failed, using keyword fallback"
                );
                counter!("classify_fallback_total").increment(1);
                (fallback::classify(listing, &self.profile), Strategy::Fallback)
            }
        }
    }
}
