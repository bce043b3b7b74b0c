// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Where a listing came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Greenhouse,
    Fixture,
    Other(String),
}

impl SourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::Greenhouse => "Greenhouse",
            SourceKind::Fixture => "Fixture",
            SourceKind::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for SourceKind {
    fn from(s: &str) -> Self {
        match s.trim() {
            x if x.eq_ignore_ascii_case("greenhouse") => SourceKind::Greenhouse,
            x if x.eq_ignore_ascii_case("fixture") => SourceKind::Fixture,
            other => SourceKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SourceKind::from(s.as_str()))
    }
}

/// One job posting as fetched from a source, before classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    pub source: SourceKind,
    /// Provenance of the query that found it, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_category: Option<String>,
}

#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Listing>>;
    fn name(&self) -> String;
}
