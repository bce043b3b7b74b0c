// src/ingest/providers/fixture.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::ingest::types::{JobSource, Listing};

/// Listings from a JSON array, either held in memory or read from disk on each fetch.
pub struct FixtureSource {
    name: String,
    mode: Mode,
}

enum Mode {
    Inline(String),
    File(PathBuf),
}

impl FixtureSource {
    pub fn from_json(name: impl Into<String>, json: &str) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Inline(json.to_string()),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("fixture:{}", path.display()),
            mode: Mode::File(path),
        }
    }

    pub fn from_listings(name: impl Into<String>, listings: &[Listing]) -> Result<Self> {
        let json = serde_json::to_string(listings).context("serializing fixture listings")?;
        Ok(Self::from_json(name, &json))
    }

    fn parse(s: &str) -> Result<Vec<Listing>> {
        let listings: Vec<Listing> = serde_json::from_str(s).context("parsing fixture listings")?;
        Ok(listings
            .into_iter()
            .filter(|l| !l.title.trim().is_empty())
            .collect())
    }
}

#[async_trait]
impl JobSource for FixtureSource {
    async fn fetch(&self) -> Result<Vec<Listing>> {
        match &self.mode {
            Mode::Inline(s) => Self::parse(s),
            Mode::File(p) => {
                let s = tokio::fs::read_to_string(p)
                    .await
                    .with_context(|| format!("reading fixture {}", p.display()))?;
                Self::parse(&s)
            }
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
