// src/ingest/providers/greenhouse.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::normalize_text;
use crate::ingest::types::{JobSource, Listing, SourceKind};

const DEFAULT_BASE_URL: &str = "https://boards-api.greenhouse.io/v1/boards";
const MAX_DESCRIPTION_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
struct Board {
    #[serde(default)]
    jobs: Vec<BoardJob>,
}

#[derive(Debug, Deserialize)]
struct BoardJob {
    title: Option<String>,
    absolute_url: Option<String>,
    location: Option<NamedField>,
    content: Option<String>,
    #[serde(default)]
    departments: Vec<NamedField>,
}

#[derive(Debug, Deserialize)]
struct NamedField {
    name: Option<String>,
}

/// "renaissancelearning-nam" -> "Renaissancelearning Nam"
pub fn company_display_name(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One company's public job board.
pub struct GreenhouseBoardSource {
    slug: String,
    base_url: String,
    client: reqwest::Client,
}

impl GreenhouseBoardSource {
    pub fn new(slug: impl Into<String>) -> Result<Self> {
        Self::with_base_url(slug, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(slug: impl Into<String>, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("job-monitor/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building greenhouse http client")?;
        Ok(Self {
            slug: slug.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Parse a board payload into listings for `slug`.
    pub fn parse_board(slug: &str, body: &str) -> Result<Vec<Listing>> {
        let board: Board = serde_json::from_str(body)
            .with_context(|| format!("parsing greenhouse board {slug}"))?;
        let company = company_display_name(slug);

        let mut out = Vec::with_capacity(board.jobs.len());
        for job in board.jobs {
            let title = normalize_text(job.title.as_deref().unwrap_or_default(), 300);
            if title.is_empty() {
                continue;
            }
            let location = job
                .location
                .and_then(|l| l.name)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Location not specified".to_string());
            let department = job.departments.into_iter().find_map(|d| d.name);

            out.push(Listing {
                title,
                company: company.clone(),
                location,
                description: normalize_text(
                    job.content.as_deref().unwrap_or_default(),
                    MAX_DESCRIPTION_CHARS,
                ),
                url: job.absolute_url.unwrap_or_default(),
                source: SourceKind::Greenhouse,
                search_category: department,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl JobSource for GreenhouseBoardSource {
    async fn fetch(&self) -> Result<Vec<Listing>> {
        let url = format!("{}/{}/jobs?content=true", self.base_url, self.slug);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("greenhouse get {}", self.slug))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow!("greenhouse board not found: {}", self.slug));
        }
        if !status.is_success() {
            return Err(anyhow!("greenhouse board {} returned {status}", self.slug));
        }
        let body = resp.text().await.context("greenhouse body")?;
        Self::parse_board(&self.slug, &body)
    }

    fn name(&self) -> String {
        format!("greenhouse:{}", self.slug)
    }
}
