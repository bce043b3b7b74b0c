// src/config/monitor.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::profile::MatchProfile;

pub const DEFAULT_MONITOR_CONFIG_PATH: &str = "config/monitor.toml";
pub const ENV_MONITOR_CONFIG_PATH: &str = "JOB_MONITOR_CONFIG";
pub const ENV_DIGEST_THRESHOLD: &str = "DIGEST_THRESHOLD";
pub const ENV_IMMEDIATE_THRESHOLD: &str = "IMMEDIATE_ALERT_THRESHOLD";
/// Upper bound for `retention_days` (100 years).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Run-wide settings. Every field has a default so an empty file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub store_path: PathBuf,
    pub dashboard_path: PathBuf,
    pub lock_path: PathBuf,
    /// A lock file older than this is considered abandoned.
    pub lock_stale_secs: u64,
    pub retention_days: i64,
    /// Minimum score for a match to be accepted (and land in the digest).
    pub digest_threshold: u8,
    /// Minimum score for an immediate alert.
    pub immediate_threshold: u8,
    pub fetch_concurrency: usize,
    pub classify_concurrency: usize,
    pub greenhouse_companies: Vec<String>,
    /// JSON listing files, read as fixture sources.
    pub fixture_paths: Vec<PathBuf>,
    pub profile: MatchProfile,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("state/jobs_seen.json"),
            dashboard_path: PathBuf::from("state/dashboard.html"),
            lock_path: PathBuf::from("state/job_monitor.lock"),
            lock_stale_secs: 6 * 3600,
            retention_days: 90,
            digest_threshold: 6,
            immediate_threshold: 8,
            fetch_concurrency: 4,
            classify_concurrency: 4,
            greenhouse_companies: default_companies(),
            fixture_paths: Vec::new(),
            profile: MatchProfile::default(),
        }
    }
}

fn default_companies() -> Vec<String> {
    [
        "anthropic",
        "openai",
        "khanacademy",
        "duolingo",
        "coursera",
        "udacity",
        "outschool",
        "codepath",
        "renaissancelearning-nam",
        "d2l",
        "newsela",
        "quizlet",
        "clever",
        "seesaw",
        "goguardian",
        "remind",
        "pluralsight",
        "udemy",
        "guild",
        "multiverse",
        "brainpop",
        "nearpod",
        "gradescope",
        "amplify",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl MonitorConfig {
    /// Load from an explicit TOML path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let cfg: MonitorConfig = toml::from_str(&content)
            .with_context(|| format!("parsing monitor config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply threshold overrides:
    /// 1) $JOB_MONITOR_CONFIG
    /// 2) config/monitor.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = std::env::var(ENV_MONITOR_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("JOB_MONITOR_CONFIG points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_MONITOR_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        Ok(cfg.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(v) = parse_score_env(std::env::var(ENV_DIGEST_THRESHOLD).ok()) {
            self.digest_threshold = v;
        }
        if let Some(v) = parse_score_env(std::env::var(ENV_IMMEDIATE_THRESHOLD).ok()) {
            self.immediate_threshold = v;
        }
        self.sanitized()
    }

    fn sanitized(mut self) -> Self {
        self.digest_threshold = self.digest_threshold.min(10);
        self.immediate_threshold = self.immediate_threshold.min(10);
        if self.immediate_threshold < self.digest_threshold {
            tracing::warn!(
                digest = self.digest_threshold,
                immediate = self.immediate_threshold,
                "immediate threshold below digest threshold, raising it"
            );
            self.immediate_threshold = self.digest_threshold;
        }
        self.fetch_concurrency = self.fetch_concurrency.max(1);
        self.classify_concurrency = self.classify_concurrency.max(1);
        if self.retention_days > MAX_RETENTION_DAYS {
            tracing::warn!(
                retention_days = self.retention_days,
                max = MAX_RETENTION_DAYS,
                "retention window too large, clamping"
            );
        }
        self.retention_days = self.retention_days.clamp(0, MAX_RETENTION_DAYS);
        self
    }
}

// parse optional score env and clamp to 0..=10
fn parse_score_env(raw: Option<String>) -> Option<u8> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|v| v.clamp(0, 10) as u8)
}
