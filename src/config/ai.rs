// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_daily_limit() -> u32 {
    200
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/ai")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "openai" | "gemini" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Provider default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from OPENAI_API_KEY / GOOGLE_AI_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    /// Real completion calls allowed per UTC day; cache hits are free.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            api_key: String::new(),
            daily_limit: default_daily_limit(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // Normalize provider
        cfg.provider = cfg.provider.trim().to_lowercase();

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                "gemini" => env::var("GOOGLE_AI_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing GOOGLE_AI_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        Ok(cfg)
    }

    /// `$AI_CONFIG_PATH`, then `config/ai.json`. A missing file means AI is off;
    /// an unreadable or invalid one is logged and also means AI is off, so the
    /// keyword fallback still scores every listing.
    pub fn load_default() -> Self {
        let path = env::var(ENV_AI_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_AI_CONFIG_PATH));
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no AI config, model scoring disabled");
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "AI config unusable, model scoring disabled"
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_key_is_resolved_per_provider() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ai.json");
        fs::write(
            &p,
            r#"{"enabled":true,"provider":"Gemini","api_key":"ENV","daily_limit":5}"#,
        )
        .unwrap();

        env::set_var("GOOGLE_AI_KEY", "k-123");
        let cfg = AiConfig::load_from_file(&p).unwrap();
        env::remove_var("GOOGLE_AI_KEY");

        assert_eq!(cfg.provider, "gemini");
        assert_eq!(cfg.api_key, "k-123");
        assert_eq!(cfg.daily_limit, 5);
        assert_eq!(cfg.cache_dir, PathBuf::from("cache/ai"));
    }

    #[serial_test::serial]
    #[test]
    fn missing_env_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ai.json");
        fs::write(&p, r#"{"enabled":true,"provider":"openai","api_key":"env"}"#).unwrap();
        env::remove_var("OPENAI_API_KEY");
        assert!(AiConfig::load_from_file(&p).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn load_default_without_file_is_disabled() {
        env::set_var(ENV_AI_CONFIG_PATH, "/definitely/not/here/ai.json");
        let cfg = AiConfig::load_default();
        env::remove_var(ENV_AI_CONFIG_PATH);
        assert!(!cfg.enabled);
    }
}
