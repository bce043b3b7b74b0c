//! Completion clients: provider abstraction + file cache + daily limit.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classify::{prompt, ClassifierError};
use crate::config::ai::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Text-in, text-out completion capability used by the classifier.
#[async_trait::async_trait]
pub trait TextCompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynCompletionClient = Arc<dyn TextCompletionClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a mock that always answers with a neutral verdict.
/// * Else if `enabled==false` or no key is configured, returns a disabled client.
/// * Else builds the provider wrapped with caching + daily limit.
pub fn build_completion_client(config: &AiConfig) -> DynCompletionClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::new(
            r#"{"is_match": false, "score": 5, "reasoning": "Neutral hint (mock)", "role_category": "other", "key_strengths": [], "concerns": []}"#,
        ));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }
    if config.api_key.trim().is_empty() {
        tracing::warn!(
            provider = %config.provider,
            "AI enabled but no api key, model scoring disabled"
        );
        return Arc::new(DisabledClient);
    }

    let built: Result<DynCompletionClient, ClassifierError> = match config.provider.as_str() {
        "openai" => OpenAiClient::new(config.api_key.clone(), config.model.as_deref()).map(|p| {
            Arc::new(QuotaClient::new(p, config.cache_dir.clone(), config.daily_limit))
                as DynCompletionClient
        }),
        "gemini" => GeminiClient::new(config.api_key.clone(), config.model.as_deref()).map(|p| {
            Arc::new(QuotaClient::new(p, config.cache_dir.clone(), config.daily_limit))
                as DynCompletionClient
        }),
        other => {
            tracing::warn!(provider = other, "unknown AI provider, model scoring disabled");
            Ok(Arc::new(DisabledClient) as DynCompletionClient)
        }
    };
    built.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not build AI client, model scoring disabled");
        Arc::new(DisabledClient)
    })
}

fn http_client() -> Result<reqwest::Client, ClassifierError> {
    reqwest::Client::builder()
        .user_agent("job-monitor/0.1")
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| ClassifierError::Transport(e.to_string()))
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// OpenAI Chat Completions.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    /// `model_override`: defaults to gpt-4o-mini.
    pub fn new(api_key: String, model_override: Option<&str>) -> Result<Self, ClassifierError> {
        Ok(Self {
            http: http_client()?,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl TextCompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ClassifierError::Status(resp.status().as_u16()));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ClassifierError::EmptyResponse)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Google Gemini `generateContent`.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// `model_override`: defaults to gemini-1.5-flash.
    pub fn new(api_key: String, model_override: Option<&str>) -> Result<Self, ClassifierError> {
        Ok(Self {
            http: http_client()?,
            api_key,
            model: model_override.unwrap_or("gemini-1.5-flash").to_string(),
        })
    }
}

#[async_trait::async_trait]
impl TextCompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<Content>,
        }
        #[derive(Deserialize)]
        struct Content {
            #[serde(default)]
            parts: Vec<Part>,
        }
        #[derive(Deserialize)]
        struct Part {
            text: Option<String>,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.2 }
        });

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ClassifierError::Status(resp.status().as_u16()));
        }
        let parsed: Resp = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            Err(ClassifierError::EmptyResponse)
        } else {
            Ok(text)
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// Always `Err(Disabled)`; used when AI is off.
pub struct DisabledClient;

#[async_trait::async_trait]
impl TextCompletionClient for DisabledClient {
    async fn complete(&self, _prompt: &str) -> Result<String, ClassifierError> {
        Err(ClassifierError::Disabled)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed reply, counts calls. For tests and local runs.
pub struct MockClient {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

impl MockClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock whose every call fails with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TextCompletionClient for MockClient {
    async fn complete(&self, _prompt: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(s) => Ok(s.clone()),
            Err(e) => Err(ClassifierError::Transport(e.clone())),
        }
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Quota wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// Counter state is guarded by a `Mutex`; cache files are written via temp + rename.
pub struct QuotaClient<C: TextCompletionClient> {
    inner: C,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Mutex<DailyCounter>,
}

impl<C: TextCompletionClient> QuotaClient<C> {
    pub fn new(inner: C, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let counter = Mutex::new(load_daily_counter(&cache_dir).unwrap_or_default());
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Reserve one call against today's limit. Check and increment happen under one
    /// lock so concurrent callers cannot overshoot; the lock is not held across the call.
    fn try_reserve(&self) -> bool {
        let mut g = match self.counter.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if g.is_expired() {
            g.reset_to_today();
        }
        if g.count >= self.daily_limit_max {
            return false;
        }
        g.count = g.count.saturating_add(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
        true
    }
}

/// Only replies that parse into a verdict are worth caching.
fn is_cacheable(text: &str) -> bool {
    prompt::parse_verdict(text).is_ok()
}

#[async_trait::async_trait]
impl<C: TextCompletionClient> TextCompletionClient for QuotaClient<C> {
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError> {
        // 1) Cache lookup (free). Unusable entries are ignored and overwritten.
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key).filter(|t| is_cacheable(t)) {
            return Ok(hit);
        }

        // 2) Daily limit (real calls only); a failed call still spends quota.
        if !self.try_reserve() {
            return Err(ClassifierError::QuotaExhausted(self.daily_limit_max));
        }

        // 3) Real call.
        let text = self.inner.complete(prompt).await?;
        if is_cacheable(&text) {
            let _ = write_cache_file(&self.cache_dir, &key, &text);
        } else {
            tracing::debug!(
                provider = self.inner.provider_name(),
                "reply not a verdict, not cached"
            );
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn cache_key(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().take(16).map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

#[derive(Serialize, Deserialize)]
struct CachedReply {
    text: String,
}

fn read_cache_file(dir: &Path, key: &str) -> Option<String> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    let c: CachedReply = serde_json::from_str(&s).ok()?;
    Some(c.text)
}

fn write_cache_file(dir: &Path, key: &str, text: &str) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(&CachedReply {
        text: text.to_string(),
    })
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}
impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}
impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}
