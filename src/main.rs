//! Job monitor — binary entrypoint.
//! Loads configuration, runs one monitoring pass and exits.

use std::process::ExitCode;

use job_monitor::config::{AiConfig, MonitorConfig};
use job_monitor::dashboard::HtmlDashboard;
use job_monitor::{build_sources, run_monitor, NotifierMux};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_monitor=info,alerts=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match MonitorConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid monitor configuration");
            return ExitCode::from(2);
        }
    };
    let ai = AiConfig::load_default();

    let sources = build_sources(&cfg);
    let notifier = NotifierMux::from_env();
    tracing::info!(
        sources = sources.len(),
        channels = ?notifier.channel_names(),
        digest_threshold = cfg.digest_threshold,
        immediate_threshold = cfg.immediate_threshold,
        "starting run"
    );
    let dashboard = HtmlDashboard::new(&cfg.dashboard_path, cfg.immediate_threshold);

    match run_monitor(&cfg, &ai, &sources, &notifier, &dashboard).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "run aborted");
            ExitCode::FAILURE
        }
    }
}
