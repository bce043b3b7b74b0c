//! Demo that pushes a synthetic batch through the multiplexer.
//! Only the log channel fires unless email/Slack env vars are set.

use chrono::{Duration, Utc};
use job_monitor::{
    AlertRouter, Listing, NotifierMux, RoleCategory, RunReport, SeenRecord, SourceKind, Verdict,
};

fn sample(
    title: &str,
    company: &str,
    score: u8,
    category: RoleCategory,
    minutes_ago: i64,
) -> SeenRecord {
    SeenRecord::new(
        Listing {
            title: title.into(),
            company: company.into(),
            location: "Remote, USA".into(),
            description: String::new(),
            url: format!("https://example.com/jobs/{}", title.to_lowercase().replace(' ', "-")),
            source: SourceKind::Fixture,
            search_category: None,
        },
        Verdict {
            is_match: true,
            score,
            reasoning: "demo reasoning".into(),
            category,
            strengths: vec!["demo strength".into()],
            concerns: vec![],
        },
        Utc::now() - Duration::minutes(minutes_ago),
    )
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();
    let mux = NotifierMux::from_env();

    let accepted = vec![
        sample("Senior Learning Designer", "Khan Academy", 9, RoleCategory::LearningDesign, 3),
        sample("Curriculum Developer", "Duolingo", 7, RoleCategory::InstructionalDesign, 2),
        sample("Program Manager, Education", "Coursera", 6, RoleCategory::ProgramMgmt, 1),
    ];
    let report = RunReport {
        all_fetched: 42,
        all_new: 3,
        accepted: accepted.clone(),
        ..Default::default()
    };
    let batch = AlertRouter::new(8).route(&accepted);

    let failed = mux.notify(&batch, &report).await;
    println!("notify-demo done ({failed} channel failures)");
}
