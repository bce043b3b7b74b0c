// src/dashboard/mod.rs
//! Static HTML overview of everything in the seen-store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::store::{SeenRecord, SeenStore};

pub trait DashboardRenderer: Send + Sync {
    fn render(&self, store: &SeenStore, now: DateTime<Utc>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total: usize,
    pub high_matches: usize,
    pub new_this_week: usize,
    pub companies: usize,
}

impl DashboardStats {
    pub fn compute(store: &SeenStore, high_score: u8, now: DateTime<Utc>) -> Self {
        let records = store.records();
        Self {
            total: records.len(),
            high_matches: records
                .iter()
                .filter(|r| r.verdict.score >= high_score)
                .count(),
            new_this_week: store.recent(7, now).len(),
            companies: records
                .iter()
                .map(|r| r.listing.company.as_str())
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}

pub struct HtmlDashboard {
    output_path: PathBuf,
    high_score: u8,
}

impl HtmlDashboard {
    pub fn new(output_path: impl Into<PathBuf>, high_score: u8) -> Self {
        Self {
            output_path: output_path.into(),
            high_score,
        }
    }

    pub fn to_html(&self, store: &SeenStore, now: DateTime<Utc>) -> String {
        let stats = DashboardStats::compute(store, self.high_score, now);
        let mut html = String::with_capacity(4096);
        html.push_str(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Job Monitor</title>\n<style>\n\
             body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\n\
             .stats{display:flex;gap:1.5rem;margin-bottom:1.5rem}\n\
             .stat{background:#f3f4f6;padding:.75rem 1rem;border-radius:6px}\n\
             table{border-collapse:collapse;width:100%}\n\
             td,th{border-bottom:1px solid #e5e7eb;padding:.4rem;text-align:left;vertical-align:top}\n\
             tr.high td.score{font-weight:bold;color:#047857}\n\
             </style>\n</head>\n<body>\n",
        );
        html.push_str(&format!(
            "<h1>Job Monitor</h1>\n<p>Updated {}</p>\n<div class=\"stats\">\n\
             <div class=\"stat\">Tracked: {}</div>\n\
             <div class=\"stat\">High matches: {}</div>\n\
             <div class=\"stat\">New this week: {}</div>\n\
             <div class=\"stat\">Companies: {}</div>\n</div>\n",
            now.format("%Y-%m-%d %H:%M UTC"),
            stats.total,
            stats.high_matches,
            stats.new_this_week,
            stats.companies
        ));

        if stats.total == 0 {
            html.push_str("<p>No matching listings yet.</p>\n");
        } else {
            html.push_str(
                "<table>\n<thead><tr><th>Score</th><th>Title</th><th>Company</th>\
                 <th>Location</th><th>Category</th><th>First seen</th><th>Why</th></tr></thead>\n<tbody>\n",
            );
            for r in store.records() {
                html.push_str(&self.row(r));
            }
            html.push_str("</tbody>\n</table>\n");
        }
        html.push_str("</body>\n</html>\n");
        html
    }

    fn row(&self, r: &SeenRecord) -> String {
        let class = if r.verdict.score >= self.high_score {
            " class=\"high\""
        } else {
            ""
        };
        let title = if r.listing.url.is_empty() {
            encode_text(&r.listing.title).into_owned()
        } else {
            format!(
                "<a href=\"{}\">{}</a>",
                encode_double_quoted_attribute(&r.listing.url),
                encode_text(&r.listing.title)
            )
        };
        format!(
            "<tr{class}><td class=\"score\">{}/10</td><td>{title}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td></tr>\n",
            r.verdict.score,
            encode_text(&r.listing.company),
            encode_text(&r.listing.location),
            encode_text(&r.verdict.category.label()),
            r.first_seen_at.format("%Y-%m-%d"),
            encode_text(&r.verdict.reasoning),
        )
    }
}

impl DashboardRenderer for HtmlDashboard {
    fn render(&self, store: &SeenStore, now: DateTime<Utc>) -> Result<()> {
        let html = self.to_html(store, now);
        if let Some(dir) = self
            .output_path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating dashboard dir {}", dir.display()))?;
        }
        let tmp = crate::store::tmp_path(&self.output_path);
        fs::write(&tmp, html).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.output_path)
            .with_context(|| format!("replacing {}", self.output_path.display()))?;
        tracing::info!(path = %self.output_path.display(), "dashboard written");
        Ok(())
    }
}
