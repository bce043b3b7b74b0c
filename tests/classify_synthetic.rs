//! Randomized property checks over synthetic listings.
//! Every case is built from a fixed seed so failures reproduce.

use chrono::{Duration, TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use job_monitor::classify::fallback;
use job_monitor::config::MatchProfile;
use job_monitor::ingest::is_accepted;
use job_monitor::{AlertRouter, IdentityKey, Listing, RoleCategory, SeenRecord, SourceKind, Verdict};

const TITLES: &[&str] = &[
    "Learning Designer",
    "Senior Instructional Designer",
    "Curriculum Developer",
    "UX Researcher",
    "Program Manager",
    "Product Designer",
    "Education Consultant",
    "Office Coordinator",
    "Warehouse Associate",
    "Customer Success Lead",
];

const PHRASES: &[&str] = &[
    "design learning experiences",
    "partner with teachers and schools",
    "AI tutoring for students",
    "serve underserved communities",
    "evidence-based research practices",
    "manage vendor relationships",
    "maintain spreadsheets",
    "build inclusive curriculum",
    "artificial intelligence roadmap",
    "quarterly planning",
];

const COMPANIES: &[&str] = &["Khan Academy", "Duolingo", "Coursera", "Acme", "Globex"];

fn pick<'a>(rng: &mut StdRng, items: &'a [&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn random_listing(rng: &mut StdRng) -> Listing {
    let n = rng.random_range(0..4);
    let description = (0..n)
        .map(|_| pick(rng, PHRASES))
        .collect::<Vec<_>>()
        .join(". ");
    Listing {
        title: pick(rng, TITLES).to_string(),
        company: pick(rng, COMPANIES).to_string(),
        location: "Remote".into(),
        description,
        url: String::new(),
        source: SourceKind::Fixture,
        search_category: None,
    }
}

fn random_case(rng: &mut StdRng, s: &str) -> String {
    let mut out = String::new();
    if rng.random_bool(0.5) {
        out.push_str("  ");
    }
    for c in s.chars() {
        if rng.random_bool(0.5) {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    if rng.random_bool(0.5) {
        out.push('\t');
    }
    out
}

#[test]
fn fallback_is_deterministic_and_bounded() {
    let profile = MatchProfile::default();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..300 {
        let l = random_listing(&mut rng);
        let a = fallback::classify(&l, &profile);
        let b = fallback::classify(&l, &profile);
        assert_eq!(a, b);
        assert!(a.score <= 10);
        assert_eq!(a.is_match, a.score >= 5, "{l:?} -> {a:?}");
    }
}

#[test]
fn exclusion_in_title_overrides_everything() {
    let profile = MatchProfile::default();
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let mut l = random_listing(&mut rng);
        let idx = rng.random_range(0..profile.exclude_keywords.len());
        let excluded = &profile.exclude_keywords[idx];
        l.title = format!("{} - Learning Platform", random_case(&mut rng, excluded).trim());
        l.description = PHRASES.join(". ");
        let v = fallback::classify(&l, &profile);
        assert_eq!(v.score, 0, "{l:?}");
        assert!(!v.is_match);
        assert_eq!(v.category, RoleCategory::Excluded);
    }
}

#[test]
fn raising_the_threshold_never_accepts_more() {
    let profile = MatchProfile::default();
    let mut rng = StdRng::seed_from_u64(23);
    let verdicts: Vec<Verdict> = (0..200)
        .map(|_| fallback::classify(&random_listing(&mut rng), &profile))
        .collect();

    for t in 0..10u8 {
        for v in &verdicts {
            if is_accepted(v, t + 1) {
                assert!(is_accepted(v, t));
            }
        }
    }
}

#[test]
fn identity_ignores_case_and_padding() {
    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..200 {
        let l = random_listing(&mut rng);
        let mut v = l.clone();
        v.title = random_case(&mut rng, &l.title);
        v.company = random_case(&mut rng, &l.company);
        v.location = random_case(&mut rng, &l.location);
        v.url = "https://elsewhere.test".into();
        assert_eq!(IdentityKey::of(&l), IdentityKey::of(&v));
    }
}

#[test]
fn immediate_is_always_a_subset_of_digest() {
    let mut rng = StdRng::seed_from_u64(47);
    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    for round in 0..50 {
        let n = rng.random_range(0..15);
        let records: Vec<SeenRecord> = (0..n)
            .map(|i| {
                let score = rng.random_range(0..=10u8);
                SeenRecord::new(
                    Listing {
                        title: format!("Role {round}-{i}"),
                        company: pick(&mut rng, COMPANIES).into(),
                        location: "Remote".into(),
                        description: String::new(),
                        url: String::new(),
                        source: SourceKind::Fixture,
                        search_category: None,
                    },
                    Verdict {
                        is_match: true,
                        score,
                        reasoning: String::new(),
                        category: RoleCategory::Other,
                        strengths: vec![],
                        concerns: vec![],
                    },
                    base + Duration::minutes(rng.random_range(0..10_000)),
                )
            })
            .collect();

        let threshold = rng.random_range(0..=10u8);
        let batch = AlertRouter::new(threshold).route(&records);

        assert_eq!(batch.digest.len(), records.len());
        for r in &batch.immediate {
            assert!(r.verdict.score >= threshold);
            assert!(batch.digest.iter().any(|d| d.key == r.key));
        }
        let expected = records.iter().filter(|r| r.verdict.score >= threshold).count();
        assert_eq!(batch.immediate.len(), expected);
        for w in batch.digest.windows(2) {
            assert!(
                w[0].verdict.score > w[1].verdict.score
                    || (w[0].verdict.score == w[1].verdict.score
                        && w[0].first_seen_at <= w[1].first_seen_at)
            );
        }
    }
}
