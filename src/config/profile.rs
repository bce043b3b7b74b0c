// src/config/profile.rs
//! Candidate profile and keyword lists used to score listings.
//!
//! The profile is immutable once loaded and is shared by the classifier's model
//! prompt and its keyword fallback. `MatchProfile::default()` is the built-in seed;
//! a `[profile]` table in the monitor TOML overrides any field it names.

use serde::{Deserialize, Serialize};

use crate::classify::RoleCategory;

/// Keywords that identify one role type. Groups are checked in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleKeywords {
    pub category: RoleCategory,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchProfile {
    /// Free text handed to the completion model.
    pub profile_text: String,
    /// Title-only, case-insensitive. Any hit excludes the listing outright.
    pub exclude_keywords: Vec<String>,
    pub role_groups: Vec<RoleKeywords>,
    pub education_keywords: Vec<String>,
    pub equity_keywords: Vec<String>,
    pub research_keywords: Vec<String>,
}

impl Default for MatchProfile {
    fn default() -> Self {
        Self::default_seed()
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl MatchProfile {
    pub(crate) fn default_seed() -> Self {
        let role_groups = [
            (
                RoleCategory::LearningDesign,
                &["learning designer", "learning design", "learning experience"][..],
            ),
            (
                RoleCategory::InstructionalDesign,
                &["instructional designer", "instructional design", "curriculum"][..],
            ),
            (
                RoleCategory::ProductDesign,
                &["product designer", "product design", "ux design"][..],
            ),
            (
                RoleCategory::UserResearch,
                &["user researcher", "ux researcher", "user research"][..],
            ),
            (
                RoleCategory::ProgramMgmt,
                &["program manager", "program management", "partnership manager"][..],
            ),
            (
                RoleCategory::Edtech,
                &["educational technologist", "edtech", "education technology"][..],
            ),
            (RoleCategory::Consultant, &["consultant", "consulting"][..]),
        ]
        .into_iter()
        .map(|(category, kws)| RoleKeywords {
            category,
            keywords: words(kws),
        })
        .collect();

        Self {
            profile_text: DEFAULT_PROFILE_TEXT.trim().to_string(),
            exclude_keywords: words(&[
                "Software Engineer",
                "Senior Software Engineer",
                "Staff Engineer",
                "Data Scientist",
                "Data Engineer",
                "Sales Representative",
                "Account Executive",
                "Marketing Manager",
                "Business Development",
                "Customer Success Manager",
            ]),
            role_groups,
            education_keywords: words(&[
                "education",
                "learning",
                "teaching",
                "student",
                "school",
                "university",
                "edtech",
            ]),
            equity_keywords: words(&["underserved", "equity", "inclusive"]),
            research_keywords: words(&["research", "evidence"]),
        }
    }
}

const DEFAULT_PROFILE_TEXT: &str = r#"
Learning designer with 8+ years across classroom teaching, EdTech product development,
consulting and adult learning; graduate study in learning design and technology.

Experience: teaching fellowship and program management in underserved communities;
MVP, curriculum and content development for learning platforms; large-scale technology
adoption and change management; adult-learning product work and qualitative user research.

Research: technology adoption among older adults, evidence-based design principles for
age-inclusive technology, human-AI collaboration in learning contexts.

Target roles: Learning Designer, Instructional Designer, Learning Experience Designer,
Educational Technologist, Product Designer (education), User Researcher (learning),
Product or Program Manager (education), Learning / L&D / Education Consultant.

Preferred sectors: AI + education, EdTech platforms, corporate learning and L&D,
education nonprofits and foundations.

Values: evidence-based and systematic design, underserved or overlooked populations,
learning science combined with product thinking, impact-driven work.

Locations: USA (including remote), Singapore, Dubai/UAE.
"#;
