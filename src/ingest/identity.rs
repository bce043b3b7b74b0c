// src/ingest/identity.rs
//! Deduplication key derived from a listing's title, company and location.
//!
//! Matching is exact after lower-casing and trimming each field. Description and
//! URL never take part, so a repost with edited text keeps its key while a repost
//! with a reworded title does not.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

use crate::ingest::types::Listing;

const FIELD_SEP: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn of(listing: &Listing) -> Self {
        Self::from_parts(&listing.title, &listing.company, &listing.location)
    }

    pub fn from_parts(title: &str, company: &str, location: &str) -> Self {
        let mut material = String::with_capacity(title.len() + company.len() + location.len() + 2);
        material.push_str(&canon(title));
        material.push(FIELD_SEP);
        material.push_str(&canon(company));
        material.push(FIELD_SEP);
        material.push_str(&canon(location));

        let digest = Sha256::digest(material.as_bytes());
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            let _ = write!(&mut out, "{:02x}", b);
        }
        IdentityKey(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canon(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceKind;

    fn listing(title: &str, company: &str, location: &str) -> Listing {
        Listing {
            title: title.into(),
            company: company.into(),
            location: location.into(),
            description: "first".into(),
            url: "https://a.example/1".into(),
            source: SourceKind::Fixture,
            search_category: None,
        }
    }

    #[test]
    fn case_and_surrounding_space_do_not_matter() {
        let a = IdentityKey::of(&listing("Learning Designer", "Khan Academy", "Remote USA"));
        let b = IdentityKey::of(&listing("  learning designer ", "KHAN ACADEMY", "remote usa"));
        assert_eq!(a, b);
    }

    #[test]
    fn description_and_url_are_ignored() {
        let a = listing("Learning Designer", "Khan Academy", "Remote USA");
        let mut b = a.clone();
        b.description = "something else entirely".into();
        b.url = "https://b.example/2".into();
        b.source = SourceKind::Greenhouse;
        assert_eq!(IdentityKey::of(&a), IdentityKey::of(&b));
    }

    #[test]
    fn field_boundaries_are_kept() {
        let a = IdentityKey::from_parts("ab", "c", "x");
        let b = IdentityKey::from_parts("a", "bc", "x");
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_hex_sha256() {
        let k = IdentityKey::from_parts("t", "c", "l");
        assert_eq!(k.as_str().len(), 64);
        assert!(k.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
