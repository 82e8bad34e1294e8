use crate::links::LinkCandidate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("static regex")
});

// Loose digit-grouping pattern, tolerant of separators and optional
// country/area codes. Deliberately over-matches; the digit-count
// threshold below is the real acceptance criterion.
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\s().\-]{7,18}\d").expect("static regex"));

/// A phone candidate is retained only if it still has at least this
/// many digits after stripping separators.
const MIN_PHONE_DIGITS: usize = 10;

/// Social networks recognized in link addresses. First keyword match
/// wins per link; a later link with the same keyword overwrites the
/// earlier mapping.
pub const SOCIAL_KEYWORDS: [&str; 6] = [
    "instagram",
    "facebook",
    "twitter",
    "pinterest",
    "youtube",
    "tiktok",
];

/// Email addresses found in flattened page text, deduplicated.
pub fn extract_emails(text: &str) -> Vec<String> {
    let set: BTreeSet<String> = EMAIL.find_iter(text).map(|m| m.as_str().to_string()).collect();
    set.into_iter().collect()
}

/// Phone numbers found in flattened page text, normalized to digit
/// strings and deduplicated. Candidates below the digit threshold are
/// discarded.
pub fn extract_phones(text: &str) -> Vec<String> {
    let mut set = BTreeSet::new();
    for m in PHONE.find_iter(text) {
        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= MIN_PHONE_DIGITS {
            set.insert(digits);
        }
    }
    set.into_iter().collect()
}

/// Map social-network keyword to the (absolute) link address. Links
/// are scanned in document order, so the last link naming a network
/// wins.
pub fn extract_social_handles(links: &[LinkCandidate]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for link in links {
        let href = link.url.to_ascii_lowercase();
        for keyword in SOCIAL_KEYWORDS {
            if href.contains(keyword) {
                out.insert(keyword.to_string(), link.url.clone());
                break;
            }
        }
    }
    out
}
