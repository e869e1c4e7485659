//! Remote / hybrid / on-site classification.

use std::sync::LazyLock;

use regex::RegexSet;

use super::NOT_MENTIONED;

const REMOTE: &[&str] = &[
    r"\bremote(-first)?\b",
    r"work\s+from\s+home",
    r"\bwfh\b",
    r"\banywhere\b",
    r"fully\s+remote",
    r"remote\s+within\s+canada",
    r"remote\s+across",
];

const HYBRID: &[&str] = &[
    r"\bhybrid\b",
    r"\b(\d|one|two|three)\s+(?:days?|d)/?\s*(?:in|at)\s+(?:the\s+)?office\b",
    r"partially\s+remote",
    r"split\s+time\s+between\s+home\s+and\s+office",
];

const ONSITE: &[&str] = &[
    r"\bon[\s-]?site\b",
    r"in[-\s]?person",
    r"\bin\s+office\b",
    r"must\s+be\s+on\s+site",
];

/// Checked in order; the first category with any hit wins.
static CATEGORIES: LazyLock<Vec<(&'static str, RegexSet)>> = LazyLock::new(|| {
    let set = |phrases: &[&str]| {
        RegexSet::new(phrases.iter().map(|p| format!("(?i){p}"))).unwrap()
    };
    vec![
        ("remote", set(REMOTE)),
        ("hybrid", set(HYBRID)),
        ("onsite", set(ONSITE)),
    ]
});

pub fn detect_work_mode(text: &str) -> String {
    CATEGORIES
        .iter()
        .find(|(_, set)| set.is_match(text))
        .map(|(label, _)| label.to_string())
        .unwrap_or_else(|| NOT_MENTIONED.to_string())
}
