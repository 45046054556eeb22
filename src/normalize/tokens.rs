//! Raw token → normalized value table
//!
//! Sentinels map to missing; comparison and rating tokens map to their enum
//! levels. The table is built once from configuration and the level enums.

use crate::model::{ComparisonCategory, OverallRating};
use rustc_hash::{FxHashMap, FxHashSet};

/// Token lookup shared by table-level normalization and typed extraction
#[derive(Debug, Clone)]
pub struct TokenTable {
    sentinels: FxHashSet<String>,
    comparisons: FxHashMap<String, ComparisonCategory>,
}

impl TokenTable {
    pub fn new(sentinels: &[String]) -> Self {
        let comparisons = ComparisonCategory::LEVELS
            .iter()
            .map(|c| (c.label().to_string(), *c))
            .collect();

        Self {
            sentinels: sentinels.iter().cloned().collect(),
            comparisons,
        }
    }

    /// Exact, case-sensitive sentinel match
    pub fn is_missing(&self, raw: &str) -> bool {
        self.sentinels.contains(raw)
    }

    pub fn sentinels(&self) -> impl Iterator<Item = &str> {
        self.sentinels.iter().map(String::as_str)
    }

    /// Title-case then match against the comparison levels
    pub fn comparison(&self, raw: &str) -> Option<ComparisonCategory> {
        if self.is_missing(raw) {
            return None;
        }
        self.comparisons.get(&title_case(raw)).copied()
    }

    pub fn rating(&self, raw: &str) -> Option<OverallRating> {
        if self.is_missing(raw) {
            return None;
        }
        OverallRating::from_token(raw)
    }
}

/// "same as the national average" → "Same As The National Average"
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Yes/No style flags
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}
