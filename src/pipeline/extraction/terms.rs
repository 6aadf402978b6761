//! Technical-term detection.
//!
//! Terms found here are handed to the model as a protected list: they must
//! appear verbatim in generated text and are never translated.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// ALL-CAPS acronyms of two or more letters (IHO, ECDIS).
static ACRONYM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());

/// Standard identifiers (S-100, S-57, ISO 19115).
static STANDARD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]+[- ]?[0-9]+\b").unwrap());

/// Acronyms spelled out in parentheses, e.g. 국제수로기구(IHO).
static PAREN_ACRONYM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]{2,})\)").unwrap());

/// Extract protected technical terms from text.
///
/// Returns a deduplicated, sorted list.
pub fn extract_technical_terms(text: &str) -> Vec<String> {
    let mut terms = BTreeSet::new();

    for m in ACRONYM.find_iter(text) {
        terms.insert(m.as_str().to_string());
    }
    for m in STANDARD_ID.find_iter(text) {
        terms.insert(m.as_str().to_string());
    }
    for caps in PAREN_ACRONYM.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            terms.insert(m.as_str().to_string());
        }
    }

    terms.into_iter().collect()
}

/// Merge term lists, keeping the first list's order and appending unseen terms.
pub fn merge_terms(primary: &[String], extra: &[String]) -> Vec<String> {
    let mut seen: BTreeSet<&str> = primary.iter().map(String::as_str).collect();
    let mut merged = primary.to_vec();
    for term in extra {
        if seen.insert(term.as_str()) {
            merged.push(term.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_acronyms() {
        let terms = extract_technical_terms("ECDIS and AIS data feed the VTS center.");
        assert!(terms.contains(&"ECDIS".to_string()));
        assert!(terms.contains(&"AIS".to_string()));
        assert!(terms.contains(&"VTS".to_string()));
    }

    #[test]
    fn finds_standard_identifiers() {
        let terms = extract_technical_terms("S-100 기반 전환, ISO 19115 메타데이터 및 S-57 호환");
        assert!(terms.contains(&"S-100".to_string()));
        assert!(terms.contains(&"S-57".to_string()));
        assert!(terms.contains(&"ISO 19115".to_string()));
    }

    #[test]
    fn finds_parenthesised_acronyms_after_hangul() {
        let terms = extract_technical_terms("국제수로기구(IHO) 회의에 참석함");
        assert!(terms.contains(&"IHO".to_string()));
    }

    #[test]
    fn single_capitals_are_not_terms() {
        let terms = extract_technical_terms("A plan for Korea");
        assert!(terms.is_empty());
    }

    #[test]
    fn result_is_sorted_and_deduplicated() {
        let terms = extract_technical_terms("VTS AIS VTS (AIS) AIS");
        assert_eq!(terms, vec!["AIS".to_string(), "VTS".to_string()]);
    }

    #[test]
    fn merge_keeps_primary_order() {
        let merged = merge_terms(
            &["VTS".to_string(), "AIS".to_string()],
            &["AIS".to_string(), "ENC".to_string()],
        );
        assert_eq!(merged, vec!["VTS", "AIS", "ENC"]);
    }
}
