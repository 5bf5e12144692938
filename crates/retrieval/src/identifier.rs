//! Query-aware selection: detects queries that look like they're naming a
//! specific record (order number, ticket number, SKU) rather than asking a
//! general question. Advisory only — logged, but does not currently change
//! RRF weighting.

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{3,}|[a-z]\d+|order\s+\d+|ticket\s+\d+)\b").expect("valid regex")
    })
}

/// Whether `query` contains a sequence of 3+ digits, an uppercase-letter +
/// digit token, or the literal phrases `order <n>` / `ticket <n>`.
pub fn looks_like_specific_identifier(query: &str) -> bool {
    pattern().is_match(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_order_number() {
        assert!(looks_like_specific_identifier("Where's order 12345?"));
    }

    #[test]
    fn detects_alnum_token() {
        assert!(looks_like_specific_identifier("my ticket is AB123 please"));
    }

    #[test]
    fn plain_question_is_not_specific() {
        assert!(!looks_like_specific_identifier("What is your return policy?"));
    }

    #[test]
    fn two_digit_sequence_is_not_specific() {
        assert!(!looks_like_specific_identifier("I need it by the 12th"));
    }
}
