//! Terminator-aware sentence splitting.

use regex::Regex;
use std::sync::OnceLock;

fn terminated_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.?!]+[.?!]+").expect("valid regex"))
}

/// Split `text` into sentences: greedily match `[^.?!]+[.?!]+`, then also
/// emit the trailing non-terminated remainder if non-empty. Empty or
/// whitespace-only fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let re = terminated_pattern();
    let mut out = Vec::new();
    let mut last_end = 0;
    for m in re.find_iter(text) {
        out.push(m.as_str().trim().to_string());
        last_end = m.end();
    }
    let remainder = text[last_end..].trim();
    if !remainder.is_empty() {
        out.push(remainder.to_string());
    }
    out.retain(|s| !s.is_empty());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators() {
        let sentences = split_sentences("Hello there. How are you? Great!");
        assert_eq!(sentences, vec!["Hello there.", "How are you?", "Great!"]);
    }

    #[test]
    fn keeps_trailing_fragment() {
        let sentences = split_sentences("Hello there. and then some more");
        assert_eq!(sentences, vec!["Hello there.", "and then some more"]);
    }

    #[test]
    fn drops_empty_fragments() {
        let sentences = split_sentences("Hi!   ");
        assert_eq!(sentences, vec!["Hi!"]);
    }

    #[test]
    fn empty_input_yields_empty() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   ").is_empty());
    }
}
