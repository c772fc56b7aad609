//! Text-level dedup and UI-chrome filtering for extracted captions and
//! comments.
//!
//! Each extraction owns its own [`TextDeduper`]; the seen-set is never shared
//! across items or workers, keeping workers fully independent.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Fixed pattern table of interface strings that must never reach
    /// persisted output: action labels, pagination labels, and relative
    /// timestamps like `4d` or `2w`.
    static ref UI_CHROME: Vec<Regex> = vec![
        Regex::new(r"^Like$").expect("chrome pattern compiles"),
        Regex::new(r"^Comment$").expect("chrome pattern compiles"),
        Regex::new(r"^Share$").expect("chrome pattern compiles"),
        Regex::new(r"^Follow$").expect("chrome pattern compiles"),
        Regex::new(r"^Reply$").expect("chrome pattern compiles"),
        Regex::new(r"^See more$").expect("chrome pattern compiles"),
        Regex::new(r"^See less$").expect("chrome pattern compiles"),
        Regex::new(r"^See translation$").expect("chrome pattern compiles"),
        Regex::new(r"^Write a comment").expect("chrome pattern compiles"),
        Regex::new(r"^View more comments$").expect("chrome pattern compiles"),
        Regex::new(r"^Most relevant$").expect("chrome pattern compiles"),
        Regex::new(r"^All comments$").expect("chrome pattern compiles"),
        Regex::new(r"^\d+[smhdwy]$").expect("chrome pattern compiles"),
        Regex::new(r"^Reply to").expect("chrome pattern compiles"),
        Regex::new(r"^·").expect("chrome pattern compiles"),
    ];
}

/// Whether a normalized string is recognized interface chrome.
#[must_use]
pub fn is_ui_chrome(text: &str) -> bool {
    UI_CHROME.iter().any(|pattern| pattern.is_match(text))
}

/// Collapse runs of whitespace (including embedded newlines) into single
/// spaces so each accepted string is one logical output line.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-item seen-set over normalized strings.
///
/// A candidate is accepted only if it is non-empty after normalization, not
/// interface chrome, and not previously seen by this deduper.
#[derive(Debug, Default)]
pub struct TextDeduper {
    seen: HashSet<String>,
}

impl TextDeduper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and admit `raw`, returning the accepted line or `None`.
    pub fn accept(&mut self, raw: &str) -> Option<String> {
        let line = normalize(raw);
        if line.is_empty() || is_ui_chrome(&line) {
            return None;
        }
        if self.seen.insert(line.clone()) {
            Some(line)
        } else {
            None
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_strings_survive_once() {
        let mut dedup = TextDeduper::new();
        assert_eq!(dedup.accept("great   post\n").as_deref(), Some("great post"));
        assert_eq!(dedup.accept("great post"), None);
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn chrome_strings_yield_nothing() {
        let mut dedup = TextDeduper::new();
        for chrome in ["Like", "Reply", "View more comments", "4d", "2w", "· Follow", "Reply to Ana"] {
            assert_eq!(dedup.accept(chrome), None, "{chrome} should be filtered");
        }
        assert!(dedup.is_empty());
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut dedup = TextDeduper::new();
        assert_eq!(dedup.accept(""), None);
        assert_eq!(dedup.accept("  \n\t "), None);
        assert!(dedup.is_empty());
    }
}
