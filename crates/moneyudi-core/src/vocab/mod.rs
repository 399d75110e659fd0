//! The vocabulary flashcard widget.
//!
//! One English word at a time with its definition, a translation of that
//! definition and an example sentence. The card is cached on disk and
//! replaced once it is an hour old. Every lookup degrades to a fallback
//! value instead of failing.

pub mod service;
pub mod sources;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::cache::CachedData;
use crate::models::VocabCard;

pub use service::{run_auto_refresh, VocabService, AUTO_REFRESH_INTERVAL};
pub use sources::{Definition, HttpVocabSource, VocabSource};

pub const DEFINITION_UNAVAILABLE: &str = "Definition not available";

/// Used when the random-word API is unreachable
pub const FALLBACK_WORDS: &[&str] = &[
    "amazing",
    "beautiful",
    "creative",
    "elegant",
    "fantastic",
    "incredible",
    "wonderful",
    "brilliant",
    "charming",
    "delightful",
];

/// `{word}` is replaced with the lowercased word
pub const EXAMPLE_TEMPLATES: &[&str] = &[
    "I find {word} quite fascinating in many ways.",
    "The concept of {word} has always intrigued me.",
    "Nothing beats the feeling of being {word}.",
    "Her approach was remarkably {word} and effective.",
    "We witnessed something truly {word} yesterday.",
    "The {word} nature of this project impressed everyone.",
    "He spoke with such {word} that moved the audience.",
    "The garden looked absolutely {word} in spring.",
    "Their {word} performance earned a standing ovation.",
    "What makes this place {word} is its rich history.",
];

pub fn fallback_word() -> String {
    FALLBACK_WORDS
        .choose(&mut rand::thread_rng())
        .unwrap_or(&FALLBACK_WORDS[0])
        .to_string()
}

/// Keep the dictionary's example unless it is missing or a filler
/// ("this is a ..."); otherwise fill a random template
pub fn varied_example(word: &str, original: &str) -> String {
    if !original.is_empty() && !original.to_lowercase().contains("this is a") {
        return original.to_string();
    }
    let template = EXAMPLE_TEMPLATES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&EXAMPLE_TEMPLATES[0]);
    template.replace("{word}", &word.to_lowercase())
}

/// What the card shows right now
#[derive(Debug, Clone, Default)]
pub struct VocabPanel {
    pub card: Option<CachedData<VocabCard>>,
    pub loading: bool,
}

impl VocabPanel {
    /// Start from whatever is cached; the spinner only shows when there is
    /// nothing to display yet
    pub fn from_cache(cached: Option<CachedData<VocabCard>>) -> Self {
        Self {
            loading: cached.is_none(),
            card: cached,
        }
    }

    pub fn apply(&mut self, card: CachedData<VocabCard>) {
        self.card = Some(card);
        self.loading = false;
    }

    pub fn minutes_until_refresh_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.card.as_ref().map(|c| c.minutes_until_stale_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varied_example_keeps_real_examples() {
        assert_eq!(
            varied_example("serene", "a serene sky"),
            "a serene sky".to_string()
        );
    }

    #[test]
    fn test_varied_example_replaces_filler() {
        for original in ["", "This is a serene thing."] {
            let example = varied_example("Serene", original);
            assert!(example.contains("serene"));
            assert!(EXAMPLE_TEMPLATES
                .iter()
                .any(|t| t.replace("{word}", "serene") == example));
        }
    }

    #[test]
    fn test_fallback_word_from_list() {
        let word = fallback_word();
        assert!(FALLBACK_WORDS.contains(&word.as_str()));
    }

    #[test]
    fn test_panel_loading_only_without_cache() {
        let mut panel = VocabPanel::from_cache(None);
        assert!(panel.loading);
        assert!(panel.minutes_until_refresh_at(Utc::now()).is_none());

        let card = CachedData::new(VocabCard {
            word: "serene".to_string(),
            meaning_translated: "tenang".to_string(),
            meaning_source: "calm".to_string(),
            example: "a serene sky".to_string(),
            phonetic: None,
        });
        panel.apply(card.clone());
        assert!(!panel.loading);

        let cached = VocabPanel::from_cache(Some(card));
        assert!(!cached.loading);
        assert_eq!(cached.minutes_until_refresh_at(Utc::now()), Some(60));
    }
}
