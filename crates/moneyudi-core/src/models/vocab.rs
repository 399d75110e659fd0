use serde::{Deserialize, Serialize};

/// One vocabulary flashcard. The refresh timestamp lives on the cache
/// wrapper (`CachedData::cached_at`), not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabCard {
    pub word: String,
    /// Definition translated into the target language
    pub meaning_translated: String,
    /// Definition as returned by the dictionary
    pub meaning_source: String,
    pub example: String,
    #[serde(default)]
    pub phonetic: Option<String>,
}
