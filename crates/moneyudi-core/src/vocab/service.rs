use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::sources::{Definition, VocabSource};
use super::{fallback_word, varied_example, DEFINITION_UNAVAILABLE};
use crate::cache::{CacheManager, CachedData};
use crate::models::VocabCard;

/// How often the background task checks the cached card's age
pub const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

pub struct VocabService<S: VocabSource> {
    source: S,
    cache: CacheManager,
    target_lang: String,
}

impl<S: VocabSource> VocabService<S> {
    pub fn new(source: S, cache: CacheManager, target_lang: &str) -> Self {
        Self {
            source,
            cache,
            target_lang: target_lang.to_string(),
        }
    }

    pub fn cached(&self) -> Option<CachedData<VocabCard>> {
        self.cache.load_vocab_lenient()
    }

    /// The cached card if it is still fresh at `now`, otherwise a new one
    pub async fn load(&self, now: DateTime<Utc>) -> CachedData<VocabCard> {
        match self.cached() {
            Some(cached) if cached.is_fresh_at(now) => {
                debug!(word = %cached.data.word, "Using cached vocabulary card");
                cached
            }
            _ => self.refresh().await,
        }
    }

    /// Re-read the shared cache file and refresh only if it has gone stale.
    /// Another client may have refreshed it in the meantime.
    pub async fn refresh_if_stale(&self, now: DateTime<Utc>) -> Option<CachedData<VocabCard>> {
        match self.cached() {
            Some(cached) if cached.is_fresh_at(now) => None,
            _ => Some(self.refresh().await),
        }
    }

    /// Fetch a new card and persist it. Never fails: each lookup falls back
    /// on its own.
    pub async fn refresh(&self) -> CachedData<VocabCard> {
        let word = self.random_word().await;
        let definition = self.define(&word).await;
        let example = varied_example(&definition.word, &definition.example);
        let translated = self.translate(&definition.definition).await;

        let card = CachedData::new(VocabCard {
            word: definition.word,
            meaning_translated: translated,
            meaning_source: definition.definition,
            example,
            phonetic: Some(definition.phonetic).filter(|p| !p.is_empty()),
        });

        if let Err(e) = self.cache.save_vocab(&card) {
            warn!(error = %e, "Failed to save vocabulary card");
        }
        card
    }

    async fn random_word(&self) -> String {
        match self.source.random_word().await {
            Ok(word) if word.chars().count() > 1 => word,
            Ok(_) => fallback_word(),
            Err(e) => {
                debug!(error = %e, "Random word lookup failed");
                fallback_word()
            }
        }
    }

    async fn define(&self, word: &str) -> Definition {
        match self.source.define(word).await {
            Ok(definition) => definition,
            Err(e) => {
                debug!(word, error = %e, "Dictionary lookup failed");
                Definition {
                    word: word.to_string(),
                    definition: DEFINITION_UNAVAILABLE.to_string(),
                    phonetic: String::new(),
                    example: String::new(),
                }
            }
        }
    }

    /// Falls back to the untranslated text
    async fn translate(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        match self.source.translate(text, &self.target_lang).await {
            Ok(translated) if !translated.trim().is_empty() => translated,
            Ok(_) => text.to_string(),
            Err(e) => {
                debug!(error = %e, "Translation failed");
                text.to_string()
            }
        }
    }
}

/// Check the card every `AUTO_REFRESH_INTERVAL` and send each refreshed
/// card to `tx`. Stops when the receiver is dropped.
pub async fn run_auto_refresh<S: VocabSource>(
    service: Arc<VocabService<S>>,
    tx: mpsc::Sender<CachedData<VocabCard>>,
) {
    // First check runs one interval after start
    let start = tokio::time::Instant::now() + AUTO_REFRESH_INTERVAL;
    let mut interval = tokio::time::interval_at(start, AUTO_REFRESH_INTERVAL);
    loop {
        interval.tick().await;
        if tx.is_closed() {
            break;
        }
        if let Some(card) = service.refresh_if_stale(Utc::now()).await {
            debug!(word = %card.data.word, "Vocabulary card refreshed");
            if tx.send(card).await.is_err() {
                break;
            }
        }
    }
}
