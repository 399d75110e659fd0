use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::ledger::LedgerSnapshot;
use crate::models::VocabCard;

/// Cached records younger than this are used without a network call.
pub const FRESHNESS_WINDOW_MINUTES: i64 = 60;

const VOCAB_CACHE: &str = "vocab_v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    #[serde(rename = "updatedAt")]
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self::at(data, Utc::now())
    }

    pub fn at(data: T, cached_at: DateTime<Utc>) -> Self {
        Self { data, cached_at }
    }

    pub fn age_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        self.age_display_at(Utc::now())
    }

    pub fn age_display_at(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes_at(now);
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    /// Strictly younger than the freshness window
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at < Duration::minutes(FRESHNESS_WINDOW_MINUTES)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    /// Whole minutes until the record stops being fresh, never negative
    pub fn minutes_until_stale_at(&self, now: DateTime<Utc>) -> i64 {
        let expires = self.cached_at + Duration::minutes(FRESHNESS_WINDOW_MINUTES);
        let remaining = expires - now;
        if remaining <= Duration::zero() {
            0
        } else {
            // Round up so "0 minutes" only shows once it is actually due
            (remaining.num_seconds() + 59) / 60
        }
    }
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    /// Write through a temp file and rename so a concurrent reader never
    /// sees a half-written record. Last writer wins.
    fn store<T: Serialize>(&self, name: &str, cached: &CachedData<T>) -> Result<()> {
        let path = self.cache_path(name);
        let tmp = self.cache_dir.join(format!("{}.json.tmp", name));
        let contents = serde_json::to_string_pretty(cached)?;
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace cache file: {}", name))?;
        debug!(cache = name, "Cache written");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.cache_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", name))?;
        }
        Ok(())
    }

    // ===== Vocabulary =====

    pub fn load_vocab(&self) -> Result<Option<CachedData<VocabCard>>> {
        self.load(VOCAB_CACHE)
    }

    pub fn save_vocab(&self, card: &CachedData<VocabCard>) -> Result<()> {
        self.store(VOCAB_CACHE, card)
    }

    /// Read the vocabulary record, treating an unreadable file as absent
    pub fn load_vocab_lenient(&self) -> Option<CachedData<VocabCard>> {
        match self.load_vocab() {
            Ok(cached) => cached,
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable vocabulary cache");
                None
            }
        }
    }

    // ===== Ledger snapshot =====

    fn snapshot_name(user_id: &str) -> String {
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("snapshot_{}", safe)
    }

    pub fn load_snapshot(&self, user_id: &str) -> Result<Option<CachedData<LedgerSnapshot>>> {
        self.load(&Self::snapshot_name(user_id))
    }

    pub fn save_snapshot(&self, user_id: &str, snapshot: &LedgerSnapshot) -> Result<()> {
        self.store(&Self::snapshot_name(user_id), &CachedData::new(snapshot))
    }

    pub fn clear_snapshot(&self, user_id: &str) -> Result<()> {
        self.remove(&Self::snapshot_name(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserSettings;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn card(word: &str) -> VocabCard {
        VocabCard {
            word: word.to_string(),
            meaning_translated: "arti".to_string(),
            meaning_source: "meaning".to_string(),
            example: "An example.".to_string(),
            phonetic: None,
        }
    }

    fn manager() -> (TempDir, CacheManager) {
        let dir = TempDir::new().unwrap();
        let manager = CacheManager::new(dir.path().join("cache")).unwrap();
        (dir, manager)
    }

    #[test]
    fn test_freshness_window_is_strict() {
        let at = Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap();
        let cached = CachedData::at(card("apple"), at);
        assert!(cached.is_fresh_at(at + Duration::minutes(59)));
        assert!(!cached.is_fresh_at(at + Duration::minutes(60)));
        assert!(!cached.is_fresh_at(at + Duration::minutes(61)));
    }

    #[test]
    fn test_minutes_until_stale() {
        let at = Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap();
        let cached = CachedData::at(card("apple"), at);
        assert_eq!(cached.minutes_until_stale_at(at), 60);
        assert_eq!(cached.minutes_until_stale_at(at + Duration::seconds(30)), 60);
        assert_eq!(cached.minutes_until_stale_at(at + Duration::minutes(59)), 1);
        assert_eq!(cached.minutes_until_stale_at(at + Duration::minutes(90)), 0);
    }

    #[test]
    fn test_age_display() {
        let at = Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap();
        let cached = CachedData::at(1, at);
        assert_eq!(cached.age_display_at(at - Duration::minutes(5)), "just now");
        assert_eq!(cached.age_display_at(at), "just now");
        assert_eq!(cached.age_display_at(at + Duration::minutes(5)), "5m ago");
        assert_eq!(cached.age_display_at(at + Duration::hours(3)), "3h ago");
        assert_eq!(cached.age_display_at(at + Duration::days(2)), "2d ago");
    }

    #[test]
    fn test_vocab_roundtrip_overwrites() {
        let (_dir, manager) = manager();
        assert!(manager.load_vocab().unwrap().is_none());

        manager.save_vocab(&CachedData::new(card("apple"))).unwrap();
        manager.save_vocab(&CachedData::new(card("river"))).unwrap();

        let loaded = manager.load_vocab().unwrap().unwrap();
        assert_eq!(loaded.data.word, "river");
        assert!(!manager.dir().join("vocab_v1.json.tmp").exists());
    }

    #[test]
    fn test_vocab_record_uses_updated_at_field() {
        let (_dir, manager) = manager();
        manager.save_vocab(&CachedData::new(card("apple"))).unwrap();
        let raw = std::fs::read_to_string(manager.dir().join("vocab_v1.json")).unwrap();
        assert!(raw.contains("\"updatedAt\""));
    }

    #[test]
    fn test_corrupt_vocab_is_ignored_leniently() {
        let (_dir, manager) = manager();
        std::fs::write(manager.dir().join("vocab_v1.json"), "{not json").unwrap();
        assert!(manager.load_vocab().is_err());
        assert!(manager.load_vocab_lenient().is_none());
    }

    #[test]
    fn test_snapshot_per_user() {
        let (_dir, manager) = manager();
        let snapshot = LedgerSnapshot {
            categories: vec![],
            transactions: vec![],
            budgets: vec![],
            settings: UserSettings::defaults_for("u/1"),
        };
        manager.save_snapshot("u/1", &snapshot).unwrap();

        assert!(manager.dir().join("snapshot_u_1.json").exists());
        assert_eq!(manager.load_snapshot("u/1").unwrap().unwrap().data, snapshot);
        assert!(manager.load_snapshot("u2").unwrap().is_none());

        manager.clear_snapshot("u/1").unwrap();
        assert!(manager.load_snapshot("u/1").unwrap().is_none());
    }
}
