//! Application configuration management.
//!
//! Configuration is stored at `~/.config/moneyudi/config.json`. The backend
//! URL and anon key can be overridden with `MONEYUDI_BACKEND_URL` and
//! `MONEYUDI_ANON_KEY`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::period::CutoffOverflow;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "moneyudi";

const CONFIG_FILE: &str = "config.json";

pub const ENV_BACKEND_URL: &str = "MONEYUDI_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "MONEYUDI_ANON_KEY";

pub const DEFAULT_TARGET_LANG: &str = "id";

fn default_target_lang() -> String {
    DEFAULT_TARGET_LANG.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default)]
    pub last_email: Option<String>,
    /// Language the vocabulary definition is translated into
    #[serde(default = "default_target_lang")]
    pub vocab_target_lang: String,
    #[serde(default)]
    pub cutoff_overflow: CutoffOverflow,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            last_email: None,
            vocab_target_lang: default_target_lang(),
            cutoff_overflow: CutoffOverflow::default(),
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Non-empty values returned by `lookup` replace the file values
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_ANON_KEY) {
            self.anon_key = Some(key);
        }
    }

    /// Backend URL and anon key, if both are configured
    pub fn backend(&self) -> Option<(&str, &str)> {
        match (self.backend_url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
