use serde::{Deserialize, Serialize};

/// Cutoff day used when the user has never saved settings (calendar months)
pub const DEFAULT_CUTOFF_DAY: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// `None` until the row exists on the backend
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub monthly_cutoff_day: u8,
}

impl UserSettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            monthly_cutoff_day: DEFAULT_CUTOFF_DAY,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Cutoff day forced into [1, 31]; rows written by other clients are
    /// not guaranteed to respect the range.
    pub fn cutoff_day(&self) -> u8 {
        self.monthly_cutoff_day.clamp(1, 31)
    }
}
