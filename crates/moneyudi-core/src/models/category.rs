use serde::{Deserialize, Serialize};

use super::TxKind;

/// Icons offered when creating or cycling a category icon
pub const CATEGORY_ICONS: &[&str] = &[
    "🧾", "🍔", "🚗", "🏠", "💡", "🛒", "🎮", "💊", "🎓", "💼", "💰", "🎁",
];

/// Icon used when a category has none
pub const DEFAULT_ICON: &str = "🧾";

/// Which transaction kinds a category may be applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryScope {
    #[default]
    Expense,
    Income,
    Both,
}

impl CategoryScope {
    /// Income only takes `Income` categories; `Both` goes with expenses
    pub fn allows(self, kind: TxKind) -> bool {
        match self {
            CategoryScope::Expense | CategoryScope::Both => kind == TxKind::Expense,
            CategoryScope::Income => kind == TxKind::Income,
        }
    }

    pub fn next(self) -> Self {
        match self {
            CategoryScope::Expense => CategoryScope::Income,
            CategoryScope::Income => CategoryScope::Both,
            CategoryScope::Both => CategoryScope::Expense,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryScope::Expense => "expense",
            CategoryScope::Income => "income",
            CategoryScope::Both => "both",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(rename = "type_scope", default)]
    pub scope: CategoryScope,
}

impl Category {
    pub fn display_name(&self) -> String {
        let icon = if self.icon.is_empty() {
            DEFAULT_ICON
        } else {
            &self.icon
        };
        format!("{} {}", icon, self.name)
    }

    /// The icon after this one in `CATEGORY_ICONS`, wrapping around
    pub fn next_icon(&self) -> &'static str {
        let pos = CATEGORY_ICONS.iter().position(|i| *i == self.icon);
        match pos {
            Some(i) => CATEGORY_ICONS[(i + 1) % CATEGORY_ICONS.len()],
            None => CATEGORY_ICONS[0],
        }
    }
}

/// Insert payload for the categories table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCategory {
    pub user_id: String,
    pub name: String,
    pub icon: String,
    #[serde(rename = "type_scope")]
    pub scope: CategoryScope,
}

/// Partial update for a category; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "type_scope", skip_serializing_if = "Option::is_none")]
    pub scope: Option<CategoryScope>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(icon: &str) -> Category {
        Category {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            name: "Makan".to_string(),
            icon: icon.to_string(),
            scope: CategoryScope::Expense,
        }
    }

    #[test]
    fn test_scope_allows() {
        assert!(CategoryScope::Expense.allows(TxKind::Expense));
        assert!(!CategoryScope::Expense.allows(TxKind::Income));
        assert!(CategoryScope::Income.allows(TxKind::Income));
        assert!(!CategoryScope::Income.allows(TxKind::Expense));
        assert!(CategoryScope::Both.allows(TxKind::Expense));
        assert!(!CategoryScope::Both.allows(TxKind::Income));
    }

    #[test]
    fn test_scope_deserializes_type_scope() {
        let json = r#"{"id":"c1","user_id":"u1","name":"Gaji","icon":"💰","type_scope":"both"}"#;
        let cat: Category = serde_json::from_str(json).unwrap();
        assert_eq!(cat.scope, CategoryScope::Both);
    }

    #[test]
    fn test_next_icon_wraps() {
        let last = CATEGORY_ICONS[CATEGORY_ICONS.len() - 1];
        assert_eq!(category(last).next_icon(), CATEGORY_ICONS[0]);
        assert_eq!(category("🍔").next_icon(), "🚗");
        assert_eq!(category("x").next_icon(), CATEGORY_ICONS[0]);
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = CategoryPatch {
            scope: Some(CategoryScope::Income),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"type_scope": "income"}));
    }

    #[test]
    fn test_display_name_defaults_icon() {
        assert_eq!(category("").display_name(), "🧾 Makan");
    }
}
