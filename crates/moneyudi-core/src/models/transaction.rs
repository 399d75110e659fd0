use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of money flow for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Expense,
    Income,
}

impl TxKind {
    pub fn toggle(self) -> Self {
        match self {
            TxKind::Expense => TxKind::Income,
            TxKind::Income => TxKind::Expense,
        }
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxKind::Expense => write!(f, "Expense"),
            TxKind::Income => write!(f, "Income"),
        }
    }
}

/// A stored transaction row. There is no update path; rows are only
/// inserted and deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub category_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.kind == TxKind::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == TxKind::Income
    }

    /// Wall-clock time of the transaction in the given zone.
    /// Period boundaries are expressed in local wall time, so every range
    /// comparison goes through this.
    pub fn local_time<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDateTime {
        self.date.with_timezone(tz).naive_local()
    }

    pub fn note_text(&self) -> &str {
        self.note.as_deref().unwrap_or("")
    }
}

/// Insert payload for the transactions table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub category_id: Option<String>,
    pub note: Option<String>,
}
