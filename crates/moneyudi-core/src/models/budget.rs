use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
}

/// A per-category spending limit. One row per (user, category); writes go
/// through an upsert that updates the existing row's amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    // Stored by the backend, not used in any calculation
    #[serde(default)]
    pub rollover: bool,
}

/// Insert payload for the budgets table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBudget {
    pub user_id: String,
    pub category_id: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_defaults_optional_columns() {
        let json = r#"{"id":"b1","user_id":"u1","category_id":"c1","amount":"500000"}"#;
        let budget: Budget = serde_json::from_str(json).unwrap();
        assert_eq!(budget.period, BudgetPeriod::Monthly);
        assert_eq!(budget.amount, Decimal::from(500_000));
        assert!(budget.start_date.is_none());
        assert!(!budget.rollover);
    }
}
