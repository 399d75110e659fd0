//! In-memory ledger state and input validation.
//!
//! The ledger only changes after the backend has accepted a write. Rows
//! returned by the backend are reconciled by id, so a row echoed back twice
//! (or re-fetched after a local insert) never shows up twice.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::category::DEFAULT_ICON;
use crate::models::{
    Budget, BudgetPeriod, Category, CategoryScope, NewBudget, NewCategory, NewTransaction,
    Transaction, TxKind, UserSettings,
};

/// Input rejected before any network call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be greater than 0")]
    NonPositiveAmount,

    #[error("Budget amount cannot be negative")]
    NegativeBudget,

    #[error("Category name is required")]
    EmptyCategoryName,

    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Enter the code from the sign-in email")]
    EmptyCode,

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD HH:MM")]
    InvalidDateTime(String),

    #[error("Cutoff day must be a number between 1 and 31")]
    InvalidCutoffDay,
}

/// Quick-add form contents
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub amount: Option<Decimal>,
    pub kind: TxKind,
    pub category_id: Option<String>,
    pub note: String,
    pub date: DateTime<Utc>,
}

impl TransactionDraft {
    pub fn validate(&self, user_id: &str) -> Result<NewTransaction, ValidationError> {
        let amount = match self.amount {
            Some(a) if a > Decimal::ZERO => a,
            _ => return Err(ValidationError::NonPositiveAmount),
        };
        let note = self.note.trim();
        Ok(NewTransaction {
            user_id: user_id.to_string(),
            date: self.date,
            amount,
            kind: self.kind,
            category_id: self.category_id.clone(),
            note: if note.is_empty() {
                None
            } else {
                Some(note.to_string())
            },
        })
    }
}

pub fn validate_new_category(
    user_id: &str,
    name: &str,
    icon: &str,
    scope: CategoryScope,
) -> Result<NewCategory, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyCategoryName);
    }
    Ok(NewCategory {
        user_id: user_id.to_string(),
        name: name.to_string(),
        icon: if icon.is_empty() {
            DEFAULT_ICON.to_string()
        } else {
            icon.to_string()
        },
        scope,
    })
}

pub fn validate_budget_amount(amount: Option<Decimal>) -> Result<Decimal, ValidationError> {
    match amount {
        Some(a) if a < Decimal::ZERO => Err(ValidationError::NegativeBudget),
        Some(a) => Ok(a),
        None => Ok(Decimal::ZERO),
    }
}

/// Parse a typed cutoff day, clamping numbers into [1, 31]
pub fn parse_cutoff_day(input: &str) -> Result<u8, ValidationError> {
    let day: i64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidCutoffDay)?;
    Ok(day.clamp(1, 31) as u8)
}

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        Err(ValidationError::EmptyEmail)
    } else {
        Ok(email.to_string())
    }
}

pub fn validate_code(code: &str) -> Result<String, ValidationError> {
    let code = code.trim();
    if code.is_empty() {
        Err(ValidationError::EmptyCode)
    } else {
        Ok(code.to_string())
    }
}

pub fn parse_date_input(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(input.trim().to_string()))
}

/// Format used by the transaction date field
pub const DATETIME_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse a wall-clock time in `tz` into UTC. A bare date means midnight.
pub fn parse_datetime_input<Tz: TimeZone>(
    input: &str,
    tz: &Tz,
) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();
    let invalid = || ValidationError::InvalidDateTime(input.to_string());
    let naive = NaiveDateTime::parse_from_str(input, DATETIME_INPUT_FORMAT)
        .or_else(|_| parse_date_input(input).map(|d| d.and_time(chrono::NaiveTime::MIN)))
        .map_err(|_| invalid())?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// Everything loaded for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
    pub settings: UserSettings,
}

/// What a budget save should do on the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetWrite {
    /// Update the amount of an existing row
    Update { budget_id: String, amount: Decimal },
    Insert(NewBudget),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub user_id: String,
    pub categories: Vec<Category>,
    /// Newest first
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
    pub settings: UserSettings,
}

impl Ledger {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            categories: Vec::new(),
            transactions: Vec::new(),
            budgets: Vec::new(),
            settings: UserSettings::defaults_for(user_id),
        }
    }

    pub fn from_snapshot(user_id: &str, snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new(user_id);
        ledger.replace(snapshot);
        ledger
    }

    /// Swap in a full reload
    pub fn replace(&mut self, snapshot: LedgerSnapshot) {
        self.categories = snapshot.categories;
        self.transactions = snapshot.transactions;
        self.budgets = snapshot.budgets;
        self.settings = snapshot.settings;
        self.sort_categories();
        self.sort_transactions();
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            categories: self.categories.clone(),
            transactions: self.transactions.clone(),
            budgets: self.budgets.clone(),
            settings: self.settings.clone(),
        }
    }

    fn sort_transactions(&mut self) {
        self.transactions.sort_by(|a, b| b.date.cmp(&a.date));
    }

    fn sort_categories(&mut self) {
        self.categories.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn cutoff_day(&self) -> u8 {
        self.settings.cutoff_day()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Categories that may be picked for a transaction of `kind`
    pub fn categories_for(&self, kind: TxKind) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| c.scope.allows(kind))
            .collect()
    }

    /// Keep `current` if it is still valid for `kind`, otherwise fall back
    /// to the first allowed category
    pub fn default_category_for(&self, kind: TxKind, current: Option<&str>) -> Option<String> {
        let allowed = self.categories_for(kind);
        if let Some(id) = current {
            if allowed.iter().any(|c| c.id == id) {
                return Some(id.to_string());
            }
        }
        allowed.first().map(|c| c.id.clone())
    }

    pub fn budget_for(&self, category_id: &str) -> Option<&Budget> {
        self.budgets.iter().find(|b| b.category_id == category_id)
    }

    /// Decide between updating the category's budget and inserting one
    pub fn plan_budget_write(&self, category_id: &str, amount: Decimal) -> BudgetWrite {
        match self.budget_for(category_id) {
            Some(existing) => BudgetWrite::Update {
                budget_id: existing.id.clone(),
                amount,
            },
            None => BudgetWrite::Insert(NewBudget {
                user_id: self.user_id.clone(),
                category_id: category_id.to_string(),
                amount,
                period: BudgetPeriod::Monthly,
            }),
        }
    }

    pub fn apply_transaction(&mut self, tx: Transaction) {
        upsert_by_id(&mut self.transactions, tx, |t| &t.id);
        self.sort_transactions();
    }

    pub fn remove_transaction(&mut self, id: &str) -> bool {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        before != self.transactions.len()
    }

    pub fn apply_budget(&mut self, budget: Budget) {
        upsert_by_id(&mut self.budgets, budget, |b| &b.id);
    }

    pub fn apply_category(&mut self, category: Category) {
        upsert_by_id(&mut self.categories, category, |c| &c.id);
        self.sort_categories();
    }

    /// Transactions referencing the category keep their now-dangling id
    pub fn remove_category(&mut self, id: &str) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        before != self.categories.len()
    }

    pub fn apply_settings(&mut self, settings: UserSettings) {
        self.settings = settings;
    }
}

fn upsert_by_id<T, F>(rows: &mut Vec<T>, row: T, id: F)
where
    F: Fn(&T) -> &String,
{
    match rows.iter().position(|r| id(r) == id(&row)) {
        Some(i) => rows[i] = row,
        None => rows.push(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::billing_period;
    use chrono::FixedOffset;

    fn tx(id: &str, day: u32, amount: i64) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "u1".to_string(),
            date: Utc.with_ymd_and_hms(2024, 7, day, 9, 0, 0).unwrap(),
            amount: Decimal::from(amount),
            kind: TxKind::Expense,
            category_id: Some("food".to_string()),
            note: None,
        }
    }

    fn category(id: &str, name: &str, scope: CategoryScope) -> Category {
        Category {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: name.to_string(),
            icon: DEFAULT_ICON.to_string(),
            scope,
        }
    }

    fn ledger() -> Ledger {
        let snapshot = LedgerSnapshot {
            categories: vec![
                category("salary", "Gaji", CategoryScope::Income),
                category("food", "Makan", CategoryScope::Expense),
                category("misc", "Amplop", CategoryScope::Both),
            ],
            transactions: vec![tx("t1", 1, 10_000), tx("t2", 5, 20_000)],
            budgets: vec![],
            settings: UserSettings::defaults_for("u1"),
        };
        Ledger::from_snapshot("u1", snapshot)
    }

    fn draft(amount: Option<i64>) -> TransactionDraft {
        TransactionDraft {
            amount: amount.map(Decimal::from),
            kind: TxKind::Expense,
            category_id: None,
            note: "  ".to_string(),
            date: Utc.with_ymd_and_hms(2024, 7, 10, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_draft_rejects_non_positive_amount() {
        assert_eq!(draft(None).validate("u1"), Err(ValidationError::NonPositiveAmount));
        assert_eq!(draft(Some(0)).validate("u1"), Err(ValidationError::NonPositiveAmount));
        assert_eq!(draft(Some(-5)).validate("u1"), Err(ValidationError::NonPositiveAmount));
    }

    #[test]
    fn test_draft_trims_empty_note() {
        let new_tx = draft(Some(15_000)).validate("u1").unwrap();
        assert_eq!(new_tx.amount, Decimal::from(15_000));
        assert_eq!(new_tx.user_id, "u1");
        assert!(new_tx.note.is_none());
    }

    #[test]
    fn test_validate_new_category() {
        assert_eq!(
            validate_new_category("u1", "   ", "", CategoryScope::Expense),
            Err(ValidationError::EmptyCategoryName)
        );
        let cat = validate_new_category("u1", " Kopi ", "", CategoryScope::Both).unwrap();
        assert_eq!(cat.name, "Kopi");
        assert_eq!(cat.icon, DEFAULT_ICON);
    }

    #[test]
    fn test_budget_amount_and_cutoff_parsing() {
        assert_eq!(validate_budget_amount(None), Ok(Decimal::ZERO));
        assert_eq!(
            validate_budget_amount(Some(Decimal::from(-1))),
            Err(ValidationError::NegativeBudget)
        );
        assert_eq!(parse_cutoff_day("25"), Ok(25));
        assert_eq!(parse_cutoff_day("0"), Ok(1));
        assert_eq!(parse_cutoff_day("99"), Ok(31));
        assert_eq!(parse_cutoff_day("abc"), Err(ValidationError::InvalidCutoffDay));
    }

    #[test]
    fn test_login_inputs() {
        assert_eq!(validate_email(" "), Err(ValidationError::EmptyEmail));
        assert_eq!(validate_email(" a@b.id "), Ok("a@b.id".to_string()));
        assert_eq!(validate_code(""), Err(ValidationError::EmptyCode));
    }

    #[test]
    fn test_parse_date_input() {
        assert!(parse_date_input("2024-07-10").is_ok());
        assert!(matches!(
            parse_date_input("10/07/2024"),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_parse_datetime_input_converts_local_to_utc() {
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        assert_eq!(
            parse_datetime_input("2024-07-10 06:30", &wib),
            Ok(Utc.with_ymd_and_hms(2024, 7, 9, 23, 30, 0).unwrap())
        );
        assert_eq!(
            parse_datetime_input(" 2024-07-10 ", &wib),
            Ok(Utc.with_ymd_and_hms(2024, 7, 9, 17, 0, 0).unwrap())
        );
        assert!(matches!(
            parse_datetime_input("2024-07-10 25:00", &wib),
            Err(ValidationError::InvalidDateTime(_))
        ));
        assert!(matches!(
            parse_datetime_input("yesterday", &wib),
            Err(ValidationError::InvalidDateTime(_))
        ));
    }

    #[test]
    fn test_backdated_transaction_lands_in_previous_period() {
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let current = billing_period(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(), 10).unwrap();
        let previous = billing_period(NaiveDate::from_ymd_opt(2024, 7, 9).unwrap(), 10).unwrap();

        let date = parse_datetime_input("2024-07-09 20:30", &wib).unwrap();
        let new_tx = TransactionDraft {
            date,
            ..draft(Some(50_000))
        }
        .validate("u1")
        .unwrap();

        let local = new_tx.date.with_timezone(&wib).naive_local();
        assert!(previous.contains(local));
        assert!(!current.contains(local));
    }

    #[test]
    fn test_snapshot_is_sorted_on_load() {
        let ledger = ledger();
        let ids: Vec<&str> = ledger.transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1"]);
        let names: Vec<&str> = ledger.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Amplop", "Gaji", "Makan"]);
    }

    #[test]
    fn test_apply_transaction_reconciles_by_id() {
        let mut ledger = ledger();
        ledger.apply_transaction(tx("t3", 9, 5_000));
        assert_eq!(ledger.transactions[0].id, "t3");

        // Same id echoed again replaces instead of duplicating
        ledger.apply_transaction(tx("t3", 9, 7_000));
        assert_eq!(ledger.transactions.len(), 3);
        assert_eq!(ledger.transactions[0].amount, Decimal::from(7_000));
    }

    #[test]
    fn test_remove_transaction() {
        let mut ledger = ledger();
        assert!(ledger.remove_transaction("t1"));
        assert!(!ledger.remove_transaction("t1"));
        assert_eq!(ledger.transactions.len(), 1);
    }

    #[test]
    fn test_remove_category_leaves_transactions_dangling() {
        let mut ledger = ledger();
        assert!(ledger.remove_category("food"));
        assert!(ledger.category("food").is_none());
        assert!(ledger
            .transactions
            .iter()
            .all(|t| t.category_id.as_deref() == Some("food")));
    }

    #[test]
    fn test_categories_for_kind() {
        let ledger = ledger();
        let expense: Vec<&str> = ledger
            .categories_for(TxKind::Expense)
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(expense, vec!["misc", "food"]);
        let income: Vec<&str> = ledger
            .categories_for(TxKind::Income)
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(income, vec!["salary"]);
    }

    #[test]
    fn test_default_category_for_kind() {
        let ledger = ledger();
        assert_eq!(
            ledger.default_category_for(TxKind::Expense, Some("food")),
            Some("food".to_string())
        );
        assert_eq!(
            ledger.default_category_for(TxKind::Income, Some("food")),
            Some("salary".to_string())
        );
        assert_eq!(
            ledger.default_category_for(TxKind::Income, Some("misc")),
            Some("salary".to_string())
        );
        assert_eq!(Ledger::new("u1").default_category_for(TxKind::Income, None), None);
    }

    #[test]
    fn test_plan_budget_write_upserts() {
        let mut ledger = ledger();
        match ledger.plan_budget_write("food", Decimal::from(100)) {
            BudgetWrite::Insert(new_budget) => {
                assert_eq!(new_budget.category_id, "food");
                assert_eq!(new_budget.period, BudgetPeriod::Monthly);
            }
            other => panic!("expected insert, got {:?}", other),
        }

        ledger.apply_budget(Budget {
            id: "b1".to_string(),
            user_id: "u1".to_string(),
            category_id: "food".to_string(),
            amount: Decimal::from(100),
            period: BudgetPeriod::Monthly,
            start_date: None,
            rollover: false,
        });

        assert_eq!(
            ledger.plan_budget_write("food", Decimal::from(250)),
            BudgetWrite::Update {
                budget_id: "b1".to_string(),
                amount: Decimal::from(250)
            }
        );
    }

    #[test]
    fn test_apply_settings() {
        let mut ledger = ledger();
        ledger.apply_settings(UserSettings {
            id: Some("s1".to_string()),
            user_id: "u1".to_string(),
            monthly_cutoff_day: 25,
        });
        assert_eq!(ledger.cutoff_day(), 25);
        assert!(ledger.settings.is_persisted());
    }
}
