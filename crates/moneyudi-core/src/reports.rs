//! Aggregations behind the Today, Reports and Budgets screens.
//!
//! All functions borrow from the ledger and take the time zone used to turn
//! stored UTC instants into the local wall time that ranges are defined in.

use chrono::{NaiveDate, TimeZone};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Budget, Category, Transaction, TxKind};
use crate::period::{day_bounds, DateRange};
use crate::utils::contains_ignore_case;

/// Rows shown in the Today list
pub const TODAY_LIST_LIMIT: usize = 10;

/// Rows shown in the unfiltered history list
pub const RECENT_HISTORY_LIMIT: usize = 20;

/// Name and icon for expenses whose category is missing or deleted
pub const UNCATEGORIZED_NAME: &str = "Other";
pub const UNCATEGORIZED_ICON: &str = "•";

/// Share of a budget at which the progress bar turns into a warning
const BUDGET_WARNING_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KindTotal {
    pub total: Decimal,
    pub count: usize,
}

impl KindTotal {
    fn add(&mut self, amount: Decimal) {
        self.total += amount;
        self.count += 1;
    }
}

fn totals<'a>(txs: impl IntoIterator<Item = &'a Transaction>) -> (KindTotal, KindTotal) {
    let mut expense = KindTotal::default();
    let mut income = KindTotal::default();
    for tx in txs {
        match tx.kind {
            TxKind::Expense => expense.add(tx.amount),
            TxKind::Income => income.add(tx.amount),
        }
    }
    (expense, income)
}

fn in_range<'a, Tz: TimeZone>(
    txs: &'a [Transaction],
    range: &DateRange,
    tz: &Tz,
) -> Vec<&'a Transaction> {
    txs.iter()
        .filter(|tx| range.contains(tx.local_time(tz)))
        .collect()
}

/// Everything that happened on one local day
#[derive(Debug, Clone)]
pub struct DaySummary<'a> {
    pub transactions: Vec<&'a Transaction>,
    pub expense: KindTotal,
    pub income: KindTotal,
}

impl DaySummary<'_> {
    /// The first `TODAY_LIST_LIMIT` rows, newest first as stored
    pub fn latest(&self) -> &[&Transaction] {
        let end = self.transactions.len().min(TODAY_LIST_LIMIT);
        &self.transactions[..end]
    }
}

pub fn day_summary<'a, Tz: TimeZone>(
    txs: &'a [Transaction],
    day: NaiveDate,
    tz: &Tz,
) -> DaySummary<'a> {
    let transactions = in_range(txs, &day_bounds(day), tz);
    let (expense, income) = totals(transactions.iter().copied());
    DaySummary {
        transactions,
        expense,
        income,
    }
}

/// Expense total for one category within a report window
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category_id: Option<String>,
    pub name: String,
    pub icon: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct PeriodSummary<'a> {
    pub range: DateRange,
    pub transactions: Vec<&'a Transaction>,
    pub total_expense: Decimal,
    pub total_income: Decimal,
    pub net: Decimal,
    /// Sorted by amount, largest first
    pub by_category: Vec<CategoryTotal>,
    pub biggest_expense: Option<&'a Transaction>,
}

pub fn summarize_period<'a, Tz: TimeZone>(
    txs: &'a [Transaction],
    categories: &[Category],
    range: &DateRange,
    tz: &Tz,
) -> PeriodSummary<'a> {
    let transactions = in_range(txs, range, tz);
    let (expense, income) = totals(transactions.iter().copied());

    let mut by_category: Vec<CategoryTotal> = Vec::new();
    let mut biggest_expense: Option<&Transaction> = None;

    for tx in transactions.iter().copied().filter(|t| t.is_expense()) {
        match by_category
            .iter_mut()
            .find(|row| row.category_id == tx.category_id)
        {
            Some(row) => row.amount += tx.amount,
            None => {
                let category = tx
                    .category_id
                    .as_ref()
                    .and_then(|id| categories.iter().find(|c| &c.id == id));
                by_category.push(CategoryTotal {
                    category_id: tx.category_id.clone(),
                    name: category
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| UNCATEGORIZED_NAME.to_string()),
                    icon: category
                        .map(|c| c.icon.clone())
                        .unwrap_or_else(|| UNCATEGORIZED_ICON.to_string()),
                    amount: tx.amount,
                });
            }
        }

        // Strictly greater keeps the first of equal amounts
        if biggest_expense.map_or(true, |b| tx.amount > b.amount) {
            biggest_expense = Some(tx);
        }
    }

    by_category.sort_by(|a, b| b.amount.cmp(&a.amount));

    PeriodSummary {
        range: *range,
        transactions,
        total_expense: expense.total,
        total_income: income.total,
        net: income.total - expense.total,
        by_category,
        biggest_expense,
    }
}

/// Spent share of a budget as a whole percent in [0, 100]. A zero or
/// missing limit reads as 0%.
pub fn budget_percent(spent: Decimal, limit: Decimal) -> u8 {
    if limit <= Decimal::ZERO {
        return 0;
    }
    let pct = (spent / limit * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .min(Decimal::ONE_HUNDRED)
        .max(Decimal::ZERO);
    pct.to_u8().unwrap_or(0)
}

pub fn budget_warning(spent: Decimal, limit: Decimal) -> bool {
    limit > Decimal::ZERO && spent >= limit * BUDGET_WARNING_RATIO
}

#[derive(Debug, Clone)]
pub struct BudgetProgress<'a> {
    pub category: &'a Category,
    pub budget: Option<&'a Budget>,
    pub limit: Decimal,
    pub spent: Decimal,
    pub percent: u8,
    pub warning: bool,
}

/// Progress for every category that can hold expenses, in category order
pub fn budget_overview<'a, Tz: TimeZone>(
    categories: &'a [Category],
    budgets: &'a [Budget],
    txs: &[Transaction],
    range: &DateRange,
    tz: &Tz,
) -> Vec<BudgetProgress<'a>> {
    let expenses: Vec<&Transaction> = in_range(txs, range, tz)
        .into_iter()
        .filter(|t| t.is_expense())
        .collect();

    categories
        .iter()
        .filter(|c| c.scope.allows(TxKind::Expense))
        .map(|category| {
            let budget = budgets.iter().find(|b| b.category_id == category.id);
            let limit = budget.map(|b| b.amount).unwrap_or(Decimal::ZERO);
            let spent: Decimal = expenses
                .iter()
                .filter(|t| t.category_id.as_deref() == Some(category.id.as_str()))
                .map(|t| t.amount)
                .sum();
            BudgetProgress {
                category,
                budget,
                limit,
                spent,
                percent: budget_percent(spent, limit),
                warning: budget_warning(spent, limit),
            }
        })
        .collect()
}

/// Filters for the transaction history list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Matched against the note and the category name
    pub query: String,
    pub category_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl HistoryFilter {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
            || self.category_id.is_some()
            || self.from.is_some()
            || self.to.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches<Tz: TimeZone>(&self, tx: &Transaction, categories: &[Category], tz: &Tz) -> bool {
        if let Some(ref category_id) = self.category_id {
            if tx.category_id.as_ref() != Some(category_id) {
                return false;
            }
        }

        let at = tx.local_time(tz);
        if let Some(from) = self.from {
            if at < day_bounds(from).from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at > day_bounds(to).to {
                return false;
            }
        }

        if !self.query.is_empty() {
            let category_name = tx
                .category_id
                .as_ref()
                .and_then(|id| categories.iter().find(|c| &c.id == id))
                .map(|c| c.name.as_str())
                .unwrap_or("");
            let haystack = format!("{} {}", tx.note_text(), category_name);
            if !contains_ignore_case(&haystack, &self.query) {
                return false;
            }
        }

        true
    }

    /// Filtered rows when any filter is set, otherwise the most recent
    /// `RECENT_HISTORY_LIMIT` rows
    pub fn apply<'a, Tz: TimeZone>(
        &self,
        txs: &'a [Transaction],
        categories: &[Category],
        tz: &Tz,
    ) -> Vec<&'a Transaction> {
        if self.is_active() {
            txs.iter()
                .filter(|tx| self.matches(tx, categories, tz))
                .collect()
        } else {
            txs.iter().take(RECENT_HISTORY_LIMIT).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryScope;
    use crate::period::billing_period;
    use chrono::{DateTime, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn tx(id: &str, date: &str, amount: i64, kind: TxKind, category: Option<&str>) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: "u1".to_string(),
            date: at(date),
            amount: Decimal::from(amount),
            kind,
            category_id: category.map(str::to_string),
            note: None,
        }
    }

    fn category(id: &str, name: &str, scope: CategoryScope) -> Category {
        Category {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: name.to_string(),
            icon: "🍔".to_string(),
            scope,
        }
    }

    fn budget(category_id: &str, amount: i64) -> Budget {
        Budget {
            id: format!("b-{}", category_id),
            user_id: "u1".to_string(),
            category_id: category_id.to_string(),
            amount: Decimal::from(amount),
            period: Default::default(),
            start_date: None,
            rollover: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> (Vec<Transaction>, Vec<Category>) {
        let txs = vec![
            tx("t5", "2024-07-24T20:00:00Z", 40_000, TxKind::Expense, None),
            tx("t4", "2024-07-10T12:00:00Z", 10_000, TxKind::Expense, Some("food")),
            tx("t3", "2024-07-10T08:00:00Z", 5_000_000, TxKind::Income, Some("salary")),
            tx("t2", "2024-07-01T09:00:00Z", 75_000, TxKind::Expense, Some("fuel")),
            tx("t1", "2024-06-20T09:00:00Z", 30_000, TxKind::Expense, Some("food")),
        ];
        let categories = vec![
            category("food", "Makan", CategoryScope::Expense),
            category("fuel", "Bensin", CategoryScope::Expense),
            category("salary", "Gaji", CategoryScope::Income),
            category("misc", "Lain", CategoryScope::Both),
        ];
        (txs, categories)
    }

    #[test]
    fn test_day_summary_counts_each_kind() {
        let (txs, _) = sample();
        let summary = day_summary(&txs, date(2024, 7, 10), &Utc);
        assert_eq!(summary.transactions.len(), 2);
        assert_eq!(summary.expense.total, Decimal::from(10_000));
        assert_eq!(summary.expense.count, 1);
        assert_eq!(summary.income.total, Decimal::from(5_000_000));
        assert_eq!(summary.income.count, 1);
    }

    #[test]
    fn test_day_summary_latest_is_capped() {
        let txs: Vec<Transaction> = (0..15)
            .map(|i| tx(&format!("t{i}"), "2024-07-10T10:00:00Z", 1_000, TxKind::Expense, None))
            .collect();
        let summary = day_summary(&txs, date(2024, 7, 10), &Utc);
        assert_eq!(summary.transactions.len(), 15);
        assert_eq!(summary.latest().len(), TODAY_LIST_LIMIT);
    }

    #[test]
    fn test_summarize_period_totals_and_breakdown() {
        let (txs, categories) = sample();
        let range = billing_period(date(2024, 7, 10), 25).unwrap();
        let summary = summarize_period(&txs, &categories, &range, &Utc);

        // t1 falls before the 25 Jun cutoff
        assert_eq!(summary.transactions.len(), 4);
        assert_eq!(summary.total_expense, Decimal::from(125_000));
        assert_eq!(summary.total_income, Decimal::from(5_000_000));
        assert_eq!(summary.net, Decimal::from(4_875_000));

        let names: Vec<&str> = summary.by_category.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Bensin", UNCATEGORIZED_NAME, "Makan"]);
        assert_eq!(summary.by_category[1].amount, Decimal::from(40_000));
        assert_eq!(summary.by_category[1].icon, UNCATEGORIZED_ICON);
        assert_eq!(summary.by_category[2].amount, Decimal::from(10_000));

        assert_eq!(summary.biggest_expense.map(|t| t.id.as_str()), Some("t2"));
    }

    #[test]
    fn test_summarize_period_dangling_category_reads_as_other() {
        let txs = vec![tx("t1", "2024-07-10T12:00:00Z", 1_000, TxKind::Expense, Some("deleted"))];
        let range = day_bounds(date(2024, 7, 10));
        let summary = summarize_period(&txs, &[], &range, &Utc);
        assert_eq!(summary.by_category[0].name, UNCATEGORIZED_NAME);
        assert_eq!(summary.by_category[0].category_id.as_deref(), Some("deleted"));
    }

    #[test]
    fn test_summarize_period_empty() {
        let range = day_bounds(date(2024, 7, 10));
        let summary = summarize_period(&[], &[], &range, &Utc);
        assert_eq!(summary.net, Decimal::ZERO);
        assert!(summary.by_category.is_empty());
        assert!(summary.biggest_expense.is_none());
    }

    #[test]
    fn test_budget_percent() {
        assert_eq!(budget_percent(Decimal::from(50), Decimal::from(200)), 25);
        assert_eq!(budget_percent(Decimal::from(1), Decimal::from(3)), 33);
        assert_eq!(budget_percent(Decimal::from(2), Decimal::from(3)), 67);
        assert_eq!(budget_percent(Decimal::from(500), Decimal::from(100)), 100);
    }

    #[test]
    fn test_budget_percent_zero_limit_is_zero() {
        assert_eq!(budget_percent(Decimal::from(75_000), Decimal::ZERO), 0);
        assert_eq!(budget_percent(Decimal::ZERO, Decimal::ZERO), 0);
        assert!(!budget_warning(Decimal::from(75_000), Decimal::ZERO));
    }

    #[test]
    fn test_budget_warning_threshold() {
        assert!(!budget_warning(Decimal::from(79), Decimal::from(100)));
        assert!(budget_warning(Decimal::from(80), Decimal::from(100)));
        assert!(budget_warning(Decimal::from(120), Decimal::from(100)));
    }

    #[test]
    fn test_budget_overview() {
        let (txs, categories) = sample();
        let budgets = vec![budget("food", 12_500)];
        let range = billing_period(date(2024, 7, 10), 25).unwrap();
        let overview = budget_overview(&categories, &budgets, &txs, &range, &Utc);

        let ids: Vec<&str> = overview.iter().map(|p| p.category.id.as_str()).collect();
        assert_eq!(ids, vec!["food", "fuel", "misc"]);

        let food = &overview[0];
        assert_eq!(food.limit, Decimal::from(12_500));
        assert_eq!(food.spent, Decimal::from(10_000));
        assert_eq!(food.percent, 80);
        assert!(food.warning);

        let fuel = &overview[1];
        assert!(fuel.budget.is_none());
        assert_eq!(fuel.spent, Decimal::from(75_000));
        assert_eq!(fuel.percent, 0);
        assert!(!fuel.warning);
    }

    #[test]
    fn test_history_unfiltered_shows_recent() {
        let txs: Vec<Transaction> = (0..30)
            .map(|i| tx(&format!("t{i}"), "2024-07-10T10:00:00Z", 1_000, TxKind::Expense, None))
            .collect();
        let filter = HistoryFilter::default();
        assert!(!filter.is_active());
        let rows = filter.apply(&txs, &[], &Utc);
        assert_eq!(rows.len(), RECENT_HISTORY_LIMIT);
        assert_eq!(rows[0].id, "t0");
    }

    #[test]
    fn test_history_query_matches_note_and_category() {
        let (mut txs, categories) = sample();
        txs[0].note = Some("Parkir mall".to_string());

        let filter = HistoryFilter {
            query: "PARKIR".to_string(),
            ..Default::default()
        };
        let rows = filter.apply(&txs, &categories, &Utc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "t5");

        let filter = HistoryFilter {
            query: "makan".to_string(),
            ..Default::default()
        };
        let ids: Vec<&str> = filter
            .apply(&txs, &categories, &Utc)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t4", "t1"]);
    }

    #[test]
    fn test_history_category_and_dates() {
        let (txs, categories) = sample();
        let filter = HistoryFilter {
            category_id: Some("food".to_string()),
            from: Some(date(2024, 7, 1)),
            to: Some(date(2024, 7, 10)),
            ..Default::default()
        };
        let ids: Vec<&str> = filter
            .apply(&txs, &categories, &Utc)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t4"]);

        let mut filter = filter;
        filter.clear();
        assert!(!filter.is_active());
    }
}
