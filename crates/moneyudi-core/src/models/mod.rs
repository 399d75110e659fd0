//! Data models for MoneYudi entities.
//!
//! Rows mirror the backend tables one to one:
//!
//! - `Transaction`: a single income or expense entry
//! - `Category`: user-defined grouping with an icon and a kind scope
//! - `Budget`: monthly limit for one category
//! - `UserSettings`: per-user billing cutoff day
//! - `VocabCard`: the client-only vocabulary flashcard

pub mod budget;
pub mod category;
pub mod settings;
pub mod transaction;
pub mod vocab;

pub use budget::{Budget, BudgetPeriod, NewBudget};
pub use category::{Category, CategoryPatch, CategoryScope, NewCategory};
pub use settings::{UserSettings, DEFAULT_CUTOFF_DAY};
pub use transaction::{NewTransaction, Transaction, TxKind};
pub use vocab::VocabCard;
