//! Content for each tab.

pub mod budgets;
pub mod reports;
pub mod settings;
pub mod today;
