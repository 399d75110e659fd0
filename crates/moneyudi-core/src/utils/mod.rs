//! Utility functions for formatting and parsing user-facing values.

pub mod format;

pub use format::{contains_ignore_case, format_idr, parse_amount_input, truncate_string};
