use chrono::{DateTime, Local, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount as Indonesian Rupiah with no fraction digits,
/// e.g. `Rp 1.250.000`
pub fn format_idr(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let grouped = group_thousands(&digits);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// Insert `.` between groups of three digits
pub fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Parse what the user typed into an amount field. Everything that is not
/// a digit is dropped, so `1.250.000` and `Rp 1,250,000` both read as
/// 1250000. Returns `None` when no digits are present.
pub fn parse_amount_input(input: &str) -> Option<Decimal> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<Decimal>().ok()
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Case-insensitive substring match
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Short local date/time for list rows, e.g. `10 Jul 14:05`
pub fn format_tx_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d %b %H:%M").to_string()
}
