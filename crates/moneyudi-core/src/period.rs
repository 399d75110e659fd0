//! Date-range math for reports and budgets.
//!
//! The "custom month" runs from the user's cutoff day to the day before the
//! cutoff in the following month. Month and day arithmetic normalizes the way
//! a calendar rollover does: month -1 is December of the previous year, day 0
//! is the last day of the previous month, and a day past the end of a month
//! spills into the next one.
//!
//! That spill means a cutoff of 31 in a 30-day month (or 29-31 in February)
//! silently moves the period start into the following month. This is kept as
//! the default (`CutoffOverflow::RollForward`); `CutoffOverflow::Clamp` pins
//! the cutoff to the month's last day instead.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Cutoff day must be between 1 and 31, got {0}")]
    InvalidCutoff(u32),

    #[error("Date is outside the supported calendar range")]
    OutOfRange,
}

/// How a cutoff day larger than the target month is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CutoffOverflow {
    /// Let the extra days spill into the next month
    #[default]
    RollForward,
    /// Use the last day of the month
    Clamp,
}

/// Inclusive range of local wall-clock times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.from && at <= self.to
    }

    pub fn start_date(&self) -> NaiveDate {
        self.from.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.to.date()
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 23:59:59.999 on `date`
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::milliseconds(MILLIS_PER_DAY - 1)
}

/// Build a date from a possibly out-of-range month (0-based) and day,
/// rolling over into neighbouring months and years.
fn normalize(year: i32, month0: i64, day: i64) -> Result<NaiveDate, PeriodError> {
    let total_months = i64::from(year) * 12 + month0;
    let y = i32::try_from(total_months.div_euclid(12)).map_err(|_| PeriodError::OutOfRange)?;
    let m = (total_months.rem_euclid(12) + 1) as u32;
    let first = NaiveDate::from_ymd_opt(y, m, 1).ok_or(PeriodError::OutOfRange)?;
    first
        .checked_add_signed(Duration::days(day - 1))
        .ok_or(PeriodError::OutOfRange)
}

fn days_in_month(year: i32, month0: i64) -> Result<u32, PeriodError> {
    Ok(normalize(year, month0 + 1, 0)?.day())
}

fn check_cutoff(cutoff_day: u32) -> Result<(), PeriodError> {
    if (1..=31).contains(&cutoff_day) {
        Ok(())
    } else {
        Err(PeriodError::InvalidCutoff(cutoff_day))
    }
}

/// The custom billing period containing `reference`, using roll-forward
/// normalization.
pub fn billing_period(reference: NaiveDate, cutoff_day: u32) -> Result<DateRange, PeriodError> {
    billing_period_with(reference, cutoff_day, CutoffOverflow::RollForward)
}

pub fn billing_period_with(
    reference: NaiveDate,
    cutoff_day: u32,
    overflow: CutoffOverflow,
) -> Result<DateRange, PeriodError> {
    check_cutoff(cutoff_day)?;

    let year = reference.year();
    let month0 = i64::from(reference.month0());
    let cutoff = i64::from(cutoff_day);

    let (start, end) = match overflow {
        CutoffOverflow::RollForward => {
            let start_month0 = if reference.day() >= cutoff_day {
                month0
            } else {
                month0 - 1
            };
            let start = normalize(year, start_month0, cutoff)?;
            let end = normalize(start.year(), i64::from(start.month0()) + 1, cutoff - 1)?;
            (start, end)
        }
        CutoffOverflow::Clamp => {
            let clamped = |m0: i64| -> Result<i64, PeriodError> {
                Ok(i64::from(cutoff_day.min(days_in_month(year, m0)?)))
            };
            let start_month0 = if i64::from(reference.day()) >= clamped(month0)? {
                month0
            } else {
                month0 - 1
            };
            let start = normalize(year, start_month0, clamped(start_month0)?)?;
            let next = normalize(year, start_month0 + 1, clamped(start_month0 + 1)?)?;
            let end = next.pred_opt().ok_or(PeriodError::OutOfRange)?;
            (start, end)
        }
    };

    Ok(DateRange {
        from: start_of_day(start),
        to: end_of_day(end),
    })
}

pub fn day_bounds(date: NaiveDate) -> DateRange {
    DateRange {
        from: start_of_day(date),
        to: end_of_day(date),
    }
}

/// Monday 00:00:00.000 through Sunday 23:59:59.999
pub fn week_bounds(date: NaiveDate) -> DateRange {
    let offset = i64::from(date.weekday().num_days_from_monday());
    let monday = date - Duration::days(offset);
    let sunday = monday + Duration::days(6);
    DateRange {
        from: start_of_day(monday),
        to: end_of_day(sunday),
    }
}

pub fn month_bounds(date: NaiveDate) -> Result<DateRange, PeriodError> {
    let year = date.year();
    let month0 = i64::from(date.month0());
    let first = normalize(year, month0, 1)?;
    let last = normalize(year, month0 + 1, 0)?;
    Ok(DateRange {
        from: start_of_day(first),
        to: end_of_day(last),
    })
}

/// Window selection on the reports screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    Daily,
    Weekly,
    Monthly,
    /// Cutoff-based billing month
    #[default]
    Custom,
}

impl ReportMode {
    pub fn next(self) -> Self {
        match self {
            ReportMode::Daily => ReportMode::Weekly,
            ReportMode::Weekly => ReportMode::Monthly,
            ReportMode::Monthly => ReportMode::Custom,
            ReportMode::Custom => ReportMode::Daily,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportMode::Daily => "Daily",
            ReportMode::Weekly => "Weekly",
            ReportMode::Monthly => "Monthly",
            ReportMode::Custom => "Custom (cutoff)",
        }
    }

    pub fn range(
        self,
        reference: NaiveDate,
        cutoff_day: u8,
        overflow: CutoffOverflow,
    ) -> Result<DateRange, PeriodError> {
        match self {
            ReportMode::Daily => Ok(day_bounds(reference)),
            ReportMode::Weekly => Ok(week_bounds(reference)),
            ReportMode::Monthly => month_bounds(reference),
            ReportMode::Custom => billing_period_with(reference, u32::from(cutoff_day), overflow),
        }
    }

    /// Human-readable label for a range produced by this mode
    pub fn label(self, range: &DateRange) -> String {
        let from = range.start_date();
        let to = range.end_date();
        match self {
            ReportMode::Daily => from.format("%d %b %Y").to_string(),
            ReportMode::Weekly => format!(
                "Week {} - {}",
                from.format("%d %b"),
                to.format("%d %b %Y")
            ),
            ReportMode::Monthly => from.format("%B %Y").to_string(),
            ReportMode::Custom => format!("{} - {}", from.format("%d %b"), to.format("%d %b %Y")),
        }
    }

    /// Move the reference date one window forward or back
    pub fn step(self, reference: NaiveDate, forward: bool) -> NaiveDate {
        let stepped = match self {
            ReportMode::Daily => {
                if forward {
                    reference.succ_opt()
                } else {
                    reference.pred_opt()
                }
            }
            ReportMode::Weekly => {
                let week = Duration::days(7);
                if forward {
                    reference.checked_add_signed(week)
                } else {
                    reference.checked_sub_signed(week)
                }
            }
            ReportMode::Monthly | ReportMode::Custom => {
                if forward {
                    reference.checked_add_months(Months::new(1))
                } else {
                    reference.checked_sub_months(Months::new(1))
                }
            }
        };
        stepped.unwrap_or(reference)
    }
}
