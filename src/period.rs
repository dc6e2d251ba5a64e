use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Last day of the first half of a month
pub const FIRST_HALF_END_DAY: u32 = 14;
/// Day-of-month used for the second-half deadline, whatever the month length
pub const SECOND_HALF_DEADLINE_DAY: u32 = 29;
/// Latest day-of-month payment is issued for the second half
pub const SECOND_HALF_PAYMENT_CAP: u32 = 30;
/// Window before a deadline during which it is reported as approaching
pub const APPROACHING_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodHalf {
    First,
    Second,
}

/// A half-month billing window
///
/// Computed on demand from a calendar date and never persisted. Every month
/// is split into `[1, 14]` and `[15, last day]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Submission cutoff, local time
    pub deadline: NaiveDateTime,
    pub payment_date: NaiveDate,
    pub label: String,
}

impl PayrollPeriod {
    /// Resolve the period that contains `date`
    ///
    /// The second-half deadline is always the 29th at 23:59:59. In months
    /// with fewer than 29 days the 29th rolls over into the next month, so the
    /// deadline lands after `end` (February in common years).
    pub fn containing(date: NaiveDate) -> Self {
        let first = first_of_month(date);
        let month_name = date.format("%B").to_string();

        if date.day() <= FIRST_HALF_END_DAY {
            Self {
                start: first,
                end: nth_day(first, FIRST_HALF_END_DAY),
                deadline: end_of_day(nth_day(first, FIRST_HALF_END_DAY)),
                payment_date: nth_day(first, FIRST_HALF_END_DAY + 1),
                label: format!("First Half of {}", month_name),
            }
        } else {
            let last_day = last_day_of_month(date.year(), date.month());
            let payment_day = last_day.min(SECOND_HALF_PAYMENT_CAP);

            Self {
                start: nth_day(first, FIRST_HALF_END_DAY + 1),
                end: nth_day(first, last_day),
                deadline: end_of_day(nth_day(first, SECOND_HALF_DEADLINE_DAY)),
                payment_date: nth_day(first, payment_day),
                label: format!("Second Half of {}", month_name),
            }
        }
    }

    /// Resolve the period containing today's local date
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// Inclusive membership test on calendar days
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn half(&self) -> PeriodHalf {
        if self.start.day() == 1 {
            PeriodHalf::First
        } else {
            PeriodHalf::Second
        }
    }
}

/// True when `deadline` is after `now` and less than 48 hours away
///
/// Both values are local wall-clock times, so the window counts clock hours
/// and is one hour shorter or longer across a DST change.
pub fn is_deadline_approaching_at(deadline: NaiveDateTime, now: NaiveDateTime) -> bool {
    let remaining = deadline - now;
    remaining > TimeDelta::zero() && remaining < TimeDelta::hours(APPROACHING_WINDOW_HOURS)
}

pub fn is_deadline_approaching(deadline: NaiveDateTime) -> bool {
    is_deadline_approaching_at(deadline, Local::now().naive_local())
}

/// Days on which the report is considered final rather than a draft
pub fn is_submission_day(date: NaiveDate) -> bool {
    date.day() == FIRST_HALF_END_DAY || date.day() == SECOND_HALF_DEADLINE_DAY
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        // Only reachable at the edge of chrono's supported range
        .unwrap_or(28)
}

/// Short display form, e.g. "Feb 14, 2024"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

// Day arithmetic from the 1st so that a day past the end of the month
// rolls into the next one instead of failing.
fn nth_day(first: NaiveDate, day: u32) -> NaiveDate {
    first
        .checked_add_days(Days::new(u64::from(day - 1)))
        .unwrap_or(first)
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}
