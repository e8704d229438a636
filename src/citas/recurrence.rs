//! Recurring-series date expansion
//!
//! A recurring cita fans out into sibling instances at a fixed cadence
//! until an inclusive end date. Monthly steps use calendar arithmetic, so
//! a series started on the 31st clamps to the last day of shorter months.

use chrono::{Days, Months, NaiveDate};

use crate::db::models::RecurringType;

// Safety limit: a daily series over several years is almost certainly an
// input mistake, and the bulk insert should stay bounded.
const MAX_INSTANCES: usize = 730;

/// Date of the nth repetition after the base date
fn nth_date(base: NaiveDate, step: RecurringType, n: u64) -> Option<NaiveDate> {
    match step {
        RecurringType::Daily => base.checked_add_days(Days::new(n)),
        RecurringType::Weekly => base.checked_add_days(Days::new(7 * n)),
        RecurringType::Monthly => base.checked_add_months(Months::new(n as u32)),
    }
}

/// Dates of the generated instances, excluding the base date itself,
/// up to and including `end`
pub fn series_dates(base: NaiveDate, step: RecurringType, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();

    for n in 1..=(MAX_INSTANCES as u64) {
        match nth_date(base, step, n) {
            Some(date) if date <= end => dates.push(date),
            _ => break,
        }
    }

    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_weekly_series() {
        // base 2024-01-01, weekly until 2024-01-22 inclusive -> 3 instances
        let dates = series_dates(d(2024, 1, 1), RecurringType::Weekly, d(2024, 1, 22));
        assert_eq!(dates, vec![d(2024, 1, 8), d(2024, 1, 15), d(2024, 1, 22)]);
    }

    #[test]
    fn test_daily_series() {
        let dates = series_dates(d(2024, 1, 1), RecurringType::Daily, d(2024, 1, 4));
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
    }

    #[test]
    fn test_monthly_series_clamps_to_month_end() {
        // Jan 31 steps to Feb 29 (leap year) and Mar 31
        let dates = series_dates(d(2024, 1, 31), RecurringType::Monthly, d(2024, 3, 31));
        assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 31)]);
    }

    #[test]
    fn test_end_before_first_step_yields_nothing() {
        let dates = series_dates(d(2024, 1, 1), RecurringType::Weekly, d(2024, 1, 5));
        assert!(dates.is_empty());
    }

    #[test]
    fn test_end_equal_to_base_yields_nothing() {
        let dates = series_dates(d(2024, 1, 1), RecurringType::Daily, d(2024, 1, 1));
        assert!(dates.is_empty());
    }

    #[test]
    fn test_series_is_bounded() {
        let dates = series_dates(d(2020, 1, 1), RecurringType::Daily, d(2030, 1, 1));
        assert_eq!(dates.len(), MAX_INSTANCES);
    }
}
