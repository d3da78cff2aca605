//! Calendar-month window planning.
//!
//! The portal serves observations in whole calendar months, so a sync run
//! is planned as the ordered sequence of months covering the missing range.
//! Planning is a pure function of two dates and can be restarted freely.

use chrono::{Datelike, Duration, NaiveDate};

/// One calendar month used as the unit of remote fetch granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
}

impl MonthWindow {
    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // month is always 1..=12 by construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid calendar month")
    }

    /// Last day of the month, leap-aware
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid calendar month")
            - Duration::days(1)
    }

    fn succ(&self) -> MonthWindow {
        if self.month == 12 {
            MonthWindow {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthWindow {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl std::fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Iterator over the months of a planned sync range
#[derive(Debug, Clone)]
pub struct MonthWindows {
    current: MonthWindow,
    end: MonthWindow,
}

impl Iterator for MonthWindows {
    type Item = MonthWindow;

    fn next(&mut self) -> Option<MonthWindow> {
        if (self.current.year, self.current.month) > (self.end.year, self.end.month) {
            return None;
        }
        let item = self.current;
        self.current = item.succ();
        Some(item)
    }
}

/// Plan every calendar month from `from`'s month through `until`'s month,
/// inclusive, in ascending order.
///
/// Yields nothing when `from` is after `until`: a station whose coverage is
/// already current must short-circuit with zero windows and zero fetches.
pub fn month_windows(from: NaiveDate, until: NaiveDate) -> MonthWindows {
    let end = MonthWindow {
        year: until.year(),
        month: until.month(),
    };
    let current = if from > until {
        // start past the end marker so the iterator is immediately exhausted
        end.succ()
    } else {
        MonthWindow {
            year: from.year(),
            month: from.month(),
        }
    };
    MonthWindows { current, end }
}
