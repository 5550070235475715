//! Weekday arithmetic for rotation windows and target-date resolution.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Weekday};

/// How far back a history check looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The N weekdays immediately before the target date, weekends skipped.
    Weekdays(u32),
    /// Every recorded date.
    AllHistory,
}

impl Default for Window {
    fn default() -> Self {
        Window::Weekdays(2)
    }
}

impl Window {
    /// Dates covered by this window relative to `target`. `None` means unbounded.
    pub fn dates(&self, target: NaiveDate) -> Option<HashSet<NaiveDate>> {
        match *self {
            Window::Weekdays(n) => Some(previous_weekdays(target, n).into_iter().collect()),
            Window::AllHistory => None,
        }
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn previous_weekday(date: NaiveDate) -> NaiveDate {
    let mut current = date - Duration::days(1);
    while is_weekend(current) {
        current -= Duration::days(1);
    }
    current
}

pub fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut current = date + Duration::days(1);
    while is_weekend(current) {
        current += Duration::days(1);
    }
    current
}

/// The `count` weekdays before `date`, most recent first.
pub fn previous_weekdays(date: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count as usize);
    let mut current = date;
    for _ in 0..count {
        current = previous_weekday(current);
        dates.push(current);
    }
    dates
}

/// Date a shuffle triggered at `now` is for: today, or the next weekday once
/// the local clock has reached `cutoff`.
pub fn shuffle_target_date<Tz: TimeZone>(now: &DateTime<Tz>, cutoff: NaiveTime) -> NaiveDate {
    let local = now.naive_local();
    if local.time() >= cutoff {
        next_weekday(local.date())
    } else {
        local.date()
    }
}
