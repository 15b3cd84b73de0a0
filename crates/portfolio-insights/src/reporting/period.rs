use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A concrete reporting interval, inclusive on both bounds. Starts are
/// normalized to start-of-day and ends to end-of-day; a `Period` is never
/// mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start_of_day(start),
            end: end_of_day(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start.date() && date <= self.end.date()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start.date(), self.end.date())
    }
}

/// Supported timeframe codes for the owner dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    CurrentMonth,
    PreviousMonth,
    YearToDate,
    Last30Days,
    Last7Days,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownTimeframe(pub String);

impl fmt::Display for UnknownTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown timeframe code '{}'", self.0)
    }
}

impl std::error::Error for UnknownTimeframe {}

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cm" => Ok(Self::CurrentMonth),
            "pm" => Ok(Self::PreviousMonth),
            "ytd" => Ok(Self::YearToDate),
            "l30" => Ok(Self::Last30Days),
            "l7" => Ok(Self::Last7Days),
            other => Err(UnknownTimeframe(other.to_string())),
        }
    }
}

impl Timeframe {
    pub const fn as_code(self) -> &'static str {
        match self {
            Self::CurrentMonth => "cm",
            Self::PreviousMonth => "pm",
            Self::YearToDate => "ytd",
            Self::Last30Days => "l30",
            Self::Last7Days => "l7",
        }
    }

    /// Resolve the timeframe into a concrete interval. `cm`/`ytd`/`l30`/`l7`
    /// anchor the end bound at "now" (end-of-day); `pm` is the full previous
    /// calendar month regardless of now's day-of-month.
    pub fn resolve(self, now: NaiveDateTime) -> Period {
        let today = now.date();
        match self {
            Self::CurrentMonth => Period::from_dates(first_of_month(today), today),
            Self::PreviousMonth => previous_month(today),
            Self::YearToDate => Period::from_dates(first_of_year(today), today),
            Self::Last30Days => rolling_window(today, 30),
            Self::Last7Days => rolling_window(today, 7),
        }
    }

    /// The comparison baseline for the resolved period: the immediately
    /// preceding equal-length window for rolling codes, and the equivalent
    /// day-of-month range one month (or year) back for calendar codes, with
    /// shorter months clamped.
    pub fn prior(self, now: NaiveDateTime) -> Period {
        let today = now.date();
        match self {
            Self::CurrentMonth => {
                let (year, month) = previous_year_month(today);
                let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
                Period::from_dates(start, clamped_day(year, month, today.day()))
            }
            Self::PreviousMonth => {
                let (year, month) = previous_year_month(first_of_month(today));
                let anchor = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
                previous_month(anchor)
            }
            Self::YearToDate => {
                let year = today.year() - 1;
                let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today);
                Period::from_dates(start, clamped_day(year, today.month(), today.day()))
            }
            Self::Last30Days => preceding_window(today, 30),
            Self::Last7Days => preceding_window(today, 7),
        }
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap_or_default()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

fn previous_year_month(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|date| date.pred_opt())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap_or_default())
}

/// Day-of-month arithmetic clamped to the target month's length, so asking
/// for day 31 of a 30-day month resolves to day 30.
fn clamped_day(year: i32, month: u32, day: u32) -> NaiveDate {
    let last = last_day_of_month(year, month);
    NaiveDate::from_ymd_opt(year, month, day.min(last.day())).unwrap_or(last)
}

fn previous_month(anchor: NaiveDate) -> Period {
    let (year, month) = previous_year_month(anchor);
    let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(anchor);
    Period::from_dates(start, last_day_of_month(year, month))
}

fn rolling_window(end: NaiveDate, days: i64) -> Period {
    Period::from_dates(end - Duration::days(days - 1), end)
}

fn preceding_window(end: NaiveDate, days: i64) -> Period {
    let current_start = end - Duration::days(days - 1);
    Period::from_dates(current_start - Duration::days(days), current_start - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .expect("valid date")
            .and_hms_opt(14, 30, 0)
            .expect("valid time")
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn codes_round_trip() {
        for timeframe in [
            Timeframe::CurrentMonth,
            Timeframe::PreviousMonth,
            Timeframe::YearToDate,
            Timeframe::Last30Days,
            Timeframe::Last7Days,
        ] {
            assert_eq!(timeframe.as_code().parse::<Timeframe>(), Ok(timeframe));
        }
        assert!("quarterly".parse::<Timeframe>().is_err());
    }

    #[test]
    fn current_month_anchors_end_at_now() {
        let period = Timeframe::CurrentMonth.resolve(at(2026, 8, 19));
        assert_eq!(period.start.date(), date(2026, 8, 1));
        assert_eq!(period.end.date(), date(2026, 8, 19));
        assert_eq!(period.end.time(), chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn previous_month_ignores_day_of_now() {
        for day in [1, 15, 31] {
            let period = Timeframe::PreviousMonth.resolve(at(2026, 3, day));
            assert_eq!(period.start.date(), date(2026, 2, 1));
            assert_eq!(period.end.date(), date(2026, 2, 28));
        }
    }

    #[test]
    fn previous_month_crosses_year_boundary() {
        let period = Timeframe::PreviousMonth.resolve(at(2026, 1, 10));
        assert_eq!(period.start.date(), date(2025, 12, 1));
        assert_eq!(period.end.date(), date(2025, 12, 31));
    }

    #[test]
    fn rolling_windows_span_exactly_their_length() {
        let period = Timeframe::Last7Days.resolve(at(2026, 8, 19));
        assert_eq!(period.start.date(), date(2026, 8, 13));
        assert_eq!(period.end.date(), date(2026, 8, 19));

        let period = Timeframe::Last30Days.resolve(at(2026, 8, 19));
        assert_eq!(period.start.date(), date(2026, 7, 21));
    }

    #[test]
    fn prior_rolling_window_immediately_precedes_current() {
        let current = Timeframe::Last7Days.resolve(at(2026, 8, 19));
        let prior = Timeframe::Last7Days.prior(at(2026, 8, 19));
        assert_eq!(prior.end.date(), current.start.date() - Duration::days(1));
        assert_eq!(prior.start.date(), date(2026, 8, 6));
    }

    #[test]
    fn prior_current_month_clamps_short_months() {
        // March 31 compared against February: day clamps to the 28th.
        let prior = Timeframe::CurrentMonth.prior(at(2026, 3, 31));
        assert_eq!(prior.start.date(), date(2026, 2, 1));
        assert_eq!(prior.end.date(), date(2026, 2, 28));

        // Leap year keeps the 29th.
        let prior = Timeframe::CurrentMonth.prior(at(2028, 3, 31));
        assert_eq!(prior.end.date(), date(2028, 2, 29));

        // 31st against a 30-day month resolves to the 30th.
        let prior = Timeframe::CurrentMonth.prior(at(2026, 5, 31));
        assert_eq!(prior.end.date(), date(2026, 4, 30));
    }

    #[test]
    fn ytd_prior_is_same_span_last_year() {
        let prior = Timeframe::YearToDate.prior(at(2026, 8, 19));
        assert_eq!(prior.start.date(), date(2025, 1, 1));
        assert_eq!(prior.end.date(), date(2025, 8, 19));
    }

    #[test]
    fn custom_periods_are_inclusive_on_both_bounds() {
        let period = Period::from_dates(date(2026, 8, 1), date(2026, 8, 15));
        assert!(period.contains(date(2026, 8, 1)));
        assert!(period.contains(date(2026, 8, 15)));
        assert!(!period.contains(date(2026, 7, 31)));
        assert!(!period.contains(date(2026, 8, 16)));
    }
}
