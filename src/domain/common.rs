//! Shared traits, calendar helpers, and period types for budgeting records.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BudgetError;

/// Exposes a stable identifier for records stored in the backend.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides read-only access to a record's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Supplies a common contract for retrieving monetary amounts.
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// The calendar date a record counts towards when aggregating by period.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// Records scoped to a single owning user.
pub trait Owned {
    fn user_id(&self) -> Uuid;
}

/// A calendar month. Months are 1-based (`1` is January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawPeriod> for Period {
    type Error = BudgetError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::new(raw.year, raw.month)
    }
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, BudgetError> {
        if !(1..=12).contains(&month) {
            return Err(BudgetError::InvalidInput(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        first_of_month(self.year, self.month)
    }

    pub fn last_day(&self) -> NaiveDate {
        first_of_month(self.year, self.month)
            .with_day(days_in_month(self.year, self.month))
            .unwrap_or_else(|| first_of_month(self.year, self.month))
    }

    pub fn days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn previous(&self) -> Self {
        self.shift(-1)
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    /// Moves the period by `months`, crossing year boundaries as needed.
    pub fn shift(&self, months: i32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.first_day(),
            end: self.last_day(),
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{} {}",
            crate::currency::month_label(self.month),
            self.year
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive date range used for projections and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BudgetError> {
        if end < start {
            return Err(BudgetError::InvalidInput(format!(
                "window end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering `days` days starting at `start`, capped at the last
    /// representable date.
    pub fn from_start(start: NaiveDate, days: u32) -> Self {
        Self {
            start,
            end: start
                .checked_add_signed(Duration::days(days as i64))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1) {
        Some(first_next) => (first_next - Duration::days(1)).day(),
        None => 31,
    }
}

/// Builds `year-month-day`, clamping `day` to the month length.
pub(crate) fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Serde adapter for dates exchanged as ISO-8601 strings.
///
/// Accepts plain dates (`2024-01-05`) and full timestamps; timestamps with an
/// offset are converted to the local calendar date.
pub mod iso_date {
    use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 date `{}`", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(stamp.with_timezone(&Local).date_naive());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.date())
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    de::Error::custom(format!("invalid ISO-8601 date `{}`", raw))
                }),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_rejects_out_of_range_month() {
        assert!(Period::new(2024, 0).is_err());
        assert!(Period::new(2024, 13).is_err());
    }

    #[test]
    fn period_shift_crosses_years() {
        let jan = Period::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), Period::new(2023, 12).unwrap());
        assert_eq!(jan.shift(14), Period::new(2025, 3).unwrap());
    }

    #[test]
    fn period_bounds_follow_month_length() {
        let feb = Period::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), date(2024, 2, 29));
        assert_eq!(feb.days(), 29);
        assert!(feb.contains(date(2024, 2, 1)));
        assert!(!feb.contains(date(2023, 2, 1)));
    }

    #[test]
    fn deserialized_period_is_validated() {
        let parsed: Period = serde_json::from_str(r#"{"year":2024,"month":2}"#).unwrap();
        assert_eq!(parsed, Period::new(2024, 2).unwrap());
        assert!(serde_json::from_str::<Period>(r#"{"year":2024,"month":13}"#).is_err());
        assert!(serde_json::from_str::<Period>(r#"{"year":2024,"month":0}"#).is_err());
    }

    #[test]
    fn window_from_start_saturates_at_max_date() {
        let window = DateWindow::from_start(date(2024, 3, 10), u32::MAX);
        assert_eq!(window.end, NaiveDate::MAX);
        let week = DateWindow::from_start(date(2024, 3, 10), 7);
        assert_eq!(week.end, date(2024, 3, 17));
    }

    #[test]
    fn window_rejects_reversed_bounds() {
        assert!(DateWindow::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn iso_dates_accept_timestamps() {
        assert_eq!(iso_date::parse("2024-01-05"), Some(date(2024, 1, 5)));
        assert_eq!(
            iso_date::parse("2024-01-05T10:30:00.000"),
            Some(date(2024, 1, 5))
        );
        assert!(iso_date::parse("05/01/2024").is_none());
    }
}
