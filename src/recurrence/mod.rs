//! Declarative recurrence rules for income and their lazy projection into dates.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::common::{clamped_date, DateWindow, Period};
use crate::domain::income::Income;

/// Cadence attached to an income record. Anchors are optional; when absent the
/// series start date supplies the weekday / day of month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "lowercase")]
pub enum RecurrenceRule {
    Daily,
    Weekly {
        #[serde(
            rename = "day_of_week",
            default,
            skip_serializing_if = "Option::is_none",
            with = "sunday_index"
        )]
        weekday: Option<Weekday>,
    },
    Monthly {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        day_of_month: Option<u32>,
    },
    Yearly,
}

impl RecurrenceRule {
    pub fn weekly_on(weekday: Weekday) -> Self {
        RecurrenceRule::Weekly {
            weekday: Some(weekday),
        }
    }

    /// Days past the month length clamp to its last day.
    pub fn monthly_on(day_of_month: u32) -> Self {
        RecurrenceRule::Monthly {
            day_of_month: Some(day_of_month.clamp(1, 31)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RecurrenceRule::Daily => "Daily".into(),
            RecurrenceRule::Weekly { weekday: None } => "Weekly".into(),
            RecurrenceRule::Weekly {
                weekday: Some(weekday),
            } => format!("Weekly on {}", weekday_name(*weekday)),
            RecurrenceRule::Monthly { day_of_month: None } => "Monthly".into(),
            RecurrenceRule::Monthly {
                day_of_month: Some(day),
            } => format!("Monthly on day {}", day),
            RecurrenceRule::Yearly => "Yearly".into(),
        }
    }

    /// Open-ended (or `end`-bounded) schedule starting at `start`.
    pub fn schedule(&self, start: NaiveDate, end: Option<NaiveDate>) -> Occurrences {
        Occurrences::new(*self, start, start, end)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Occurrence dates of `rule` from `start` (until `end`, if set) that fall in `window`.
pub fn occurrences(
    rule: RecurrenceRule,
    start: NaiveDate,
    end: Option<NaiveDate>,
    window: DateWindow,
) -> Occurrences {
    let upper = match end {
        Some(end) => end.min(window.end),
        None => window.end,
    };
    Occurrences::new(rule, start, window.start.max(start), Some(upper))
}

/// Lazy iterator over the dates of a recurring series.
///
/// The n-th date is computed from the first one rather than the previous one, so
/// a monthly series anchored on the 31st returns to the 31st after February.
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: RecurrenceRule,
    first: Option<NaiveDate>,
    anchor_day: u32,
    index: u32,
    upper: Option<NaiveDate>,
}

impl Occurrences {
    fn new(
        rule: RecurrenceRule,
        start: NaiveDate,
        lower: NaiveDate,
        upper: Option<NaiveDate>,
    ) -> Self {
        let anchor_day = match rule {
            RecurrenceRule::Monthly {
                day_of_month: Some(day),
            } => day,
            _ => start.day(),
        };
        let first = first_occurrence(rule, start, anchor_day);
        let mut occurrences = Self {
            rule,
            first,
            anchor_day,
            index: 0,
            upper,
        };
        occurrences.skip_before(lower);
        occurrences
    }

    fn nth_date(&self, index: u32) -> Option<NaiveDate> {
        let first = self.first?;
        match self.rule {
            RecurrenceRule::Daily => first.checked_add_signed(Duration::days(index as i64)),
            RecurrenceRule::Weekly { .. } => {
                first.checked_add_signed(Duration::weeks(index as i64))
            }
            RecurrenceRule::Monthly { .. } => {
                let period = Period::containing(first).shift(index as i32);
                clamped_date(period.year(), period.month(), self.anchor_day)
            }
            RecurrenceRule::Yearly => {
                clamped_date(first.year() + index as i32, first.month(), self.anchor_day)
            }
        }
    }

    fn skip_before(&mut self, lower: NaiveDate) {
        let Some(first) = self.first else {
            return;
        };
        if lower <= first {
            return;
        }
        let gap = (lower - first).num_days();
        self.index = match self.rule {
            RecurrenceRule::Daily => gap as u32,
            RecurrenceRule::Weekly { .. } => ((gap + 6) / 7) as u32,
            RecurrenceRule::Monthly { .. } => {
                let months = (lower.year() - first.year()) * 12 + lower.month() as i32
                    - first.month() as i32;
                (months - 1).max(0) as u32
            }
            RecurrenceRule::Yearly => (lower.year() - first.year() - 1).max(0) as u32,
        };
        while let Some(date) = self.nth_date(self.index) {
            if date >= lower {
                break;
            }
            self.index += 1;
        }
    }
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let date = self.nth_date(self.index)?;
        if let Some(upper) = self.upper {
            if date > upper {
                self.first = None;
                return None;
            }
        }
        self.index += 1;
        Some(date)
    }
}

fn first_occurrence(rule: RecurrenceRule, start: NaiveDate, anchor_day: u32) -> Option<NaiveDate> {
    match rule {
        RecurrenceRule::Daily | RecurrenceRule::Yearly => Some(start),
        RecurrenceRule::Weekly { weekday: None } => Some(start),
        RecurrenceRule::Weekly {
            weekday: Some(weekday),
        } => {
            let delta = (weekday.num_days_from_monday() as i64
                - start.weekday().num_days_from_monday() as i64)
                .rem_euclid(7);
            start.checked_add_signed(Duration::days(delta))
        }
        RecurrenceRule::Monthly { .. } => {
            let candidate = clamped_date(start.year(), start.month(), anchor_day)?;
            if candidate >= start {
                Some(candidate)
            } else {
                let next = Period::containing(start).next();
                clamped_date(next.year(), next.month(), anchor_day)
            }
        }
    }
}

/// Sum of every occurrence of every income inside `window`.
pub fn projected_income(incomes: &[Income], window: DateWindow) -> f64 {
    incomes
        .iter()
        .map(|income| income.amount * income.occurrences_in(window).count() as f64)
        .sum()
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Weekdays stored as `0 = Sunday … 6 = Saturday`.
mod sunday_index {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Option<Weekday>, serializer: S) -> Result<S::Ok, S::Error> {
        match day {
            Some(day) => serializer.serialize_u8(day.num_days_from_sunday() as u8),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Weekday>, D::Error> {
        let raw = Option::<u8>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(index) => match index {
                0 => Ok(Some(Weekday::Sun)),
                1 => Ok(Some(Weekday::Mon)),
                2 => Ok(Some(Weekday::Tue)),
                3 => Ok(Some(Weekday::Wed)),
                4 => Ok(Some(Weekday::Thu)),
                5 => Ok(Some(Weekday::Fri)),
                6 => Ok(Some(Weekday::Sat)),
                other => Err(de::Error::custom(format!(
                    "day_of_week must be 0-6, got {}",
                    other
                ))),
            },
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
    fn weekly_rule_starts_on_next_matching_weekday() {
        // 2024-01-03 is a Wednesday.
        let dates: Vec<_> = RecurrenceRule::weekly_on(Weekday::Fri)
            .schedule(date(2024, 1, 3), None)
            .take(2)
            .collect();
        assert_eq!(dates, vec![date(2024, 1, 5), date(2024, 1, 12)]);
    }

    #[test]
    fn monthly_anchor_clamps_without_drifting() {
        let dates: Vec<_> = RecurrenceRule::monthly_on(31)
            .schedule(date(2024, 1, 1), Some(date(2024, 4, 30)))
            .collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 31),
                date(2024, 4, 30)
            ]
        );
    }

    #[test]
    fn monthly_anchor_before_start_moves_to_next_month() {
        let first = RecurrenceRule::monthly_on(5)
            .schedule(date(2024, 1, 20), None)
            .next();
        assert_eq!(first, Some(date(2024, 2, 5)));
    }

    #[test]
    fn yearly_leap_day_clamps_in_common_years() {
        let dates: Vec<_> = RecurrenceRule::Yearly
            .schedule(date(2024, 2, 29), Some(date(2028, 12, 31)))
            .collect();
        assert_eq!(dates[1], date(2025, 2, 28));
        assert_eq!(dates[4], date(2028, 2, 29));
        assert_eq!(dates.len(), 5);
    }

    #[test]
    fn window_skips_to_first_inner_occurrence() {
        let window = DateWindow::new(date(2024, 3, 10), date(2024, 3, 20)).unwrap();
        let dates: Vec<_> = occurrences(RecurrenceRule::Daily, date(2024, 1, 1), None, window)
            .collect();
        assert_eq!(dates.len(), 11);
        assert_eq!(dates[0], date(2024, 3, 10));
        assert_eq!(*dates.last().unwrap(), date(2024, 3, 20));
    }

    #[test]
    fn end_date_before_window_yields_nothing() {
        let window = DateWindow::new(date(2024, 6, 1), date(2024, 6, 30)).unwrap();
        let count = occurrences(
            RecurrenceRule::monthly_on(1),
            date(2024, 1, 1),
            Some(date(2024, 3, 1)),
            window,
        )
        .count();
        assert_eq!(count, 0);
    }

    #[test]
    fn rule_serializes_as_tagged_frequency() {
        let rule = RecurrenceRule::weekly_on(Weekday::Sun);
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json, serde_json::json!({"frequency": "weekly", "day_of_week": 0}));
        let parsed: RecurrenceRule =
            serde_json::from_str(r#"{"frequency":"monthly","day_of_month":15}"#).unwrap();
        assert_eq!(parsed.describe(), "Monthly on day 15");
        assert!(serde_json::from_str::<RecurrenceRule>(r#"{"frequency":"weekly","day_of_week":9}"#).is_err());
    }
}
