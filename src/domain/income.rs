//! Income records and their optional recurrence.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::CurrencyCode;
use crate::domain::common::*;
use crate::recurrence::{occurrences, RecurrenceRule};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IncomeKind {
    Salary,
    Recurring,
    #[default]
    OneTime,
}

impl fmt::Display for IncomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IncomeKind::Salary => "Salary",
            IncomeKind::Recurring => "Recurring",
            IncomeKind::OneTime => "One-time",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Income {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub source: String,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(rename = "type", default)]
    pub kind: IncomeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso_date::option"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub currency: CurrencyCode,
}

impl Income {
    /// A one-time income; the owner is assigned when the record is saved.
    pub fn new(amount: f64, source: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            amount,
            source: source.into(),
            date,
            kind: IncomeKind::OneTime,
            recurrence_rule: None,
            end_date: None,
            currency: CurrencyCode::default(),
        }
    }

    pub fn recurring(mut self, kind: IncomeKind, rule: RecurrenceRule) -> Self {
        self.kind = kind;
        self.recurrence_rule = Some(rule);
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn in_currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = currency;
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.kind != IncomeKind::OneTime && self.recurrence_rule.is_some()
    }

    /// Dates on which this income lands inside `window`.
    pub fn occurrences_in(&self, window: DateWindow) -> impl Iterator<Item = NaiveDate> {
        let projected = match self.recurrence_rule {
            Some(rule) if self.kind != IncomeKind::OneTime => {
                Some(occurrences(rule, self.date, self.end_date, window))
            }
            _ => None,
        };
        let single = if projected.is_none() && window.contains(self.date) {
            Some(self.date)
        } else {
            None
        };
        projected.into_iter().flatten().chain(single)
    }

    pub fn schedule_label(&self) -> String {
        match (&self.recurrence_rule, self.kind) {
            (Some(rule), kind) if kind != IncomeKind::OneTime => rule.describe(),
            _ => IncomeKind::OneTime.to_string(),
        }
    }
}

impl Identifiable for Income {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for Income {
    fn amount(&self) -> f64 {
        self.amount
    }
}

impl Dated for Income {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Owned for Income {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
}
