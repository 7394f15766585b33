//! Expense records, their need/want classification, and priorities.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// Essential versus discretionary spending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    #[default]
    Need,
    Want,
}

impl fmt::Display for ExpenseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExpenseKind::Need => "Need",
            ExpenseKind::Want => "Want",
        };
        f.write_str(label)
    }
}

/// Ordinal priority stored as `1` (highest) through `3`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(format!("priority must be between 1 and 3, got {}", other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        match value {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: ExpenseKind,
    #[serde(default)]
    pub priority: Priority,
}

impl Expense {
    pub fn new(
        amount: f64,
        category: impl Into<String>,
        date: NaiveDate,
        kind: ExpenseKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            amount,
            category: category.into(),
            description: String::new(),
            date,
            kind,
            priority: Priority::default(),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Applies the fields present in `changes`.
    pub fn apply(&mut self, changes: &ExpenseUpdate) {
        if let Some(amount) = changes.amount {
            self.amount = amount;
        }
        if let Some(category) = &changes.category {
            self.category = category.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(date) = changes.date {
            self.date = date;
        }
        if let Some(kind) = changes.kind {
            self.kind = kind;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
    }
}

/// Partial update for an expense; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExpenseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso_date::option"
    )]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ExpenseKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for Expense {
    fn amount(&self) -> f64 {
        self.amount
    }
}

impl Dated for Expense {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Owned for Expense {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
}
