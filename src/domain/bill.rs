//! Bills: scheduled payments tracked separately from expenses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A bill counts towards spending only once it is paid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: f64,
    #[serde(with = "iso_date")]
    pub due_date: NaiveDate,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub recurring: bool,
}

impl Bill {
    pub fn new(name: impl Into<String>, amount: f64, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.into(),
            amount,
            due_date,
            category: String::new(),
            is_paid: false,
            recurring: false,
        }
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn paid(mut self) -> Self {
        self.is_paid = true;
        self
    }

    pub fn repeating(mut self) -> Self {
        self.recurring = true;
        self
    }

    pub fn apply(&mut self, changes: &BillUpdate) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(amount) = changes.amount {
            self.amount = amount;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        if let Some(category) = &changes.category {
            self.category = category.clone();
        }
        if let Some(is_paid) = changes.is_paid {
            self.is_paid = is_paid;
        }
        if let Some(recurring) = changes.recurring {
            self.recurring = recurring;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BillUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso_date::option"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring: Option<bool>,
}

impl BillUpdate {
    pub fn mark_paid() -> Self {
        Self {
            is_paid: Some(true),
            ..Self::default()
        }
    }
}

impl Identifiable for Bill {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Bill {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Amounted for Bill {
    fn amount(&self) -> f64 {
        self.amount
    }
}

impl Dated for Bill {
    fn date(&self) -> NaiveDate {
        self.due_date
    }
}

impl Owned for Bill {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
}
