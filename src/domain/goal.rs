//! Savings goals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(with = "iso_date")]
    pub target_date: NaiveDate,
}

impl SavingGoal {
    pub fn new(name: impl Into<String>, target_amount: f64, target_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.into(),
            target_amount,
            current_amount: 0.0,
            target_date,
        }
    }

    pub fn with_saved(mut self, current_amount: f64) -> Self {
        self.current_amount = current_amount;
        self
    }

    pub fn apply(&mut self, changes: &SavingGoalUpdate) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(target_amount) = changes.target_amount {
            self.target_amount = target_amount;
        }
        if let Some(current_amount) = changes.current_amount {
            self.current_amount = current_amount;
        }
        if let Some(target_date) = changes.target_date {
            self.target_date = target_date;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SavingGoalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_amount: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso_date::option"
    )]
    pub target_date: Option<NaiveDate>,
}

impl Identifiable for SavingGoal {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for SavingGoal {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Owned for SavingGoal {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
}
