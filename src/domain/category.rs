//! Budget categories: user-defined buckets compared against actual spending.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;
use crate::domain::expense::ExpenseKind;

/// A spending bucket with either a flat budget or a share of monthly income.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetCategory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_amount: Option<f64>,
    #[serde(default)]
    pub income_percentage: f64,
    #[serde(rename = "type")]
    pub kind: ExpenseKind,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#6B7280".into()
}

impl BudgetCategory {
    pub fn new(name: impl Into<String>, income_percentage: f64, kind: ExpenseKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.into(),
            budget_amount: None,
            income_percentage,
            kind,
            color: default_color(),
        }
    }

    pub fn with_budget(mut self, amount: f64) -> Self {
        self.budget_amount = Some(amount);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Flat budget when set, otherwise the income share.
    pub fn allocation(&self, monthly_income: f64) -> f64 {
        match self.budget_amount {
            Some(amount) => amount,
            None => monthly_income * self.income_percentage / 100.0,
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        category_key(&self.name) == category_key(category)
    }
}

/// Normalized form used whenever category names are compared or grouped.
pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Identifiable for BudgetCategory {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for BudgetCategory {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Owned for BudgetCategory {
    fn user_id(&self) -> Uuid {
        self.user_id
    }
}
