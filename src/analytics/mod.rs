//! Financial aggregation over already-fetched records.
//!
//! Every function here is pure: the reference date or period is always passed in,
//! empty inputs produce zero or empty results, and nothing returns an error.
//! Category names are compared case-insensitively after trimming (see
//! [`category_key`]).

pub mod insights;

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{
    category_key, Amounted, Bill, Dated, Expense, ExpenseKind, Income, Period, SavingGoal,
};

pub use crate::currency::format_currency;
pub use insights::*;

/// Look-ahead used for upcoming bills when the caller has no preference.
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;

fn in_period<T: Dated>(record: &T, period: Option<Period>) -> bool {
    period.map_or(true, |period| period.contains(record.date()))
}

fn sum_in_period<T: Amounted + Dated>(records: &[T], period: Option<Period>) -> f64 {
    records
        .iter()
        .filter(|record| in_period(*record, period))
        .map(Amounted::amount)
        .sum()
}

/// Sum of income amounts, for all time or a single month.
pub fn total_income(incomes: &[Income], period: Option<Period>) -> f64 {
    sum_in_period(incomes, period)
}

pub fn total_expenses(expenses: &[Expense], period: Option<Period>) -> f64 {
    sum_in_period(expenses, period)
}

/// Sum of paid bills, filtered on the due date when a period is given.
pub fn total_paid_bills(bills: &[Bill], period: Option<Period>) -> f64 {
    bills
        .iter()
        .filter(|bill| bill.is_paid && in_period(*bill, period))
        .map(|bill| bill.amount)
        .sum()
}

pub fn total_expenses_with_bills(
    expenses: &[Expense],
    bills: &[Bill],
    period: Option<Period>,
) -> f64 {
    total_expenses(expenses, period) + total_paid_bills(bills, period)
}

/// Spending per category. Spellings that differ only by case share one entry,
/// labelled with the first spelling encountered.
pub fn expenses_by_category(expenses: &[Expense], period: Option<Period>) -> BTreeMap<String, f64> {
    let mut labels: HashMap<String, String> = HashMap::new();
    let mut totals = BTreeMap::new();
    for expense in expenses.iter().filter(|expense| in_period(*expense, period)) {
        let label = labels
            .entry(category_key(&expense.category))
            .or_insert_with(|| expense.category.trim().to_string())
            .clone();
        *totals.entry(label).or_insert(0.0) += expense.amount;
    }
    totals
}

/// Spending split by need/want classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NeedsWants {
    pub needs: f64,
    pub wants: f64,
}

impl NeedsWants {
    pub fn total(&self) -> f64 {
        self.needs + self.wants
    }
}

pub fn expenses_by_type(expenses: &[Expense], period: Option<Period>) -> NeedsWants {
    expenses
        .iter()
        .filter(|expense| in_period(*expense, period))
        .fold(NeedsWants::default(), |mut acc, expense| {
            match expense.kind {
                ExpenseKind::Need => acc.needs += expense.amount,
                ExpenseKind::Want => acc.wants += expense.amount,
            }
            acc
        })
}

/// Unpaid bills due between `today` and `today + days_ahead`, inclusive, soonest first.
pub fn upcoming_bills(bills: &[Bill], today: NaiveDate, days_ahead: u32) -> Vec<&Bill> {
    let horizon = today
        .checked_add_signed(Duration::days(days_ahead as i64))
        .unwrap_or(NaiveDate::MAX);
    let mut upcoming: Vec<&Bill> = bills
        .iter()
        .filter(|bill| !bill.is_paid && bill.due_date >= today && bill.due_date <= horizon)
        .collect();
    upcoming.sort_by_key(|bill| bill.due_date);
    upcoming
}

/// Unpaid bills whose due date is strictly before `today`, oldest first.
pub fn overdue_bills(bills: &[Bill], today: NaiveDate) -> Vec<&Bill> {
    let mut overdue: Vec<&Bill> = bills
        .iter()
        .filter(|bill| !bill.is_paid && bill.due_date < today)
        .collect();
    overdue.sort_by_key(|bill| bill.due_date);
    overdue
}

pub fn calculate_savings(incomes: &[Income], expenses: &[Expense], period: Option<Period>) -> f64 {
    total_income(incomes, period) - total_expenses(expenses, period)
}

/// Percentage of `whole` represented by `part`; zero when `whole` is not positive.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 && whole.is_finite() {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Progress towards the goal in percent, capped at 100. A non-positive target reads as 0.
pub fn saving_goal_progress(goal: &SavingGoal) -> f64 {
    percent_of(goal.current_amount, goal.target_amount).clamp(0.0, 100.0)
}

/// Whole days from `today` until the goal's target date; negative once it has passed.
pub fn days_until_goal(goal: &SavingGoal, today: NaiveDate) -> i64 {
    (goal.target_date - today).num_days()
}
