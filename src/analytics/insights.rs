//! Derived views built on the basic totals: trends, budget comparisons, and the
//! dashboard bundle.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{category_key, Bill, BudgetCategory, Expense, Income, Period, SavingGoal};

use super::{
    calculate_savings, expenses_by_category, expenses_by_type, overdue_bills, percent_of,
    saving_goal_progress, total_expenses, total_expenses_with_bills, total_income,
    upcoming_bills, NeedsWants,
};

/// Default share of monthly income recommended per bucket.
pub const RECOMMENDED_SPLIT: [(&str, f64); 4] = [
    ("Housing", 30.0),
    ("Transportation", 15.0),
    ("Food", 12.0),
    ("Savings", 20.0),
];

const SAVINGS_BUCKET: &str = "Savings";

/// Needs as a percentage of all categorized spending.
pub fn needs_share(expenses: &[Expense], period: Option<Period>) -> f64 {
    let split = expenses_by_type(expenses, period);
    percent_of(split.needs, split.total())
}

/// Spending per elapsed day of `period` as seen from `today`.
pub fn average_daily_spend(expenses: &[Expense], period: Period, today: NaiveDate) -> f64 {
    let elapsed = if period.contains(today) {
        today.day()
    } else if period.last_day() < today {
        period.days()
    } else {
        0
    };
    if elapsed == 0 {
        return 0.0;
    }
    total_expenses(expenses, Some(period)) / elapsed as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

/// Largest spending categories first; ties are ordered by name.
pub fn top_categories(
    expenses: &[Expense],
    period: Option<Period>,
    limit: usize,
) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = expenses_by_category(expenses, period)
        .into_iter()
        .map(|(category, amount)| CategoryTotal { category, amount })
        .collect();
    totals.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    totals.truncate(limit);
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    pub period: Period,
    pub income: f64,
    pub expenses: f64,
    pub savings: f64,
}

/// Figures for the `months` periods ending with `end`, oldest first.
pub fn monthly_trend(
    incomes: &[Income],
    expenses: &[Expense],
    end: Period,
    months: u32,
) -> Vec<MonthlyFigures> {
    (0..months)
        .rev()
        .map(|offset| {
            let period = end.shift(-(offset as i32));
            let income = total_income(incomes, Some(period));
            let spent = total_expenses(expenses, Some(period));
            MonthlyFigures {
                period,
                income,
                expenses: spent,
                savings: income - spent,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAverages {
    pub income: f64,
    pub expenses: f64,
    pub savings: f64,
}

impl TrendAverages {
    pub fn of(trend: &[MonthlyFigures]) -> Self {
        if trend.is_empty() {
            return Self::default();
        }
        let count = trend.len() as f64;
        let sum = trend.iter().fold(Self::default(), |mut acc, month| {
            acc.income += month.income;
            acc.expenses += month.expenses;
            acc.savings += month.savings;
            acc
        });
        Self {
            income: sum.income / count,
            expenses: sum.expenses / count,
            savings: sum.savings / count,
        }
    }
}

/// One row of a budget-versus-actual comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: String,
    pub allocated: f64,
    pub actual: f64,
    pub percentage: f64,
    pub over_budget: bool,
}

impl BudgetLine {
    fn new(category: impl Into<String>, allocated: f64, actual: f64) -> Self {
        Self {
            category: category.into(),
            allocated,
            actual,
            percentage: percent_of(actual, allocated),
            over_budget: actual > allocated,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.allocated - self.actual
    }
}

/// Compares each budget category's allocation with what was spent in `period`.
pub fn budget_vs_actual(
    categories: &[BudgetCategory],
    expenses: &[Expense],
    monthly_income: f64,
    period: Option<Period>,
) -> Vec<BudgetLine> {
    let spent = expenses_by_category(expenses, period);
    categories
        .iter()
        .map(|category| {
            let actual: f64 = spent
                .iter()
                .filter(|(name, _)| category.matches(name))
                .map(|(_, amount)| *amount)
                .sum();
            BudgetLine::new(
                category.name.clone(),
                category.allocation(monthly_income),
                actual,
            )
        })
        .collect()
}

/// The default income split, with the savings bucket measured as income minus spending.
pub fn recommended_budget(
    incomes: &[Income],
    expenses: &[Expense],
    period: Period,
) -> Vec<BudgetLine> {
    let monthly_income = total_income(incomes, Some(period));
    let spent = expenses_by_category(expenses, Some(period));
    RECOMMENDED_SPLIT
        .iter()
        .map(|(bucket, share)| {
            let allocated = monthly_income * share / 100.0;
            let actual = if *bucket == SAVINGS_BUCKET {
                calculate_savings(incomes, expenses, Some(period))
            } else {
                spent
                    .iter()
                    .filter(|(name, _)| category_key(name) == category_key(bucket))
                    .map(|(_, amount)| *amount)
                    .sum()
            };
            BudgetLine::new(*bucket, allocated, actual)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Income,
    Expense,
}

/// A single entry of the merged income/expense feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub date: NaiveDate,
}

impl Activity {
    /// Positive for income, negative for spending.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            ActivityKind::Income => self.amount,
            ActivityKind::Expense => -self.amount,
        }
    }
}

/// Newest incomes and expenses interleaved by date.
pub fn recent_activity(incomes: &[Income], expenses: &[Expense], limit: usize) -> Vec<Activity> {
    let mut feed: Vec<Activity> = incomes
        .iter()
        .map(|income| Activity {
            kind: ActivityKind::Income,
            description: income.source.clone(),
            category: "Income".into(),
            amount: income.amount,
            date: income.date,
        })
        .chain(expenses.iter().map(|expense| Activity {
            kind: ActivityKind::Expense,
            description: expense.description.clone(),
            category: expense.category.clone(),
            amount: expense.amount,
            date: expense.date,
        }))
        .collect();
    feed.sort_by(|a, b| b.date.cmp(&a.date));
    feed.truncate(limit);
    feed
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalsOverview {
    pub completed: usize,
    pub active: usize,
    pub total_saved: f64,
    pub total_target: f64,
    pub overall_progress: f64,
}

pub fn goals_overview(goals: &[SavingGoal]) -> GoalsOverview {
    let mut overview = GoalsOverview::default();
    for goal in goals {
        if saving_goal_progress(goal) >= 100.0 {
            overview.completed += 1;
        } else {
            overview.active += 1;
        }
        overview.total_saved += goal.current_amount;
        overview.total_target += goal.target_amount;
    }
    overview.overall_progress = percent_of(overview.total_saved, overview.total_target);
    overview
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BillsOverview {
    pub total_amount: f64,
    pub paid: usize,
    pub upcoming: usize,
    pub overdue: usize,
}

pub fn bills_overview(bills: &[Bill], today: NaiveDate, days_ahead: u32) -> BillsOverview {
    BillsOverview {
        total_amount: bills.iter().map(|bill| bill.amount).sum(),
        paid: bills.iter().filter(|bill| bill.is_paid).count(),
        upcoming: upcoming_bills(bills, today, days_ahead).len(),
        overdue: overdue_bills(bills, today).len(),
    }
}

/// Everything the monthly overview needs, derived in one pass over the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub period: Period,
    pub income: f64,
    pub expenses: f64,
    pub expenses_with_bills: f64,
    pub savings: f64,
    pub total_saved: f64,
    pub needs_wants: NeedsWants,
    pub top_categories: Vec<CategoryTotal>,
    pub upcoming_bills: Vec<Bill>,
    pub overdue_bills: Vec<Bill>,
    pub goals: GoalsOverview,
}

pub struct DashboardInput<'a> {
    pub incomes: &'a [Income],
    pub expenses: &'a [Expense],
    pub bills: &'a [Bill],
    pub goals: &'a [SavingGoal],
}

pub fn dashboard(
    input: &DashboardInput<'_>,
    period: Period,
    today: NaiveDate,
    days_ahead: u32,
) -> DashboardSummary {
    let scope = Some(period);
    let goals = goals_overview(input.goals);
    DashboardSummary {
        period,
        income: total_income(input.incomes, scope),
        expenses: total_expenses(input.expenses, scope),
        expenses_with_bills: total_expenses_with_bills(input.expenses, input.bills, scope),
        savings: calculate_savings(input.incomes, input.expenses, scope),
        total_saved: goals.total_saved,
        needs_wants: expenses_by_type(input.expenses, scope),
        top_categories: top_categories(input.expenses, scope, 5),
        upcoming_bills: upcoming_bills(input.bills, today, days_ahead)
            .into_iter()
            .cloned()
            .collect(),
        overdue_bills: overdue_bills(input.bills, today).into_iter().cloned().collect(),
        goals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExpenseKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn average_daily_spend_uses_elapsed_days() {
        let period = Period::new(2024, 1).unwrap();
        let expenses = vec![Expense::new(310.0, "Food", date(2024, 1, 2), ExpenseKind::Need)];
        assert_eq!(average_daily_spend(&expenses, period, date(2024, 1, 10)), 31.0);
        assert_eq!(average_daily_spend(&expenses, period, date(2024, 3, 1)), 10.0);
        assert_eq!(average_daily_spend(&expenses, period, date(2023, 12, 31)), 0.0);
    }

    #[test]
    fn needs_share_is_zero_without_spending() {
        assert_eq!(needs_share(&[], None), 0.0);
    }

    #[test]
    fn trend_is_oldest_first_and_spans_years() {
        let incomes = vec![Income::new(500.0, "Gig", date(2023, 12, 3))];
        let trend = monthly_trend(&incomes, &[], Period::new(2024, 2).unwrap(), 3);
        let periods: Vec<String> = trend.iter().map(|m| m.period.to_string()).collect();
        assert_eq!(periods, vec!["2023-12", "2024-01", "2024-02"]);
        assert_eq!(trend[0].savings, 500.0);
        let averages = TrendAverages::of(&trend);
        assert!((averages.income - 500.0 / 3.0).abs() < 1e-9);
        assert_eq!(TrendAverages::of(&[]), TrendAverages::default());
    }

    #[test]
    fn top_categories_are_sorted_and_truncated() {
        let day = date(2024, 1, 5);
        let expenses = vec![
            Expense::new(5.0, "Books", day, ExpenseKind::Want),
            Expense::new(50.0, "Rent", day, ExpenseKind::Need),
            Expense::new(20.0, "Food", day, ExpenseKind::Need),
        ];
        let top = top_categories(&expenses, None, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].category, "Rent");
        assert_eq!(top[1].category, "Food");
    }

    #[test]
    fn recent_activity_merges_newest_first() {
        let incomes = vec![Income::new(100.0, "Salary", date(2024, 1, 1))];
        let expenses = vec![
            Expense::new(10.0, "Food", date(2024, 1, 3), ExpenseKind::Need).described("Lunch"),
        ];
        let feed = recent_activity(&incomes, &expenses, 5);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].kind, ActivityKind::Expense);
        assert_eq!(feed[0].signed_amount(), -10.0);
        assert_eq!(feed[1].category, "Income");
    }

    #[test]
    fn goals_overview_counts_completed_goals() {
        let goals = vec![
            SavingGoal::new("Trip", 1000.0, date(2024, 6, 1)).with_saved(1000.0),
            SavingGoal::new("Car", 3000.0, date(2025, 6, 1)).with_saved(500.0),
        ];
        let overview = goals_overview(&goals);
        assert_eq!(overview.completed, 1);
        assert_eq!(overview.active, 1);
        assert_eq!(overview.total_saved, 1500.0);
        assert_eq!(overview.overall_progress, 37.5);
    }
}
