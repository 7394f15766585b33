mod common;

use budget_tracker::{
    analytics::{
        bills_overview, budget_vs_actual, calculate_savings, dashboard, expenses_by_category, expenses_by_type,
        format_currency, goals_overview, monthly_trend, overdue_bills, recent_activity,
        recommended_budget, saving_goal_progress, total_expenses, total_expenses_with_bills,
        total_income, upcoming_bills, ActivityKind, DashboardInput, TrendAverages,
        DEFAULT_UPCOMING_DAYS,
    },
    domain::{Bill, BudgetCategory, Expense, ExpenseKind, Income, Period, SavingGoal},
};
use common::date;

fn january() -> Period {
    Period::new(2024, 1).unwrap()
}

fn sample_expenses() -> Vec<Expense> {
    vec![
        Expense::new(200.0, "Food", date(2024, 1, 5), ExpenseKind::Need),
        Expense::new(100.0, "Fun", date(2024, 1, 20), ExpenseKind::Want),
        Expense::new(50.0, "Food", date(2023, 12, 31), ExpenseKind::Need),
    ]
}

#[test]
fn january_income_and_savings() {
    let incomes = vec![Income::new(1000.0, "Salary", date(2024, 1, 15))];
    let expenses = sample_expenses();
    let period = Some(january());

    assert_eq!(total_income(&incomes, period), 1000.0);
    assert_eq!(total_expenses(&expenses, period), 300.0);
    assert_eq!(calculate_savings(&incomes, &expenses, period), 700.0);
    assert_eq!(calculate_savings(&incomes, &expenses, None), 650.0);
}

#[test]
fn category_and_type_splits_sum_to_the_total() {
    let expenses = sample_expenses();
    for period in [None, Some(january())] {
        let by_category: f64 = expenses_by_category(&expenses, period).values().sum();
        let split = expenses_by_type(&expenses, period);
        let total = total_expenses(&expenses, period);
        assert!((by_category - total).abs() < 1e-9);
        assert!((split.total() - total).abs() < 1e-9);
    }
}

#[test]
fn bill_due_in_three_days_is_upcoming_but_not_overdue() {
    let today = date(2024, 3, 10);
    let bills = vec![
        Bill::new("Internet", 45.0, date(2024, 3, 13)),
        Bill::new("Rent", 900.0, date(2024, 3, 8)),
        Bill::new("Gym", 30.0, date(2024, 3, 12)).paid(),
        Bill::new("Insurance", 120.0, date(2024, 3, 25)),
    ];

    let upcoming = upcoming_bills(&bills, today, DEFAULT_UPCOMING_DAYS);
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].name, "Internet");

    let overdue = overdue_bills(&bills, today);
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].name, "Rent");
}

#[test]
fn bills_due_today_and_on_the_horizon_are_included() {
    let today = date(2024, 3, 10);
    let bills = vec![
        Bill::new("Later", 1.0, date(2024, 3, 17)),
        Bill::new("Today", 1.0, today),
        Bill::new("Past horizon", 1.0, date(2024, 3, 18)),
    ];
    let names: Vec<_> = upcoming_bills(&bills, today, 7)
        .into_iter()
        .map(|bill| bill.name.as_str())
        .collect();
    assert_eq!(names, vec!["Today", "Later"]);
}

#[test]
fn paid_bills_count_towards_spending() {
    let expenses = sample_expenses();
    let bills = vec![
        Bill::new("Rent", 800.0, date(2024, 1, 1)).paid(),
        Bill::new("Water", 30.0, date(2024, 1, 15)),
    ];
    assert_eq!(
        total_expenses_with_bills(&expenses, &bills, Some(january())),
        1100.0
    );
}

#[test]
fn goal_progress_is_clamped() {
    let deadline = date(2024, 12, 31);
    let over = SavingGoal::new("Trip", 500.0, deadline).with_saved(750.0);
    let half = SavingGoal::new("Laptop", 1000.0, deadline).with_saved(500.0);
    let zero_target = SavingGoal::new("Empty", 0.0, deadline).with_saved(10.0);
    assert_eq!(saving_goal_progress(&over), 100.0);
    assert_eq!(saving_goal_progress(&half), 50.0);
    assert_eq!(saving_goal_progress(&zero_target), 0.0);

    let overview = goals_overview(&[over, half]);
    assert_eq!(overview.completed, 1);
    assert_eq!(overview.active, 1);
    assert_eq!(overview.total_saved, 1250.0);
}

#[test]
fn budget_comparison_matches_categories_case_insensitively() {
    let categories = vec![
        BudgetCategory::new("food", 20.0, ExpenseKind::Need),
        BudgetCategory::new("Fun", 0.0, ExpenseKind::Want).with_budget(50.0),
    ];
    let lines = budget_vs_actual(&categories, &sample_expenses(), 1000.0, Some(january()));
    assert_eq!(lines[0].allocated, 200.0);
    assert_eq!(lines[0].actual, 200.0);
    assert!(!lines[0].over_budget);
    assert_eq!(lines[1].actual, 100.0);
    assert!(lines[1].over_budget);
    assert_eq!(lines[1].percentage, 200.0);
}

#[test]
fn recommended_budget_measures_savings_as_surplus() {
    let incomes = vec![Income::new(1000.0, "Salary", date(2024, 1, 15))];
    let lines = recommended_budget(&incomes, &sample_expenses(), january());
    let food = lines.iter().find(|line| line.category == "Food").unwrap();
    assert_eq!(food.allocated, 120.0);
    assert_eq!(food.actual, 200.0);
    let savings = lines.iter().find(|line| line.category == "Savings").unwrap();
    assert_eq!(savings.allocated, 200.0);
    assert_eq!(savings.actual, 700.0);
}

#[test]
fn trend_runs_oldest_first_and_averages() {
    let incomes = vec![
        Income::new(1000.0, "Salary", date(2023, 12, 1)),
        Income::new(1200.0, "Salary", date(2024, 1, 1)),
    ];
    let trend = monthly_trend(&incomes, &sample_expenses(), january(), 2);
    assert_eq!(trend[0].period, Period::new(2023, 12).unwrap());
    assert_eq!(trend[0].savings, 950.0);
    assert_eq!(trend[1].savings, 900.0);
    let averages = TrendAverages::of(&trend);
    assert_eq!(averages.income, 1100.0);
}

#[test]
fn activity_feed_is_newest_first() {
    let incomes = vec![Income::new(1000.0, "Salary", date(2024, 1, 15))];
    let feed = recent_activity(&incomes, &sample_expenses(), 2);
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].date, date(2024, 1, 20));
    assert_eq!(feed[1].kind, ActivityKind::Income);
    assert_eq!(feed[0].signed_amount(), -100.0);
}

#[test]
fn dashboard_bundles_the_month() {
    let incomes = vec![Income::new(1000.0, "Salary", date(2024, 1, 15))];
    let expenses = sample_expenses();
    let bills = vec![Bill::new("Internet", 45.0, date(2024, 1, 22))];
    let goals = vec![SavingGoal::new("Trip", 500.0, date(2024, 6, 1)).with_saved(100.0)];
    let input = DashboardInput {
        incomes: &incomes,
        expenses: &expenses,
        bills: &bills,
        goals: &goals,
    };
    let summary = dashboard(&input, january(), date(2024, 1, 20), DEFAULT_UPCOMING_DAYS);
    assert_eq!(summary.income, 1000.0);
    assert_eq!(summary.savings, 700.0);
    assert_eq!(summary.top_categories[0].category, "Food");
    assert_eq!(summary.upcoming_bills.len(), 1);
    assert!(summary.overdue_bills.is_empty());
    assert_eq!(summary.total_saved, 100.0);
}

#[test]
fn default_currency_formatting() {
    assert_eq!(format_currency(1234.5, None), "$1,234.50");
    assert_eq!(format_currency(-1234.5, None), "-$1,234.50");
}

#[test]
fn totals_ignore_input_order() {
    let incomes = vec![
        Income::new(1000.0, "Salary", date(2024, 1, 15)),
        Income::new(250.5, "Freelance", date(2024, 1, 3)),
        Income::new(75.25, "Refund", date(2024, 2, 1)),
    ];
    let mut expenses = sample_expenses();
    expenses.push(Expense::new(12.75, "Transport", date(2024, 1, 31), ExpenseKind::Need));
    let period = Some(january());

    let expected_income: f64 = incomes
        .iter()
        .filter(|income| january().contains(income.date))
        .map(|income| income.amount)
        .sum();
    let expected_expenses: f64 = expenses
        .iter()
        .filter(|expense| january().contains(expense.date))
        .map(|expense| expense.amount)
        .sum();

    let mut reversed_incomes = incomes.clone();
    reversed_incomes.reverse();
    let mut rotated_expenses = expenses.clone();
    rotated_expenses.rotate_left(2);

    for (incomes, expenses) in [(&incomes, &expenses), (&reversed_incomes, &rotated_expenses)] {
        assert!((total_income(incomes, period) - expected_income).abs() < 1e-9);
        assert!((total_expenses(expenses, period) - expected_expenses).abs() < 1e-9);
    }
}

#[test]
fn goal_progress_hits_exact_bounds() {
    let deadline = date(2024, 12, 31);
    let reached = SavingGoal::new("Phone", 800.0, deadline).with_saved(800.0);
    let untouched = SavingGoal::new("Car", 5000.0, deadline);
    assert_eq!(saving_goal_progress(&reached), 100.0);
    assert_eq!(saving_goal_progress(&untouched), 0.0);
}

#[test]
fn overdue_excludes_paid_and_due_today() {
    let today = date(2024, 3, 10);
    let bills = vec![
        Bill::new("Paid late", 50.0, date(2024, 3, 1)).paid(),
        Bill::new("Due today", 20.0, today),
        Bill::new("Unpaid late", 70.0, date(2024, 3, 9)),
    ];
    let overdue = overdue_bills(&bills, today);
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].name, "Unpaid late");
}

#[test]
fn bill_overview_with_huge_look_ahead() {
    let today = date(2024, 3, 10);
    let bills = vec![
        Bill::new("Internet", 45.0, date(2024, 3, 13)),
        Bill::new("Rent", 900.0, date(2024, 3, 8)),
    ];
    let overview = bills_overview(&bills, today, u32::MAX);
    assert_eq!(overview.upcoming, 1);
    assert_eq!(overview.overdue, 1);
    assert_eq!(upcoming_bills(&bills, today, 200_000_000).len(), 1);
}
