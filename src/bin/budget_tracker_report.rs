use std::{env, sync::Arc, time::Duration};

use chrono::{Local, NaiveDate};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Password};

use budget_tracker::{
    analytics::{self, DashboardSummary},
    config::{Config, ConfigManager},
    currency::{format_currency_value, format_date, CurrencyCode, FormatOptions},
    domain::Period,
    errors::{BudgetError, RepositoryError},
    init,
    repository::RestBackend,
    services::{BudgetService, ServiceError},
};

const USAGE: &str = "\
Usage: budget_tracker_report [OPTIONS]

Logs in to the configured backend and prints the monthly budget overview.

Options:
  -u, --username <NAME>   Log in as NAME instead of prompting
  -m, --month <YYYY-MM>   Report on this month instead of the current one
  -h, --help              Print this help
  -V, --version           Print the version

Environment:
  BUDGET_TRACKER_HOME           Data directory (default ~/.budget_tracker)
  BUDGET_TRACKER_BACKEND_URL    Backend base URL
  BUDGET_TRACKER_ANON_KEY       Backend public API key
  RUST_LOG                      Log filter";

#[derive(Debug, thiserror::Error)]
enum ReportError {
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("{0}")]
    Usage(String),
}

#[derive(Debug, Default)]
struct Options {
    username: Option<String>,
    period: Option<Period>,
}

enum Command {
    Help,
    Version,
    Report(Options),
}

fn main() {
    init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ReportError> {
    match parse_args(env::args().skip(1))? {
        Command::Help => {
            println!("{USAGE}");
            Ok(())
        }
        Command::Version => {
            println!("budget_tracker_report {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Report(options) => report(options),
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command, ReportError> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-u" | "--username" => {
                let value = args
                    .next()
                    .ok_or_else(|| ReportError::Usage(format!("{arg} needs a value")))?;
                options.username = Some(value);
            }
            "-m" | "--month" => {
                let value = args
                    .next()
                    .ok_or_else(|| ReportError::Usage(format!("{arg} needs a value")))?;
                options.period = Some(parse_month(&value)?);
            }
            other => {
                return Err(ReportError::Usage(format!(
                    "unexpected argument `{other}` (see --help)"
                )))
            }
        }
    }
    Ok(Command::Report(options))
}

fn parse_month(raw: &str) -> Result<Period, ReportError> {
    let invalid = || ReportError::Usage(format!("month must look like 2024-01, got `{raw}`"));
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    Ok(Period::new(year, month)?)
}

fn report(options: Options) -> Result<(), ReportError> {
    let config = ConfigManager::new()?.load()?;
    let (url, key) = config.backend()?;
    let backend = Arc::new(RestBackend::new(
        url,
        key,
        Duration::from_secs(config.request_timeout_secs),
    )?);
    let mut service =
        BudgetService::new(backend.clone(), backend).with_upcoming_days(config.upcoming_days);

    let theme = ColorfulTheme::default();
    let username = match options.username {
        Some(username) => username,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;
    let user = service.login(&username, &password)?;

    let today = Local::now().date_naive();
    let period = options.period.unwrap_or_else(|| Period::containing(today));
    let summary = service.dashboard(period, today)?;
    print_dashboard(&config, &user.username, &summary, today);
    service.logout()?;
    Ok(())
}

fn print_dashboard(config: &Config, username: &str, summary: &DashboardSummary, today: NaiveDate) {
    let money = |amount: f64| render_money(&config.default_currency, config, amount);

    println!(
        "{}",
        format!("=== {} for {} ===", summary.period.label(), username).bold()
    );
    println!("Income:              {}", money(summary.income).green());
    println!("Expenses:            {}", money(summary.expenses).red());
    println!("Expenses with bills: {}", money(summary.expenses_with_bills));
    let savings = money(summary.savings);
    if summary.savings < 0.0 {
        println!("Net savings:         {}", savings.red().bold());
    } else {
        println!("Net savings:         {}", savings.green().bold());
    }
    println!(
        "Needs / wants:       {} / {} ({:.1}% needs)",
        money(summary.needs_wants.needs),
        money(summary.needs_wants.wants),
        analytics::percent_of(summary.needs_wants.needs, summary.needs_wants.total())
    );

    if !summary.top_categories.is_empty() {
        println!("\n{}", "Top categories".bold());
        for entry in &summary.top_categories {
            println!("  {:<20} {}", entry.category, money(entry.amount));
        }
    }

    println!("\n{}", "Bills".bold());
    if summary.upcoming_bills.is_empty() && summary.overdue_bills.is_empty() {
        println!("  Nothing due.");
    }
    for bill in &summary.overdue_bills {
        println!(
            "  {} {:<20} {} (due {})",
            "OVERDUE".red().bold(),
            bill.name,
            money(bill.amount),
            format_date(&config.locale, bill.due_date)
        );
    }
    for bill in &summary.upcoming_bills {
        let days = (bill.due_date - today).num_days();
        println!(
            "  {} {:<20} {} (in {} day{})",
            "DUE".yellow(),
            bill.name,
            money(bill.amount),
            days,
            if days == 1 { "" } else { "s" }
        );
    }

    let goals = &summary.goals;
    println!("\n{}", "Saving goals".bold());
    println!(
        "  {} active, {} completed, {} of {} saved ({:.1}%)",
        goals.active,
        goals.completed,
        money(goals.total_saved),
        money(goals.total_target),
        goals.overall_progress
    );
}

fn render_money(code: &CurrencyCode, config: &Config, amount: f64) -> String {
    format_currency_value(amount, code, &config.locale, &FormatOptions::default())
}
