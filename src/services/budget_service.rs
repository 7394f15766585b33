use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::analytics::{self, BudgetLine, DashboardInput, DashboardSummary, DEFAULT_UPCOMING_DAYS};
use crate::domain::{
    Bill, BillUpdate, BudgetCategory, Expense, ExpenseUpdate, Income, Period, SavingGoal,
    SavingGoalUpdate, User,
};
use crate::errors::RepositoryError;
use crate::repository::{self, AuthProvider, BudgetRepository, Session};

use super::{ensure_amount, ensure_name, ServiceError, ServiceResult, MIN_PASSWORD_LEN};

const BAD_CREDENTIALS: &str = "Incorrect username or password";

/// Session-bound entry point for every budgeting operation.
///
/// Reads and writes are scoped to the logged-in user; anything called without a
/// session fails with [`ServiceError::NotAuthenticated`].
pub struct BudgetService {
    repository: Arc<dyn BudgetRepository>,
    auth: Arc<dyn AuthProvider>,
    session: Option<Session>,
    current_user: Option<User>,
    upcoming_days: u32,
}

/// Logs a backend failure against the operation that hit it.
fn backend_failure(operation: &str, err: RepositoryError) -> ServiceError {
    tracing::error!(operation, error = %err, "backend call failed");
    ServiceError::from(err)
}

fn logged<T>(operation: &str, result: repository::Result<T>) -> ServiceResult<T> {
    result.map_err(|err| backend_failure(operation, err))
}

impl BudgetService {
    pub fn new(repository: Arc<dyn BudgetRepository>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            repository,
            auth,
            session: None,
            current_user: None,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }

    /// Look-ahead used by [`BudgetService::dashboard`].
    pub fn with_upcoming_days(mut self, days: u32) -> Self {
        self.upcoming_days = days;
        self
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    fn user_id(&self) -> ServiceResult<Uuid> {
        self.session
            .as_ref()
            .map(|session| session.user_id)
            .ok_or(ServiceError::NotAuthenticated)
    }

    pub fn register(&mut self, username: &str, email: &str, password: &str) -> ServiceResult<User> {
        let username = username.trim();
        let email = email.trim();
        ensure_name("Username", username)?;
        if !email.contains('@') {
            return Err(ServiceError::Invalid("A valid email is required".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Invalid(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if logged("find_user_by_username", self.repository.find_user_by_username(username))?
            .is_some()
        {
            return Err(ServiceError::Duplicate(
                "This username is already taken. Please choose another.".into(),
            ));
        }
        if logged("find_user_by_email", self.repository.find_user_by_email(email))?.is_some() {
            return Err(ServiceError::Duplicate(
                "An account with this email already exists".into(),
            ));
        }
        let session = match self.auth.sign_up(email, password) {
            Ok(session) => session,
            Err(RepositoryError::Conflict(_)) => {
                return Err(ServiceError::Duplicate(
                    "An account with this email already exists".into(),
                ))
            }
            Err(err) => return Err(backend_failure("sign_up", err)),
        };
        let user = logged(
            "insert_user",
            self.repository
                .insert_user(&User::new(session.user_id, username, email)),
        )?;
        tracing::info!(username = %user.username, "registered user");
        self.session = Some(session);
        self.current_user = Some(user.clone());
        Ok(user)
    }

    /// Starts a new session. Any previous session is dropped before the attempt, so a
    /// failed login leaves the service logged out.
    pub fn login(&mut self, username: &str, password: &str) -> ServiceResult<User> {
        self.session = None;
        self.current_user = None;
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ServiceError::Invalid(
                "Username and password are required".into(),
            ));
        }
        let user = logged("find_user_by_username", self.repository.find_user_by_username(username))?
            .ok_or_else(|| ServiceError::Invalid(BAD_CREDENTIALS.into()))?;
        let session = match self.auth.sign_in_with_password(&user.email, password) {
            Ok(session) => session,
            Err(RepositoryError::Unauthorized) => {
                tracing::warn!(username, "rejected login");
                return Err(ServiceError::Invalid(BAD_CREDENTIALS.into()));
            }
            Err(err) => return Err(backend_failure("sign_in_with_password", err)),
        };
        if session.user_id != user.id {
            tracing::error!(username, "auth user does not match profile row");
            return Err(ServiceError::Invalid(BAD_CREDENTIALS.into()));
        }
        tracing::info!(username, "logged in");
        self.session = Some(session);
        self.current_user = Some(user.clone());
        Ok(user)
    }

    /// Ends the session. The local session is cleared even if the backend call fails.
    pub fn logout(&mut self) -> ServiceResult<()> {
        self.current_user = None;
        match self.session.take() {
            Some(session) => logged("sign_out", self.auth.sign_out(&session)),
            None => Ok(()),
        }
    }

    pub fn incomes(&self) -> ServiceResult<Vec<Income>> {
        let user_id = self.user_id()?;
        logged("incomes", self.repository.incomes(user_id))
    }

    pub fn add_income(&self, mut income: Income) -> ServiceResult<Income> {
        income.user_id = self.user_id()?;
        ensure_amount("Income amount", income.amount)?;
        ensure_name("Income source", &income.source)?;
        if matches!(income.end_date, Some(end) if end < income.date) {
            return Err(ServiceError::Invalid(
                "End date cannot be before the start date".into(),
            ));
        }
        logged("insert_income", self.repository.insert_income(&income))
    }

    pub fn delete_income(&self, id: Uuid) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        logged("delete_income", self.repository.delete_income(user_id, id))
    }

    pub fn expenses(&self) -> ServiceResult<Vec<Expense>> {
        let user_id = self.user_id()?;
        logged("expenses", self.repository.expenses(user_id))
    }

    pub fn add_expense(&self, mut expense: Expense) -> ServiceResult<Expense> {
        expense.user_id = self.user_id()?;
        ensure_amount("Expense amount", expense.amount)?;
        ensure_name("Category", &expense.category)?;
        logged("insert_expense", self.repository.insert_expense(&expense))
    }

    pub fn update_expense(&self, id: Uuid, changes: &ExpenseUpdate) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        if let Some(amount) = changes.amount {
            ensure_amount("Expense amount", amount)?;
        }
        if let Some(category) = &changes.category {
            ensure_name("Category", category)?;
        }
        logged(
            "update_expense",
            self.repository.update_expense(user_id, id, changes),
        )
    }

    pub fn delete_expense(&self, id: Uuid) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        logged("delete_expense", self.repository.delete_expense(user_id, id))
    }

    pub fn bills(&self) -> ServiceResult<Vec<Bill>> {
        let user_id = self.user_id()?;
        logged("bills", self.repository.bills(user_id))
    }

    pub fn add_bill(&self, mut bill: Bill) -> ServiceResult<Bill> {
        bill.user_id = self.user_id()?;
        ensure_name("Bill name", &bill.name)?;
        ensure_amount("Bill amount", bill.amount)?;
        logged("insert_bill", self.repository.insert_bill(&bill))
    }

    pub fn update_bill(&self, id: Uuid, changes: &BillUpdate) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        if let Some(name) = &changes.name {
            ensure_name("Bill name", name)?;
        }
        if let Some(amount) = changes.amount {
            ensure_amount("Bill amount", amount)?;
        }
        logged("update_bill", self.repository.update_bill(user_id, id, changes))
    }

    pub fn mark_bill_paid(&self, id: Uuid) -> ServiceResult<()> {
        self.update_bill(id, &BillUpdate::mark_paid())
    }

    pub fn delete_bill(&self, id: Uuid) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        logged("delete_bill", self.repository.delete_bill(user_id, id))
    }

    pub fn saving_goals(&self) -> ServiceResult<Vec<SavingGoal>> {
        let user_id = self.user_id()?;
        logged("saving_goals", self.repository.saving_goals(user_id))
    }

    pub fn add_saving_goal(&self, mut goal: SavingGoal) -> ServiceResult<SavingGoal> {
        goal.user_id = self.user_id()?;
        ensure_name("Goal name", &goal.name)?;
        ensure_amount("Target amount", goal.target_amount)?;
        ensure_saved(goal.current_amount)?;
        logged("insert_saving_goal", self.repository.insert_saving_goal(&goal))
    }

    pub fn update_saving_goal(&self, id: Uuid, changes: &SavingGoalUpdate) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        if let Some(name) = &changes.name {
            ensure_name("Goal name", name)?;
        }
        if let Some(target) = changes.target_amount {
            ensure_amount("Target amount", target)?;
        }
        if let Some(saved) = changes.current_amount {
            ensure_saved(saved)?;
        }
        logged(
            "update_saving_goal",
            self.repository.update_saving_goal(user_id, id, changes),
        )
    }

    /// Adds `amount` to the goal's saved total. The read and the write are two
    /// separate backend calls; a concurrent writer in between is overwritten.
    pub fn add_saving_goal_progress(&self, id: Uuid, amount: f64) -> ServiceResult<SavingGoal> {
        let user_id = self.user_id()?;
        ensure_amount("Contribution", amount)?;
        let mut goal = logged("saving_goals", self.repository.saving_goals(user_id))?
            .into_iter()
            .find(|goal| goal.id == id)
            .ok_or_else(|| ServiceError::Invalid("Saving goal not found".into()))?;
        let changes = SavingGoalUpdate {
            current_amount: Some(goal.current_amount + amount),
            ..SavingGoalUpdate::default()
        };
        logged(
            "update_saving_goal",
            self.repository.update_saving_goal(user_id, id, &changes),
        )?;
        goal.apply(&changes);
        Ok(goal)
    }

    pub fn delete_saving_goal(&self, id: Uuid) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        logged(
            "delete_saving_goal",
            self.repository.delete_saving_goal(user_id, id),
        )
    }

    pub fn budget_categories(&self) -> ServiceResult<Vec<BudgetCategory>> {
        let user_id = self.user_id()?;
        logged("budget_categories", self.repository.budget_categories(user_id))
    }

    pub fn add_budget_category(&self, mut category: BudgetCategory) -> ServiceResult<BudgetCategory> {
        let user_id = self.user_id()?;
        category.user_id = user_id;
        ensure_name("Category name", &category.name)?;
        if !(0.0..=100.0).contains(&category.income_percentage) {
            return Err(ServiceError::Invalid(
                "Income percentage must be between 0 and 100".into(),
            ));
        }
        if let Some(amount) = category.budget_amount {
            ensure_amount("Budget amount", amount)?;
        }
        let existing = logged("budget_categories", self.repository.budget_categories(user_id))?;
        if existing.iter().any(|other| other.matches(&category.name)) {
            return Err(ServiceError::Duplicate(format!(
                "Category `{}` already exists",
                category.name.trim()
            )));
        }
        logged(
            "insert_budget_category",
            self.repository.insert_budget_category(&category),
        )
    }

    pub fn delete_budget_category(&self, id: Uuid) -> ServiceResult<()> {
        let user_id = self.user_id()?;
        logged(
            "delete_budget_category",
            self.repository.delete_budget_category(user_id, id),
        )
    }

    pub fn monthly_incomes(&self, period: Period) -> ServiceResult<Vec<Income>> {
        Ok(self
            .incomes()?
            .into_iter()
            .filter(|income| period.contains(income.date))
            .collect())
    }

    pub fn monthly_expenses(&self, period: Period) -> ServiceResult<Vec<Expense>> {
        Ok(self
            .expenses()?
            .into_iter()
            .filter(|expense| period.contains(expense.date))
            .collect())
    }

    pub fn upcoming_bills(&self, today: NaiveDate, days_ahead: u32) -> ServiceResult<Vec<Bill>> {
        let bills = self.bills()?;
        Ok(analytics::upcoming_bills(&bills, today, days_ahead)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn overdue_bills(&self, today: NaiveDate) -> ServiceResult<Vec<Bill>> {
        let bills = self.bills()?;
        Ok(analytics::overdue_bills(&bills, today)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Budget categories measured against the month's spending and income.
    pub fn budget_report(&self, period: Period) -> ServiceResult<Vec<BudgetLine>> {
        let categories = self.budget_categories()?;
        let incomes = self.incomes()?;
        let expenses = self.expenses()?;
        let monthly_income = analytics::total_income(&incomes, Some(period));
        Ok(analytics::budget_vs_actual(
            &categories,
            &expenses,
            monthly_income,
            Some(period),
        ))
    }

    pub fn dashboard(&self, period: Period, today: NaiveDate) -> ServiceResult<DashboardSummary> {
        let incomes = self.incomes()?;
        let expenses = self.expenses()?;
        let bills = self.bills()?;
        let goals = self.saving_goals()?;
        let input = DashboardInput {
            incomes: &incomes,
            expenses: &expenses,
            bills: &bills,
            goals: &goals,
        };
        Ok(analytics::dashboard(&input, period, today, self.upcoming_days))
    }
}

fn ensure_saved(amount: f64) -> ServiceResult<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(ServiceError::Invalid(
            "Saved amount cannot be negative".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExpenseKind;
    use crate::repository::InMemoryBackend;

    fn service() -> BudgetService {
        let backend = Arc::new(InMemoryBackend::new());
        BudgetService::new(backend.clone(), backend)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn operations_require_a_session() {
        let service = service();
        assert!(matches!(
            service.expenses(),
            Err(ServiceError::NotAuthenticated)
        ));
        let expense = Expense::new(5.0, "Food", date(2024, 1, 1), ExpenseKind::Need);
        assert!(matches!(
            service.add_expense(expense),
            Err(ServiceError::NotAuthenticated)
        ));
    }

    #[test]
    fn register_then_login_restores_the_same_user() {
        let mut service = service();
        let registered = service
            .register("amina", "amina@example.com", "secret1")
            .unwrap();
        service.logout().unwrap();
        assert!(service.current_user().is_none());

        let logged_in = service.login("amina", "secret1").unwrap();
        assert_eq!(logged_in.id, registered.id);
        assert!(matches!(
            service.login("amina", "wrong-pass"),
            Err(ServiceError::Invalid(message)) if message == BAD_CREDENTIALS
        ));
    }

    #[test]
    fn failed_login_drops_the_previous_session() {
        let mut service = service();
        service
            .register("amina", "amina@example.com", "secret1")
            .unwrap();
        assert!(service.login("amina", "wrong-pass").is_err());
        assert!(!service.is_authenticated());
        assert!(service.current_user().is_none());
        assert!(matches!(
            service.bills(),
            Err(ServiceError::NotAuthenticated)
        ));
    }

    #[test]
    fn short_passwords_are_rejected() {
        let mut service = service();
        assert!(matches!(
            service.register("amina", "amina@example.com", "12345"),
            Err(ServiceError::Invalid(_))
        ));
    }

    #[test]
    fn progress_accumulates_on_the_stored_goal() {
        let mut service = service();
        service.register("amina", "amina@example.com", "secret1").unwrap();
        let goal = service
            .add_saving_goal(SavingGoal::new("Laptop", 1000.0, date(2024, 12, 1)))
            .unwrap();
        service.add_saving_goal_progress(goal.id, 150.0).unwrap();
        let updated = service.add_saving_goal_progress(goal.id, 50.0).unwrap();
        assert_eq!(updated.current_amount, 200.0);
        assert_eq!(service.saving_goals().unwrap()[0].current_amount, 200.0);
    }
}
