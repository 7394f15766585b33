//! The hosted backend seam: row-level CRUD per table and password authentication.
//!
//! Implementations are constructed once by the caller and shared by reference;
//! nothing in the crate holds a global client.

pub mod memory;
pub mod rest;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Bill, BillUpdate, BudgetCategory, Expense, ExpenseUpdate, Income, SavingGoal,
    SavingGoalUpdate, User,
};
use crate::errors::RepositoryError;

pub use memory::InMemoryBackend;
pub use rest::RestBackend;

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Table names used by the backend.
pub struct Tables;

impl Tables {
    pub const USERS: &'static str = "users";
    pub const INCOMES: &'static str = "incomes";
    pub const EXPENSES: &'static str = "expenses";
    pub const BILLS: &'static str = "bills";
    pub const SAVING_GOALS: &'static str = "saving_goals";
    pub const BUDGET_CATEGORIES: &'static str = "budget_categories";

    pub fn all() -> [&'static str; 6] {
        [
            Self::USERS,
            Self::INCOMES,
            Self::EXPENSES,
            Self::BILLS,
            Self::SAVING_GOALS,
            Self::BUDGET_CATEGORIES,
        ]
    }
}

/// An authenticated session bound to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
}

/// Password authentication offered by the backend.
pub trait AuthProvider: Send + Sync {
    fn sign_up(&self, email: &str, password: &str) -> Result<Session>;
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;
    fn sign_out(&self, session: &Session) -> Result<()>;
}

/// Row-level access to the budgeting tables. Every query is scoped by `user_id`.
///
/// Listing order: incomes and expenses newest first, bills by due date, goals and
/// categories in insertion order.
pub trait BudgetRepository: Send + Sync {
    /// Checks that every table is reachable.
    fn ping(&self) -> Result<()>;

    fn user(&self, id: Uuid) -> Result<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn insert_user(&self, user: &User) -> Result<User>;

    fn incomes(&self, user_id: Uuid) -> Result<Vec<Income>>;
    fn insert_income(&self, income: &Income) -> Result<Income>;
    fn delete_income(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    fn expenses(&self, user_id: Uuid) -> Result<Vec<Expense>>;
    fn insert_expense(&self, expense: &Expense) -> Result<Expense>;
    fn update_expense(&self, user_id: Uuid, id: Uuid, changes: &ExpenseUpdate) -> Result<()>;
    fn delete_expense(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    fn bills(&self, user_id: Uuid) -> Result<Vec<Bill>>;
    fn insert_bill(&self, bill: &Bill) -> Result<Bill>;
    fn update_bill(&self, user_id: Uuid, id: Uuid, changes: &BillUpdate) -> Result<()>;
    fn delete_bill(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    fn saving_goals(&self, user_id: Uuid) -> Result<Vec<SavingGoal>>;
    fn insert_saving_goal(&self, goal: &SavingGoal) -> Result<SavingGoal>;
    fn update_saving_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: &SavingGoalUpdate,
    ) -> Result<()>;
    fn delete_saving_goal(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    fn budget_categories(&self, user_id: Uuid) -> Result<Vec<BudgetCategory>>;
    fn insert_budget_category(&self, category: &BudgetCategory) -> Result<BudgetCategory>;
    fn delete_budget_category(&self, user_id: Uuid, id: Uuid) -> Result<()>;
}
