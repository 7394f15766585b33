//! Budgeting records as exchanged with the backend.

pub mod bill;
pub mod category;
pub mod common;
pub mod expense;
pub mod goal;
pub mod income;
pub mod user;

pub use bill::{Bill, BillUpdate};
pub use category::{category_key, BudgetCategory};
pub use common::{Amounted, DateWindow, Dated, Identifiable, NamedEntity, Owned, Period};
pub use expense::{Expense, ExpenseKind, ExpenseUpdate, Priority};
pub use goal::{SavingGoal, SavingGoalUpdate};
pub use income::{Income, IncomeKind};
pub use user::User;
