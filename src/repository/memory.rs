//! Process-local backend used for tests and offline runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::domain::{
    Bill, BillUpdate, BudgetCategory, Expense, ExpenseUpdate, Income, Owned, SavingGoal,
    SavingGoalUpdate, User,
};
use crate::errors::RepositoryError;

use super::{AuthProvider, BudgetRepository, Result, Session, Tables};

#[derive(Debug, Default)]
struct Store {
    users: Vec<User>,
    incomes: Vec<Income>,
    expenses: Vec<Expense>,
    bills: Vec<Bill>,
    saving_goals: Vec<SavingGoal>,
    budget_categories: Vec<BudgetCategory>,
    credentials: HashMap<String, Credential>,
}

#[derive(Debug, Clone)]
struct Credential {
    user_id: Uuid,
    password: String,
}

/// Mutex-guarded tables with the same scoping rules as the hosted backend.
/// Concurrent writers are not reconciled; the last write wins.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Backend("in-memory store poisoned".into()))
    }
}

fn owned_by<T: Owned>(records: &[T], user_id: Uuid) -> Vec<T>
where
    T: Clone,
{
    records
        .iter()
        .filter(|record| record.user_id() == user_id)
        .cloned()
        .collect()
}

fn remove_owned<T, F>(records: &mut Vec<T>, table: &str, user_id: Uuid, matches: F) -> Result<()>
where
    T: Owned,
    F: Fn(&T) -> bool,
{
    let before = records.len();
    records.retain(|record| !(record.user_id() == user_id && matches(record)));
    if records.len() == before {
        return Err(RepositoryError::NotFound(format!("{} row", table)));
    }
    Ok(())
}

fn not_found(table: &str, id: Uuid) -> RepositoryError {
    RepositoryError::NotFound(format!("{} row {}", table, id))
}

impl BudgetRepository for InMemoryBackend {
    fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    fn user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|user| user.id == id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn insert_user(&self, user: &User) -> Result<User> {
        let mut store = self.lock()?;
        if store.users.iter().any(|existing| existing.id == user.id) {
            return Err(RepositoryError::Conflict(format!(
                "{} row {} already exists",
                Tables::USERS,
                user.id
            )));
        }
        store.users.push(user.clone());
        Ok(user.clone())
    }

    fn incomes(&self, user_id: Uuid) -> Result<Vec<Income>> {
        let mut incomes = owned_by(&self.lock()?.incomes, user_id);
        incomes.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(incomes)
    }

    fn insert_income(&self, income: &Income) -> Result<Income> {
        self.lock()?.incomes.push(income.clone());
        Ok(income.clone())
    }

    fn delete_income(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        remove_owned(&mut self.lock()?.incomes, Tables::INCOMES, user_id, |row| {
            row.id == id
        })
    }

    fn expenses(&self, user_id: Uuid) -> Result<Vec<Expense>> {
        let mut expenses = owned_by(&self.lock()?.expenses, user_id);
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(expenses)
    }

    fn insert_expense(&self, expense: &Expense) -> Result<Expense> {
        self.lock()?.expenses.push(expense.clone());
        Ok(expense.clone())
    }

    fn update_expense(&self, user_id: Uuid, id: Uuid, changes: &ExpenseUpdate) -> Result<()> {
        let mut store = self.lock()?;
        let expense = store
            .expenses
            .iter_mut()
            .find(|row| row.id == id && row.user_id == user_id)
            .ok_or_else(|| not_found(Tables::EXPENSES, id))?;
        expense.apply(changes);
        Ok(())
    }

    fn delete_expense(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        remove_owned(&mut self.lock()?.expenses, Tables::EXPENSES, user_id, |row| {
            row.id == id
        })
    }

    fn bills(&self, user_id: Uuid) -> Result<Vec<Bill>> {
        let mut bills = owned_by(&self.lock()?.bills, user_id);
        bills.sort_by_key(|bill| bill.due_date);
        Ok(bills)
    }

    fn insert_bill(&self, bill: &Bill) -> Result<Bill> {
        self.lock()?.bills.push(bill.clone());
        Ok(bill.clone())
    }

    fn update_bill(&self, user_id: Uuid, id: Uuid, changes: &BillUpdate) -> Result<()> {
        let mut store = self.lock()?;
        let bill = store
            .bills
            .iter_mut()
            .find(|row| row.id == id && row.user_id == user_id)
            .ok_or_else(|| not_found(Tables::BILLS, id))?;
        bill.apply(changes);
        Ok(())
    }

    fn delete_bill(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        remove_owned(&mut self.lock()?.bills, Tables::BILLS, user_id, |row| {
            row.id == id
        })
    }

    fn saving_goals(&self, user_id: Uuid) -> Result<Vec<SavingGoal>> {
        Ok(owned_by(&self.lock()?.saving_goals, user_id))
    }

    fn insert_saving_goal(&self, goal: &SavingGoal) -> Result<SavingGoal> {
        self.lock()?.saving_goals.push(goal.clone());
        Ok(goal.clone())
    }

    fn update_saving_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: &SavingGoalUpdate,
    ) -> Result<()> {
        let mut store = self.lock()?;
        let goal = store
            .saving_goals
            .iter_mut()
            .find(|row| row.id == id && row.user_id == user_id)
            .ok_or_else(|| not_found(Tables::SAVING_GOALS, id))?;
        goal.apply(changes);
        Ok(())
    }

    fn delete_saving_goal(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        remove_owned(
            &mut self.lock()?.saving_goals,
            Tables::SAVING_GOALS,
            user_id,
            |row| row.id == id,
        )
    }

    fn budget_categories(&self, user_id: Uuid) -> Result<Vec<BudgetCategory>> {
        Ok(owned_by(&self.lock()?.budget_categories, user_id))
    }

    fn insert_budget_category(&self, category: &BudgetCategory) -> Result<BudgetCategory> {
        self.lock()?.budget_categories.push(category.clone());
        Ok(category.clone())
    }

    fn delete_budget_category(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        remove_owned(
            &mut self.lock()?.budget_categories,
            Tables::BUDGET_CATEGORIES,
            user_id,
            |row| row.id == id,
        )
    }
}

impl AuthProvider for InMemoryBackend {
    fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let key = email.trim().to_lowercase();
        let mut store = self.lock()?;
        if store.credentials.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!(
                "email `{}` already registered",
                email
            )));
        }
        let user_id = Uuid::new_v4();
        store.credentials.insert(
            key.clone(),
            Credential {
                user_id,
                password: password.to_string(),
            },
        );
        Ok(Session {
            user_id,
            email: key,
            access_token: Uuid::new_v4().to_string(),
        })
    }

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let key = email.trim().to_lowercase();
        let store = self.lock()?;
        match store.credentials.get(&key) {
            Some(credential) if credential.password == password => Ok(Session {
                user_id: credential.user_id,
                email: key,
                access_token: Uuid::new_v4().to_string(),
            }),
            _ => Err(RepositoryError::Unauthorized),
        }
    }

    fn sign_out(&self, _session: &Session) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExpenseKind;
    use chrono::NaiveDate;

    #[test]
    fn rows_are_scoped_by_user() {
        let backend = InMemoryBackend::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let mut mine = Expense::new(10.0, "Food", date, ExpenseKind::Need);
        mine.user_id = Uuid::new_v4();
        let mut theirs = Expense::new(20.0, "Food", date, ExpenseKind::Need);
        theirs.user_id = Uuid::new_v4();
        backend.insert_expense(&mine).unwrap();
        backend.insert_expense(&theirs).unwrap();

        assert_eq!(backend.expenses(mine.user_id).unwrap(), vec![mine.clone()]);
        let err = backend.delete_expense(mine.user_id, theirs.id).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn sign_in_rejects_wrong_password() {
        let backend = InMemoryBackend::new();
        backend.sign_up("a@example.com", "secret").unwrap();
        assert!(backend.sign_in_with_password("A@example.com", "secret").is_ok());
        let err = backend
            .sign_in_with_password("a@example.com", "nope")
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Unauthorized));
    }
}
