//! REST client for a PostgREST-style hosted backend with GoTrue-style auth.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Bill, BillUpdate, BudgetCategory, Expense, ExpenseUpdate, Income, SavingGoal,
    SavingGoalUpdate, User,
};
use crate::errors::RepositoryError;

use super::{AuthProvider, BudgetRepository, Result, Session, Tables};

const REST_PATH: &str = "rest/v1/";
const AUTH_PATH: &str = "auth/v1/";
/// PostgREST code for "no rows" on single-row requests.
const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Debug)]
pub struct RestBackend {
    base_url: Url,
    anon_key: String,
    http: Client,
    access_token: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl RestBackend {
    pub fn new(base_url: &str, anon_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|err| RepositoryError::Backend(format!("invalid backend url: {err}")))?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            anon_key: anon_key.into(),
            http,
            access_token: Mutex::new(None),
        })
    }

    fn endpoint(&self, prefix: &str, path: &str) -> Result<Url> {
        self.base_url
            .join(prefix)
            .and_then(|url| url.join(path))
            .map_err(|err| RepositoryError::Backend(format!("invalid endpoint `{path}`: {err}")))
    }

    fn bearer(&self) -> String {
        self.access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn set_token(&self, token: Option<String>) {
        *self
            .access_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        order: Option<&str>,
    ) -> Result<Vec<T>> {
        let url = self.endpoint(REST_PATH, table)?;
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().cloned());
        if let Some(order) = order {
            query.push(("order", order.to_string()));
        }
        tracing::debug!(table, "select");
        let response = self.authorized(self.http.get(url).query(&query)).send()?;
        parse_json(response)
    }

    fn insert<T: Serialize + DeserializeOwned>(&self, table: &str, row: &T) -> Result<T> {
        let url = self.endpoint(REST_PATH, table)?;
        tracing::debug!(table, "insert");
        let response = self
            .authorized(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()?;
        let mut rows: Vec<T> = parse_json(response)?;
        if rows.is_empty() {
            return Err(RepositoryError::Backend(format!(
                "insert into {table} returned no row"
            )));
        }
        Ok(rows.remove(0))
    }

    fn update<P: Serialize>(&self, table: &str, user_id: Uuid, id: Uuid, changes: &P) -> Result<()> {
        let url = self.endpoint(REST_PATH, table)?;
        tracing::debug!(table, %id, "update");
        let response = self
            .authorized(self.http.patch(url))
            .query(&row_filter(user_id, id))
            .header("Prefer", "return=representation")
            .json(changes)
            .send()?;
        let rows: Vec<serde_json::Value> = parse_json(response)?;
        affected(table, id, &rows)
    }

    fn delete(&self, table: &str, user_id: Uuid, id: Uuid) -> Result<()> {
        let url = self.endpoint(REST_PATH, table)?;
        tracing::debug!(table, %id, "delete");
        let response = self
            .authorized(self.http.delete(url))
            .query(&row_filter(user_id, id))
            .header("Prefer", "return=representation")
            .send()?;
        let rows: Vec<serde_json::Value> = parse_json(response)?;
        affected(table, id, &rows)
    }

    fn first_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let mut users: Vec<User> =
            self.select(Tables::USERS, &[(column, format!("eq.{value}"))], None)?;
        Ok(if users.is_empty() {
            None
        } else {
            Some(users.remove(0))
        })
    }

    fn auth_request(&self, path: &str, email: &str, password: &str) -> Result<Session> {
        let url = self.endpoint(AUTH_PATH, path)?;
        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&Credentials { email, password })
            .send()?;
        let body: AuthResponse = parse_json(response)?;
        let (user_id, user_email) = match (body.user, body.id) {
            (Some(user), _) => (user.id, user.email),
            (None, Some(id)) => (id, body.email),
            (None, None) => {
                return Err(RepositoryError::Backend(
                    "auth response did not include a user".into(),
                ))
            }
        };
        let access_token = body.access_token.unwrap_or_default();
        if !access_token.is_empty() {
            self.set_token(Some(access_token.clone()));
        }
        Ok(Session {
            user_id,
            email: user_email.unwrap_or_else(|| email.to_string()),
            access_token,
        })
    }
}

fn user_filter(user_id: Uuid) -> [(&'static str, String); 1] {
    [("user_id", format!("eq.{user_id}"))]
}

fn row_filter(user_id: Uuid, id: Uuid) -> [(&'static str, String); 2] {
    [
        ("id", format!("eq.{id}")),
        ("user_id", format!("eq.{user_id}")),
    ]
}

/// PATCH and DELETE echo the touched rows; none means the id/owner pair matched nothing.
fn affected(table: &str, id: Uuid, rows: &[serde_json::Value]) -> Result<()> {
    if rows.is_empty() {
        Err(RepositoryError::NotFound(format!("{table} row {id}")))
    } else {
        Ok(())
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: serde_json::Value = response.json().unwrap_or(serde_json::Value::Null);
    Err(map_error(status, &body))
}

fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = ensure_success(response)?;
    let bytes = response.bytes()?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Translates an error response into the repository error taxonomy.
pub(crate) fn map_error(status: StatusCode, body: &serde_json::Value) -> RepositoryError {
    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|value| value.as_str()))
        .unwrap_or("unknown error")
        .to_string();
    if body.get("code").and_then(|code| code.as_str()) == Some(NO_ROWS_CODE) {
        return RepositoryError::NotFound(message);
    }
    match status.as_u16() {
        401 => RepositoryError::Unauthorized,
        403 => RepositoryError::Forbidden,
        404 => RepositoryError::NotFound(message),
        409 => RepositoryError::Conflict(message),
        code => RepositoryError::Backend(format!("{code}: {message}")),
    }
}

impl BudgetRepository for RestBackend {
    fn ping(&self) -> Result<()> {
        for table in Tables::all() {
            let url = self.endpoint(REST_PATH, table)?;
            let response = self
                .authorized(self.http.get(url).query(&[("select", "id"), ("limit", "1")]))
                .send()?;
            ensure_success(response).map_err(|err| {
                tracing::error!(table, error = %err, "table check failed");
                err
            })?;
        }
        Ok(())
    }

    fn user(&self, id: Uuid) -> Result<Option<User>> {
        self.first_user("id", &id.to_string())
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.first_user("username", username)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.first_user("email", email)
    }

    fn insert_user(&self, user: &User) -> Result<User> {
        self.insert(Tables::USERS, user)
    }

    fn incomes(&self, user_id: Uuid) -> Result<Vec<Income>> {
        self.select(Tables::INCOMES, &user_filter(user_id), Some("date.desc"))
    }

    fn insert_income(&self, income: &Income) -> Result<Income> {
        self.insert(Tables::INCOMES, income)
    }

    fn delete_income(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.delete(Tables::INCOMES, user_id, id)
    }

    fn expenses(&self, user_id: Uuid) -> Result<Vec<Expense>> {
        self.select(Tables::EXPENSES, &user_filter(user_id), Some("date.desc"))
    }

    fn insert_expense(&self, expense: &Expense) -> Result<Expense> {
        self.insert(Tables::EXPENSES, expense)
    }

    fn update_expense(&self, user_id: Uuid, id: Uuid, changes: &ExpenseUpdate) -> Result<()> {
        self.update(Tables::EXPENSES, user_id, id, changes)
    }

    fn delete_expense(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.delete(Tables::EXPENSES, user_id, id)
    }

    fn bills(&self, user_id: Uuid) -> Result<Vec<Bill>> {
        self.select(Tables::BILLS, &user_filter(user_id), Some("due_date.asc"))
    }

    fn insert_bill(&self, bill: &Bill) -> Result<Bill> {
        self.insert(Tables::BILLS, bill)
    }

    fn update_bill(&self, user_id: Uuid, id: Uuid, changes: &BillUpdate) -> Result<()> {
        self.update(Tables::BILLS, user_id, id, changes)
    }

    fn delete_bill(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.delete(Tables::BILLS, user_id, id)
    }

    fn saving_goals(&self, user_id: Uuid) -> Result<Vec<SavingGoal>> {
        self.select(Tables::SAVING_GOALS, &user_filter(user_id), None)
    }

    fn insert_saving_goal(&self, goal: &SavingGoal) -> Result<SavingGoal> {
        self.insert(Tables::SAVING_GOALS, goal)
    }

    fn update_saving_goal(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: &SavingGoalUpdate,
    ) -> Result<()> {
        self.update(Tables::SAVING_GOALS, user_id, id, changes)
    }

    fn delete_saving_goal(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.delete(Tables::SAVING_GOALS, user_id, id)
    }

    fn budget_categories(&self, user_id: Uuid) -> Result<Vec<BudgetCategory>> {
        self.select(Tables::BUDGET_CATEGORIES, &user_filter(user_id), None)
    }

    fn insert_budget_category(&self, category: &BudgetCategory) -> Result<BudgetCategory> {
        self.insert(Tables::BUDGET_CATEGORIES, category)
    }

    fn delete_budget_category(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.delete(Tables::BUDGET_CATEGORIES, user_id, id)
    }
}

impl AuthProvider for RestBackend {
    fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.auth_request("signup", email, password)
    }

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.auth_request("token?grant_type=password", email, password)
    }

    fn sign_out(&self, session: &Session) -> Result<()> {
        let url = self.endpoint(AUTH_PATH, "logout")?;
        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()?;
        self.set_token(None);
        ensure_success(response).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_rows_code_maps_to_not_found() {
        let err = map_error(
            StatusCode::NOT_ACCEPTABLE,
            &json!({"code": "PGRST116", "message": "JSON object requested, multiple (or no) rows returned"}),
        );
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(
            map_error(StatusCode::UNAUTHORIZED, &json!({})),
            RepositoryError::Unauthorized
        ));
        assert!(matches!(
            map_error(StatusCode::CONFLICT, &json!({"message": "duplicate key"})),
            RepositoryError::Conflict(message) if message == "duplicate key"
        ));
        match map_error(StatusCode::INTERNAL_SERVER_ERROR, &json!({"error": "boom"})) {
            RepositoryError::Backend(message) => assert_eq!(message, "500: boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_echo_means_no_row_was_touched() {
        let id = Uuid::new_v4();
        let err = affected(Tables::BILLS, id, &[]).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(message) if message.contains("bills")));
        assert!(affected(Tables::BILLS, id, &[json!({"id": id})]).is_ok());
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let backend =
            RestBackend::new("https://example.test/project", "anon", Duration::from_secs(5))
                .unwrap();
        let url = backend.endpoint(REST_PATH, Tables::BILLS).unwrap();
        assert_eq!(url.as_str(), "https://example.test/project/rest/v1/bills");
        let auth = backend
            .endpoint(AUTH_PATH, "token?grant_type=password")
            .unwrap();
        assert_eq!(
            auth.as_str(),
            "https://example.test/project/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn bearer_falls_back_to_anon_key() {
        let backend =
            RestBackend::new("https://example.test", "anon-key", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.bearer(), "anon-key");
        backend.set_token(Some("user-token".into()));
        assert_eq!(backend.bearer(), "user-token");
    }
}
