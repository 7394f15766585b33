//! Account holder records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A registered user. Every other record is scoped to one of these by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Uuid, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

impl Identifiable for User {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for User {
    fn name(&self) -> &str {
        &self.username
    }
}
