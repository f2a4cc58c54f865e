//! User entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cursor::CursorCodec;
use crate::domain::store::KeyedEntity;

/// Registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    user_id: String,
    username: String,
    email: String,
    /// Persisted with the record; outer surfaces render users through their own views
    #[serde(default)]
    password_hash: String,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Creates a user with a freshly generated ID
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self::with_id(Self::generate_id(), username, email, password_hash, Utc::now())
    }

    /// Creates a user with an explicit ID and creation time.
    /// Creation times are kept at cursor precision.
    pub fn with_id(
        user_id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: CursorCodec::truncate(created_at),
            updated_at: None,
        }
    }

    pub fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl KeyedEntity for User {
    fn key(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, created_at: DateTime<Utc>) {
        self.created_at = created_at;
    }
}
