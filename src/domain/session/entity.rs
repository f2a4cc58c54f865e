//! Session entity

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cursor::CursorCodec;
use crate::domain::store::KeyedEntity;

/// Lifetime of a freshly issued session
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Login session referenced by a cookie value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: String,
    user_id: String,
    expiry: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Issues a session for `user_id` that expires after `ttl`
    pub fn issue(user_id: impl Into<String>, ttl: Duration) -> Self {
        let now = CursorCodec::truncate(Utc::now());
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        Self {
            id: Self::generate_id(),
            user_id: user_id.into(),
            expiry: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            created_at: now,
        }
    }

    pub fn with_id(
        id: impl Into<String>,
        user_id: impl Into<String>,
        expiry: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            expiry,
            created_at: CursorCodec::truncate(created_at),
        }
    }

    pub fn generate_id() -> String {
        format!("session-{}", uuid::Uuid::new_v4())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

impl KeyedEntity for Session {
    fn key(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn set_created_at(&mut self, created_at: DateTime<Utc>) {
        self.created_at = created_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_sets_expiry() {
        let session = Session::issue("u1", Duration::from_secs(60));

        assert!(session.id().starts_with("session-"));
        assert_eq!(session.user_id(), "u1");
        assert!(!session.is_expired());
        assert!(session.is_expired_at(session.expiry()));
    }

    #[test]
    fn test_expired_session() {
        let now = Utc::now();
        let session = Session::with_id("s1", "u1", now - chrono::Duration::seconds(1), now);

        assert!(session.is_expired());
        assert_eq!(session.key(), "s1");
    }
}
