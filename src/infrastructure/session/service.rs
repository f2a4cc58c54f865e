//! Session service: issuing, lookup and request authorization

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::session::DEFAULT_SESSION_TTL;
use crate::domain::{CallContext, DomainError, KeyedStore, Session};

/// Session service over any keyed session store
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Arc<dyn KeyedStore<Session>>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn KeyedStore<Session>>) -> Self {
        Self {
            store,
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Lifetime given to sessions created by [`issue`](Self::issue)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Creates and stores a fresh session for `user_id`
    pub async fn issue(&self, ctx: &CallContext, user_id: &str) -> Result<Session, DomainError> {
        let session = Session::issue(user_id, self.ttl);
        self.store.save(ctx, session.clone()).await?;

        debug!(session_id = %session.id(), user_id, "Session issued");
        Ok(session)
    }

    pub async fn find(&self, ctx: &CallContext, id: &str) -> Result<Session, DomainError> {
        self.store.find_by_key(ctx, id).await
    }

    pub async fn save(&self, ctx: &CallContext, session: Session) -> Result<(), DomainError> {
        self.store.save(ctx, session).await
    }

    pub async fn delete(&self, ctx: &CallContext, id: &str) -> Result<(), DomainError> {
        self.store.delete(ctx, id).await
    }

    /// Resolves the session backing a request
    ///
    /// Expired sessions are reported as `NotFound`, the same as unknown IDs.
    pub async fn authorize(&self, ctx: &CallContext, id: &str) -> Result<Session, DomainError> {
        let session = self.store.find_by_key(ctx, id).await?;

        if session.is_expired() {
            debug!(session_id = %id, expiry = %session.expiry(), "Rejected expired session");
            return Err(DomainError::not_found(id));
        }

        Ok(session)
    }
}
