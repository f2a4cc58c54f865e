//! User service for lookups and listings

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{CallContext, Cursor, DomainError, Page, PagedStore, User};
use crate::infrastructure::resolver::{BatchLookupError, FanOutResolver};

/// User service over any paged user store
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<dyn PagedStore<User>>,
    resolver: FanOutResolver,
}

impl UserService {
    pub fn new(store: Arc<dyn PagedStore<User>>, resolver: FanOutResolver) -> Self {
        Self { store, resolver }
    }

    /// Registers a user; fails with `AlreadyExists` if the ID is taken
    pub async fn create(&self, ctx: &CallContext, user: User) -> Result<(), DomainError> {
        info!(user_id = %user.user_id(), username = %user.username(), "Creating user");
        self.store.save(ctx, user).await
    }

    pub async fn get_by_user_id(&self, ctx: &CallContext, id: &str) -> Result<User, DomainError> {
        self.store.find_by_key(ctx, id).await
    }

    /// Looks up every ID concurrently
    ///
    /// The outer error is the caller's cancellation. Per-ID failures are gathered
    /// into the [`BatchLookupError`] while the users that did resolve are kept,
    /// in completion order.
    pub async fn get_by_user_ids(
        &self,
        ctx: &CallContext,
        ids: &[String],
    ) -> Result<(Vec<User>, Option<BatchLookupError>), DomainError> {
        let store = Arc::clone(&self.store);

        let resolution = self
            .resolver
            .resolve(ctx, ids, move |ctx, id| {
                let store = Arc::clone(&store);
                async move { store.find_by_key(&ctx, &id).await }
            })
            .await?;

        let (users, error) = resolution.into_parts();
        if let Some(error) = &error {
            debug!(
                resolved = users.len(),
                failed = error.failures().len(),
                "Batch user lookup incomplete"
            );
        }

        Ok((users, error))
    }

    /// One page of users in registration order
    pub async fn list(
        &self,
        ctx: &CallContext,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page<User>, DomainError> {
        self.store.list_after(ctx, cursor, limit).await
    }
}
