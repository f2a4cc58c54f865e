//! Cancellation-aware cache repository
//!
//! Wraps a [`SyncCache`] so it can serve the [`KeyedStore`] contract. Each call
//! runs the primitive on the blocking pool and races it against the caller's
//! context. Cancellation is cooperative: when the context wins, the primitive
//! call keeps running to completion and its result is dropped unread. A call
//! that lost the race may therefore still take effect (a late `add` still
//! inserts).

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::primitive::{AddError, SyncCache};
use crate::domain::{CallContext, DomainError, KeyedEntity, KeyedStore};

/// Expiration applied to saved entries unless overridden with [`CancellableCacheRepository::with_ttl`]
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// [`KeyedStore`] over a blocking cache, with create-if-absent saves
#[derive(Debug)]
pub struct CancellableCacheRepository<E, C>
where
    E: KeyedEntity,
    C: SyncCache<E> + 'static,
{
    cache: Arc<C>,
    ttl: Duration,
    _phantom: PhantomData<E>,
}

impl<E, C> CancellableCacheRepository<E, C>
where
    E: KeyedEntity,
    C: SyncCache<E> + 'static,
{
    pub fn new(cache: Arc<C>) -> Self {
        Self {
            cache,
            ttl: DEFAULT_TTL,
            _phantom: PhantomData,
        }
    }

    /// Sets the TTL applied to every saved entry
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Runs `call` in the background and waits for it or for `ctx`, whichever
    /// comes first. Exactly one of the two outcomes is returned.
    async fn race<T, F>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        key: &str,
        call: F,
    ) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: FnOnce(&C) -> Result<T, DomainError> + Send + 'static,
    {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let cache = Arc::clone(&self.cache);
        let call_ctx = ctx.clone();
        let handle = tokio::task::spawn_blocking(move || {
            // The context may have fired while this task waited for a thread
            if let Some(err) = call_ctx.err() {
                return Err(err);
            }
            call(&cache)
        });

        tokio::select! {
            biased;
            err = ctx.done() => {
                debug!(operation, key, error = %err, "Cache call abandoned");
                Err(err)
            }
            joined = handle => match joined {
                Ok(result) => result,
                Err(e) => Err(DomainError::unexpected(operation, key, e)),
            },
        }
    }
}

#[async_trait]
impl<E, C> KeyedStore<E> for CancellableCacheRepository<E, C>
where
    E: KeyedEntity,
    C: SyncCache<E> + 'static,
{
    async fn find_by_key(&self, ctx: &CallContext, key: &str) -> Result<E, DomainError> {
        let owned_key = key.to_string();

        self.race(ctx, "find_by_key", key, move |cache| {
            cache
                .get(&owned_key)
                .ok_or_else(|| DomainError::not_found(owned_key))
        })
        .await
    }

    async fn save(&self, ctx: &CallContext, entity: E) -> Result<(), DomainError> {
        let key = entity.key().to_string();
        let owned_key = key.clone();
        let ttl = self.ttl;

        self.race(ctx, "save", &key, move |cache| {
            cache
                .add(&owned_key, entity, ttl)
                .map_err(|AddError::Exists(existing)| DomainError::already_exists(existing))
        })
        .await
    }

    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), DomainError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        self.cache.delete(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Session;
    use crate::infrastructure::cache::MokaSyncCache;
    use crate::infrastructure::cache::primitive::mock::SlowCache;
    use std::time::Instant;

    fn repository() -> CancellableCacheRepository<Session, MokaSyncCache<Session>> {
        CancellableCacheRepository::new(Arc::new(MokaSyncCache::new()))
    }

    fn slow_repository(
        delay: Duration,
    ) -> (
        Arc<SlowCache<Session>>,
        CancellableCacheRepository<Session, SlowCache<Session>>,
    ) {
        let cache = Arc::new(SlowCache::new(delay));
        (Arc::clone(&cache), CancellableCacheRepository::new(cache))
    }

    #[tokio::test]
    async fn test_save_then_find() {
        let repo = repository();
        let ctx = CallContext::background();
        let session = Session::issue("u1", Duration::from_secs(60));

        repo.save(&ctx, session.clone()).await.unwrap();
        let found = repo.find_by_key(&ctx, session.id()).await.unwrap();

        assert_eq!(found, session);
    }

    #[tokio::test]
    async fn test_find_missing() {
        let repo = repository();
        let err = repo
            .find_by_key(&CallContext::background(), "nope")
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::not_found("nope"));
    }

    #[tokio::test]
    async fn test_second_save_already_exists() {
        let repo = repository();
        let ctx = CallContext::background();
        let session = Session::issue("u1", Duration::from_secs(60));

        repo.save(&ctx, session.clone()).await.unwrap();
        let err = repo.save(&ctx, session.clone()).await.unwrap_err();

        assert_eq!(err, DomainError::already_exists(session.id()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_have_one_winner() {
        let repo = Arc::new(repository());
        let session = Session::issue("u1", Duration::from_secs(60));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let session = session.clone();
                tokio::spawn(async move { repo.save(&CallContext::background(), session).await })
            })
            .collect();

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => wins += 1,
                Err(DomainError::AlreadyExists { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_find_returns_at_deadline_not_after_slow_call() {
        let (_, repo) = slow_repository(Duration::from_millis(500));
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let start = Instant::now();

        let err = repo.find_by_key(&ctx, "s1").await.unwrap_err();

        assert_eq!(err, DomainError::DeadlineExceeded);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_save_returns_at_deadline_and_completes_in_background() {
        let (cache, repo) = slow_repository(Duration::from_millis(300));
        let session = Session::issue("u1", Duration::from_secs(60));
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let start = Instant::now();

        let err = repo.save(&ctx, session.clone()).await.unwrap_err();
        assert_eq!(err, DomainError::DeadlineExceeded);
        assert!(start.elapsed() < Duration::from_millis(200));

        // The wrapped call was not interrupted
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(cache.calls(), 1);
        let found = repo
            .find_by_key(&CallContext::background(), session.id())
            .await
            .unwrap();
        assert_eq!(found, session);
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_primitive() {
        let (cache, repo) = slow_repository(Duration::from_millis(50));
        let ctx = CallContext::background();
        ctx.cancel();

        let err = repo.find_by_key(&ctx, "s1").await.unwrap_err();

        assert_eq!(err, DomainError::Cancelled);
        assert_eq!(cache.calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_passes_through() {
        let repo = repository();
        let ctx = CallContext::background();
        let session = Session::issue("u1", Duration::from_secs(60));

        repo.save(&ctx, session.clone()).await.unwrap();
        repo.delete(&ctx, session.id()).await.unwrap();

        let err = repo.find_by_key(&ctx, session.id()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        repo.delete(&ctx, "never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_default_ttl() {
        assert_eq!(repository().ttl(), DEFAULT_TTL);
        assert_eq!(DEFAULT_TTL, Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_ttl_override() {
        let repo = repository().with_ttl(Duration::from_millis(50));
        let ctx = CallContext::background();
        let session = Session::issue("u1", Duration::from_secs(60));
        assert_eq!(repo.ttl(), Duration::from_millis(50));

        repo.save(&ctx, session.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        let err = repo.find_by_key(&ctx, session.id()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
