//! Fan-out/fan-in resolver
//!
//! One task per key, a shared result channel and a single collector. Per-key
//! failures never cancel sibling lookups. When the caller's context fires, the
//! collector returns at once and in-flight tasks are left to finish on their
//! own; their results are never read.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use super::outcome::{LookupResult, Resolution};
use crate::domain::{CallContext, DomainError};

/// Resolves batches of keys concurrently through an injected single-key lookup
#[derive(Debug, Clone, Default)]
pub struct FanOutResolver {
    limiter: Option<Arc<Semaphore>>,
    max_concurrency: Option<usize>,
}

impl FanOutResolver {
    /// Unbounded: every key's lookup starts immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// At most `max_concurrency` lookups run at once; every key still gets its own task
    pub fn bounded(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);

        Self {
            limiter: Some(Arc::new(Semaphore::new(max_concurrency))),
            max_concurrency: Some(max_concurrency),
        }
    }

    pub fn from_limit(max_concurrency: Option<usize>) -> Self {
        match max_concurrency {
            Some(limit) => Self::bounded(limit),
            None => Self::new(),
        }
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Resolves every key in `keys`, duplicates included.
    ///
    /// On return the resolution holds exactly `keys.len()` outcomes in
    /// completion order. `Err` is returned only when `ctx` is cancelled or
    /// its deadline passes before all outcomes arrived.
    pub async fn resolve<V, F, Fut>(
        &self,
        ctx: &CallContext,
        keys: &[String],
        get_one: F,
    ) -> Result<Resolution<V>, DomainError>
    where
        V: Send + 'static,
        F: Fn(CallContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        if keys.is_empty() {
            return Ok(Resolution::new(Vec::new()));
        }

        if let Some(err) = ctx.err() {
            return Err(err);
        }

        debug!(
            keys = keys.len(),
            max_concurrency = ?self.max_concurrency,
            "Resolving batch"
        );

        // Capacity covers every key so that no sender ever waits on the collector
        let (tx, mut rx) = mpsc::channel::<LookupResult<V>>(keys.len());
        let get_one = Arc::new(get_one);

        for key in keys {
            let tx = tx.clone();
            let get_one = Arc::clone(&get_one);
            let limiter = self.limiter.clone();
            let ctx = ctx.clone();
            let key = key.clone();

            tokio::spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let outcome = get_one(ctx, key.clone()).await;

                // Fails only once the collector has given up
                let _ = tx.send(LookupResult { key, outcome }).await;
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(keys.len());

        while outcomes.len() < keys.len() {
            tokio::select! {
                biased;
                err = ctx.done() => {
                    debug!(
                        received = outcomes.len(),
                        pending = keys.len() - outcomes.len(),
                        "Batch resolution abandoned"
                    );
                    return Err(err);
                }
                received = rx.recv() => match received {
                    Some(result) => outcomes.push(result),
                    None => break,
                },
            }
        }

        if outcomes.len() < keys.len() {
            fill_missing(keys, &mut outcomes);
        }

        let resolution = Resolution::new(outcomes);
        debug!(
            resolved = resolution.values().count(),
            total = resolution.len(),
            "Batch resolved"
        );

        Ok(resolution)
    }
}

/// Records an outcome for keys whose task ended without reporting (a panicked lookup)
fn fill_missing<V>(keys: &[String], outcomes: &mut Vec<LookupResult<V>>) {
    let mut expected: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *expected.entry(key.as_str()).or_default() += 1;
    }
    for result in outcomes.iter() {
        if let Some(count) = expected.get_mut(result.key.as_str()) {
            *count = count.saturating_sub(1);
        }
    }

    for (key, missing) in expected {
        for _ in 0..missing {
            warn!(key = %key, "Lookup task ended without a result");
            outcomes.push(LookupResult {
                key: key.to_string(),
                outcome: Err(DomainError::unexpected(
                    "resolve",
                    key,
                    "lookup task terminated without a result",
                )),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::mock::{MockStore, TestRecord};
    use crate::domain::{ErrorKind, KeyedStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|k| k.to_string()).collect()
    }

    type LookupFuture =
        std::pin::Pin<Box<dyn Future<Output = Result<TestRecord, DomainError>> + Send>>;

    fn store_lookup(
        store: Arc<MockStore<TestRecord>>,
    ) -> impl Fn(CallContext, String) -> LookupFuture + Send + Sync + 'static {
        move |ctx: CallContext, key: String| -> LookupFuture {
            let store = Arc::clone(&store);
            Box::pin(async move { store.find_by_key(&ctx, &key).await })
        }
    }

    #[tokio::test]
    async fn test_empty_batch_returns_immediately() {
        let resolver = FanOutResolver::new();
        let resolution = resolver
            .resolve(&CallContext::background(), &[], |_, _| async {
                Ok::<u32, DomainError>(1)
            })
            .await
            .unwrap();

        assert!(resolution.is_empty());
        assert!(resolution.aggregate_error().is_none());
    }

    #[tokio::test]
    async fn test_partial_failure_names_missing_key() {
        let store = Arc::new(
            MockStore::new()
                .with_entity(TestRecord::at("u1", 1))
                .with_entity(TestRecord::at("u2", 2)),
        );
        let resolver = FanOutResolver::new();

        let resolution = resolver
            .resolve(
                &CallContext::background(),
                &keys(&["u1", "u2", "missing"]),
                store_lookup(store),
            )
            .await
            .unwrap();
        assert_eq!(resolution.len(), 3);

        let (values, error) = resolution.into_parts();
        let mut resolved: Vec<_> = values.iter().map(|r| r.id.as_str()).collect();
        resolved.sort();
        assert_eq!(resolved, vec!["u1", "u2"]);

        let error = error.unwrap();
        assert!(error.to_string().contains("missing"));
        assert_eq!(error.failed_keys().collect::<Vec<_>>(), vec!["missing"]);
        assert_eq!(error.failures()[0].kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unexpected_failure_does_not_cancel_siblings() {
        let store = Arc::new(
            MockStore::new()
                .with_entity(TestRecord::at("a", 1))
                .with_entity(TestRecord::at("c", 3))
                .with_failure("b", "connection reset"),
        );

        let (values, error) = FanOutResolver::new()
            .resolve(
                &CallContext::background(),
                &keys(&["a", "b", "c"]),
                store_lookup(store),
            )
            .await
            .unwrap()
            .into_parts();

        assert_eq!(values.len(), 2);
        let error = error.unwrap();
        assert_eq!(error.failures().len(), 1);
        assert_eq!(error.failures()[0].kind, ErrorKind::Unexpected);
        assert!(error.has_unexpected());
    }

    #[tokio::test]
    async fn test_duplicates_each_get_an_outcome() {
        let store = Arc::new(MockStore::new().with_entity(TestRecord::at("a", 1)));

        let resolution = FanOutResolver::new()
            .resolve(
                &CallContext::background(),
                &keys(&["a", "a", "zz", "a"]),
                store_lookup(store),
            )
            .await
            .unwrap();

        assert_eq!(resolution.len(), 4);
        assert_eq!(resolution.values().count(), 3);
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let resolution = FanOutResolver::new()
            .resolve(
                &CallContext::background(),
                &keys(&["slow", "fast"]),
                |_, key| async move {
                    let delay = if key == "slow" { 150 } else { 1 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok::<String, DomainError>(key)
                },
            )
            .await
            .unwrap();

        let order: Vec<&str> = resolution.outcomes().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(order, vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_deadline_aborts_collection() {
        let store = Arc::new(
            MockStore::new()
                .with_entity(TestRecord::at("a", 1))
                .with_delay(Duration::from_millis(500)),
        );
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let start = Instant::now();

        let err = FanOutResolver::new()
            .resolve(&ctx, &keys(&["a", "b"]), store_lookup(store))
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::DeadlineExceeded);
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_cancel_aborts_collection() {
        let ctx = CallContext::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = FanOutResolver::new()
            .resolve(&ctx, &keys(&["a"]), |_, key| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<String, DomainError>(key)
            })
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::Cancelled);
    }

    #[tokio::test]
    async fn test_already_cancelled_context() {
        let ctx = CallContext::background();
        ctx.cancel();

        let err = FanOutResolver::new()
            .resolve(&ctx, &keys(&["a"]), |_, key| async move {
                Ok::<String, DomainError>(key)
            })
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::Cancelled);
    }

    #[tokio::test]
    async fn test_bounded_caps_concurrency() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let resolver = FanOutResolver::bounded(2);

        let (active_in, peak_in) = (Arc::clone(&active), Arc::clone(&peak));
        let resolution = resolver
            .resolve(
                &CallContext::background(),
                &keys(&["a", "b", "c", "d", "e", "f"]),
                move |_, key| {
                    let active = Arc::clone(&active_in);
                    let peak = Arc::clone(&peak_in);
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok::<String, DomainError>(key)
                    }
                },
            )
            .await
            .unwrap();

        assert_eq!(resolution.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(resolver.max_concurrency(), Some(2));
    }

    #[tokio::test]
    async fn test_panicking_lookup_still_reports_outcome() {
        let resolution = FanOutResolver::new()
            .resolve(
                &CallContext::background(),
                &keys(&["ok", "boom"]),
                |_, key| async move {
                    if key == "boom" {
                        panic!("lookup exploded");
                    }
                    Ok::<String, DomainError>(key)
                },
            )
            .await
            .unwrap();

        assert_eq!(resolution.len(), 2);
        let error = resolution.aggregate_error().unwrap();
        assert_eq!(error.failed_keys().collect::<Vec<_>>(), vec!["boom"]);
    }

    #[test]
    fn test_from_limit() {
        assert_eq!(FanOutResolver::from_limit(None).max_concurrency(), None);
        assert_eq!(FanOutResolver::from_limit(Some(0)).max_concurrency(), Some(1));
    }
}
