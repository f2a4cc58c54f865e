//! Gophr keyed-store core
//!
//! Users and sessions behind a common keyed-store contract, with:
//! - Opaque timestamp cursors and forward keyset pagination
//! - Concurrent multi-key lookups with per-key outcomes
//! - Cancellation-aware access to a blocking session cache

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::bail;
use api::state::AppState;
use config::SessionBackend;
use domain::{KeyedStore, Session};
use infrastructure::cache::{CancellableCacheRepository, MokaSyncCache, MokaSyncCacheConfig};
use infrastructure::resolver::FanOutResolver;
use infrastructure::session::SessionService;
use infrastructure::storage::{FileStore, StoreBackend, StoreFactory};
use infrastructure::user::{RemoteUserConfig, RemoteUserStore, UserService};
use tracing::info;

/// Builds the user service over the configured backend
pub async fn create_user_service(config: &AppConfig) -> anyhow::Result<UserService> {
    let store_config = config.storage.store_config()?;
    let store = StoreFactory::create(&store_config).await?;
    let resolver = FanOutResolver::from_limit(config.resolver.max_concurrency);

    Ok(UserService::new(store, resolver))
}

/// Builds the user service the CLI reads through
///
/// An explicit `api_url` wins over `client.api_url`. Without either the CLI
/// opens the storage backend directly, which only makes sense for backends that
/// outlive the process.
pub async fn create_cli_user_service(
    config: &AppConfig,
    api_url: Option<&str>,
) -> anyhow::Result<UserService> {
    if let Some(url) = api_url.or(config.client.api_url.as_deref()) {
        let remote = RemoteUserConfig::new(url).with_timeout(config.client.timeout());
        let store = RemoteUserStore::new(remote)?;
        info!(api_url = %store.base_url(), "Reading users through the API");

        let resolver = FanOutResolver::from_limit(config.resolver.max_concurrency);
        return Ok(UserService::new(Arc::new(store), resolver));
    }

    if config.storage.backend == StoreBackend::Memory {
        bail!(
            "the memory backend starts empty in every process; \
             pass --api-url, set client.api_url, or configure a file or postgres backend"
        );
    }

    create_user_service(config).await
}

/// Builds the session service over the configured session backend
pub async fn create_session_service(config: &AppConfig) -> anyhow::Result<SessionService> {
    let store: Arc<dyn KeyedStore<Session>> = match config.session.backend {
        SessionBackend::Cache => {
            let cache = MokaSyncCache::with_config(
                MokaSyncCacheConfig::default().with_max_capacity(config.cache.max_capacity),
            );
            Arc::new(
                CancellableCacheRepository::new(Arc::new(cache))
                    .with_ttl(config.cache.default_ttl()),
            )
        }
        SessionBackend::File => {
            Arc::new(FileStore::<Session>::open(config.session.file_path.clone()).await?)
        }
    };

    Ok(SessionService::new(store).with_ttl(config.session.ttl()))
}

/// Create the application state with all services initialized
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let user_service = create_user_service(config).await?;
    let session_service = create_session_service(config).await?;

    info!(
        backend = ?config.storage.backend,
        session_backend = ?config.session.backend,
        max_concurrency = ?config.resolver.max_concurrency,
        "Application state initialized"
    );

    Ok(AppState::new(
        Arc::new(user_service),
        Arc::new(session_service),
        config.server.request_timeout(),
    ))
}
