//! Store factory for runtime backend selection

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::domain::{DomainError, KeyedEntity, PagedStore};

use super::file::FileStore;
use super::in_memory::InMemoryStore;
use super::postgres::{PostgresConfig, PostgresStore};

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-memory store (for testing/development)
    #[default]
    Memory,
    /// JSON file on local disk
    File,
    /// PostgreSQL table
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                other
            ))),
        }
    }
}

/// Fully resolved backend settings
#[derive(Debug, Clone)]
pub enum StoreConfig {
    InMemory,
    File { path: PathBuf },
    Postgres { config: PostgresConfig, table: String },
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn postgres(config: PostgresConfig, table: impl Into<String>) -> Self {
        Self::Postgres {
            config,
            table: table.into(),
        }
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::InMemory => StoreBackend::Memory,
            Self::File { .. } => StoreBackend::File,
            Self::Postgres { .. } => StoreBackend::Postgres,
        }
    }
}

/// Factory for creating paged stores
#[derive(Debug)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates the configured backend, preparing its schema or file as needed
    pub async fn create<E>(config: &StoreConfig) -> Result<Arc<dyn PagedStore<E>>, DomainError>
    where
        E: KeyedEntity,
    {
        info!(backend = ?config.backend(), "Creating store");

        match config {
            StoreConfig::InMemory => Ok(Arc::new(InMemoryStore::<E>::new())),
            StoreConfig::File { path } => Ok(Arc::new(FileStore::<E>::open(path.clone()).await?)),
            StoreConfig::Postgres { config, table } => {
                let store = PostgresStore::<E>::connect(config, table.clone()).await?;
                store.ensure_table().await?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CallContext;
    use crate::domain::store::mock::TestRecord;

    #[test]
    fn test_store_backend_from_str() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("in-memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("FILE".parse::<StoreBackend>().unwrap(), StoreBackend::File);
        assert_eq!("postgresql".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("pg".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);

        let err = "mongo".parse::<StoreBackend>().unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_store_config_backend() {
        assert_eq!(StoreConfig::in_memory().backend(), StoreBackend::Memory);
        assert_eq!(StoreConfig::file("x.json").backend(), StoreBackend::File);
        assert_eq!(
            StoreConfig::postgres(PostgresConfig::default(), "users").backend(),
            StoreBackend::Postgres
        );
    }

    #[tokio::test]
    async fn test_create_in_memory() {
        let store = StoreFactory::create::<TestRecord>(&StoreConfig::in_memory())
            .await
            .unwrap();
        let ctx = CallContext::background();

        store.save(&ctx, TestRecord::at("a", 0)).await.unwrap();
        assert_eq!(store.list_after(&ctx, None, 5).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_create_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig::file(dir.path().join("records.json"));

        let store = StoreFactory::create::<TestRecord>(&config).await.unwrap();
        store
            .save(&CallContext::background(), TestRecord::at("a", 0))
            .await
            .unwrap();

        assert!(dir.path().join("records.json").exists());
    }
}
