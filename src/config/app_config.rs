use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::storage::{PostgresConfig, StoreBackend, StoreConfig};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub resolver: ResolverConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline given to each request's store calls
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    pub file_path: PathBuf,
    pub postgres_url: Option<String>,
    pub max_connections: u32,
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub default_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    /// Used by the file backend
    pub file_path: PathBuf,
    /// Lifetime of issued sessions
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// In-process moka cache; sessions are lost on restart
    #[default]
    Cache,
    /// JSON file keyed by session ID
    File,
}

/// Settings for the CLI's remote API client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of a running API; commands read through it when set
    pub api_url: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound on concurrent lookups per batch; unbounded when unset
    pub max_concurrency: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_ms: 2000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            file_path: PathBuf::from("users.json"),
            postgres_url: None,
            max_connections: 10,
            table: "users".to_string(),
        }
    }
}

impl StorageConfig {
    /// Resolves the backend settings, requiring a URL for postgres
    pub fn store_config(&self) -> Result<StoreConfig, config::ConfigError> {
        match self.backend {
            StoreBackend::Memory => Ok(StoreConfig::in_memory()),
            StoreBackend::File => Ok(StoreConfig::file(self.file_path.clone())),
            StoreBackend::Postgres => {
                let url = self.postgres_url.as_deref().ok_or_else(|| {
                    config::ConfigError::Message(
                        "storage.postgres_url is required for the postgres backend".to_string(),
                    )
                })?;
                let pg = PostgresConfig::new(url).with_max_connections(self.max_connections);

                Ok(StoreConfig::postgres(pg, self.table.clone()))
            }
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            default_ttl_secs: 86_400,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            file_path: PathBuf::from("sessions.json"),
            ttl_secs: 86_400,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
