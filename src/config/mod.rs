//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, ClientConfig, LogFormat, LoggingConfig, ResolverConfig, ServerConfig,
    SessionBackend, SessionConfig, StorageConfig,
};
