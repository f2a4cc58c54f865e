//! Storage infrastructure - KeyedStore / PagedStore backends

mod factory;
mod file;
mod in_memory;
mod postgres;

pub use factory::{StoreBackend, StoreConfig, StoreFactory};
pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};
