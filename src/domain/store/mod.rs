//! Keyed store domain - the storage contract every backend implements

mod entity;
mod pagination;
mod repository;

pub use entity::KeyedEntity;
pub use pagination::{Page, list_after_snapshot, start_boundary};
pub use repository::{KeyedStore, PagedStore};

#[cfg(test)]
pub use repository::mock;
