//! Keyed store trait definitions

use std::fmt::Debug;

use async_trait::async_trait;

use super::entity::KeyedEntity;
use super::pagination::Page;
use crate::domain::DomainError;
use crate::domain::context::CallContext;
use crate::domain::cursor::Cursor;

/// Point-lookup half of the storage contract
///
/// Implemented by durable tables, files and caches alike.
#[async_trait]
pub trait KeyedStore<E>: Send + Sync + Debug
where
    E: KeyedEntity,
{
    /// Retrieves an entity by key, `NotFound` if absent
    async fn find_by_key(&self, ctx: &CallContext, key: &str) -> Result<E, DomainError>;

    /// Creates an entity, `AlreadyExists` if the key is taken
    async fn save(&self, ctx: &CallContext, entity: E) -> Result<(), DomainError>;

    /// Deletes an entity by key
    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), DomainError>;
}

/// Stores that can walk their entities in creation order
#[async_trait]
pub trait PagedStore<E>: KeyedStore<E>
where
    E: KeyedEntity,
{
    /// Returns up to `limit` entities created strictly after `cursor`, ascending.
    /// A `None` cursor starts from the beginning of the sequence.
    async fn list_after(
        &self,
        ctx: &CallContext,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page<E>, DomainError>;
}
