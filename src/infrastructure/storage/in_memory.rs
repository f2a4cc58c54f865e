//! In-memory store implementation

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::store::list_after_snapshot;
use crate::domain::{CallContext, Cursor, DomainError, KeyedEntity, KeyedStore, Page, PagedStore};

/// Thread-safe in-memory store
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryStore<E>
where
    E: KeyedEntity,
{
    entities: RwLock<HashMap<String, E>>,
}

impl<E> Default for InMemoryStore<E>
where
    E: KeyedEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStore<E>
where
    E: KeyedEntity,
{
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store pre-populated with entities; later duplicates replace earlier ones
    pub fn with_entities(entities: Vec<E>) -> Self {
        let map = entities
            .into_iter()
            .map(|e| (e.key().to_string(), e.at_cursor_precision()))
            .collect();

        Self {
            entities: RwLock::new(map),
        }
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

#[async_trait]
impl<E> KeyedStore<E> for InMemoryStore<E>
where
    E: KeyedEntity,
{
    async fn find_by_key(&self, ctx: &CallContext, key: &str) -> Result<E, DomainError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        self.entities
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::not_found(key))
    }

    async fn save(&self, ctx: &CallContext, entity: E) -> Result<(), DomainError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let mut entities = self.entities.write().await;

        if entities.contains_key(entity.key()) {
            return Err(DomainError::already_exists(entity.key()));
        }

        entities.insert(entity.key().to_string(), entity.at_cursor_precision());
        Ok(())
    }

    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), DomainError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        self.entities
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(key))
    }
}

#[async_trait]
impl<E> PagedStore<E> for InMemoryStore<E>
where
    E: KeyedEntity,
{
    async fn list_after(
        &self,
        ctx: &CallContext,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page<E>, DomainError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let snapshot: Vec<E> = self.entities.read().await.values().cloned().collect();
        list_after_snapshot(snapshot, cursor, limit)
    }
}
