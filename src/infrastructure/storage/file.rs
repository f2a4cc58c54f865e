//! JSON file store
//!
//! The whole file is a single `key -> entity` object. It is read once when the
//! store is opened and rewritten after every successful mutation.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::store::list_after_snapshot;
use crate::domain::{CallContext, Cursor, DomainError, KeyedEntity, KeyedStore, Page, PagedStore};

#[derive(Debug)]
pub struct FileStore<E>
where
    E: KeyedEntity,
{
    path: PathBuf,
    entities: RwLock<HashMap<String, E>>,
}

impl<E> FileStore<E>
where
    E: KeyedEntity,
{
    /// Loads `path`, starting empty if the file does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        let entities = load(&path).await?;

        info!(path = %path.display(), count = entities.len(), "Opened file store");

        Ok(Self {
            path,
            entities: RwLock::new(entities),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(
        &self,
        operation: &str,
        key: &str,
        entities: &HashMap<String, E>,
    ) -> Result<(), DomainError> {
        let body = serde_json::to_vec_pretty(entities)
            .map_err(|e| DomainError::unexpected(operation, key, e))?;

        // Write-then-rename so readers never see a truncated file
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| DomainError::unexpected(operation, key, e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| DomainError::unexpected(operation, key, e))?;

        debug!(path = %self.path.display(), operation, key, "Persisted file store");
        Ok(())
    }
}

async fn load<E: KeyedEntity>(path: &Path) -> Result<HashMap<String, E>, DomainError> {
    let origin = path.display().to_string();

    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(HashMap::new()),
        Ok(bytes) => {
            let entities: HashMap<String, E> = serde_json::from_slice(&bytes)
                .map_err(|e| DomainError::unexpected("open", origin, e))?;

            Ok(entities
                .into_iter()
                .map(|(key, entity)| (key, entity.at_cursor_precision()))
                .collect())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(DomainError::unexpected("open", origin, e)),
    }
}

#[async_trait]
impl<E> KeyedStore<E> for FileStore<E>
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

        let key = entity.key().to_string();
        let mut entities = self.entities.write().await;

        if entities.contains_key(&key) {
            return Err(DomainError::already_exists(key));
        }

        entities.insert(key.clone(), entity.at_cursor_precision());

        if let Err(e) = self.persist("save", &key, &entities).await {
            entities.remove(&key);
            return Err(e);
        }

        Ok(())
    }

    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), DomainError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let mut entities = self.entities.write().await;
        let removed = entities
            .remove(key)
            .ok_or_else(|| DomainError::not_found(key))?;

        if let Err(e) = self.persist("delete", key, &entities).await {
            entities.insert(key.to_string(), removed);
            return Err(e);
        }

        Ok(())
    }
}

#[async_trait]
impl<E> PagedStore<E> for FileStore<E>
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::mock::TestRecord;
    use tempfile::TempDir;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("records.json")
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();

        let page = store
            .list_after(&CallContext::background(), None, 10)
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_save_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let ctx = CallContext::background();
        let record = TestRecord::at("a", 1);

        {
            let store: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();
            store.save(&ctx, record.clone()).await.unwrap();
        }

        let reopened: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();
        assert_eq!(reopened.find_by_key(&ctx, "a").await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_file_is_a_key_to_entity_map() {
        let dir = TempDir::new().unwrap();
        let store: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();
        store
            .save(&CallContext::background(), TestRecord::at("a", 1))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(parsed["a"]["id"], "a");
    }

    #[tokio::test]
    async fn test_save_conflict() {
        let dir = TempDir::new().unwrap();
        let ctx = CallContext::background();
        let store: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();

        store.save(&ctx, TestRecord::at("a", 1)).await.unwrap();
        let err = store.save(&ctx, TestRecord::at("a", 2)).await.unwrap_err();

        assert_eq!(err, DomainError::already_exists("a"));
    }

    #[tokio::test]
    async fn test_delete_persists() {
        let dir = TempDir::new().unwrap();
        let ctx = CallContext::background();
        let store: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();
        store.save(&ctx, TestRecord::at("a", 1)).await.unwrap();
        store.save(&ctx, TestRecord::at("b", 2)).await.unwrap();

        store.delete(&ctx, "a").await.unwrap();

        let reopened: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();
        assert!(reopened.find_by_key(&ctx, "a").await.is_err());
        assert!(reopened.find_by_key(&ctx, "b").await.is_ok());
        assert!(matches!(
            reopened.delete(&ctx, "a").await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_loaded_rows_are_kept_at_cursor_precision() {
        let dir = TempDir::new().unwrap();
        let on_disk = serde_json::json!({
            "a": TestRecord::at_micros("a", 100),
            "b": TestRecord::at_micros("b", 1_900),
        });
        std::fs::write(store_path(&dir), on_disk.to_string()).unwrap();

        let store: FileStore<TestRecord> = FileStore::open(store_path(&dir)).await.unwrap();
        let ctx = CallContext::background();

        let first = store.list_after(&ctx, None, 1).await.unwrap();
        let second = store
            .list_after(&ctx, first.next_cursor.as_ref(), 1)
            .await
            .unwrap();

        assert_eq!(first.items[0], TestRecord::at_micros("a", 0));
        assert_eq!(second.items[0], TestRecord::at_micros("b", 1_000));
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        std::fs::write(store_path(&dir), "{ not json").unwrap();

        let err = FileStore::<TestRecord>::open(store_path(&dir))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Unexpected { .. }));
    }
}
