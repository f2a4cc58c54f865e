//! PostgreSQL store implementation with connection pooling

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::debug;

use crate::domain::store::start_boundary;
use crate::domain::{CallContext, Cursor, DomainError, KeyedEntity, KeyedStore, Page, PagedStore};

/// PostgreSQL store configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/gophr".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// Entities stored as JSON documents keyed by their string key
///
/// `created_at` lives in its own column so listings can use an index instead of
/// unpacking the document.
pub struct PostgresStore<E>
where
    E: KeyedEntity,
{
    pool: PgPool,
    table_name: String,
    _phantom: PhantomData<E>,
}

impl<E> Debug for PostgresStore<E>
where
    E: KeyedEntity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl<E> PostgresStore<E>
where
    E: KeyedEntity,
{
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
            _phantom: PhantomData,
        }
    }

    pub async fn connect(
        config: &PostgresConfig,
        table_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let table_name = table_name.into();
        validate_table_name(&table_name)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                DomainError::configuration(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        Ok(Self::new(pool, table_name))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the table and its creation-time index if missing
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                key VARCHAR(255) PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            table = self.table_name
        );
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_created_at_idx ON {table} (created_at)",
            table = self.table_name
        );

        for query in [create_table, create_index] {
            sqlx::query(&query)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::unexpected("ensure_table", &self.table_name, e))?;
        }

        Ok(())
    }

    fn decode_row(&self, operation: &str, row: &PgRow) -> Result<E, DomainError> {
        let key: String = row.get("key");
        let data: serde_json::Value = row.get("data");

        serde_json::from_value::<E>(data)
            .map(KeyedEntity::at_cursor_precision)
            .map_err(|e| DomainError::unexpected(operation, key, e))
    }
}

/// Table names are interpolated into SQL, so only identifiers are accepted
fn validate_table_name(name: &str) -> Result<(), DomainError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DomainError::configuration(format!(
            "Invalid table name '{}'",
            name
        )))
    }
}

#[async_trait]
impl<E> KeyedStore<E> for PostgresStore<E>
where
    E: KeyedEntity,
{
    async fn find_by_key(&self, ctx: &CallContext, key: &str) -> Result<E, DomainError> {
        let query = format!("SELECT key, data FROM {} WHERE key = $1", self.table_name);

        let row = ctx
            .run(async {
                sqlx::query(&query)
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| DomainError::unexpected("find_by_key", key, e))
            })
            .await?;

        match row {
            Some(row) => self.decode_row("find_by_key", &row),
            None => Err(DomainError::not_found(key)),
        }
    }

    async fn save(&self, ctx: &CallContext, entity: E) -> Result<(), DomainError> {
        let entity = entity.at_cursor_precision();
        let key = entity.key().to_string();
        let created_at = entity.created_at();
        let data =
            serde_json::to_value(&entity).map_err(|e| DomainError::unexpected("save", &key, e))?;

        let query = format!(
            "INSERT INTO {} (key, data, created_at) VALUES ($1, $2, $3)",
            self.table_name
        );

        ctx.run(async {
            sqlx::query(&query)
                .bind(&key)
                .bind(&data)
                .bind(created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        DomainError::already_exists(&key)
                    }
                    other => DomainError::unexpected("save", &key, other),
                })
        })
        .await?;

        Ok(())
    }

    async fn delete(&self, ctx: &CallContext, key: &str) -> Result<(), DomainError> {
        let query = format!("DELETE FROM {} WHERE key = $1", self.table_name);

        let result = ctx
            .run(async {
                sqlx::query(&query)
                    .bind(key)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| DomainError::unexpected("delete", key, e))
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(key));
        }

        Ok(())
    }
}

#[async_trait]
impl<E> PagedStore<E> for PostgresStore<E>
where
    E: KeyedEntity,
{
    async fn list_after(
        &self,
        ctx: &CallContext,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page<E>, DomainError> {
        let boundary: Option<DateTime<Utc>> = start_boundary(cursor, limit)?;
        let cursor_key = cursor.map(Cursor::as_str).unwrap_or("");

        let query = format!(
            r#"
            SELECT key, data FROM {}
            WHERE $1::TIMESTAMPTZ IS NULL OR created_at > $1
            ORDER BY created_at
            LIMIT $2
            "#,
            self.table_name
        );

        let rows = ctx
            .run(async {
                sqlx::query(&query)
                    .bind(boundary)
                    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| DomainError::unexpected("list_after", cursor_key, e))
            })
            .await?;

        let items = rows
            .iter()
            .map(|row| self.decode_row("list_after", row))
            .collect::<Result<Vec<E>, _>>()?;

        debug!(table = %self.table_name, count = items.len(), "Listed page");
        Ok(Page::from_rows(items, limit))
    }
}
