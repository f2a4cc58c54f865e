//! Forward keyset pagination by creation time
//!
//! Creation times are compared at cursor (millisecond) precision. Rows created
//! within the same millisecond share a position: there is no secondary ordering
//! key, so a page boundary that falls inside such a group skips the rest of it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entity::KeyedEntity;
use crate::domain::DomainError;
use crate::domain::cursor::{Cursor, CursorCodec};

/// One page of a `list_after` walk
#[derive(Debug, Clone, Serialize)]
pub struct Page<E> {
    pub items: Vec<E>,
    /// `None` once fewer than `limit` rows came back
    pub next_cursor: Option<Cursor>,
}

impl<E: KeyedEntity> Page<E> {
    /// Builds a page from rows already ordered ascending by `created_at`
    pub fn from_rows(items: Vec<E>, limit: usize) -> Self {
        let next_cursor = if limit > 0 && items.len() == limit {
            items.last().map(|last| CursorCodec::encode(last.created_at()))
        } else {
            None
        };

        Self { items, next_cursor }
    }

    /// The value carried to HTTP clients, empty when there are no more pages
    pub fn next_cursor_wire(&self) -> &str {
        self.next_cursor.as_ref().map(Cursor::as_str).unwrap_or("")
    }
}

/// Decodes the lower (exclusive) bound of a listing; `None` means unbounded
pub fn start_boundary(
    cursor: Option<&Cursor>,
    limit: usize,
) -> Result<Option<DateTime<Utc>>, DomainError> {
    if limit == 0 {
        return Err(DomainError::validation("limit must be greater than zero"));
    }

    cursor.map(CursorCodec::decode).transpose()
}

/// Runs the pagination protocol over an in-memory snapshot
pub fn list_after_snapshot<E, I>(
    entities: I,
    cursor: Option<&Cursor>,
    limit: usize,
) -> Result<Page<E>, DomainError>
where
    E: KeyedEntity,
    I: IntoIterator<Item = E>,
{
    let boundary = start_boundary(cursor, limit)?;

    let mut rows: Vec<E> = entities
        .into_iter()
        .map(KeyedEntity::at_cursor_precision)
        .filter(|e| boundary.is_none_or(|b| e.created_at() > b))
        .collect();
    rows.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.key().cmp(b.key()))
    });
    rows.truncate(limit);

    Ok(Page::from_rows(rows, limit))
}
