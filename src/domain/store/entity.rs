//! Keyed entity trait

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::domain::cursor::CursorCodec;

/// A record addressed by an opaque unique key and ordered by its creation time
pub trait KeyedEntity:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Unique key of the entity
    fn key(&self) -> &str;

    /// Ordering and pagination key
    fn created_at(&self) -> DateTime<Utc>;

    fn set_created_at(&mut self, created_at: DateTime<Utc>);

    /// Drops the sub-millisecond part of `created_at`
    ///
    /// Stores apply this to everything they hold so that ordering, filtering and
    /// cursors all work on the value a cursor can represent.
    fn at_cursor_precision(mut self) -> Self {
        let truncated = CursorCodec::truncate(self.created_at());
        self.set_created_at(truncated);
        self
    }
}
