//! Opaque pagination cursors
//!
//! A cursor is the standard base64 encoding of a fixed-layout timestamp
//! (`YYYY-MM-DDTHH:MM:SS.sss±HH:MM`). Cursors are not sortable as strings;
//! compare them only after decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Millisecond precision with an explicit UTC offset
pub const CURSOR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Opaque token wrapping a timestamp boundary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a client-supplied token without validating it
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Parses a wire value, where the empty string means "start of the sequence"
    pub fn from_wire(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes and decodes [`Cursor`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorCodec;

impl CursorCodec {
    pub fn encode(t: DateTime<Utc>) -> Cursor {
        let formatted = t.format(CURSOR_TIME_FORMAT).to_string();
        Cursor(STANDARD.encode(formatted.as_bytes()))
    }

    pub fn decode(cursor: &Cursor) -> Result<DateTime<Utc>, DomainError> {
        let bytes = STANDARD
            .decode(cursor.as_str())
            .map_err(|e| DomainError::invalid_cursor(format!("not valid base64: {}", e)))?;

        let formatted = String::from_utf8(bytes)
            .map_err(|e| DomainError::invalid_cursor(format!("not valid UTF-8: {}", e)))?;

        let parsed = DateTime::parse_from_str(&formatted, CURSOR_TIME_FORMAT).map_err(|e| {
            DomainError::invalid_cursor(format!("malformed timestamp '{}': {}", formatted, e))
        })?;

        Ok(parsed.with_timezone(&Utc))
    }

    /// Drops sub-millisecond precision, the finest precision a cursor carries
    pub fn truncate(t: DateTime<Utc>) -> DateTime<Utc> {
        let millis_only = (t.nanosecond() / 1_000_000) * 1_000_000;
        t.with_nanosecond(millis_only).unwrap_or(t)
    }
}
