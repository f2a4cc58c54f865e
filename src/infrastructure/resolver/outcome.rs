//! Per-key outcomes and the aggregate batch error

use thiserror::Error;

use crate::domain::{DomainError, ErrorKind};

/// Outcome of one key within a batch
#[derive(Debug, Clone)]
pub struct LookupResult<V> {
    pub key: String,
    pub outcome: Result<V, DomainError>,
}

/// A key that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFailure {
    pub key: String,
    pub kind: ErrorKind,
    pub error: DomainError,
}

impl std::fmt::Display for KeyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::NotFound => write!(f, "key '{}' not found", self.key),
            kind => write!(f, "key '{}' failed ({}): {}", self.key, kind, self.error),
        }
    }
}

/// Every failed key of one batch, one line each
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", render_failures(.failures))]
pub struct BatchLookupError {
    failures: Vec<KeyFailure>,
}

fn render_failures(failures: &[KeyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl BatchLookupError {
    pub fn failures(&self) -> &[KeyFailure] {
        &self.failures
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.key.as_str())
    }

    /// Whether any key failed for a reason other than being absent
    pub fn has_unexpected(&self) -> bool {
        self.failures.iter().any(|f| f.kind != ErrorKind::NotFound)
    }
}

/// All outcomes of one resolve call, in completion order
#[derive(Debug, Clone)]
pub struct Resolution<V> {
    outcomes: Vec<LookupResult<V>>,
}

impl<V> Resolution<V> {
    pub(crate) fn new(outcomes: Vec<LookupResult<V>>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[LookupResult<V>] {
        &self.outcomes
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.outcomes.iter().filter_map(|r| r.outcome.as_ref().ok())
    }

    /// The aggregate error, `None` only if every key succeeded
    pub fn aggregate_error(&self) -> Option<BatchLookupError> {
        let failures: Vec<KeyFailure> = self
            .outcomes
            .iter()
            .filter_map(|r| match &r.outcome {
                Ok(_) => None,
                Err(error) => Some(KeyFailure {
                    key: r.key.clone(),
                    kind: error.kind(),
                    error: error.clone(),
                }),
            })
            .collect();

        if failures.is_empty() {
            None
        } else {
            Some(BatchLookupError { failures })
        }
    }

    /// Splits into resolved values and the aggregate error
    pub fn into_parts(self) -> (Vec<V>, Option<BatchLookupError>) {
        let error = self.aggregate_error();
        let values = self
            .outcomes
            .into_iter()
            .filter_map(|r| r.outcome.ok())
            .collect();

        (values, error)
    }
}
