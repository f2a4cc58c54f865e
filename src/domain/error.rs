use thiserror::Error;

/// Core domain errors
///
/// A closed set of kinds. Boundaries match on the variant (or on [`ErrorKind`])
/// instead of comparing against sentinel values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Not found: '{key}'")]
    NotFound { key: String },

    #[error("Already exists: '{key}'")]
    AlreadyExists { key: String },

    #[error("Invalid cursor: {message}")]
    InvalidCursor { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Unexpected error in {operation} for '{key}': {message}")]
    Unexpected {
        operation: String,
        key: String,
        message: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Payload-free discriminant of [`DomainError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidCursor,
    Cancelled,
    DeadlineExceeded,
    Unexpected,
    Validation,
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::InvalidCursor => "invalid_cursor",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Unexpected => "unexpected",
            Self::Validation => "validation",
            Self::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

impl DomainError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    pub fn invalid_cursor(message: impl Into<String>) -> Self {
        Self::InvalidCursor {
            message: message.into(),
        }
    }

    /// Wraps an underlying failure with the operation name and key it happened on
    pub fn unexpected(
        operation: impl Into<String>,
        key: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Unexpected {
            operation: operation.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidCursor { .. } => ErrorKind::InvalidCursor,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Expected conditions that callers handle as typed results, not failures
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound | ErrorKind::AlreadyExists | ErrorKind::InvalidCursor
        )
    }

    /// Errors produced by the caller's cancellation signal
    pub fn is_cancellation(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled | ErrorKind::DeadlineExceeded)
    }
}
