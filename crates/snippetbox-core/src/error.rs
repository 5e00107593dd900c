//! Storage error taxonomy.

use thiserror::Error;

/// Result type alias using [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors returned by the storage collaborators.
///
/// `NoRecord`, `InvalidCredentials` and `DuplicateEmail` are expected
/// outcomes that callers turn into 404s or form errors. `Storage` is an
/// infrastructure failure and always becomes a logged 500.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// No matching record was found.
    #[error("models: no matching record found")]
    NoRecord,

    /// Email and password did not match an active user.
    #[error("models: invalid credentials")]
    InvalidCredentials,

    /// A user with this email already exists.
    #[error("models: duplicate email")]
    DuplicateEmail,

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ModelError {
    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Returns true for outcomes that describe the data, not a failure.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
