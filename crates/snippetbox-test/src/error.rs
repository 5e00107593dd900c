//! Test error types.

use thiserror::Error;

/// Errors that can occur while driving the application in tests.
#[derive(Debug, Error)]
pub enum TestError {
    /// The application could not be built.
    #[error("failed to build application: {0}")]
    Setup(#[from] snippetbox_server::ServerError),

    /// Request building failed.
    #[error("request build error: {0}")]
    RequestBuild(#[from] http::Error),

    /// Form encoding failed.
    #[error("form encoding error: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// Response body was not valid UTF-8.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// A page did not contain the expected CSRF field.
    #[error("no csrf_token field in page {0}")]
    MissingCsrfToken(String),
}
