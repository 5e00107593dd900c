//! Session errors.

use thiserror::Error;

/// Errors raised by the session layer.
///
/// Decoding a client cookie never fails with one of these; bad cookies
/// simply produce an empty session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The signing secret is shorter than the required minimum.
    #[error("session secret must be at least {min} bytes, got {actual}")]
    SecretTooShort {
        /// Required minimum length
        min: usize,
        /// Length supplied
        actual: usize,
    },

    /// The session values could not be serialized.
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}
