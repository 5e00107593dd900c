//! Server error types.
//!
//! Everything here is a startup failure. Once the server is accepting
//! connections, per-request failures become responses instead.

use std::net::SocketAddr;
use std::path::PathBuf;

use snippetbox_core::ModelError;
use snippetbox_router::RouteError;
use snippetbox_session::SessionError;
use snippetbox_templates::TemplateError;
use thiserror::Error;

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidAddress {
        /// The configured value
        addr: String,
        /// Parser error
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// Address we tried to bind
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A TLS certificate or key could not be loaded.
    #[error("TLS setup failed for {}: {reason}", path.display())]
    Tls {
        /// File being loaded
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// The template cache could not be built.
    #[error("failed to build template cache: {0}")]
    Templates(#[from] TemplateError),

    /// The storage collaborator could not be opened.
    #[error("failed to open storage: {0}")]
    Storage(#[from] ModelError),

    /// The session manager rejected its configuration.
    #[error("invalid session configuration: {0}")]
    Session(#[from] SessionError),

    /// The route table is inconsistent.
    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),

    /// I/O error while running.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
