//! # Snippetbox Server
//!
//! The HTTP side of Snippetbox: the [`Application`] handlers share, the
//! route table, static assets and the hyper accept loop.
//!
//! ## Request flow
//!
//! Every request passes through the standard chain (recover, log, secure
//! headers) and is then dispatched by path and method. Pages that use
//! sessions add the dynamic chain (session, CSRF, authenticate); protected
//! pages also require authentication.
//!
//! ```text
//! recover -> log_request -> secure_headers -> dispatch
//!                                               |- /ping, /static/*    handler
//!                                               |- /, /snippet/:id ... load_session -> csrf -> authenticate -> handler
//!                                               '- /snippet/create ... ... -> require_authentication -> handler
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use snippetbox_config::SnippetboxConfig;
//! use snippetbox_server::{routes, Application, Server};
//!
//! let config = SnippetboxConfig::development();
//! let app = Arc::new(Application::from_config(&config)?);
//! Server::new(routes(app)?, &config.server)?.run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/snippetbox-server/0.1.0")]

pub mod app;
pub mod error;
pub mod handlers;
pub mod helpers;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod static_files;
pub mod tls;

pub use app::Application;
pub use error::ServerError;
pub use helpers::{TemplateData, FLASH};
pub use routes::{routes, Dispatcher};
pub use server::Server;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
pub use static_files::{StaticFileError, StaticFiles};
