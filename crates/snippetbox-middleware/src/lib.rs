//! # Snippetbox Middleware
//!
//! Middleware chains and the pipeline stages that every Snippetbox request
//! passes through.
//!
//! ## Pipeline
//!
//! ```text
//! Request → Recover → LogRequest → SecureHeaders → Router
//!                                                    ↓
//!            LoadSession → CsrfGuard → Authenticate → [RequireAuthentication] → Handler
//! ```
//!
//! The standard chain wraps everything, including 404s and static files. The
//! dynamic chain wraps each application route, and protected routes add
//! [`RequireAuthentication`](stages::RequireAuthentication) at the end.
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use snippetbox_middleware::stages::{LogRequest, Recover, SecureHeaders};
//! use snippetbox_middleware::{handler_fn, Chain, Handler, RequestContext, Response, ResponseExt};
//!
//! # tokio_test::block_on(async {
//! let app = Chain::new()
//!     .then(Recover::new())
//!     .then(LogRequest::new())
//!     .then(SecureHeaders::new())
//!     .handler(handler_fn(|_ctx, _req| Response::status_text(StatusCode::OK)));
//!
//! let request = http::Request::new(http_body_util::Full::new(bytes::Bytes::new()));
//! let mut ctx = RequestContext::new();
//! let response = app.call(&mut ctx, request).await;
//! assert_eq!(response.headers()["x-frame-options"], "deny");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/snippetbox-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod middleware;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use chain::{Chain, Composed};
pub use context::RequestContext;
pub use middleware::{handler_fn, BoxFuture, BoxedMiddleware, FnHandler, Handler, Middleware, Next};
pub use types::{Request, Response, ResponseExt};
