//! Logging setup for Snippetbox services.
//!
//! Every crate in the workspace logs through `tracing` macros; this crate
//! only decides where those events go. Call [`init_logging`] once, early in
//! `main`.
//!
//! Field names used across the workspace:
//!
//! | Field | Emitted by |
//! |-------|-----------|
//! | `request_id` | every per-request event |
//! | `remote_addr`, `proto`, `method`, `uri` | the access log |
//! | `error` | server errors |
//! | `backtrace` | recovered panics |

#![doc(html_root_url = "https://docs.rs/snippetbox-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
