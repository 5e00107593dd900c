//! # Snippetbox Config
//!
//! Typed configuration for the Snippetbox server.
//!
//! Configuration is layered: built-in defaults, then an optional TOML or
//! JSON file, then `SNIPPETBOX__SECTION__KEY` environment variables (a
//! `.env` file in the working directory is read into the environment
//! first). Unknown keys in a file are an error.
//!
//! ```toml
//! [server]
//! addr = "127.0.0.1:4000"
//! static_dir = "./ui/static"
//! template_dir = "./ui/html"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 10000
//! keep_alive = true
//!
//! [session]
//! secret = "s6Ndh+pPbnzHbS*+9Pk8qGWhTzbpa@ge"
//! lifetime_secs = 43200
//! cookie_name = "session"
//! secure = true
//!
//! [storage]
//! dsn = "memory://"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/snippetbox-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::SnippetboxConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    LogFormat, LoggingConfig, ServerConfig, SessionSection, StorageConfig, MIN_SECRET_LEN,
};
