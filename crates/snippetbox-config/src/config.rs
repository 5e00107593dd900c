//! The root [`SnippetboxConfig`] type.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::schema::MIN_SECRET_LEN;
use crate::{ConfigError, LoggingConfig, ServerConfig, SessionSection, StorageConfig};

/// Complete Snippetbox configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use snippetbox_config::SnippetboxConfig;
///
/// let config = SnippetboxConfig::default();
/// assert_eq!(config.server.addr, "127.0.0.1:4000");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SnippetboxConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session cookie settings.
    #[serde(default)]
    pub session: SessionSection,

    /// Storage collaborator settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SnippetboxConfig {
    /// Development preset: pretty logs at `debug`, non-`Secure` cookies so
    /// plain-HTTP localhost works.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.session.secure = false;
        config.logging.level = "debug".to_string();
        config.logging.format = crate::LogFormat::Pretty;
        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.addr",
                format!("invalid socket address: {}", self.server.addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.server.idle_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.idle_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.server.tls_cert.is_some() != self.server.tls_key.is_some() {
            return Err(ConfigError::invalid_value(
                "server.tls_cert",
                "tls_cert and tls_key must be set together",
            ));
        }

        if let Some(value) = &self.server.static_cache_control {
            if value.trim().is_empty() || !value.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) {
                return Err(ConfigError::invalid_value(
                    "server.static_cache_control",
                    format!("not a valid header value: {value:?}"),
                ));
            }
        }

        if self.session.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid_value(
                "session.secret",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }

        if self.session.lifetime_secs == 0 {
            return Err(ConfigError::invalid_value(
                "session.lifetime_secs",
                "must be greater than zero",
            ));
        }

        if !is_cookie_name(&self.session.cookie_name) {
            return Err(ConfigError::invalid_value(
                "session.cookie_name",
                format!("not a valid cookie name: {:?}", self.session.cookie_name),
            ));
        }

        if self.storage.dsn.trim().is_empty() {
            return Err(ConfigError::invalid_value("storage.dsn", "must not be empty"));
        }

        if !(4..=31).contains(&self.storage.password_cost) {
            return Err(ConfigError::invalid_value(
                "storage.password_cost",
                "must be between 4 and 31",
            ));
        }

        if let Err(e) = snippetbox_telemetry::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        Ok(())
    }
}

// RFC 6265 token characters.
fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
