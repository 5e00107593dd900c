//! Configuration schema types.
//!
//! One struct per section of the configuration file. Every field has a
//! default, so an empty file (or no file at all) is a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snippetbox_telemetry::LogConfig;

/// Shortest signing secret accepted by the session codec.
pub const MIN_SECRET_LEN: usize = 32;

/// Server configuration section.
///
/// # Example
///
/// ```
/// use snippetbox_config::ServerConfig;
///
/// let config = ServerConfig {
///     addr: "0.0.0.0:4000".to_string(),
///     ..ServerConfig::default()
/// };
/// assert_eq!(config.static_dir.to_str(), Some("./ui/static"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:4000").
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Directory served under `/static/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Directory holding the `*.tmpl` files.
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Time allowed to receive a request body, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Keep connections open between requests.
    #[serde(default = "default_true")]
    pub keep_alive: bool,

    /// Seconds an open connection may wait for the next request's headers.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    /// PEM certificate chain. With `tls_key`, the server speaks HTTPS.
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key matching `tls_cert`.
    #[serde(default)]
    pub tls_key: Option<PathBuf>,

    /// `Cache-Control` sent with static files and their 304s.
    #[serde(default)]
    pub static_cache_control: Option<String>,
}

impl ServerConfig {
    /// Shutdown timeout as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Request body timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Keep-alive idle timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Certificate and key paths when both are set.
    #[must_use]
    pub fn tls_files(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            static_dir: default_static_dir(),
            template_dir: default_template_dir(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            keep_alive: true,
            idle_timeout_secs: default_idle_timeout(),
            max_body_bytes: default_max_body_bytes(),
            tls_cert: None,
            tls_key: None,
            static_cache_control: None,
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:4000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./ui/static")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("./ui/html")
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_idle_timeout() -> u64 {
    60
}

// Same cap as Go's form parser.
fn default_max_body_bytes() -> u64 {
    10 << 20
}

/// Session cookie configuration section.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    /// HMAC signing secret, at least [`MIN_SECRET_LEN`] bytes.
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Absolute session lifetime in seconds.
    #[serde(default = "default_lifetime")]
    pub lifetime_secs: u64,

    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Mark session and CSRF cookies `Secure`.
    #[serde(default = "default_true")]
    pub secure: bool,
}

impl SessionSection {
    /// Session lifetime as a [`Duration`].
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }
}

impl std::fmt::Debug for SessionSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSection")
            .field("secret", &"<redacted>")
            .field("lifetime_secs", &self.lifetime_secs)
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .finish()
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            lifetime_secs: default_lifetime(),
            cookie_name: default_cookie_name(),
            secure: true,
        }
    }
}

fn default_secret() -> String {
    "s6Ndh+pPbnzHbS*+9Pk8qGWhTzbpa@ge".to_string()
}

fn default_lifetime() -> u64 {
    12 * 60 * 60
}

fn default_cookie_name() -> String {
    "session".to_string()
}

/// Storage configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Connection string. Only `memory://` is built in.
    #[serde(default = "default_dsn")]
    pub dsn: String,

    /// bcrypt work factor for new password hashes, 4 to 31.
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dsn: default_dsn(),
            password_cost: default_password_cost(),
        }
    }
}

fn default_password_cost() -> u32 {
    12
}

fn default_dsn() -> String {
    "memory://".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format {other:?}, expected json or pretty")),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Converts this section into the telemetry crate's settings.
    ///
    /// Pretty output also turns on file and line info.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let pretty = self.format == LogFormat::Pretty;
        LogConfig {
            level: self.level.clone(),
            json_format: !pretty,
            file_line_info: pretty,
            include_target: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "127.0.0.1:4000");
        assert_eq!(config.template_dir, PathBuf::from("./ui/html"));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert!(config.keep_alive);
    }

    #[test]
    fn test_session_defaults() {
        let config = SessionSection::default();
        assert!(config.secret.len() >= MIN_SECRET_LEN);
        assert_eq!(config.lifetime(), Duration::from_secs(43_200));
        assert_eq!(config.cookie_name, "session");
        assert!(config.secure);
    }

    #[test]
    fn test_session_debug_hides_secret() {
        let debug = format!("{:?}", SessionSection::default());
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("s6Ndh"));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: ServerConfig = toml::from_str(r#"addr = "0.0.0.0:80""#).unwrap();
        assert_eq!(config.addr, "0.0.0.0:80");
        assert_eq!(config.static_dir, PathBuf::from("./ui/static"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<StorageConfig, _> = toml::from_str(r#"url = "postgres://""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_to_log_config() {
        let pretty = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
        }
        .to_log_config();
        assert!(!pretty.json_format);
        assert!(pretty.file_line_info);
        assert_eq!(pretty.level, "debug");

        let json = LoggingConfig::default().to_log_config();
        assert!(json.json_format);
        assert_eq!(json.level, "info");
    }
}
