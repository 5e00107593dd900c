//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {path} does not exist")]
    FileNotFound {
        /// Requested path
        path: PathBuf,
    },

    /// A file exists but could not be read.
    #[error("cannot read config file {path}")]
    ReadError {
        /// File path
        path: PathBuf,
        /// I/O failure
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error.
    #[error("bad TOML config: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON syntax or schema error.
    #[error("bad JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The `.env` file exists but is malformed.
    #[error("cannot load .env: {0}")]
    DotenvError(String),

    /// Neither TOML nor JSON.
    #[error("unsupported config format {0:?}, expected toml or json")]
    UnsupportedFormat(String),

    /// A field failed validation.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field name, e.g. `session.secret`
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// An override variable could not be parsed.
    #[error("cannot parse {var}: {reason}")]
    EnvParseError {
        /// Variable name
        var: String,
        /// Parser message
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Builds an [`InvalidValue`](Self::InvalidValue) error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
