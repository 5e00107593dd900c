//! Route registration errors.

use thiserror::Error;

/// Errors raised while building the route table.
///
/// Every variant is a startup error; a router that failed to build is never
/// served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The same method and pattern were registered twice.
    #[error("duplicate route: {method} {pattern}")]
    Duplicate {
        /// HTTP method of the duplicate registration
        method: String,
        /// Path pattern of the duplicate registration
        pattern: String,
    },

    /// Two parameter segments at the same position use different names.
    #[error("conflicting parameter names at the same position in {pattern}: `{existing}` vs `{new}`")]
    ConflictingParam {
        /// Pattern being inserted
        pattern: String,
        /// Name already registered at this position
        existing: String,
        /// Name requested by the new pattern
        new: String,
    },

    /// A wildcard segment appeared before the end of the pattern.
    #[error("wildcard must be the last segment in {0}")]
    WildcardNotLast(String),

    /// A parameter or wildcard segment had no name.
    #[error("unnamed parameter segment in {0}")]
    EmptyParamName(String),
}
