//! High-level router API.
//!
//! This module provides the main [`Router`] struct which is the primary
//! interface for building and matching routes.

use http::{Method, StatusCode};

use crate::error::RouteError;
use crate::node::Node;
use crate::RouteMatch;

/// Outcome of looking up a request against the route table.
#[derive(Debug)]
pub enum Lookup<'a, T> {
    /// A pattern matched and has a value for the request method.
    Found(RouteMatch<'a, T>),
    /// A pattern matched the path but not the method.
    MethodNotAllowed(Vec<Method>),
    /// No pattern matched the path.
    NotFound,
}

impl<T> Lookup<'_, T> {
    /// The status a dispatcher should answer with when this is not a match.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Found(_) => StatusCode::OK,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// A radix tree router.
///
/// # Route Priority
///
/// When multiple routes could match, the router uses the following priority
/// at every segment:
///
/// 1. **Literal segments** (e.g., `/snippet/create`)
/// 2. **Parameter segments** (e.g., `/snippet/:id`)
/// 3. **Wildcard segments** (e.g., `/static/*filepath`)
///
/// A branch that fails further down is abandoned and the next kind is tried.
///
/// # Example
///
/// ```rust
/// use snippetbox_router::{Lookup, Router};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert(Method::GET, "/user/login", 1).unwrap();
/// router.insert(Method::POST, "/user/login", 2).unwrap();
///
/// assert!(matches!(router.at(&Method::POST, "/user/login"), Lookup::Found(m) if *m.value == 2));
/// assert!(matches!(router.at(&Method::PUT, "/user/login"), Lookup::MethodNotAllowed(_)));
/// assert!(matches!(router.at(&Method::GET, "/user/nope"), Lookup::NotFound));
/// ```
#[derive(Debug, Clone)]
pub struct Router<T> {
    /// Root node of the radix tree
    root: Node<T>,
    /// Number of (method, pattern) registrations
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Registers `value` for `method` on `pattern`.
    ///
    /// Fails on a duplicate method and pattern, on a parameter whose name
    /// conflicts with one already registered at the same position, and on
    /// malformed patterns.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        self.root.insert(pattern, method, value)?;
        self.route_count += 1;
        Ok(())
    }

    /// Looks up `method` and `path`.
    #[must_use]
    pub fn at(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        if let Some((methods, params)) = self.root.match_path(path, |m| m.contains(method)) {
            if let Some(value) = methods.get_value(method) {
                return Lookup::Found(RouteMatch::new(value, params));
            }
        }

        match self.root.match_path(path, |m| m.has_any_method()) {
            Some((methods, _)) => Lookup::MethodNotAllowed(methods.allowed_methods()),
            None => Lookup::NotFound,
        }
    }

    /// Returns the number of routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
