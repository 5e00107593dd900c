//! Radix tree router for Snippetbox.
//!
//! Routes map a method and a path pattern to an arbitrary value, usually a
//! composed handler. The tree is built once at startup and read concurrently
//! afterwards; nothing in this crate mutates after [`Router::insert`] calls
//! stop.
//!
//! # Pattern syntax
//!
//! - Literal segments: `/snippet/create`
//! - Named parameters: `/snippet/:id` or `/snippet/{id}`
//! - Catch-all wildcards (last segment only): `/static/*filepath`
//!
//! # Precedence
//!
//! At every segment the router tries the literal child first, then the
//! parameter child, then the wildcard child. A branch that fails deeper down
//! is abandoned and the next kind is tried, so `/snippet/create` is never
//! captured by `/snippet/:id` regardless of registration order.
//!
//! # Example
//!
//! ```rust
//! use snippetbox_router::{Lookup, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(Method::GET, "/snippet/:id", "show").unwrap();
//! router.insert(Method::GET, "/snippet/create", "create_form").unwrap();
//!
//! match router.at(&Method::GET, "/snippet/create") {
//!     Lookup::Found(m) => assert_eq!(*m.value, "create_form"),
//!     _ => unreachable!(),
//! }
//!
//! match router.at(&Method::GET, "/snippet/42") {
//!     Lookup::Found(m) => assert_eq!(m.params.get("id"), Some("42")),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//!                  (root)
//!                    │
//!          ┌─────────┼──────────┐
//!          │         │          │
//!      "snippet"   "user"   "static"
//!          │         │          │
//!     ┌────┴───┐   "login"  "*filepath"
//!     │        │
//!  "create"  ":id"
//! ```

mod error;
mod method_router;
mod node;
mod params;
mod router;

pub use error::RouteError;
pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::{Lookup, Router};

/// A matched route with its value and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the matched method and pattern
    pub value: &'a T,
    /// Extracted path parameters
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(value: &'a T, params: Params) -> Self {
        Self { value, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn found<'a, T>(lookup: Lookup<'a, T>) -> RouteMatch<'a, T> {
        match lookup {
            Lookup::Found(m) => m,
            other => panic!("expected a match, got {:?}", other.status()),
        }
    }

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.insert(Method::GET, "/", "home").unwrap();
        router.insert(Method::GET, "/snippet/:id", "show").unwrap();

        let m = found(router.at(&Method::GET, "/"));
        assert_eq!(*m.value, "home");
        assert!(m.params.is_empty());

        let m = found(router.at(&Method::GET, "/snippet/123"));
        assert_eq!(*m.value, "show");
        assert_eq!(m.params.get("id"), Some("123"));
    }

    #[test]
    fn test_method_routing() {
        let mut router = Router::new();
        router.insert(Method::GET, "/user/login", "login_form").unwrap();
        router.insert(Method::POST, "/user/login", "login").unwrap();

        assert_eq!(*found(router.at(&Method::GET, "/user/login")).value, "login_form");
        assert_eq!(*found(router.at(&Method::POST, "/user/login")).value, "login");

        match router.at(&Method::DELETE, "/user/login") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("expected 405, got {:?}", other.status()),
        }
    }

    #[test]
    fn test_wildcard_routing() {
        let mut router = Router::new();
        router.insert(Method::GET, "/static/*filepath", "static").unwrap();

        let m = found(router.at(&Method::GET, "/static/css/main.css"));
        assert_eq!(*m.value, "static");
        assert_eq!(m.params.get("filepath"), Some("css/main.css"));
    }

    #[test]
    fn test_no_match() {
        let mut router = Router::new();
        router.insert(Method::GET, "/", "home").unwrap();

        assert!(matches!(router.at(&Method::GET, "/missing"), Lookup::NotFound));
    }

    #[test]
    fn test_literal_wins_over_param_in_either_order() {
        let mut first = Router::new();
        first.insert(Method::GET, "/snippet/create", "create").unwrap();
        first.insert(Method::GET, "/snippet/:id", "show").unwrap();

        let mut second = Router::new();
        second.insert(Method::GET, "/snippet/:id", "show").unwrap();
        second.insert(Method::GET, "/snippet/create", "create").unwrap();

        for router in [&first, &second] {
            assert_eq!(*found(router.at(&Method::GET, "/snippet/create")).value, "create");
            assert_eq!(*found(router.at(&Method::GET, "/snippet/7")).value, "show");
        }
    }
}
