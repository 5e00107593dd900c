//! Middleware chain composition.
//!
//! A [`Chain`] is an ordered list of stages. Composing it with a handler is a
//! fold from the back: the last stage wraps the handler, the stage before it
//! wraps that, and so on, so the first stage in the list is the outermost
//! wrapper. It sees the request first and the response last.
//!
//! ```
//! use http::StatusCode;
//! use snippetbox_middleware::stages::{LogRequest, Recover, SecureHeaders};
//! use snippetbox_middleware::{handler_fn, Chain, Response, ResponseExt};
//!
//! let standard = Chain::new()
//!     .then(Recover::new())
//!     .then(LogRequest::new())
//!     .then(SecureHeaders::new());
//!
//! assert_eq!(standard.names(), vec!["recover", "log_request", "secure_headers"]);
//!
//! let app = standard.handler(handler_fn(|_ctx, _req| Response::status_text(StatusCode::OK)));
//! ```

use std::sync::Arc;

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, BoxedMiddleware, Handler, Middleware, Next};
use crate::types::{Request, Response};

/// An ordered, immutable-once-built list of middleware stages.
///
/// Cloning a chain is cheap; stages are shared.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("stages", &self.names()).finish()
    }
}

impl Chain {
    /// Creates an empty chain. Composing it is the identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage to the inside of the chain.
    #[must_use]
    pub fn then<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Returns a new chain with `other`'s stages after this chain's.
    #[must_use]
    pub fn append(&self, other: &Chain) -> Self {
        let mut stages = self.stages.clone();
        stages.extend(other.stages.iter().cloned());
        Self { stages }
    }

    /// Stage names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `request` through every stage and then `handler`.
    pub async fn run(
        &self,
        ctx: &mut RequestContext,
        request: Request,
        handler: &dyn Handler,
    ) -> Response {
        self.build(handler).run(ctx, request).await
    }

    fn build<'a>(&'a self, handler: &'a dyn Handler) -> Next<'a> {
        self.stages
            .iter()
            .rev()
            .fold(Next::handler(handler), |next, middleware| {
                Next::new(middleware.as_ref(), next)
            })
    }

    /// Composes this chain with `handler` into a single handler.
    pub fn handler<H: Handler>(&self, handler: H) -> Composed {
        Composed {
            chain: self.clone(),
            handler: Arc::new(handler),
        }
    }
}

/// A chain bound to its terminal handler.
#[derive(Clone)]
pub struct Composed {
    chain: Chain,
    handler: Arc<dyn Handler>,
}

impl Composed {
    /// The stages wrapping the handler.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

impl std::fmt::Debug for Composed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composed")
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl Handler for Composed {
    fn call<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        Box::pin(self.chain.run(ctx, request, self.handler.as_ref()))
    }
}
