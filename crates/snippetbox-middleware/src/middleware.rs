//! Core middleware and handler traits.
//!
//! A [`Middleware`] receives the context, the request and a [`Next`] for
//! the rest of the chain. It may work before delegating, after the inner call
//! returns, or short-circuit by never calling [`Next::run`]. The end of every
//! chain is a [`Handler`].
//!
//! # Example
//!
//! ```
//! use snippetbox_middleware::{BoxFuture, Middleware, Next, Request, RequestContext, Response};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "done");
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::types::{Request, Response};

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared middleware stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The core middleware trait.
///
/// Middleware MUST call `next.run()` at most once. Not calling it
/// short-circuits the chain.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs and tests.
    fn name(&self) -> &'static str;

    /// Processes the request through this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// The terminal stage of a chain.
pub trait Handler: Send + Sync + 'static {
    /// Produces the response for `request`.
    fn call<'a>(&'a self, ctx: &'a mut RequestContext, request: Request)
        -> BoxFuture<'a, Response>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        (**self).call(ctx, request)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn call<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        (**self).call(ctx, request)
    }
}

/// A handler built from a synchronous function.
///
/// ```
/// use http::StatusCode;
/// use snippetbox_middleware::{handler_fn, Response, ResponseExt};
///
/// let ping = handler_fn(|_ctx, _req| Response::error(StatusCode::OK, "OK"));
/// ```
pub struct FnHandler<F> {
    func: F,
}

/// Wraps `func` as a [`Handler`].
pub fn handler_fn<F>(func: F) -> FnHandler<F>
where
    F: Fn(&mut RequestContext, Request) -> Response + Send + Sync + 'static,
{
    FnHandler { func }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut RequestContext, Request) -> Response + Send + Sync + 'static,
{
    fn call<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        let response = (self.func)(ctx, request);
        Box::pin(async move { response })
    }
}

/// Callback to invoke the next stage in the chain.
///
/// Consumed by [`run`](Self::run) so it can only be called once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More middleware to process
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain - invoke the handler
    Handler(&'a dyn Handler),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke `middleware`, then `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes `handler`.
    pub fn handler(handler: &'a dyn Handler) -> Self {
        Self {
            inner: NextInner::Handler(handler),
        }
    }

    /// Invokes the next middleware or the handler.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler.call(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;

    struct Visit {
        name: &'static str,
    }

    #[derive(Default)]
    struct Visited(Vec<&'static str>);

    impl Middleware for Visit {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut visited = ctx.get_extension::<Visited>().map(|v| v.0.clone()).unwrap_or_default();
                visited.push(self.name);
                ctx.set_extension(Visited(visited));
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_next_handler() {
        let handler = handler_fn(|_ctx, _req| Response::error(StatusCode::OK, "OK"));
        let mut ctx = RequestContext::new();

        let response = Next::handler(&handler).run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain_order() {
        let first = Visit { name: "first" };
        let second = Visit { name: "second" };
        let handler = handler_fn(|ctx, _req| {
            let visited = ctx.get_extension::<Visited>().map(|v| v.0.join(",")).unwrap_or_default();
            Response::error(StatusCode::OK, &visited)
        });

        let mut ctx = RequestContext::new();
        let next = Next::new(&first, Next::new(&second, Next::handler(&handler)));
        let response = next.run(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.get_extension::<Visited>().unwrap().0, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_arc_handler() {
        let handler: Arc<dyn Handler> =
            Arc::new(handler_fn(|_ctx, _req| Response::status_text(StatusCode::ACCEPTED)));
        let mut ctx = RequestContext::new();
        let response = handler.call(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
