//! Panic recovery middleware.
//!
//! Must be the outermost stage. A panic anywhere inside it is caught, logged
//! with a backtrace, and answered with a generic 500 carrying
//! `Connection: close`. Only the faulting request is affected.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::{header, HeaderValue};

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Catches panics from the rest of the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recover;

impl Recover {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

impl Middleware for Recover {
    fn name(&self) -> &'static str {
        "recover"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await;
            match outcome {
                Ok(response) => response,
                Err(payload) => {
                    let backtrace = Backtrace::force_capture();
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        panic = panic_message(payload.as_ref()),
                        backtrace = %backtrace,
                        "recovered from panic while handling request"
                    );

                    let mut response = Response::server_error();
                    ctx.apply_response_headers(&mut response);
                    response
                        .headers_mut()
                        .insert(header::CONNECTION, HeaderValue::from_static("close"));
                    response
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::middleware::{handler_fn, Handler};
    use crate::stages::test_support::{body_text, request};
    use http::StatusCode;

    #[tokio::test]
    async fn test_passes_through_without_panic() {
        let app = Chain::new()
            .then(Recover::new())
            .handler(handler_fn(|_ctx, _req| Response::status_text(StatusCode::OK)));

        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, request("GET", "/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONNECTION).is_none());
    }

    #[tokio::test]
    async fn test_panic_becomes_500_with_connection_close() {
        let app = Chain::new()
            .then(Recover::new())
            .handler(handler_fn(|_ctx, _req| -> Response { panic!("boom") }));

        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, request("GET", "/")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get(header::CONNECTION).unwrap(), "close");
        assert_eq!(body_text(response).await, "Internal Server Error\n");
    }

    #[tokio::test]
    async fn test_same_chain_serves_after_panic() {
        let app = Chain::new()
            .then(Recover::new())
            .handler(handler_fn(|_ctx, req| {
                if req.uri().path() == "/panic" {
                    panic!("only this request fails");
                }
                Response::status_text(StatusCode::OK)
            }));

        let mut ctx = RequestContext::new();
        let first = app.call(&mut ctx, request("GET", "/panic")).await;
        assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let mut ctx = RequestContext::new();
        let second = app.call(&mut ctx, request("GET", "/")).await;
        assert_eq!(second.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_staged_headers_survive_panic() {
        let app = Chain::new()
            .then(Recover::new())
            .handler(handler_fn(|ctx, _req| -> Response {
                ctx.response_headers_mut()
                    .insert("x-frame-options", HeaderValue::from_static("deny"));
                panic!("after staging");
            }));

        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, request("GET", "/")).await;
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "deny");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
