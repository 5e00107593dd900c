//! Access logging middleware.

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Emits one `info` event per request, before the request is handled.
///
/// Logging before delegating means a request that later panics still
/// appears in the access log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequest;

impl LogRequest {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for LogRequest {
    fn name(&self) -> &'static str {
        "log_request"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let remote_addr = ctx
                .remote_addr()
                .map_or_else(|| "-".to_string(), |addr| addr.to_string());
            tracing::info!(
                remote_addr = %remote_addr,
                proto = ?request.version(),
                method = %request.method(),
                uri = %request.uri(),
                request_id = %ctx.request_id(),
                "request"
            );

            let response = next.run(ctx, request).await;

            tracing::debug!(
                request_id = %ctx.request_id(),
                status = response.status().as_u16(),
                elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
                "response"
            );
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::middleware::{handler_fn, Handler};
    use crate::stages::test_support::request;
    use crate::types::ResponseExt;
    use http::StatusCode;

    #[tokio::test]
    async fn test_response_passes_through_unchanged() {
        let app = Chain::new()
            .then(LogRequest::new())
            .handler(handler_fn(|_ctx, _req| Response::status_text(StatusCode::IM_A_TEAPOT)));

        let mut ctx = RequestContext::with_remote_addr("10.0.0.1:4242".parse().unwrap());
        let response = app.call(&mut ctx, request("GET", "/snippet/1")).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
