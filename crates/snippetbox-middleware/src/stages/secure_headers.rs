//! Security response headers.

use http::header::{CONTENT_SECURITY_POLICY, X_FRAME_OPTIONS, X_XSS_PROTECTION};
use http::{HeaderMap, HeaderValue};

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Sets `X-Frame-Options`, `Content-Security-Policy` and
/// `X-XSS-Protection` on every response.
///
/// The headers are staged on the context before delegating, so
/// [`Recover`](super::Recover) can still apply them to the 500 it produces
/// if something further in panics. They are applied to the normal response
/// on the way out, overriding whatever a handler set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureHeaders;

impl SecureHeaders {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Writes the three headers into `headers`.
    ///
    /// Also used for responses produced before the pipeline runs.
    pub fn apply(headers: &mut HeaderMap) {
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
        headers.insert(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("frame-ancestors 'none'"),
        );
        headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    }
}

impl Middleware for SecureHeaders {
    fn name(&self) -> &'static str {
        "secure_headers"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            Self::apply(ctx.response_headers_mut());

            let mut response = next.run(ctx, request).await;
            ctx.apply_response_headers(&mut response);
            response
        })
    }
}
