//! Gate for protected routes.

use http::{header, HeaderValue, StatusCode};

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

const DEFAULT_LOGIN_PATH: &str = "/user/login";

/// Redirects anonymous requests to the login page with a 303.
///
/// Must run after [`Authenticate`](super::Authenticate). Responses from the
/// protected handler get `Cache-Control: no-store` so shared caches never
/// keep a page rendered for a logged-in user.
#[derive(Debug, Clone)]
pub struct RequireAuthentication {
    login_path: String,
}

impl Default for RequireAuthentication {
    fn default() -> Self {
        Self::new()
    }
}

impl RequireAuthentication {
    /// Creates the stage redirecting to `/user/login`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    /// Overrides the redirect target.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }
}

impl Middleware for RequireAuthentication {
    fn name(&self) -> &'static str {
        "require_authentication"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if !ctx.is_authenticated() {
                return Response::redirect(StatusCode::SEE_OTHER, &self.login_path);
            }

            let mut response = next.run(ctx, request).await;
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        })
    }
}
