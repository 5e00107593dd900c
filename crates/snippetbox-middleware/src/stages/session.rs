//! Session loading and saving.

use std::sync::Arc;

use http::{header, HeaderValue};
use snippetbox_session::SessionManager;

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Decodes the session cookie into the context before delegating and
/// appends a `Set-Cookie` afterwards if the session changed.
#[derive(Debug, Clone)]
pub struct LoadSession {
    manager: Arc<SessionManager>,
}

impl LoadSession {
    /// Creates the stage around a shared manager.
    #[must_use]
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

impl Middleware for LoadSession {
    fn name(&self) -> &'static str {
        "load_session"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            ctx.set_session(self.manager.load(request.headers()));

            let mut response = next.run(ctx, request).await;

            let Some(mut session) = ctx.take_session() else {
                return response;
            };
            match self.manager.save(&mut session) {
                Ok(Some(cookie)) => match HeaderValue::from_str(&cookie.to_header_value()) {
                    Ok(value) => {
                        response.headers_mut().append(header::SET_COOKIE, value);
                        response
                    }
                    Err(err) => {
                        tracing::error!(request_id = %ctx.request_id(), error = %err, "invalid session cookie header");
                        Response::server_error()
                    }
                },
                Ok(None) => response,
                Err(err) => {
                    tracing::error!(request_id = %ctx.request_id(), error = %err, "failed to save session");
                    Response::server_error()
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
    use snippetbox_session::SessionConfig;

    fn stage() -> LoadSession {
        let config = SessionConfig::new("s6Ndh+pPbnzHbS*+9Pk8qGWhTzbpa@ge");
        LoadSession::new(Arc::new(SessionManager::new(config).unwrap()))
    }

    fn cookie_pair(response: &Response) -> String {
        let header = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_untouched_session_sets_no_cookie() {
        let app = Chain::new()
            .then(stage())
            .handler(handler_fn(|ctx, _req| {
                assert!(ctx.session().is_some());
                Response::status_text(StatusCode::OK)
            }));

        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, request("GET", "/")).await;
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_written_session_round_trips() {
        let app = Chain::new().then(stage()).handler(handler_fn(|ctx, req| {
            let session = ctx.session_mut().unwrap();
            if req.uri().path() == "/write" {
                session.put("flash", "saved");
                Response::status_text(StatusCode::OK)
            } else {
                let flash = session.pop_string("flash").unwrap_or_default();
                Response::error(StatusCode::OK, &flash)
            }
        }));

        let mut ctx = RequestContext::new();
        let first = app.call(&mut ctx, request("GET", "/write")).await;
        let cookie = cookie_pair(&first);

        let mut read = request("GET", "/read");
        read.headers_mut()
            .insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        let mut ctx = RequestContext::new();
        let second = app.call(&mut ctx, read).await;

        assert!(second.headers().get(header::SET_COOKIE).is_some());
        assert_eq!(body_text(second).await, "saved\n");
    }

    #[tokio::test]
    async fn test_tampered_cookie_reads_as_empty() {
        let app = Chain::new().then(stage()).handler(handler_fn(|ctx, _req| {
            let session = ctx.session().unwrap();
            assert!(!session.exists("authenticatedUserID"));
            Response::status_text(StatusCode::OK)
        }));

        let mut req = request("GET", "/");
        req.headers_mut()
            .insert(header::COOKIE, HeaderValue::from_static("session=eyJ9.forged"));
        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
