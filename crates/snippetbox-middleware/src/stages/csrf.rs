//! CSRF protection.
//!
//! Double-submit scheme: a random 32-byte secret lives in an `HttpOnly`
//! base cookie, and every request gets a freshly masked copy of it
//! (`base64(pad || pad ^ secret)`) to embed in forms. Requests with an unsafe
//! method must submit a token that unmasks to the cookie's secret, in the
//! `csrf_token` form field or the `X-CSRF-Token` header. Anything else is
//! rejected with 400 before later stages or the handler run.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use snippetbox_core::security::{constant_time_eq, random_bytes};
use snippetbox_session::{Cookies, SetCookie};

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Name of the base cookie.
pub const CSRF_COOKIE_NAME: &str = "csrf_token";
/// Name of the form field carrying the masked token.
pub const CSRF_FIELD_NAME: &str = "csrf_token";
/// Name of the header carrying the masked token.
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

const TOKEN_LEN: usize = 32;
const COOKIE_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

type Secret = [u8; TOKEN_LEN];

/// CSRF guard stage.
#[derive(Debug, Clone, Copy)]
pub struct CsrfGuard {
    secure: bool,
}

impl Default for CsrfGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfGuard {
    /// Creates the stage with a `Secure` base cookie.
    #[must_use]
    pub fn new() -> Self {
        Self { secure: true }
    }

    /// Controls the `Secure` flag on the base cookie.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    fn base_cookie(&self, secret: &Secret) -> Option<HeaderValue> {
        let cookie = SetCookie::new(CSRF_COOKIE_NAME, STANDARD.encode(secret))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .max_age_secs(COOKIE_MAX_AGE_SECS);
        HeaderValue::from_str(&cookie.to_header_value()).ok()
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn decode_secret(value: &str) -> Option<Secret> {
    STANDARD.decode(value).ok()?.try_into().ok()
}

/// Masks `secret` with a one-time pad.
fn mask(secret: &Secret) -> String {
    let pad = random_bytes::<TOKEN_LEN>();
    let mut token = Vec::with_capacity(TOKEN_LEN * 2);
    token.extend_from_slice(&pad);
    token.extend(pad.iter().zip(secret).map(|(p, s)| p ^ s));
    STANDARD.encode(token)
}

/// Recovers the secret from a submitted token. Unmasked tokens are accepted
/// as-is.
fn unmask(token: &str) -> Option<Vec<u8>> {
    let raw = STANDARD.decode(token.trim()).ok()?;
    match raw.len() {
        TOKEN_LEN => Some(raw),
        len if len == TOKEN_LEN * 2 => {
            let (pad, masked) = raw.split_at(TOKEN_LEN);
            Some(pad.iter().zip(masked).map(|(p, m)| p ^ m).collect())
        }
        _ => None,
    }
}

fn verify(secret: &Secret, submitted: &str) -> bool {
    unmask(submitted).is_some_and(|candidate| constant_time_eq(&candidate, secret))
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

/// Reads the submitted token, rebuilding the request if the body was read.
async fn submitted_token(request: Request) -> (Request, Option<String>) {
    if let Some(token) = request
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
    {
        let token = token.to_string();
        return (request, Some(token));
    }

    if !is_form(&request) {
        return (request, None);
    }

    let (parts, body) = request.into_parts();
    let bytes: Bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    let token = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
        .ok()
        .and_then(|pairs| {
            pairs
                .into_iter()
                .find(|(name, _)| name == CSRF_FIELD_NAME)
                .map(|(_, value)| value)
        });
    (Request::from_parts(parts, Full::new(bytes)), token)
}

impl Middleware for CsrfGuard {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let existing = Cookies::from_headers(request.headers())
                .get(CSRF_COOKIE_NAME)
                .and_then(decode_secret);
            let secret = existing.unwrap_or_else(random_bytes::<TOKEN_LEN>);
            let issued = if existing.is_none() {
                self.base_cookie(&secret)
            } else {
                None
            };

            ctx.set_csrf_token(mask(&secret));

            let mut response = if is_safe(request.method()) {
                next.run(ctx, request).await
            } else {
                let (request, submitted) = submitted_token(request).await;
                let accepted = existing.is_some()
                    && submitted.as_deref().is_some_and(|token| verify(&secret, token));
                if accepted {
                    next.run(ctx, request).await
                } else {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        has_cookie = existing.is_some(),
                        has_token = submitted.is_some(),
                        "rejecting request that failed CSRF verification"
                    );
                    Response::status_text(StatusCode::BAD_REQUEST)
                }
            };

            if let Some(cookie) = issued {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            response
                .headers_mut()
                .append(header::VARY, HeaderValue::from_static("Cookie"));
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::middleware::{handler_fn, Handler};
    use crate::stages::test_support::{body_text, request};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_app(calls: Arc<AtomicUsize>) -> impl Handler {
        Chain::new().then(CsrfGuard::new()).handler(handler_fn(move |ctx, _req| {
            calls.fetch_add(1, Ordering::SeqCst);
            let token = ctx.csrf_token().unwrap_or_default().to_string();
            Response::error(StatusCode::OK, &token)
        }))
    }

    fn base_cookie_value(response: &Response) -> String {
        let header = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        header
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, v)| v.to_string())
            .unwrap()
    }

    /// Performs a GET and returns (base cookie value, masked token).
    async fn bootstrap(app: &impl Handler) -> (String, String) {
        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, request("GET", "/user/login")).await;
        let cookie = base_cookie_value(&response);
        let token = body_text(response).await.trim_end().to_string();
        (cookie, token)
    }

    fn form_post(cookie: Option<&str>, body: String) -> Request {
        let mut builder = http::Request::builder()
            .method("POST")
            .uri("/user/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("{CSRF_COOKIE_NAME}={cookie}"));
        }
        builder.body(Full::new(Bytes::from(body))).unwrap()
    }

    #[test]
    fn test_mask_round_trip() {
        let secret = random_bytes::<TOKEN_LEN>();
        let a = mask(&secret);
        let b = mask(&secret);
        assert_ne!(a, b);
        assert!(verify(&secret, &a));
        assert!(verify(&secret, &b));
        assert!(verify(&secret, &STANDARD.encode(secret)));
        assert!(!verify(&random_bytes::<TOKEN_LEN>(), &a));
        assert!(!verify(&secret, "not base64!"));
        assert!(!verify(&secret, &STANDARD.encode([0u8; 7])));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe(&Method::GET));
        assert!(is_safe(&Method::HEAD));
        assert!(is_safe(&Method::OPTIONS));
        assert!(is_safe(&Method::TRACE));
        assert!(!is_safe(&Method::POST));
        assert!(!is_safe(&Method::DELETE));
    }

    #[tokio::test]
    async fn test_safe_request_issues_cookie_and_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(calls.clone());

        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, request("GET", "/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(header.starts_with("csrf_token="));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Secure"));
        assert!(ctx.csrf_token().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_valid_form_token_is_accepted_and_body_preserved() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Chain::new().then(CsrfGuard::new()).handler(handler_fn({
            let calls = calls.clone();
            move |ctx: &mut RequestContext, req: Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                if req.method() == Method::GET {
                    return Response::error(StatusCode::OK, ctx.csrf_token().unwrap_or_default());
                }
                let body = futures_util::FutureExt::now_or_never(req.into_body().collect())
                    .and_then(Result::ok)
                    .map(|c| c.to_bytes())
                    .unwrap_or_default();
                Response::error(StatusCode::OK, &String::from_utf8_lossy(&body))
            }
        }));
        let (cookie, token) = bootstrap(&app).await;

        let body = serde_urlencoded::to_string([("email", "a@b.c"), ("csrf_token", token.as_str())]).unwrap();
        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, form_post(Some(&cookie), body.clone())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_text(response).await.trim_end(), body);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_header_token_is_accepted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(calls.clone());
        let (cookie, token) = bootstrap(&app).await;

        let req = http::Request::builder()
            .method("DELETE")
            .uri("/snippet/1")
            .header(header::COOKIE, format!("{CSRF_COOKIE_NAME}={cookie}"))
            .header(CSRF_HEADER_NAME, token)
            .body(Full::new(Bytes::new()))
            .unwrap();
        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(calls.clone());
        let (cookie, _) = bootstrap(&app).await;

        let mut ctx = RequestContext::new();
        let response = app
            .call(&mut ctx, form_post(Some(&cookie), "email=a%40b.c".to_string()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_from_other_cookie_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(calls.clone());
        let (_, token) = bootstrap(&app).await;
        let (other_cookie, _) = bootstrap(&app).await;

        let body = serde_urlencoded::to_string([("csrf_token", token.as_str())]).unwrap();
        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, form_post(Some(&other_cookie), body)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_cookie_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(calls.clone());
        let (_, token) = bootstrap(&app).await;

        let body = serde_urlencoded::to_string([("csrf_token", token.as_str())]).unwrap();
        let mut ctx = RequestContext::new();
        let response = app.call(&mut ctx, form_post(None, body)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cookie_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = counting_app(calls.clone());

        let mut ctx = RequestContext::new();
        let response = app
            .call(&mut ctx, form_post(Some("%%%"), "csrf_token=abc".to_string()))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
