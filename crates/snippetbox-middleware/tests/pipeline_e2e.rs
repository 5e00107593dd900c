//! End-to-end pipeline integration tests.
//!
//! These run the standard chain and the dynamic chain together, the way the
//! server composes them:
//!
//! 1. Recover
//! 2. LogRequest
//! 3. SecureHeaders
//! 4. LoadSession
//! 5. CsrfGuard
//! 6. Authenticate
//! 7. RequireAuthentication (protected routes only)

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use http::{header, Request as HttpRequest, StatusCode};
use http_body_util::{BodyExt, Full};
use snippetbox_core::security::MIN_PASSWORD_COST;
use snippetbox_core::{MemoryStore, UserStore};
use snippetbox_middleware::stages::{
    Authenticate, CsrfGuard, LoadSession, LogRequest, Recover, RequireAuthentication,
    SecureHeaders, AUTHENTICATED_USER_ID, CSRF_FIELD_NAME,
};
use snippetbox_middleware::{
    handler_fn, Chain, Composed, Handler, Request, RequestContext, Response, ResponseExt,
};
use snippetbox_session::{SessionConfig, SessionManager};

const SECRET: &str = "s6Ndh+pPbnzHbS*+9Pk8qGWhTzbpa@ge";

/// Minimal cookie jar keyed by cookie name.
#[derive(Default)]
struct Jar(BTreeMap<String, String>);

impl Jar {
    fn store(&mut self, response: &Response) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Some((name, rest)) = value.to_str().unwrap().split_once('=') else {
                continue;
            };
            let value = rest.split(';').next().unwrap_or_default();
            if value.is_empty() {
                self.0.remove(name);
            } else {
                self.0.insert(name.to_string(), value.to_string());
            }
        }
    }

    fn header(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

struct App {
    form: Composed,
    login: Composed,
    protected: Composed,
    panics: Composed,
}

fn read_form(req: Request) -> BTreeMap<String, String> {
    let bytes = req
        .into_body()
        .collect()
        .now_or_never()
        .and_then(Result::ok)
        .map(|c| c.to_bytes())
        .unwrap_or_default();
    serde_urlencoded::from_bytes(&bytes).unwrap_or_default()
}

fn app(users: Arc<dyn UserStore>) -> App {
    let manager = Arc::new(SessionManager::new(SessionConfig::new(SECRET)).unwrap());
    let standard = Chain::new()
        .then(Recover::new())
        .then(LogRequest::new())
        .then(SecureHeaders::new());
    let dynamic = standard
        .clone()
        .then(LoadSession::new(manager))
        .then(CsrfGuard::new())
        .then(Authenticate::new(users));
    let protected = dynamic.clone().then(RequireAuthentication::new());

    App {
        form: dynamic.handler(handler_fn(|ctx, _req| {
            Response::error(StatusCode::OK, ctx.csrf_token().unwrap_or_default())
        })),
        login: dynamic.handler(handler_fn(|ctx, req| {
            let form = read_form(req);
            let id: i64 = form.get("id").and_then(|v| v.parse().ok()).unwrap_or_default();
            if let Some(session) = ctx.session_mut() {
                session.put(AUTHENTICATED_USER_ID, id);
            }
            Response::redirect(StatusCode::SEE_OTHER, "/protected")
        })),
        protected: protected.handler(handler_fn(|_ctx, _req| {
            Response::status_text(StatusCode::OK)
        })),
        panics: dynamic.handler(handler_fn(|_ctx, _req| -> Response {
            panic!("handler failure")
        })),
    }
}

fn request(method: &str, path: &str, jar: &Jar, body: Option<String>) -> Request {
    let mut builder = HttpRequest::builder()
        .method(method)
        .uri(path)
        .header(header::COOKIE, jar.header());
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    }
    builder
        .body(Full::new(Bytes::from(body.unwrap_or_default())))
        .unwrap()
}

async fn send(
    handler: &Composed,
    jar: &mut Jar,
    method: &str,
    path: &str,
    body: Option<String>,
) -> Response {
    let request = request(method, path, jar, body);
    let mut ctx = RequestContext::with_remote_addr("127.0.0.1:50000".parse().unwrap());
    let response = handler.call(&mut ctx, request).await;
    jar.store(&response);
    response
}

async fn text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap().trim_end().to_string()
}

fn assert_secure_headers(response: &Response) {
    assert_eq!(response.headers()["x-frame-options"], "deny");
    assert_eq!(response.headers()["content-security-policy"], "frame-ancestors 'none'");
    assert_eq!(response.headers()["x-xss-protection"], "1; mode=block");
}

#[tokio::test]
async fn test_login_flow_through_full_pipeline() {
    let store = Arc::new(MemoryStore::with_password_cost(MIN_PASSWORD_COST));
    let id = store.insert("Alice", "alice@example.com", "pa55word!").await.unwrap();
    let app = app(store);
    let mut jar = Jar::default();

    // Anonymous request to a protected page is redirected.
    let response = send(&app.protected, &mut jar, "GET", "/protected", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/user/login");
    assert_secure_headers(&response);

    // Fetch a token, then log in with it.
    let response = send(&app.form, &mut jar, "GET", "/user/login", None).await;
    let token = text(response).await;
    let body = serde_urlencoded::to_string([
        ("id", id.to_string()),
        (CSRF_FIELD_NAME, token),
    ])
    .unwrap();
    let response = send(&app.login, &mut jar, "POST", "/user/login", Some(body)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(jar.0.contains_key("session"));

    // Now the protected page is served and marked uncacheable.
    let response = send(&app.protected, &mut jar, "GET", "/protected", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_secure_headers(&response);
}

#[tokio::test]
async fn test_post_without_token_never_reaches_handler() {
    let store = Arc::new(MemoryStore::with_password_cost(MIN_PASSWORD_COST));
    let id = store.insert("Alice", "alice@example.com", "pa55word!").await.unwrap();
    let app = app(store);
    let mut jar = Jar::default();

    send(&app.form, &mut jar, "GET", "/user/login", None).await;
    let body = format!("id={id}");
    let response = send(&app.login, &mut jar, "POST", "/user/login", Some(body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!jar.0.contains_key("session"));
    assert_secure_headers(&response);
}

#[tokio::test]
async fn test_session_for_unknown_user_is_anonymous() {
    let app = app(Arc::new(MemoryStore::with_password_cost(MIN_PASSWORD_COST)));
    let mut jar = Jar::default();

    let response = send(&app.form, &mut jar, "GET", "/user/login", None).await;
    let token = text(response).await;
    let body = serde_urlencoded::to_string([("id", "99"), (CSRF_FIELD_NAME, token.as_str())]).unwrap();
    send(&app.login, &mut jar, "POST", "/user/login", Some(body)).await;

    let response = send(&app.protected, &mut jar, "GET", "/protected", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_panic_inside_dynamic_chain() {
    let app = app(Arc::new(MemoryStore::with_password_cost(MIN_PASSWORD_COST)));
    let mut jar = Jar::default();

    let response = send(&app.panics, &mut jar, "GET", "/boom", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::CONNECTION], "close");
    assert_secure_headers(&response);
    assert_eq!(text(response).await, "Internal Server Error");

    // The same composed handlers keep serving.
    let response = send(&app.form, &mut jar, "GET", "/user/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
