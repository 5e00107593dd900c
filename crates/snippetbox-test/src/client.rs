//! In-memory test client.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::{header, Method};
use http_body_util::Full;
use parking_lot::Mutex;
use regex::Regex;
use snippetbox_config::SnippetboxConfig;
use snippetbox_middleware::{Composed, Handler, RequestContext};
use snippetbox_server::{routes, Application};

use crate::error::TestError;
use crate::response::TestResponse;

/// Drives the full route table without opening a socket.
///
/// Cookies set by responses are stored and sent back on later requests,
/// so a sequence of calls behaves like one browser.
pub struct TestClient {
    app: Arc<Application>,
    handler: Composed,
    jar: Mutex<BTreeMap<String, String>>,
}

impl TestClient {
    /// Creates a client for `app`.
    pub fn new(app: Arc<Application>) -> Result<Self, TestError> {
        let handler = routes(Arc::clone(&app))?;
        Ok(Self {
            app,
            handler,
            jar: Mutex::new(BTreeMap::new()),
        })
    }

    /// Creates a client for an application using the repository's `ui/`
    /// templates and assets with an empty in-memory store.
    pub fn with_ui() -> Result<Self, TestError> {
        let app = Application::from_config(&ui_config())?;
        Self::new(Arc::new(app))
    }

    /// The application under test.
    #[must_use]
    pub fn app(&self) -> &Application {
        &self.app
    }

    /// Starts a `GET` request.
    pub fn get(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, path)
    }

    /// Starts a `HEAD` request.
    pub fn head(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, path)
    }

    /// Starts a `POST` request.
    pub fn post(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, path)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, path: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest {
            client: self,
            builder: http::Request::builder().method(method).uri(path.as_ref()),
            body: Bytes::new(),
        }
    }

    /// The stored value of cookie `name`.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.lock().get(name).cloned()
    }

    /// Forgets every stored cookie.
    pub fn clear_cookies(&self) {
        self.jar.lock().clear();
    }

    /// Loads `path` and returns the CSRF token embedded in its form.
    pub async fn csrf_token(&self, path: &str) -> Result<String, TestError> {
        let page = self.get(path).send().await?;
        let html = page.text()?;
        extract_csrf_token(&html).ok_or_else(|| TestError::MissingCsrfToken(path.to_string()))
    }

    /// Submits the signup form.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<TestResponse, TestError> {
        let token = self.csrf_token("/user/signup").await?;
        self.post("/user/signup")
            .form(&[
                ("name", name),
                ("email", email),
                ("password", password),
                ("csrf_token", &token),
            ])?
            .send()
            .await
    }

    /// Submits the login form.
    pub async fn login(&self, email: &str, password: &str) -> Result<TestResponse, TestError> {
        let token = self.csrf_token("/user/login").await?;
        self.post("/user/login")
            .form(&[("email", email), ("password", password), ("csrf_token", &token)])?
            .send()
            .await
    }

    fn cookie_header(&self) -> Option<String> {
        let jar = self.jar.lock();
        if jar.is_empty() {
            return None;
        }
        Some(
            jar.iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn store_cookies(&self, response: &TestResponse) {
        let mut jar = self.jar.lock();
        for set_cookie in response.set_cookies() {
            let mut attrs = set_cookie.split(';').map(str::trim);
            let Some((name, value)) = attrs.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let expired = attrs.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));
            if expired || value.is_empty() {
                jar.remove(name);
            } else {
                jar.insert(name.to_string(), value.to_string());
            }
        }
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("app", &self.app)
            .field("cookies", &self.jar.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A request being built by [`TestClient`].
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: http::request::Builder,
    body: Bytes,
}

impl TestClientRequest<'_> {
    /// Adds a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets an `application/x-www-form-urlencoded` body.
    pub fn form(mut self, fields: &[(&str, &str)]) -> Result<Self, TestError> {
        self.body = Bytes::from(serde_urlencoded::to_string(fields)?);
        self.builder = self
            .builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        Ok(self)
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sends the request through the full middleware stack.
    pub async fn send(self) -> Result<TestResponse, TestError> {
        let mut builder = self.builder;
        if let Some(cookies) = self.client.cookie_header() {
            builder = builder.header(header::COOKIE, cookies);
        }
        let request = builder.body(Full::new(self.body))?;

        let mut ctx = RequestContext::with_remote_addr(SocketAddr::from(([127, 0, 0, 1], 50_000)));
        let response = self.client.handler.call(&mut ctx, request).await;
        let response = TestResponse::from_http(response).await;
        self.client.store_cookies(&response);
        Ok(response)
    }
}

/// Configuration pointing at the repository's `ui/` directory.
#[must_use]
pub fn ui_config() -> SnippetboxConfig {
    let ui = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../ui");
    let mut config = SnippetboxConfig::development();
    config.server.template_dir = ui.join("html");
    config.server.static_dir = ui.join("static");
    config.storage.password_cost = 4;
    config
}

/// Pulls the value of the hidden `csrf_token` input out of a page.
#[must_use]
pub fn extract_csrf_token(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"<input type=["']hidden["'] name=["']csrf_token["'] value=["']([^"']+)["']>"#)
            .expect("csrf pattern is a valid regex")
    });
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
