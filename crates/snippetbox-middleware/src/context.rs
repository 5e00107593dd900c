//! Per-request processing context.
//!
//! A [`RequestContext`] is created by the server for every request and
//! passed by mutable reference down the chain. Stages attach what they learn
//! (the session, the CSRF token, the authentication fact, route parameters)
//! as typed fields; anything else goes in the type-keyed extensions.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use http::HeaderMap;
use snippetbox_router::Params;
use snippetbox_session::Session;
use uuid::Uuid;

use crate::types::Response;

/// State carried through the middleware chain for one request.
#[derive(Debug)]
pub struct RequestContext {
    /// Unique request ID (UUID v7)
    request_id: Uuid,

    /// Peer address, when known
    remote_addr: Option<SocketAddr>,

    /// When processing started
    started_at: Instant,

    /// Session loaded by the session stage
    session: Option<Session>,

    /// Masked CSRF token for embedding in forms
    csrf_token: Option<String>,

    /// Set only by the authentication stage
    authenticated: bool,

    /// Parameters captured by the router
    params: Params,

    /// Headers every response for this request must carry
    response_headers: HeaderMap,

    /// Type-keyed extension storage
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates a new context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7(),
            remote_addr: None,
            started_at: Instant::now(),
            session: None,
            csrf_token: None,
            authenticated: false,
            params: Params::new(),
            response_headers: HeaderMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a context for a request from `addr`.
    #[must_use]
    pub fn with_remote_addr(addr: SocketAddr) -> Self {
        let mut ctx = Self::new();
        ctx.remote_addr = Some(addr);
        ctx
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the peer address.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The session, if the session stage ran.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Mutable access to the session, if the session stage ran.
    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Installs `session`, replacing any loaded one.
    ///
    /// Normally done by [`LoadSession`](crate::stages::LoadSession); handlers
    /// under test can install one directly.
    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub(crate) fn take_session(&mut self) -> Option<Session> {
        self.session.take()
    }

    /// The masked CSRF token to embed in forms, if the CSRF stage ran.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub(crate) fn set_csrf_token(&mut self, token: String) {
        self.csrf_token = Some(token);
    }

    /// Whether the session maps to an active user.
    ///
    /// Only [`Authenticate`](crate::stages::Authenticate) can make this
    /// true.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }

    /// Route parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Stores the route parameters captured by the dispatcher.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Headers that must appear on every response to this request,
    /// including one produced after a panic.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Mutable access to the staged response headers.
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    /// Copies the staged headers onto `response`, replacing existing values.
    pub fn apply_response_headers(&self, response: &mut Response) {
        for (name, value) in &self.response_headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }

    /// Stores an extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns an extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
