//! The route table.
//!
//! Every route is registered with the handler already wrapped in its
//! middleware chain. The [`Dispatcher`] at the end of the standard chain
//! looks the request up and hands it to that composed handler.

use std::sync::Arc;

use http::Method;
use snippetbox_middleware::stages::{
    Authenticate, CsrfGuard, LoadSession, LogRequest, Recover, RequireAuthentication,
    SecureHeaders,
};
use snippetbox_middleware::{BoxFuture, Chain, Composed, Handler, Request, RequestContext, Response};
use snippetbox_router::{Lookup, Router};

use crate::app::Application;
use crate::error::ServerError;
use crate::handlers::{self, AppHandler, HandlerFn};
use crate::helpers::{method_not_allowed, not_found};

/// A route table entry value.
pub type RouteHandler = Arc<dyn Handler>;

/// Matches requests against the route table and calls the winning handler.
pub struct Dispatcher {
    router: Router<RouteHandler>,
}

impl Dispatcher {
    /// Creates a dispatcher over `router`.
    pub fn new(router: Router<RouteHandler>) -> Self {
        Self { router }
    }
}

impl Handler for Dispatcher {
    fn call<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        let path = request.uri().path().to_string();
        match self.router.at(request.method(), &path) {
            Lookup::Found(found) => {
                ctx.set_params(found.params);
                found.value.call(ctx, request)
            }
            Lookup::MethodNotAllowed(allowed) => {
                Box::pin(async move { method_not_allowed(&allowed) })
            }
            Lookup::NotFound => Box::pin(async { not_found() }),
        }
    }
}

/// Chain applied to every request.
pub fn standard_chain() -> Chain {
    Chain::new()
        .then(Recover::new())
        .then(LogRequest::new())
        .then(SecureHeaders::new())
}

/// Chain for pages that use sessions and forms.
pub fn dynamic_chain(app: &Application) -> Chain {
    Chain::new()
        .then(LoadSession::new(Arc::clone(&app.sessions)))
        .then(CsrfGuard::new().with_secure(app.secure_cookies))
        .then(Authenticate::new(Arc::clone(&app.storage.users)))
}

/// Builds the full request handler for `app`.
pub fn routes(app: Arc<Application>) -> Result<Composed, ServerError> {
    let dynamic = dynamic_chain(&app);
    let protected = dynamic.append(&Chain::new().then(RequireAuthentication::new()));
    let bare = Chain::new();

    let table: [(Method, &str, &Chain, HandlerFn); 12] = [
        (Method::GET, "/ping", &bare, handlers::ping),
        (Method::GET, "/static/*filepath", &bare, handlers::static_file),
        (Method::HEAD, "/static/*filepath", &bare, handlers::static_file),
        (Method::GET, "/", &dynamic, handlers::home),
        (Method::GET, "/snippet/create", &protected, handlers::snippet_create),
        (Method::POST, "/snippet/create", &protected, handlers::snippet_create_post),
        (Method::GET, "/snippet/:id", &dynamic, handlers::snippet_view),
        (Method::GET, "/user/signup", &dynamic, handlers::signup),
        (Method::POST, "/user/signup", &dynamic, handlers::signup_post),
        (Method::GET, "/user/login", &dynamic, handlers::login),
        (Method::POST, "/user/login", &dynamic, handlers::login_post),
        (Method::POST, "/user/logout", &protected, handlers::logout_post),
    ];

    let mut router: Router<RouteHandler> = Router::new();
    for (method, pattern, chain, func) in table {
        let handler = chain.handler(AppHandler::new(Arc::clone(&app), func));
        tracing::debug!(%method, pattern, stages = ?handler.chain().names(), "route registered");
        router.insert(method, pattern, Arc::new(handler))?;
    }

    Ok(standard_chain().handler(Dispatcher::new(router)))
}
