//! Request handlers.
//!
//! Each handler borrows the shared [`Application`] and the request context
//! for the duration of one request. They are plain functions so the route
//! table can name them directly; [`AppHandler`] adapts them to the
//! middleware [`Handler`] trait.

use std::sync::Arc;

use http::StatusCode;
use http_body_util::BodyExt;
use snippetbox_core::{email_pattern, Form, ModelError};
use snippetbox_middleware::stages::AUTHENTICATED_USER_ID;
use snippetbox_middleware::{BoxFuture, Handler, Request, RequestContext, Response, ResponseExt};

use crate::app::Application;
use crate::helpers::{client_error, not_found, server_error, TemplateData, FLASH};

/// Signature shared by every application handler.
pub type HandlerFn =
    for<'a> fn(&'a Application, &'a mut RequestContext, Request) -> BoxFuture<'a, Response>;

/// Number of snippets listed on the home page.
pub const LATEST_LIMIT: usize = 10;

/// Binds a [`HandlerFn`] to the application it runs against.
#[derive(Clone)]
pub struct AppHandler {
    app: Arc<Application>,
    func: HandlerFn,
}

impl AppHandler {
    /// Creates a handler that calls `func` with `app`.
    pub fn new(app: Arc<Application>, func: HandlerFn) -> Self {
        Self { app, func }
    }
}

impl Handler for AppHandler {
    fn call<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        (self.func)(&self.app, ctx, request)
    }
}

/// Liveness check. Answers `OK` without touching sessions or storage.
pub fn ping<'a>(
    _app: &'a Application,
    _ctx: &'a mut RequestContext,
    _request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let mut response = Response::html(StatusCode::OK, "OK");
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    })
}

/// `GET /`
pub fn home<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    _request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let snippets = match app.storage.snippets.latest(LATEST_LIMIT).await {
            Ok(snippets) => snippets,
            Err(err) => return server_error(ctx, &err),
        };

        let data = TemplateData {
            snippets,
            ..TemplateData::default()
        };
        app.render(ctx, StatusCode::OK, "home.page.tmpl", data)
    })
}

/// `GET /snippet/:id`
pub fn snippet_view<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    _request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let Some(id) = ctx
            .params()
            .get("id")
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|id| *id >= 1)
        else {
            return not_found();
        };

        let snippet = match app.storage.snippets.get(id).await {
            Ok(snippet) => snippet,
            Err(ModelError::NoRecord) => return not_found(),
            Err(err) => return server_error(ctx, &err),
        };

        let data = TemplateData {
            snippet: Some(snippet),
            ..TemplateData::default()
        };
        app.render(ctx, StatusCode::OK, "show.page.tmpl", data)
    })
}

/// `GET /snippet/create`
pub fn snippet_create<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    _request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let form = Form::new([("expires", "365")]);
        app.render(ctx, StatusCode::OK, "create.page.tmpl", TemplateData::with_form(form))
    })
}

/// `POST /snippet/create`
pub fn snippet_create_post<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let mut form = match read_form(request).await {
            Ok(form) => form,
            Err(response) => return response,
        };

        form.required(&["title", "content", "expires"]);
        form.max_length("title", 100);
        form.permitted_values("expires", &["365", "7", "1"]);

        if !form.valid() {
            return app.render(
                ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                "create.page.tmpl",
                TemplateData::with_form(form),
            );
        }

        let Ok(expires) = form.get("expires").parse::<i64>() else {
            return client_error(StatusCode::BAD_REQUEST);
        };

        let id = match app
            .storage
            .snippets
            .insert(form.get("title"), form.get("content"), expires)
            .await
        {
            Ok(id) => id,
            Err(err) => return server_error(ctx, &err),
        };

        if let Some(session) = ctx.session_mut() {
            session.put(FLASH, "Snippet successfully created!");
        }
        Response::redirect(StatusCode::SEE_OTHER, &format!("/snippet/{id}"))
    })
}

/// `GET /user/signup`
pub fn signup<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    _request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        app.render(
            ctx,
            StatusCode::OK,
            "signup.page.tmpl",
            TemplateData::with_form(Form::default()),
        )
    })
}

/// `POST /user/signup`
pub fn signup_post<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let mut form = match read_form(request).await {
            Ok(form) => form,
            Err(response) => return response,
        };

        form.required(&["name", "email", "password"]);
        form.max_length("email", 255);
        form.matches_pattern("email", email_pattern());
        form.min_length("password", 10);

        if form.valid() {
            let result = app
                .storage
                .users
                .insert(form.get("name"), form.get("email"), form.get("password"))
                .await;
            match result {
                Ok(id) => {
                    tracing::debug!(request_id = %ctx.request_id(), user_id = id, "user signed up");
                    if let Some(session) = ctx.session_mut() {
                        session.put(FLASH, "Your signup was successful. Please log in.");
                    }
                    return Response::redirect(StatusCode::SEE_OTHER, "/user/login");
                }
                Err(ModelError::DuplicateEmail) => {
                    form.errors.add("email", "Address is already in use");
                }
                Err(err) => return server_error(ctx, &err),
            }
        }

        // Never echo the password back into the page.
        form.values.remove("password");
        app.render(
            ctx,
            StatusCode::UNPROCESSABLE_ENTITY,
            "signup.page.tmpl",
            TemplateData::with_form(form),
        )
    })
}

/// `GET /user/login`
pub fn login<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    _request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        app.render(
            ctx,
            StatusCode::OK,
            "login.page.tmpl",
            TemplateData::with_form(Form::default()),
        )
    })
}

/// `POST /user/login`
pub fn login_post<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        let mut form = match read_form(request).await {
            Ok(form) => form,
            Err(response) => return response,
        };

        form.required(&["email", "password"]);
        form.matches_pattern("email", email_pattern());

        if form.valid() {
            let result = app
                .storage
                .users
                .authenticate(form.get("email"), form.get("password"))
                .await;
            match result {
                Ok(id) => {
                    if let Some(session) = ctx.session_mut() {
                        session.put(AUTHENTICATED_USER_ID, id);
                    }
                    return Response::redirect(StatusCode::SEE_OTHER, "/snippet/create");
                }
                Err(ModelError::InvalidCredentials) => {
                    form.errors.add("generic", "Email or Password is incorrect");
                }
                Err(err) => return server_error(ctx, &err),
            }
        }

        form.values.remove("password");
        app.render(
            ctx,
            StatusCode::UNPROCESSABLE_ENTITY,
            "login.page.tmpl",
            TemplateData::with_form(form),
        )
    })
}

/// `POST /user/logout`
pub fn logout_post<'a>(
    _app: &'a Application,
    ctx: &'a mut RequestContext,
    _request: Request,
) -> BoxFuture<'a, Response> {
    Box::pin(async move {
        if let Some(session) = ctx.session_mut() {
            session.remove(AUTHENTICATED_USER_ID);
            session.put(FLASH, "You've been logged out successfully!");
        }
        Response::redirect(StatusCode::SEE_OTHER, "/")
    })
}

/// `GET /static/*filepath`
pub fn static_file<'a>(
    app: &'a Application,
    ctx: &'a mut RequestContext,
    request: Request,
) -> BoxFuture<'a, Response> {
    app.static_files.call(ctx, request)
}

// The server collects bodies before dispatch, so this only fails on a
// malformed encoding.
async fn read_form(request: Request) -> Result<Form, Response> {
    let bytes = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    Form::parse(&bytes).map_err(|err| {
        tracing::debug!(error = %err, "malformed form body");
        client_error(StatusCode::BAD_REQUEST)
    })
}
