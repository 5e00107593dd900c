//! Response helpers shared by the handlers.

use std::fmt::Display;

use chrono::{Datelike, Utc};
use http::{header, HeaderValue, Method, StatusCode};
use serde::Serialize;
use snippetbox_core::{Form, Snippet};
use snippetbox_middleware::{RequestContext, Response, ResponseExt};

use crate::app::Application;

/// Session key for one-shot messages shown on the next rendered page.
pub const FLASH: &str = "flash";

/// Everything a page template can see.
///
/// Handlers fill in the page-specific fields; [`Application::render`]
/// supplies the rest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateData {
    /// Year shown in the footer
    pub current_year: i32,
    /// Masked CSRF token for form hidden fields
    pub csrf_token: String,
    /// Flash message popped from the session
    pub flash: Option<String>,
    /// Submitted values and validation errors
    pub form: Option<Form>,
    /// Whether the request carries an authenticated session
    pub is_authenticated: bool,
    /// The snippet on a detail page
    pub snippet: Option<Snippet>,
    /// The snippets on the home page
    pub snippets: Vec<Snippet>,
}

impl TemplateData {
    /// Data for a page showing `form`.
    #[must_use]
    pub fn with_form(form: Form) -> Self {
        Self {
            form: Some(form),
            ..Self::default()
        }
    }
}

/// Logs `err` and answers with a generic 500.
///
/// The client never sees the error text.
pub fn server_error(ctx: &RequestContext, err: &dyn Display) -> Response {
    tracing::error!(request_id = %ctx.request_id(), error = %err, "server error");
    Response::server_error()
}

/// Answers with `status` and its canonical reason phrase.
pub fn client_error(status: StatusCode) -> Response {
    Response::status_text(status)
}

/// Answers 404 Not Found.
pub fn not_found() -> Response {
    client_error(StatusCode::NOT_FOUND)
}

/// Answers 405 with an `Allow` header listing `allowed`.
pub fn method_not_allowed(allowed: &[Method]) -> Response {
    let mut response = client_error(StatusCode::METHOD_NOT_ALLOWED);
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

impl Application {
    /// Renders `page` with `data` plus the per-request defaults.
    ///
    /// The page is rendered into a buffer first; a missing page or a render
    /// failure is logged and answered with a 500, never partial output.
    pub fn render(
        &self,
        ctx: &mut RequestContext,
        status: StatusCode,
        page: &str,
        mut data: TemplateData,
    ) -> Response {
        data.current_year = Utc::now().year();
        data.csrf_token = ctx.csrf_token().unwrap_or_default().to_string();
        data.is_authenticated = ctx.is_authenticated();
        data.flash = ctx.session_mut().and_then(|s| s.pop_string(FLASH));

        match self.templates.render(page, &data) {
            Ok(html) => Response::html(status, html),
            Err(err) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    page,
                    error = %err,
                    "failed to render template"
                );
                Response::server_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_server_error_hides_detail() {
        let ctx = RequestContext::new();
        let response = server_error(&ctx, &"connection refused by 10.0.0.7");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal Server Error\n");
    }

    #[tokio::test]
    async fn test_client_error_uses_reason_phrase() {
        let response = client_error(StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Bad Request\n");
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let response = method_not_allowed(&[Method::GET, Method::POST]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }

    #[test]
    fn test_template_data_serializes_snake_case() {
        let data = TemplateData::with_form(Form::new([("title", "x")]));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["form"]["values"]["title"], "x");
        assert_eq!(json["is_authenticated"], false);
        assert!(json["flash"].is_null());
        assert_eq!(json["snippets"], serde_json::json!([]));
    }
}
