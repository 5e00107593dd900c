//! Common types used throughout the middleware pipeline.
//!
//! This module re-exports HTTP request and response types used by middleware.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// The HTTP request type used in the pipeline.
///
/// Bodies are collected by the server before the pipeline runs, so every
/// stage sees a complete body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building common responses.
///
/// None of these panic: if the builder rejects its input, a bare
/// `500 Internal Server Error` is returned instead.
pub trait ResponseExt {
    /// Plain-text response with `status` and `message`.
    fn error(status: StatusCode, message: &str) -> Response;

    /// Plain-text response using the canonical reason phrase of `status`.
    fn status_text(status: StatusCode) -> Response;

    /// The generic 500 sent for every server-side failure.
    fn server_error() -> Response;

    /// Redirect to `location` with `status`.
    fn redirect(status: StatusCode, location: &str) -> Response;

    /// HTML response.
    fn html(status: StatusCode, body: impl Into<Bytes>) -> Response;
}

fn fallback() -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

impl ResponseExt for Response {
    fn error(status: StatusCode, message: &str) -> Response {
        http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
            .body(Full::new(Bytes::from(format!("{message}\n"))))
            .unwrap_or_else(|_| fallback())
    }

    fn status_text(status: StatusCode) -> Response {
        Self::error(status, status.canonical_reason().unwrap_or("Unknown Status"))
    }

    fn server_error() -> Response {
        Self::status_text(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn redirect(status: StatusCode, location: &str) -> Response {
        match HeaderValue::from_str(location) {
            Ok(value) => http::Response::builder()
                .status(status)
                .header(header::LOCATION, value)
                .body(Full::new(Bytes::new()))
                .unwrap_or_else(|_| fallback()),
            Err(_) => fallback(),
        }
    }

    fn html(status: StatusCode, body: impl Into<Bytes>) -> Response {
        http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Full::new(body.into()))
            .unwrap_or_else(|_| fallback())
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
    async fn test_error_response() {
        let response = Response::error(StatusCode::BAD_REQUEST, "Bad Request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "Bad Request\n");
    }

    #[tokio::test]
    async fn test_server_error_is_generic() {
        let response = Response::server_error();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal Server Error\n");
    }

    #[test]
    fn test_redirect() {
        let response = Response::redirect(StatusCode::SEE_OTHER, "/user/login");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/user/login");
    }

    #[test]
    fn test_redirect_with_invalid_location_falls_back() {
        let response = Response::redirect(StatusCode::SEE_OTHER, "/bad\nlocation");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_html() {
        let response = Response::html(StatusCode::OK, "<p>hi</p>");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
