//! Static assets under `/static/`.
//!
//! Files are served from a single root directory with `ETag` and
//! `Last-Modified` validators. Directory listings are never produced: a
//! path that resolves to a directory is served only if it holds an
//! `index.html`, and is a 404 otherwise.
//!
//! Requests are refused when the path
//!
//! - contains a `..` component, before or after percent-decoding,
//! - holds an escaped separator or NUL byte,
//! - names a hidden file (a component starting with `.`), or
//! - resolves (through symlinks) outside the root.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::Full;
use snippetbox_middleware::{BoxFuture, Handler, Request, RequestContext, Response, ResponseExt};
use thiserror::Error;

use crate::helpers;

/// The only file served for a directory request.
pub const INDEX_FILE: &str = "index.html";

/// Route parameter holding the path below `/static/`.
pub const FILEPATH_PARAM: &str = "filepath";

/// Errors that can occur when serving static files.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// The requested file was not found, or is a directory without an index.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The path is forbidden (traversal, hidden file, outside the root).
    #[error("forbidden path: {0}")]
    Forbidden(String),

    /// Only GET and HEAD are served.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// I/O error while reading the file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StaticFileError {
    /// Returns the HTTP status code for this error.
    ///
    /// Forbidden paths answer 404, the same as missing ones.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::Forbidden(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Serves files from one root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    cache_control: Option<String>,
}

impl StaticFiles {
    /// Creates a file server rooted at `root`.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache_control: None,
        }
    }

    /// Sets a `Cache-Control` value for every file response.
    #[must_use]
    pub fn cache_control<S: Into<String>>(mut self, value: S) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Answers a request for `request_path`, relative to the root.
    ///
    /// # Errors
    ///
    /// Returns `StaticFileError` for non-GET/HEAD methods, forbidden or
    /// missing paths, directories without an index, and read failures.
    pub fn handle(
        &self,
        request_path: &str,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<Response, StaticFileError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }

        let mut path = self.resolve_path(request_path)?;

        if path.is_dir() {
            path = path.join(INDEX_FILE);
            if !path.is_file() {
                return Err(StaticFileError::NotFound(request_path.to_string()));
            }
        }

        self.serve_file(&path, headers, method)
    }

    fn resolve_path(&self, request_path: &str) -> Result<PathBuf, StaticFileError> {
        let forbidden = || StaticFileError::Forbidden(request_path.to_string());
        let mut relative = PathBuf::new();

        // Each segment is decoded on its own so an escaped separator cannot
        // merge or split components.
        for raw in request_path.split('/') {
            let bytes = urlencoding::decode_binary(raw.as_bytes());
            let segment = std::str::from_utf8(&bytes).map_err(|_| forbidden())?;
            if segment.contains(['/', '\\', '\0']) {
                return Err(forbidden());
            }
            match segment {
                "" | "." => {}
                name if name.starts_with('.') => return Err(forbidden()),
                name => match Path::new(name).components().next() {
                    Some(Component::Normal(_)) => relative.push(name),
                    _ => return Err(forbidden()),
                },
            }
        }

        let canonical = self
            .root
            .join(relative)
            .canonicalize()
            .map_err(|_| StaticFileError::NotFound(request_path.to_string()))?;
        let root = self.root.canonicalize()?;

        if !canonical.starts_with(&root) {
            return Err(StaticFileError::Forbidden(request_path.to_string()));
        }

        Ok(canonical)
    }

    fn serve_file(
        &self,
        path: &Path,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<Response, StaticFileError> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata.modified().ok();
        let etag = modified.and_then(|m| etag_for(m, metadata.len()));

        if let (Some(etag), Some(candidate)) = (&etag, headers.get(header::IF_NONE_MATCH)) {
            if candidate
                .to_str()
                .is_ok_and(|v| v == "*" || v.split(',').any(|tag| tag.trim() == etag))
            {
                return Ok(self.not_modified(etag));
            }
        } else if let (Some(modified), Some(since)) = (modified, headers.get(header::IF_MODIFIED_SINCE)) {
            let since = since.to_str().ok().and_then(|v| httpdate::parse_http_date(v).ok());
            if let Some(since) = since {
                if unix_secs(modified) <= unix_secs(since) {
                    return Ok(self.not_modified(etag.as_deref().unwrap_or_default()));
                }
            }
        }

        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(std::fs::read(path)?)
        };

        let mut builder = http::Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type(path))
            .header(header::CONTENT_LENGTH, metadata.len().to_string());

        if let Some(etag) = &etag {
            builder = builder.header(header::ETAG, etag.as_str());
        }
        if let Some(modified) = modified {
            builder = builder.header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified));
        }
        if let Some(cache_control) = &self.cache_control {
            builder = builder.header(header::CACHE_CONTROL, cache_control.as_str());
        }

        builder
            .body(Full::new(body))
            .map_err(|e| StaticFileError::IoError(std::io::Error::other(e.to_string())))
    }

    fn not_modified(&self, etag: &str) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        if let Ok(value) = HeaderValue::from_str(etag) {
            if !etag.is_empty() {
                response.headers_mut().insert(header::ETAG, value);
            }
        }
        if let Some(Ok(value)) = self.cache_control.as_deref().map(HeaderValue::from_str) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
        response
    }
}

impl Handler for StaticFiles {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let path = ctx.params().get(FILEPATH_PARAM).unwrap_or_default().to_string();
            let files = self.clone();
            let (parts, _) = request.into_parts();

            let outcome = tokio::task::spawn_blocking(move || {
                files.handle(&path, &parts.headers, &parts.method)
            })
            .await;

            match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(StaticFileError::IoError(err))) => helpers::server_error(ctx, &err),
                Ok(Err(StaticFileError::MethodNotAllowed)) => {
                    helpers::method_not_allowed(&[Method::GET, Method::HEAD])
                }
                Ok(Err(err)) => {
                    tracing::debug!(request_id = %ctx.request_id(), error = %err, "static file refused");
                    Response::status_text(err.status_code())
                }
                Err(err) => helpers::server_error(ctx, &err),
            }
        })
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn etag_for(modified: SystemTime, len: u64) -> Option<String> {
    let nanos = modified.duration_since(SystemTime::UNIX_EPOCH).ok()?.as_nanos();
    Some(format!("\"{nanos:x}-{len:x}\""))
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("css")).unwrap();
        fs::create_dir_all(root.join("img")).unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("css/main.css"), "body { margin: 0; }").unwrap();
        fs::write(root.join("img/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(root.join("docs/index.html"), "<h1>Docs</h1>").unwrap();
        fs::write(root.join(".env"), "SECRET=1").unwrap();
        fs::write(root.join("css/my file.css"), "p {}").unwrap();
        dir
    }

    fn get(files: &StaticFiles, path: &str) -> Result<Response, StaticFileError> {
        files.handle(path, &HeaderMap::new(), &Method::GET)
    }

    #[test]
    fn test_serve_css_file() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let response = get(&files, "css/main.css").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "19");
        assert!(response.headers().contains_key(header::ETAG));
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
    }

    #[test]
    fn test_serve_image_file() {
        let dir = create_test_dir();
        let response = get(&StaticFiles::new(dir.path()), "/img/logo.png").unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[test]
    fn test_directory_without_index_is_not_found() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        for path in ["css", "css/", "img/", ""] {
            let err = get(&files, path).unwrap_err();
            assert!(matches!(err, StaticFileError::NotFound(_)), "{path}");
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_directory_with_index_serves_it() {
        let dir = create_test_dir();
        let response = get(&StaticFiles::new(dir.path()), "docs/").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
    }

    #[test]
    fn test_directory_traversal_blocked() {
        let dir = create_test_dir();
        let err = get(&StaticFiles::new(dir.path().join("css")), "../docs/index.html").unwrap_err();
        assert!(matches!(err, StaticFileError::Forbidden(_)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_hidden_files_blocked() {
        let dir = create_test_dir();
        let err = get(&StaticFiles::new(dir.path()), ".env").unwrap_err();
        assert!(matches!(err, StaticFileError::Forbidden(_)));
    }

    #[test]
    fn test_percent_encoded_paths() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path().join("css"));

        let response = get(&files, "my%20file.css").unwrap();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
        assert!(get(&files, "%6d%61in.css").is_ok());

        for path in [
            "%2e%2e/docs/index.html",
            "%2E%2E%2Fdocs%2Findex.html",
            "..%2fdocs/index.html",
            "%2eenv",
            "main.css%00.png",
            "..%5cdocs",
            "%ff.css",
        ] {
            let err = get(&files, path).unwrap_err();
            assert!(matches!(err, StaticFileError::Forbidden(_)), "{path}");
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_file_not_found() {
        let dir = create_test_dir();
        let err = get(&StaticFiles::new(dir.path()), "css/missing.css").unwrap_err();
        assert!(matches!(err, StaticFileError::NotFound(_)));
    }

    #[test]
    fn test_method_not_allowed() {
        let dir = create_test_dir();
        let err = StaticFiles::new(dir.path())
            .handle("css/main.css", &HeaderMap::new(), &Method::POST)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_head_request_has_no_body() {
        use http_body_util::BodyExt;

        let dir = create_test_dir();
        let response = StaticFiles::new(dir.path())
            .handle("css/main.css", &HeaderMap::new(), &Method::HEAD)
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "19");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn test_if_none_match_returns_304() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path()).cache_control("max-age=3600");
        let etag = get(&files, "css/main.css").unwrap().headers()[header::ETAG].clone();

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, etag);
        let response = files.handle("css/main.css", &headers, &Method::GET).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=3600");
    }

    #[test]
    fn test_if_modified_since_returns_304() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_MODIFIED_SINCE,
            HeaderValue::from_str(&httpdate::fmt_http_date(
                SystemTime::now() + std::time::Duration::from_secs(60),
            ))
            .unwrap(),
        );
        let response = files.handle("css/main.css", &headers, &Method::GET).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_handler_reads_filepath_param() {
        let dir = create_test_dir();
        let files = StaticFiles::new(dir.path());

        let mut ctx = RequestContext::new();
        let mut params = snippetbox_router::Params::new();
        params.push(FILEPATH_PARAM, "css");
        ctx.set_params(params);

        let request = http::Request::builder()
            .uri("/static/css")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = files.call(&mut ctx, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
