//! The hyper accept loop.
//!
//! One task per connection, HTTP/1.1 with optional keep-alive, plain TCP or
//! TLS. Request bodies are collected under a deadline and a size cap before
//! the pipeline runs, so handlers always see a complete body.
//!
//! ```rust,ignore
//! use snippetbox_server::{routes, Application, Server};
//!
//! let app = Arc::new(Application::from_config(&config)?);
//! let server = Server::new(routes(app)?, &config.server)?;
//! server.run().await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{header, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body as _, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use snippetbox_config::ServerConfig;
use snippetbox_middleware::stages::SecureHeaders;
use snippetbox_middleware::{Handler, RequestContext, Response, ResponseExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::tls;

/// Serves a composed handler over TCP, optionally wrapped in TLS.
pub struct Server {
    handler: Arc<dyn Handler>,
    addr: SocketAddr,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    idle_timeout: Duration,
    keep_alive: bool,
    max_body_bytes: usize,
    tls: Option<TlsAcceptor>,
}

impl Server {
    /// Creates a server for `handler` using the listener settings in
    /// `config`. Certificate problems are reported here, before binding.
    pub fn new<H: Handler>(handler: H, config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config
            .addr
            .parse()
            .map_err(|source| ServerError::InvalidAddress {
                addr: config.addr.clone(),
                source,
            })?;
        let tls = config
            .tls_files()
            .map(|(cert, key)| tls::acceptor(cert, key))
            .transpose()?;
        Ok(Self {
            handler: Arc::new(handler),
            addr,
            request_timeout: config.request_timeout(),
            shutdown_timeout: config.shutdown_timeout(),
            idle_timeout: config.idle_timeout(),
            keep_alive: config.keep_alive,
            max_body_bytes: usize::try_from(config.max_body_bytes).unwrap_or(usize::MAX),
            tls,
        })
    }

    /// The configured listen address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether connections are served over TLS.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Binds and serves until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds and serves until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already-bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        let scheme = if self.is_tls() { "https" } else { "http" };
        tracing::info!(addr = %local, scheme, "starting server");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            let served = match server.tls.clone() {
                                Some(acceptor) => {
                                    let handshake = acceptor.accept(stream);
                                    match tokio::time::timeout(server.request_timeout, handshake).await {
                                        Ok(Ok(stream)) => {
                                            server.handle_connection(stream, remote_addr, shutdown).await
                                        }
                                        Ok(Err(err)) => {
                                            tracing::debug!(%remote_addr, error = %err, "TLS handshake failed");
                                            Ok(())
                                        }
                                        Err(_) => {
                                            tracing::debug!(%remote_addr, "TLS handshake timed out");
                                            Ok(())
                                        }
                                    }
                                }
                                None => server.handle_connection(stream, remote_addr, shutdown).await,
                            };
                            if let Err(err) = served {
                                tracing::debug!(%remote_addr, error = %err, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to accept connection");
                    }
                },
                () = shutdown.recv() => break,
            }
        }

        tracing::info!(
            active = tracker.active_connections(),
            timeout = ?server.shutdown_timeout,
            "shutting down"
        );
        if tokio::time::timeout(server.shutdown_timeout, tracker.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }
        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection<S>(
        self: Arc<Self>,
        stream: S,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::clone(&self);
        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(request, remote_addr).await) }
        });

        // The header read timeout also bounds how long an idle keep-alive
        // connection waits for its next request.
        let conn = http1::Builder::new()
            .timer(TokioTimer::new())
            .header_read_timeout(self.idle_timeout)
            .keep_alive(self.keep_alive)
            .serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                // Let the in-flight request finish, then close.
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        }
    }

    async fn handle_request(
        &self,
        request: http::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Response {
        let (parts, body) = request.into_parts();

        if body.size_hint().lower() > u64::try_from(self.max_body_bytes).unwrap_or(u64::MAX) {
            tracing::warn!(%remote_addr, limit = self.max_body_bytes, "declared request body too large");
            return transport_error(StatusCode::PAYLOAD_TOO_LARGE);
        }

        let collect = Limited::new(body, self.max_body_bytes).collect();
        let bytes = match tokio::time::timeout(self.request_timeout, collect).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(err)) if err.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(%remote_addr, limit = self.max_body_bytes, "request body too large");
                return transport_error(StatusCode::PAYLOAD_TOO_LARGE);
            }
            Ok(Err(err)) => {
                tracing::debug!(%remote_addr, error = %err, "failed to read request body");
                return transport_error(StatusCode::BAD_REQUEST);
            }
            Err(_) => {
                tracing::warn!(%remote_addr, timeout = ?self.request_timeout, "request body timed out");
                return transport_error(StatusCode::REQUEST_TIMEOUT);
            }
        };

        let request = http::Request::from_parts(parts, Full::new(bytes));
        let mut ctx = RequestContext::with_remote_addr(remote_addr);
        self.handler.call(&mut ctx, request).await
    }
}

/// An answer given before the pipeline runs. The body may be partly unread,
/// so the connection is not reused.
fn transport_error(status: StatusCode) -> Response {
    let mut response = Response::status_text(status);
    SecureHeaders::apply(response.headers_mut());
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("addr", &self.addr)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("keep_alive", &self.keep_alive)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}
