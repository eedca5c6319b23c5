//! HTTP server and graceful shutdown.
//!
//! The server is the outermost layer: it accepts connections, buffers each
//! request body, and hands the request to a [`Mux`]. Middleware chains are
//! synchronous, so each dispatch runs on tokio's blocking pool where file
//! reads and slow handlers cannot stall the reactor.
//!
//! # Cancellation
//!
//! When a client goes away while its body is still arriving, hyper drops the
//! request future and the chain never starts. Once a chain has started it
//! runs to completion; nothing interrupts a middleware halfway.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server stops accepting, lets every
//! in-flight connection finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::{Error, SetupError};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::transport::Mux;

/// The HTTP server.
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is parsed there.
    ///
    /// ```rust,no_run
    /// use tether::{Mux, Router, Server};
    ///
    /// # async fn run() -> Result<(), tether::SetupError> {
    /// let mut mux = Mux::new();
    /// mux.register(Router::new("/api"))?;
    /// Server::bind("0.0.0.0:3000").serve(mux).await
    /// # }
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Starts accepting connections and dispatching them through `mux`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, mux: Mux) -> Result<(), SetupError> {
        let addr: SocketAddr = self.addr.parse()
            .map_err(|_| SetupError::InvalidAddr(self.addr.clone()))?;
        let listener = TcpListener::bind(addr).await?;
        let mux = Arc::new(mux);

        info!(%addr, "tether listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a SIGTERM stops accepting even with a backlog.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let mux = Arc::clone(&mux);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| dispatch(Arc::clone(&mux), req));

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("tether stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers one request, runs it through the mux, converts the result.
///
/// Never fails: every problem becomes a JSON error response.
async fn dispatch(
    mux: Arc<Mux>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(path = parts.uri.path(), "failed to read request body: {e}");
            return Ok(error_response(Error::bad_request("failed to read request body")));
        }
    };

    let mut request = Request::new(parts.method.as_str(), parts.uri.path()).with_body(body.to_vec());
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    match tokio::task::spawn_blocking(move || mux.dispatch(request)).await {
        Ok(response) => Ok(response.into_http()),
        Err(e) => {
            error!("request chain panicked: {e}");
            Ok(error_response(Error::internal("internal server error")))
        }
    }
}

fn error_response(err: Error) -> http::Response<Full<Bytes>> {
    let mut response = ResponseWriter::new();
    response.write_error(&err);
    response.into_http()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A signal handler that cannot be
/// installed is logged and that arm never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
