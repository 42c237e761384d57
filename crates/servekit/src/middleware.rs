//! Request logging middleware.
//!
//! [`RequestLogLayer`] wraps a service and emits one `INFO` entry per inbound
//! request, before the request reaches the wrapped service:
//!
//! ```json
//! {"level":"INFO","time":"...","message":"request","properties":{"method":"GET","protocol":"HTTP/1.1","remote_addr":"127.0.0.1:51234","uri":"/v1/movies?page=2"}}
//! ```
//!
//! Only the request side is logged. No status, latency or outcome is
//! recorded, and panics in the wrapped service are not caught.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use axum::{routing::get, Router};
//! use servekit::{Level, Logger, RequestLogLayer};
//!
//! let logger = Arc::new(Logger::stdout(Level::Info));
//! let app: Router = Router::new()
//!     .route("/healthcheck", get(|| async { "ok" }))
//!     .layer(RequestLogLayer::new(logger));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use http::{Request, Version};
use tower::{Layer, Service};

use crate::logger::Logger;

/// Tower layer that logs every inbound request.
#[derive(Debug, Clone)]
pub struct RequestLogLayer {
    logger: Arc<Logger>,
}

impl RequestLogLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog {
            inner,
            logger: Arc::clone(&self.logger),
        }
    }
}

/// Service produced by [`RequestLogLayer`].
#[derive(Debug, Clone)]
pub struct RequestLog<S> {
    inner: S,
    logger: Arc<Logger>,
}

impl<S, B> Service<Request<B>> for RequestLog<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let uri = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().to_string());

        let properties = [
            ("protocol", protocol(req.version()).to_string()),
            ("uri", uri),
            ("method", req.method().to_string()),
            ("remote_addr", remote_addr(&req)),
        ];
        self.logger.info("request", properties);

        self.inner.call(req)
    }
}

impl Logger {
    /// Wrap `inner` so that every request it receives is logged by this
    /// logger first.
    pub fn wrap<S>(self: &Arc<Self>, inner: S) -> RequestLog<S> {
        RequestLogLayer::new(Arc::clone(self)).layer(inner)
    }
}

fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "-",
    }
}

/// Peer address from axum's `ConnectInfo`, or a bare `SocketAddr` extension.
fn remote_addr<B>(req: &Request<B>) -> String {
    let extensions = req.extensions();
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| extensions.get::<SocketAddr>().copied())
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string())
}
