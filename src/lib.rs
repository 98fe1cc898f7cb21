//! # Accesslog
//!
//! A tower middleware for axum that emits one structured access log record
//! per HTTP request, after the response has been fully written.
//!
//! The middleware wraps the response body in a transparent decorator, so the
//! downstream handler can stream, chunk, or short-circuit however it likes:
//! every byte still reaches the client first, and the decorator accumulates
//! status, byte count, and timing as a side channel. When the body finishes
//! (or the client goes away), the configured [`Collector`] turns the recorded
//! state into an ordered attribute list and the configured [`AccessLogger`]
//! writes the record under the message key `access`.
//!
//! ## Features
//!
//! - **Transparent**: responses are forwarded unchanged, streaming included
//! - **Opt-in body capture**: no buffer is allocated unless recording is on
//! - **Pluggable**: clock, collector, logger, and observer factory are all
//!   traits with stock implementations, swappable at configuration time
//! - **Deterministic tests**: pin the clock with [`FixedClock`] and inject a
//!   capturing logger to assert on whole records
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use accesslog::AccessLog;
//! use axum::{routing::get, Router};
//!
//! async fn hello() -> &'static str {
//!     "Hello, World!"
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .route("/hello", get(hello))
//!         .layer(AccessLog::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! Every request now produces a record like:
//!
//! ```text
//! INFO access: access attrs=remote_addr= http_method=GET path=/hello status=200 body_bytes_sent=13 http_referer= http_user_agent=curl/8.0
//! ```
//!
//! (Populate `remote_addr` by serving with
//! `Router::into_make_service_with_connect_info::<std::net::SocketAddr>()`.)
//!
//! ## Configuration
//!
//! [`AccessLog`] is a fluent builder; every knob is optional:
//!
//! ```rust
//! use accesslog::AccessLog;
//! use tracing::Level;
//!
//! let layer = AccessLog::new()
//!     .log_level(Level::DEBUG)
//!     .record_response(true);
//! ```
//!
//! The configuration is frozen when the layer wraps a service; one builder
//! can layer many routers, and each request always gets its own observer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};
use tracing::Level;

pub mod clock;
pub mod collector;
pub mod logger;
pub mod observer;
pub mod types;

mod body;

pub use clock::{Clock, FixedClock, SystemClock};
pub use collector::{Collector, StandardCollector};
pub use logger::{AccessLogger, Attrs, TracingLogger};
pub use observer::{DefaultObserverFactory, ObserverFactory, ResponseObserver};
pub use types::{Attr, AttrValue, RequestInfo};

use body::ObservedBody;

/// Configuration snapshot frozen into each generated service.
///
/// Shared read-only across all requests the service handles; per-request
/// state lives in the observer, never here.
pub(crate) struct Config {
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) collector: Arc<dyn Collector>,
    pub(crate) logger: Arc<dyn AccessLogger>,
    pub(crate) level: Level,
    pub(crate) record_response: bool,
    pub(crate) factory: Arc<dyn ObserverFactory>,
}

/// Fluent builder for the access log middleware.
///
/// Despite being the thing you configure, it is also the [`Layer`]: apply it
/// with `Router::layer` (or any tower stack) and it freezes its settings into
/// an [`AccessLogService`].
///
/// Defaults: [`SystemClock`], [`StandardCollector`], [`TracingLogger`],
/// level `INFO`, response recording off, [`DefaultObserverFactory`].
#[derive(Clone)]
pub struct AccessLog {
    clock: Arc<dyn Clock>,
    collector: Arc<dyn Collector>,
    logger: Arc<dyn AccessLogger>,
    level: Level,
    record_response: bool,
    factory: Arc<dyn ObserverFactory>,
}

impl AccessLog {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the attribute collector. Defaults to [`StandardCollector`].
    pub fn collector(mut self, collector: impl Collector + 'static) -> Self {
        self.collector = Arc::new(collector);
        self
    }

    /// Sets the record sink. Defaults to [`TracingLogger`], which writes
    /// through the process-global `tracing` dispatcher.
    pub fn logger(mut self, logger: impl AccessLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Sets the severity of emitted records. Defaults to `INFO`.
    pub fn log_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Enables mirroring of response bodies into the observer, making
    /// [`ResponseObserver::body`] available to collectors. Off by default:
    /// capture costs a per-request buffer, and most deployments only need
    /// the byte count.
    pub fn record_response(mut self, record: bool) -> Self {
        self.record_response = record;
        self
    }

    /// Sets the observer factory. Defaults to [`DefaultObserverFactory`].
    pub fn observer_factory(mut self, factory: impl ObserverFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    fn freeze(&self) -> Arc<Config> {
        Arc::new(Config {
            clock: self.clock.clone(),
            collector: self.collector.clone(),
            logger: self.logger.clone(),
            level: self.level,
            record_response: self.record_response,
            factory: self.factory.clone(),
        })
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            collector: Arc::new(StandardCollector),
            logger: Arc::new(TracingLogger),
            level: Level::INFO,
            record_response: false,
            factory: Arc::new(DefaultObserverFactory),
        }
    }
}

impl<S> Layer<S> for AccessLog {
    type Service = AccessLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService {
            inner,
            config: self.freeze(),
        }
    }
}

/// The per-service middleware produced by [`AccessLog`].
///
/// Wraps an inner service; on each call it snapshots the request, lets the
/// inner service run to completion, then swaps the response body for the
/// observing decorator that will emit the record once the body finishes.
/// Inner service errors propagate unmodified; fault recovery is a separate
/// middleware's job.
#[derive(Clone)]
pub struct AccessLogService<S> {
    inner: S,
    config: Arc<Config>,
}

impl<S> Service<Request> for AccessLogService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let config = self.config.clone();
        let request = RequestInfo::from_request(&req);
        let mut observer =
            config
                .factory
                .wrap(&request, config.record_response, config.clock.now());

        let future = self.inner.call(req);

        Box::pin(async move {
            let response = future.await?;
            let (parts, inner_body) = response.into_parts();
            observer.set_status(parts.status);
            let observed = ObservedBody::new(inner_body, observer, request, config);
            Ok(Response::from_parts(parts, Body::new(observed)))
        })
    }
}
