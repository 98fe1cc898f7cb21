//! Per-request response observation state.
//!
//! A [`ResponseObserver`] records what the downstream handler wrote to the
//! response channel: final status, byte count, start/end timestamps, and
//! optionally the body itself. One observer is created per request and
//! discarded after the record is logged; it is never shared between requests.

use bytes::BytesMut;
use http::StatusCode;
use std::time::SystemTime;

use crate::types::RequestInfo;

/// Metadata recorded from one request/response exchange.
///
/// All accessors are pure reads over already-recorded state and never block.
/// Status mirrors whatever the handler last set; if the handler never set
/// one, [`status`](ResponseObserver::status) reports the channel default,
/// `200 OK`.
#[derive(Debug)]
pub struct ResponseObserver {
    status: Option<StatusCode>,
    bytes_written: u64,
    start: SystemTime,
    end: Option<SystemTime>,
    body: Option<BytesMut>,
}

impl ResponseObserver {
    /// Creates an observer stamped with `start`.
    ///
    /// The body accumulator is allocated only when `record_body` is set;
    /// with recording off the observer carries no buffer at all.
    pub fn new(start: SystemTime, record_body: bool) -> Self {
        Self {
            status: None,
            bytes_written: 0,
            start,
            end: None,
            body: record_body.then(BytesMut::new),
        }
    }

    /// Records the status the handler attempted to set. Last call wins,
    /// mirroring the underlying channel rather than enforcing a single-write
    /// discipline of its own.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Records `data` as written to the client. No-op once the exchange has
    /// ended.
    pub(crate) fn record_write(&mut self, data: &[u8]) {
        if self.end.is_some() {
            return;
        }
        self.bytes_written += data.len() as u64;
        if let Some(body) = &mut self.body {
            body.extend_from_slice(data);
        }
    }

    /// Marks the exchange finished at `at`. Only the first call takes effect.
    pub(crate) fn end(&mut self, at: SystemTime) {
        if self.end.is_none() {
            self.end = Some(at);
        }
    }

    /// Final status, or `200 OK` if the handler never set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Total bytes written to the client so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// When the request entered the middleware.
    pub fn start_time(&self) -> SystemTime {
        self.start
    }

    /// When the exchange finished, once it has.
    pub fn end_time(&self) -> Option<SystemTime> {
        self.end
    }

    /// The mirrored response body, or `None` when recording was disabled.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Builds the [`ResponseObserver`] for each request.
///
/// Swappable at configuration time; a custom factory can, for example,
/// pre-size buffers or force recording on for selected routes.
pub trait ObserverFactory: Send + Sync {
    /// Builds an observer for `request`, stamped with `start`.
    fn wrap(&self, request: &RequestInfo, record_body: bool, start: SystemTime)
        -> ResponseObserver;
}

/// The stock [`ObserverFactory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultObserverFactory;

impl ObserverFactory for DefaultObserverFactory {
    fn wrap(
        &self,
        _request: &RequestInfo,
        record_body: bool,
        start: SystemTime,
    ) -> ResponseObserver {
        ResponseObserver::new(start, record_body)
    }
}
