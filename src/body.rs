//! The response body decorator.
//!
//! [`ObservedBody`] wraps the real response body and forwards every frame
//! unchanged while recording byte counts (and, when enabled, the bytes
//! themselves) into the request's [`ResponseObserver`]. When the stream
//! finishes it stamps the end time, runs the collector, and emits the log
//! record. Forwarding always happens first: what the client receives takes
//! precedence over observability.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::observer::ResponseObserver;
use crate::types::RequestInfo;
use crate::Config;

/// The message key of every record this middleware emits.
pub(crate) const MESSAGE: &str = "access";

pub(crate) struct ObservedBody {
    inner: Body,
    // Taken on finalization; `None` means the record was already emitted.
    observer: Option<ResponseObserver>,
    request: RequestInfo,
    config: Arc<Config>,
}

impl ObservedBody {
    pub(crate) fn new(
        inner: Body,
        observer: ResponseObserver,
        request: RequestInfo,
        config: Arc<Config>,
    ) -> Self {
        Self {
            inner,
            observer: Some(observer),
            request,
            config,
        }
    }

    /// Stamps the end time, collects attributes and emits the record.
    /// Idempotent: only the first call logs.
    fn finish(&mut self) {
        let Some(mut observer) = self.observer.take() else {
            return;
        };
        observer.end(self.config.clock.now());
        let attrs = self.config.collector.collect(&observer, &self.request);
        self.config.logger.log(self.config.level, MESSAGE, &attrs);
    }
}

impl HttpBody for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    if let Some(observer) = this.observer.as_mut() {
                        observer.record_write(data);
                    }
                }
                Poll::Ready(Some(Ok(frame)))
            }
            // Stream errors propagate unchanged; the drop guard still logs
            // whatever was recorded up to this point.
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

// Covers responses that never reach end-of-stream: client disconnects,
// cancelled requests, bodies dropped unread. The record is still emitted,
// with whatever partial state was observed.
impl Drop for ObservedBody {
    fn drop(&mut self) {
        self.finish();
    }
}
