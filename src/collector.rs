//! Attribute collection.
//!
//! A [`Collector`] turns the finished observer plus the request snapshot into
//! the ordered attribute list of one log record.

use crate::observer::ResponseObserver;
use crate::types::{Attr, RequestInfo};

/// Maps (observer, request) to the ordered attribute list of a log record.
///
/// Called once per request, after the response has finished. Collection must
/// not fail: absent data resolves to empty-string attributes, never an error
/// or an omitted field.
///
/// To extend the standard set rather than replace it, hold a
/// [`StandardCollector`] and append to its output:
///
/// ```
/// use accesslog::{Attr, Collector, RequestInfo, ResponseObserver, StandardCollector};
///
/// struct WithTiming(StandardCollector);
///
/// impl Collector for WithTiming {
///     fn collect(&self, observer: &ResponseObserver, request: &RequestInfo) -> Vec<Attr> {
///         let mut attrs = self.0.collect(observer, request);
///         if let Some(end) = observer.end_time() {
///             let elapsed = end
///                 .duration_since(observer.start_time())
///                 .unwrap_or_default();
///             attrs.push(Attr::uint("request_time_ms", elapsed.as_millis() as u64));
///         }
///         attrs
///     }
/// }
/// ```
pub trait Collector: Send + Sync {
    /// Produces the attributes to log for one finished exchange.
    fn collect(&self, observer: &ResponseObserver, request: &RequestInfo) -> Vec<Attr>;
}

/// The standard attribute set, in its fixed order:
/// `remote_addr`, `http_method`, `path`, `status`, `body_bytes_sent`,
/// `http_referer`, `http_user_agent`.
///
/// These names and their order are a compatibility surface; downstream log
/// pipelines key on them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCollector;

impl Collector for StandardCollector {
    fn collect(&self, observer: &ResponseObserver, request: &RequestInfo) -> Vec<Attr> {
        vec![
            Attr::str("remote_addr", request.remote_addr()),
            Attr::str("http_method", request.method().as_str()),
            Attr::str("path", request.path()),
            Attr::int("status", i64::from(observer.status().as_u16())),
            Attr::uint("body_bytes_sent", observer.bytes_written()),
            Attr::str("http_referer", request.referer()),
            Attr::str("http_user_agent", request.user_agent()),
        ]
    }
}
