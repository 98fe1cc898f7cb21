//! Value types shared across the middleware.
//!
//! [`RequestInfo`] is the read-only snapshot of the inbound request that
//! collectors see, and [`Attr`] is one named value in the ordered attribute
//! list that becomes a log record.

use axum::extract::ConnectInfo;
use http::header::{AsHeaderName, HeaderMap, REFERER, USER_AGENT};
use http::{Method, Request, Uri};
use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;

/// Read-only request metadata captured before the inner service runs.
///
/// The middleware takes this snapshot once per request and hands it to the
/// [`Collector`](crate::Collector) after the response has been written, so
/// collectors never touch the live request. Missing data degrades to empty
/// strings rather than errors.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    method: Method,
    uri: Uri,
    remote_addr: String,
    headers: HeaderMap,
}

impl RequestInfo {
    /// Snapshots the parts of `req` that collectors may read.
    ///
    /// The remote address comes from the [`ConnectInfo`] extension when the
    /// host server installs it (`Router::into_make_service_with_connect_info`)
    /// and is empty otherwise.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.to_string())
            .unwrap_or_default();

        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            remote_addr,
            headers: req.headers().clone(),
        }
    }

    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path component of the URI.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Peer address, or `""` when the host server did not record one.
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// All request headers, for custom collectors.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A single header as a string; `""` when absent or not valid UTF-8.
    pub fn header_str(&self, name: impl AsHeaderName) -> &str {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    }

    /// The `Referer` header, or `""`.
    pub fn referer(&self) -> &str {
        self.header_str(REFERER)
    }

    /// The `User-Agent` header, or `""`.
    pub fn user_agent(&self) -> &str {
        self.header_str(USER_AGENT)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Int(n) => write!(f, "{n}"),
            AttrValue::Uint(n) => write!(f, "{n}"),
            AttrValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One named value in a log record.
///
/// Attribute order is significant: the collector's insertion order is the
/// field order of the emitted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: Cow<'static, str>,
    pub value: AttrValue,
}

impl Attr {
    /// A string attribute.
    pub fn str(name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Str(value.into()),
        }
    }

    /// A signed integer attribute.
    pub fn int(name: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Int(value),
        }
    }

    /// An unsigned integer attribute.
    pub fn uint(name: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Uint(value),
        }
    }

    /// A boolean attribute.
    pub fn bool(name: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Bool(value),
        }
    }
}
