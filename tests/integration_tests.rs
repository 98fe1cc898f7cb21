use accesslog::{
    AccessLog, AccessLogger, Attr, AttrValue, Collector, FixedClock, RequestInfo,
    ResponseObserver, StandardCollector,
};
use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Path},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::future::join_all;
use http_body_util::BodyExt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;
use tower::ServiceExt;
use tracing::Level;

type Record = (Level, String, Vec<Attr>);

/// Logger that stores every record for assertion.
#[derive(Clone, Default)]
struct CapturingLogger {
    records: Arc<Mutex<Vec<Record>>>,
}

impl CapturingLogger {
    fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    fn attr<'a>(attrs: &'a [Attr], name: &str) -> &'a AttrValue {
        &attrs
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("missing attribute {name}"))
            .value
    }
}

impl AccessLogger for CapturingLogger {
    fn log(&self, level: Level, message: &str, attrs: &[Attr]) {
        self.records
            .lock()
            .unwrap()
            .push((level, message.to_string(), attrs.to_vec()));
    }
}

// Test server handlers
async fn hello_handler() -> impl IntoResponse {
    "Hello, World!"
}

async fn created_handler() -> impl IntoResponse {
    (StatusCode::CREATED, "made")
}

async fn echo_handler(body: Bytes) -> impl IntoResponse {
    format!("Echo: {}", String::from_utf8_lossy(&body))
}

async fn sized_handler(Path(size): Path<usize>) -> String {
    "x".repeat(size)
}

async fn streaming_handler() -> impl IntoResponse {
    let stream = futures::stream::iter(vec![
        Ok::<_, std::convert::Infallible>(Bytes::from("chunk1")),
        Ok(Bytes::from("chunk2")),
        Ok(Bytes::from("chunk3")),
    ]);

    Response::builder()
        .header("content-type", "text/plain")
        .body(Body::from_stream(stream))
        .unwrap()
}

fn create_test_app(layer: AccessLog) -> Router {
    Router::new()
        .route("/hello", get(hello_handler))
        .route("/created", get(created_handler))
        .route("/echo", post(echo_handler))
        .route("/data/{size}", get(sized_handler))
        .route("/streaming", get(streaming_handler))
        .layer(layer)
}

fn get_request(path: &str) -> Request<Body> {
    let mut req = Request::builder()
        .uri(path)
        .header(header::USER_AGENT, "test-agent/1.0")
        .header(header::REFERER, "http://example.com/")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4242))));
    req
}

/// Drives one request through the router and reads the body to completion,
/// which is the point at which the middleware emits its record.
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn emits_one_record_per_request_after_response_completes() {
    let logger = CapturingLogger::default();
    let app = create_test_app(AccessLog::new().logger(logger.clone()));

    let response = app.clone().oneshot(get_request("/hello")).await.unwrap();
    // The handler has returned, but the body has not been written yet.
    assert!(logger.records().is_empty());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from("Hello, World!"));

    let records = logger.records();
    assert_eq!(records.len(), 1);

    let (level, message, attrs) = &records[0];
    assert_eq!(*level, Level::INFO);
    assert_eq!(message, "access");

    let names: Vec<&str> = attrs.iter().map(|a| a.name.as_ref()).collect();
    assert_eq!(
        names,
        [
            "remote_addr",
            "http_method",
            "path",
            "status",
            "body_bytes_sent",
            "http_referer",
            "http_user_agent",
        ]
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "remote_addr"),
        AttrValue::Str("127.0.0.1:4242".into())
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "http_method"),
        AttrValue::Str("GET".into())
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "path"),
        AttrValue::Str("/hello".into())
    );
    assert_eq!(*CapturingLogger::attr(attrs, "status"), AttrValue::Int(200));
    assert_eq!(
        *CapturingLogger::attr(attrs, "body_bytes_sent"),
        AttrValue::Uint(13)
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "http_referer"),
        AttrValue::Str("http://example.com/".into())
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "http_user_agent"),
        AttrValue::Str("test-agent/1.0".into())
    );
}

#[tokio::test]
async fn status_reflects_what_the_handler_set() {
    let logger = CapturingLogger::default();
    let app = create_test_app(AccessLog::new().logger(logger.clone()));

    let (status, _) = send(&app, get_request("/created")).await;
    assert_eq!(status, StatusCode::CREATED);

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        *CapturingLogger::attr(&records[0].2, "status"),
        AttrValue::Int(201)
    );
}

#[tokio::test]
async fn missing_headers_resolve_to_empty_attributes() {
    let logger = CapturingLogger::default();
    let app = create_test_app(AccessLog::new().logger(logger.clone()));

    // No ConnectInfo, no referer, no user agent.
    let req = Request::builder()
        .uri("/hello")
        .body(Body::empty())
        .unwrap();
    send(&app, req).await;

    let records = logger.records();
    assert_eq!(records.len(), 1);
    let attrs = &records[0].2;
    assert_eq!(
        *CapturingLogger::attr(attrs, "remote_addr"),
        AttrValue::Str(String::new())
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "http_referer"),
        AttrValue::Str(String::new())
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "http_user_agent"),
        AttrValue::Str(String::new())
    );
}

/// Extends the standard set with what the observer captured of the body.
struct BodyCollector(StandardCollector);

impl Collector for BodyCollector {
    fn collect(&self, observer: &ResponseObserver, request: &RequestInfo) -> Vec<Attr> {
        let mut attrs = self.0.collect(observer, request);
        attrs.push(Attr::bool("body_captured", observer.body().is_some()));
        if let Some(body) = observer.body() {
            attrs.push(Attr::str(
                "response_body",
                String::from_utf8_lossy(body).into_owned(),
            ));
        }
        attrs
    }
}

#[tokio::test]
async fn record_response_mirrors_the_exact_body() {
    let logger = CapturingLogger::default();
    let app = create_test_app(
        AccessLog::new()
            .logger(logger.clone())
            .collector(BodyCollector(StandardCollector))
            .record_response(true),
    );

    send(&app, get_request("/hello")).await;

    let records = logger.records();
    assert_eq!(records.len(), 1);
    let attrs = &records[0].2;
    assert_eq!(
        *CapturingLogger::attr(attrs, "body_captured"),
        AttrValue::Bool(true)
    );
    assert_eq!(
        *CapturingLogger::attr(attrs, "response_body"),
        AttrValue::Str("Hello, World!".into())
    );
}

#[tokio::test]
async fn recording_disabled_captures_nothing() {
    let logger = CapturingLogger::default();
    let app = create_test_app(
        AccessLog::new()
            .logger(logger.clone())
            .collector(BodyCollector(StandardCollector)),
    );

    send(&app, get_request("/hello")).await;

    let records = logger.records();
    assert_eq!(records.len(), 1);
    let attrs = &records[0].2;
    assert_eq!(
        *CapturingLogger::attr(attrs, "body_captured"),
        AttrValue::Bool(false)
    );
    assert!(attrs.iter().all(|a| a.name != "response_body"));
    // Byte counting still works without capture.
    assert_eq!(
        *CapturingLogger::attr(attrs, "body_bytes_sent"),
        AttrValue::Uint(13)
    );
}

#[tokio::test]
async fn streamed_chunks_are_counted_and_forwarded() {
    let logger = CapturingLogger::default();
    let app = create_test_app(AccessLog::new().logger(logger.clone()));

    let (status, body) = send(&app, get_request("/streaming")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Bytes::from("chunk1chunk2chunk3"));

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        *CapturingLogger::attr(&records[0].2, "body_bytes_sent"),
        AttrValue::Uint(18)
    );
}

/// Appends elapsed time, which a pinned clock forces to zero.
struct WithTiming(StandardCollector);

impl Collector for WithTiming {
    fn collect(&self, observer: &ResponseObserver, request: &RequestInfo) -> Vec<Attr> {
        let mut attrs = self.0.collect(observer, request);
        if let Some(end) = observer.end_time() {
            let elapsed = end
                .duration_since(observer.start_time())
                .unwrap_or_default();
            attrs.push(Attr::uint("request_time_ms", elapsed.as_millis() as u64));
        }
        attrs
    }
}

#[tokio::test]
async fn fixed_clock_makes_identical_requests_log_identical_records() {
    let logger = CapturingLogger::default();
    let app = Router::new()
        .route("/a", get(hello_handler))
        .route("/b", get(hello_handler))
        .layer(
            AccessLog::new()
                .logger(logger.clone())
                .clock(FixedClock(UNIX_EPOCH))
                .collector(WithTiming(StandardCollector)),
        );

    send(&app, get_request("/a")).await;
    send(&app, get_request("/b")).await;

    let records = logger.records();
    assert_eq!(records.len(), 2);
    let (first, second) = (&records[0].2, &records[1].2);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second) {
        if a.name == "path" {
            continue; // intentionally per-request
        }
        assert_eq!(a, b, "attribute {} should not vary", a.name);
    }
    assert_eq!(
        *CapturingLogger::attr(first, "request_time_ms"),
        AttrValue::Uint(0)
    );
}

#[tokio::test]
async fn concurrent_requests_do_not_cross_contaminate() {
    let logger = CapturingLogger::default();
    let app = create_test_app(AccessLog::new().logger(logger.clone()));

    let sizes = [10usize, 20, 30, 40, 50];
    let futures: Vec<_> = sizes
        .iter()
        .map(|size| {
            let app = app.clone();
            async move {
                let (status, body) = send(&app, get_request(&format!("/data/{size}"))).await;
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body.len(), *size);
            }
        })
        .collect();
    join_all(futures).await;

    let records = logger.records();
    assert_eq!(records.len(), sizes.len());
    for record in &records {
        let attrs = &record.2;
        let AttrValue::Str(path) = CapturingLogger::attr(attrs, "path") else {
            panic!("path must be a string");
        };
        let expected: u64 = path.trim_start_matches("/data/").parse().unwrap();
        assert_eq!(
            *CapturingLogger::attr(attrs, "body_bytes_sent"),
            AttrValue::Uint(expected),
            "record for {path} must carry its own byte count"
        );
    }
}

#[tokio::test]
async fn log_level_is_configurable() {
    let logger = CapturingLogger::default();
    let app = create_test_app(
        AccessLog::new()
            .logger(logger.clone())
            .log_level(Level::DEBUG),
    );

    send(&app, get_request("/hello")).await;

    let records = logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, Level::DEBUG);
}

#[tokio::test]
async fn abandoned_response_still_logs_partial_state() {
    let logger = CapturingLogger::default();
    let app = create_test_app(AccessLog::new().logger(logger.clone()));

    let response = app.clone().oneshot(get_request("/hello")).await.unwrap();
    // Client goes away without reading the body.
    drop(response);

    let records = logger.records();
    assert_eq!(records.len(), 1);
    let attrs = &records[0].2;
    assert_eq!(*CapturingLogger::attr(attrs, "status"), AttrValue::Int(200));
    assert_eq!(
        *CapturingLogger::attr(attrs, "body_bytes_sent"),
        AttrValue::Uint(0)
    );
}

#[tokio::test]
async fn middleware_does_not_alter_responses() {
    // Drive a real in-process server to check end-to-end passthrough.
    let logger = CapturingLogger::default();
    let app = create_test_app(AccessLog::new().logger(logger.clone()));
    let server = axum_test::TestServer::new(app).unwrap();

    let hello = server.get("/hello").await;
    assert_eq!(hello.status_code(), StatusCode::OK);
    assert_eq!(hello.text(), "Hello, World!");

    let echo = server.post("/echo").text("test").await;
    assert_eq!(echo.status_code(), StatusCode::OK);
    assert_eq!(echo.text(), "Echo: test");

    let streaming = server.get("/streaming").await;
    assert_eq!(streaming.status_code(), StatusCode::OK);
    assert_eq!(streaming.text(), "chunk1chunk2chunk3");

    // The server side finishes writing the last body independently of the
    // client read; give it a beat before counting records.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(logger.records().len(), 3);
}
