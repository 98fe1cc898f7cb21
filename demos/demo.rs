use accesslog::{AccessLog, Attr, Collector, RequestInfo, ResponseObserver, StandardCollector};
use axum::{
    body::{Body, Bytes},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::{net::TcpListener, time::sleep};
use tracing::{info, Level};

/// Standard attribute set plus request duration, to show collector
/// composition.
struct TimedCollector(StandardCollector);

impl Collector for TimedCollector {
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

async fn hello_handler() -> impl IntoResponse {
    sleep(Duration::from_millis(100)).await; // Simulate some work
    "Hello, World!"
}

async fn echo_handler(body: Bytes) -> impl IntoResponse {
    format!("Echo: {}", String::from_utf8_lossy(&body))
}

async fn streaming_handler() -> impl IntoResponse {
    use futures::stream;

    let stream = stream::unfold(0u32, |count| async move {
        if count >= 5 {
            None
        } else {
            sleep(Duration::from_millis(200)).await;
            Some((
                Ok::<_, std::convert::Infallible>(Bytes::from(format!("chunk-{count}\n"))),
                count + 1,
            ))
        }
    });

    Response::builder()
        .header("content-type", "text/plain")
        .body(Body::from_stream(stream))
        .unwrap()
}

async fn missing_handler() -> impl IntoResponse {
    (axum::http::StatusCode::NOT_FOUND, "nothing here\n")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    info!("Starting access log demo server");

    let access_log = AccessLog::new()
        .collector(TimedCollector(StandardCollector))
        .record_response(true);

    let app = Router::new()
        .route("/hello", get(hello_handler))
        .route("/echo", post(echo_handler))
        .route("/streaming", get(streaming_handler))
        .route("/missing", get(missing_handler))
        .layer(access_log);

    info!("Demo server endpoints:");
    info!("  GET  /hello      - Simple greeting");
    info!("  POST /echo       - Echo request body");
    info!("  GET  /streaming  - Streaming response (bytes counted per chunk)");
    info!("  GET  /missing    - Non-200 status in the log");
    info!("");
    info!("Try these commands:");
    info!("  curl http://localhost:3000/hello");
    info!("  curl -X POST -d 'Hello from client' http://localhost:3000/echo");
    info!("  curl http://localhost:3000/streaming");
    info!("  curl http://localhost:3000/missing");

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Demo server listening on http://localhost:3000");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
