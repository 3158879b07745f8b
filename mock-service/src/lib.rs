//! A small HTTP target for exercising `press` in tests.
use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

pub const HELLO: &str = "Hello, world!";

/// A running mock target. The server task is aborted when this is dropped.
pub struct MockService {
    addr: SocketAddr,
    hits: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl MockService {
    /// Serve on an ephemeral port on localhost.
    pub async fn start() -> anyhow::Result<Self> {
        Self::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicU64::new(0));
        let app = router(hits.clone());

        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!("Mock service stopped: {err}");
            }
        });
        debug!("Mock service listening on {addr}");

        Ok(Self { addr, hits, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests served so far, across every route.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn router(hits: Arc<AtomicU64>) -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/status/:code", get(status))
        .route("/delay/ms/:delay_ms", get(delay))
        .layer(TraceLayer::new_for_http())
        .with_state(hits)
}

#[debug_handler]
async fn hello(State(hits): State<Arc<AtomicU64>>) -> &'static str {
    hits.fetch_add(1, Ordering::Relaxed);
    HELLO
}

#[debug_handler]
async fn status(State(hits): State<Arc<AtomicU64>>, Path(code): Path<u16>) -> StatusCode {
    hits.fetch_add(1, Ordering::Relaxed);
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

#[debug_handler]
async fn delay(State(hits): State<Arc<AtomicU64>>, Path(delay_ms): Path<u64>) -> &'static str {
    hits.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    "Ok"
}
