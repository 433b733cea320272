//! Local HTTP fixtures for probe tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

/// Request counters shared with the fixture's handler.
#[derive(Default)]
struct Traffic {
    hits: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements `in_flight` even if the handler future is dropped.
struct InFlight(Arc<Traffic>);

impl InFlight {
    fn enter(traffic: Arc<Traffic>) -> Self {
        traffic.hits.fetch_add(1, Ordering::SeqCst);
        let now = traffic.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        traffic.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(traffic)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Axum server on 127.0.0.1 answering `/` with a switchable status.
pub struct StatusServer {
    addr: SocketAddr,
    status: Arc<AtomicU16>,
    traffic: Arc<Traffic>,
}

impl StatusServer {
    pub async fn start(status: u16) -> Self {
        Self::start_with_delay(status, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: u16, delay: Duration) -> Self {
        let status = Arc::new(AtomicU16::new(status));
        let traffic = Arc::new(Traffic::default());
        let (shared, counters) = (status.clone(), traffic.clone());
        let app = Router::new().route(
            "/",
            get(move || {
                let shared = shared.clone();
                let guard = InFlight::enter(counters.clone());
                async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    drop(guard);
                    StatusCode::from_u16(shared.load(Ordering::SeqCst))
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            status,
            traffic,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.traffic.hits.load(Ordering::SeqCst)
    }

    /// Highest number of requests ever handled at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.traffic.max_in_flight.load(Ordering::SeqCst)
    }
}

/// URL of a local port with nothing listening on it.
pub fn refused_target() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}
