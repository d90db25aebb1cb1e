//! Shared utilities for integration tests.

use axum::{body::Bytes, http::StatusCode, http::Uri, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use router_registry::admin::setup_admin_router;
use router_registry::registry::{ConfigurationManager, RegistrationRequest};

/// A request as seen by a mock router.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: Bytes,
}

impl Recorded {
    #[allow(dead_code)]
    pub fn registration(&self) -> RegistrationRequest {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Start a programmable mock router on an ephemeral port.
///
/// `f` is called with every request and returns the status and body to answer.
#[allow(dead_code)]
pub async fn start_programmable_router<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(Recorded) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    let app = Router::new().fallback(move |uri: Uri, body: Bytes| {
        let f = f.clone();
        async move {
            let (status, body) = f(Recorded {
                path: uri.path().to_string(),
                body,
            })
            .await;
            (StatusCode::from_u16(status).unwrap(), body)
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Mock router that accepts everything and keeps what it received.
#[allow(dead_code)]
pub async fn start_recording_router() -> (SocketAddr, Arc<Mutex<Vec<Recorded>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let addr = start_programmable_router(move |request| {
        sink.lock().unwrap().push(request);
        async { (200, r#"{"status":"ok"}"#.to_string()) }
    })
    .await;
    (addr, received)
}

/// Serve the admin API of `manager` on an ephemeral port.
#[allow(dead_code)]
pub async fn start_admin(manager: Arc<ConfigurationManager>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = setup_admin_router(manager);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}
