//! Exposes an in-process fake of the pet-store API for use in integration tests.
//!
//! ```
//! use petstore_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.url("/pet/1");
//!    // use the URL in tests...
//! }
//! ```

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

/// The pet served by [`petstore`] under `/pet/1`.
pub fn fido() -> Value {
    json!({
        "id": 1,
        "category": { "id": 1, "name": "Dogs" },
        "name": "Fido",
        "photoUrls": [],
        "tags": [],
        "status": "available",
    })
}

/// A router that behaves like a healthy pet-store API.
///
/// - `GET /pet/1` returns [`fido`]
/// - `GET /pet/findByStatus` returns a list containing [`fido`]
/// - everything else, including `GET /`, returns `404 Not Found`
pub fn petstore() -> Router {
    Router::new()
        .route("/pet/1", get(|| async { Json(fido()) }))
        .route(
            "/pet/findByStatus",
            get(|| async { Json(Value::Array(vec![fido()])) }),
        )
}

/// An in-process test server for use in integration tests.
///
/// The server listens on a random available port on localhost and is stopped when dropped.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
}

impl TestServer {
    /// Starts a server backed by the healthy [`petstore`] router.
    pub async fn new() -> Self {
        Self::with_router(petstore()).await
    }

    /// Starts a server with custom routes, e.g. to simulate a misbehaving API.
    pub async fn with_router(router: Router) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let socket = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { handle, socket }
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses the IPv4 loopback address as hostname.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://{}/{}", self.socket, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
