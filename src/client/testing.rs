//! Real API server on a loopback port for client tests

use axum::Router;
use std::sync::Arc;
use tempfile::TempDir;

use crate::api::{build_router, testing::test_state};
use crate::db::Database;

pub(crate) struct TestServer {
    pub base_url: String,
    pub db: Arc<Database>,
    _uploads: TempDir,
}

pub(crate) async fn spawn_api() -> TestServer {
    let uploads = tempfile::tempdir().unwrap();
    let state = test_state(uploads.path());
    let db = Arc::clone(&state.db);

    TestServer {
        base_url: spawn_router(build_router(state)).await,
        db,
        _uploads: uploads,
    }
}

/// Serve any router on a loopback port and return its base URL
pub(crate) async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
