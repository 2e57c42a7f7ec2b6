//! API server lifecycle: starts and stops the axum HTTP server.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

/// Handle to a running API server.
pub struct ApiServer {
    /// Address the listener is bound to (resolved when port 0 was requested).
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Ask the server to shut down gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait until the server task has finished.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("API server task failed: {e}");
            }
        }
    }
}

/// Start the API server on `addr` (port 0 picks an ephemeral port).
///
/// Builds the full `api_router` and spawns the axum server in a background
/// tokio task. Returns an `ApiServer` handle with the bound address and a
/// shutdown channel.
pub async fn start_api_server_on(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = api_router(core);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use crate::db::open_memory_database;
    use crate::pipeline::synthesis::{MockCompletion, RecipeSynthesizer, SynthesisSettings};

    const PASTA_RESPONSE: &str = "```json\n{\"title\":\"Pasta Delight\",\"ingredients\":[{\"name\":\"tomato\",\"quantity\":\"2\"}],\"instructions\":[\"Boil pasta\"]}\n```";

    fn test_core() -> Arc<CoreState> {
        let synth = RecipeSynthesizer::new(
            Arc::new(MockCompletion::new(PASTA_RESPONSE)),
            None,
            SynthesisSettings {
                model: "test-model".into(),
                max_tokens: 100,
                min_ingredients: 5,
            },
        );
        Arc::new(CoreState::new(
            open_memory_database().unwrap(),
            Arc::new(synth),
            None,
        ))
    }

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start_api_server_on(test_core(), localhost())
            .await
            .expect("server should start");

        assert!(server.addr.ip().is_loopback());
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), server.stopped())
            .await
            .expect("server should stop");
    }

    #[tokio::test]
    async fn generates_recipe_over_http() {
        let mut server = start_api_server_on(test_core(), localhost())
            .await
            .expect("server should start");
        let port = server.addr.port();

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/generate-recipe"))
            .header("X-User-Id", "alice")
            .json(&serde_json::json!({
                "selectedIngredients": ["tomato", "onion", "garlic", "basil", "pasta"]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["recipe"]["title"], "Pasta Delight");

        // CORS is open to any origin.
        let resp = client
            .get(format!("http://127.0.0.1:{port}/api/health"))
            .header("Origin", "https://somewhere.example")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");

        server.shutdown();
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let mut server = start_api_server_on(test_core(), localhost())
            .await
            .expect("server should start");

        let url = format!("http://{}/nonexistent", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_api_server_on(test_core(), localhost())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown();
        server.stopped().await;
        server.stopped().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let err = start_api_server_on(test_core(), addr).await.err().unwrap();
        assert!(err.contains("Failed to bind"), "{err}");
    }
}
