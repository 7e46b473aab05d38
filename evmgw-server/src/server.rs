//! Axum server setup and router configuration.

use crate::api;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .merge(api::routes())
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use evmgw_core::config::StreamConfig;
    use evmgw_sdk::objects::{RpcErrorCode, RpcResponse};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router() -> Router {
        build_router(AppState::new(StreamConfig::default(), None))
    }

    async fn post_rpc(body: &str) -> RpcResponse {
        let response = router()
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_http_block_number() {
        let response =
            post_rpc(r#"{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber","params":[]}"#).await;
        assert_eq!(response.id, json!(1));
        assert_eq!(response.result, Some(json!("0x0")));
    }

    #[tokio::test]
    async fn test_http_subscribe_is_unsupported() {
        let response = post_rpc(
            r#"{"jsonrpc":"2.0","id":"a","method":"eth_subscribe","params":["newHeads"]}"#,
        )
        .await;
        assert_eq!(response.id, json!("a"));
        let error = response.error.unwrap();
        assert_eq!(error.code, RpcErrorCode::METHOD_NOT_FOUND);
        assert_eq!(error.message, "notifications not supported");
    }

    #[tokio::test]
    async fn test_http_parse_error() {
        let response = post_rpc("{not json").await;
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, RpcErrorCode::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let response = router()
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
