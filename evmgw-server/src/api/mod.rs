//! JSON-RPC endpoints.
//!
//! - `POST /` answers single requests over HTTP; it cannot push, so
//!   `eth_subscribe` fails with "notifications not supported"
//! - `GET /ws` serves the same methods over a WebSocket, with subscriptions
//!
//! State reads (`eth_getBalance`, `eth_call`, ...) are served only when a
//! forked state is attached to [`AppState`].

mod notifier;
mod rpc;
mod ws;

use crate::state::AppState;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use evmgw_sdk::objects::{RpcErrorCode, RpcRequest, RpcResponse};
use serde_json::Value;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(rpc_http))
        .route("/ws", get(ws::rpc_ws))
}

/// `POST /`: one JSON-RPC request per body.
async fn rpc_http(State(state): State<AppState>, body: String) -> Json<RpcResponse> {
    let response = match serde_json::from_str::<RpcRequest>(&body) {
        Ok(request) => rpc::dispatch(&state, None, request).await.response,
        Err(e) => RpcResponse::failure(
            Value::Null,
            RpcErrorCode::PARSE_ERROR,
            format!("parse error: {e}"),
        ),
    };
    Json(response)
}
