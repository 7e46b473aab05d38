//! WebSocket client for the gateway subscription API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in a WebSocket stack.

mod ws;

pub use ws::SubscriptionClient;

use crate::objects::RpcErrorObject;

/// Errors produced by the SDK client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (connect, TLS, connection reset, …).
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server answered the request with a JSON-RPC error.
    #[error("rpc error {}: {}", .0.code, .0.message)]
    Rpc(RpcErrorObject),

    /// A frame could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server closed the connection.
    #[error("connection closed")]
    Closed,

    /// The server sent a frame that is neither a response nor a push.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),
}
