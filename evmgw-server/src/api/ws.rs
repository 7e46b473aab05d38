use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use evmgw_core::api::Notifier;
use evmgw_sdk::objects::{RpcErrorCode, RpcRequest, RpcResponse};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::notifier::WsNotifier;
use super::rpc::dispatch;
use crate::state::AppState;

/// `GET /ws`: JSON-RPC over WebSocket with `eth_subscribe` support.
pub(super) async fn rpc_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_rpc_ws(socket, state))
}

/// Drives one connection until either side goes away.
///
/// Incoming frames are dispatched in order on this task. Responses and
/// subscription pushes are queued on the connection's [`WsNotifier`] and
/// written by a separate writer task.
async fn handle_rpc_ws(socket: WebSocket, state: AppState) {
    let (sink, mut stream) = socket.split();
    let (notifier, outbound) = WsNotifier::new();
    let writer = tokio::spawn(write_frames(sink, outbound, notifier.closed()));

    tracing::debug!("WS: connection opened");

    let closed = notifier.closed();
    loop {
        let message = tokio::select! {
            _ = closed.cancelled() => break,
            message = stream.next() => message,
        };

        let text = match message {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "WS: receive error");
                break;
            }
        };

        let dispatched = match serde_json::from_str::<RpcRequest>(text.as_str()) {
            Ok(request) => dispatch(&state, Some(&notifier), request).await,
            Err(e) => RpcResponse::failure(
                Value::Null,
                RpcErrorCode::PARSE_ERROR,
                format!("parse error: {e}"),
            )
            .into(),
        };

        let frame = match serde_json::to_string(&dispatched.response) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "WS: failed to serialize response");
                break;
            }
        };
        if notifier.send(frame).await.is_err() {
            break;
        }
        if let Some(id) = dispatched.subscribed {
            notifier.activate(&id);
        }
    }

    notifier.close();
    if let Err(e) = writer.await {
        tracing::error!(error = %e, "WS: writer task failed");
    }
    tracing::debug!(
        subscriptions = notifier.subscription_count(),
        "WS: connection closed"
    );
}

/// Write queued frames to the socket until the connection closes.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    closed: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = outbound.recv() => frame,
        };
        let Some(frame) = frame else { break };
        if let Err(e) = sink.send(Message::Text(frame.into())).await {
            tracing::debug!(error = %e, "WS: send error");
            break;
        }
    }
    closed.cancel();
    let _ = sink.close().await;
}
