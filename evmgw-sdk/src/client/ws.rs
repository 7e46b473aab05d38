use std::collections::VecDeque;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use super::ClientError;
use crate::objects::{
    FilterCriteria, RpcRequest, RpcResponse, SubscriptionId, SubscriptionKind,
    SubscriptionNotification,
};

/// Typed client for `eth_subscribe` over a gateway WebSocket.
///
/// Requests are issued one at a time. Pushes that arrive while a response
/// is awaited are queued and handed out by [`Self::next_notification`] in
/// arrival order.
pub struct SubscriptionClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    pending: VecDeque<SubscriptionNotification>,
}

impl SubscriptionClient {
    /// Connect to `url` (e.g. `ws://127.0.0.1:8545/ws`).
    pub async fn connect(url: &Url) -> Result<Self, ClientError> {
        let (socket, _) = connect_async(url.as_str()).await?;
        Ok(Self {
            socket,
            next_id: 1,
            pending: VecDeque::new(),
        })
    }

    /// `eth_subscribe("newHeads")`
    pub async fn subscribe_new_heads(&mut self) -> Result<SubscriptionId, ClientError> {
        self.subscribe(SubscriptionKind::NewHeads, None::<()>).await
    }

    /// `eth_subscribe("newPendingTransactions", full_tx)`
    pub async fn subscribe_pending_transactions(
        &mut self,
        full_tx: Option<bool>,
    ) -> Result<SubscriptionId, ClientError> {
        self.subscribe(SubscriptionKind::NewPendingTransactions, full_tx)
            .await
    }

    /// `eth_subscribe("logs", criteria)`
    pub async fn subscribe_logs(
        &mut self,
        criteria: &FilterCriteria,
    ) -> Result<SubscriptionId, ClientError> {
        self.subscribe(SubscriptionKind::Logs, Some(criteria)).await
    }

    /// Generic `eth_subscribe` with an optional second parameter.
    pub async fn subscribe<P: Serialize>(
        &mut self,
        kind: SubscriptionKind,
        param: Option<P>,
    ) -> Result<SubscriptionId, ClientError> {
        let mut params = vec![serde_json::to_value(kind)?];
        if let Some(param) = param {
            params.push(serde_json::to_value(param)?);
        }
        let result = self.request("eth_subscribe", params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// `eth_unsubscribe(id)`; returns whether the server knew the id.
    pub async fn unsubscribe(&mut self, id: &SubscriptionId) -> Result<bool, ClientError> {
        let result = self
            .request("eth_unsubscribe", vec![serde_json::to_value(id)?])
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Wait for the next subscription push.
    pub async fn next_notification(&mut self) -> Result<SubscriptionNotification, ClientError> {
        if let Some(notification) = self.pending.pop_front() {
            return Ok(notification);
        }
        let text = self.next_text().await?;
        serde_json::from_str::<SubscriptionNotification>(&text)
            .map_err(|_| ClientError::UnexpectedMessage(text))
    }

    /// Send a request and wait for the response carrying the same id.
    pub async fn request(&mut self, method: &str, params: Vec<Value>) -> Result<Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest::new(id, method, params);
        self.socket
            .send(Message::Text(serde_json::to_string(&request)?))
            .await?;

        loop {
            let text = self.next_text().await?;
            if let Ok(notification) = serde_json::from_str::<SubscriptionNotification>(&text) {
                self.pending.push_back(notification);
                continue;
            }
            let response: RpcResponse = serde_json::from_str(&text)?;
            if response.id != Value::from(id) {
                return Err(ClientError::UnexpectedMessage(text));
            }
            if let Some(error) = response.error {
                return Err(ClientError::Rpc(error));
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Result<String, ClientError> {
        while let Some(message) = self.socket.next().await {
            match message? {
                Message::Text(text) => return Ok(text),
                Message::Close(_) => return Err(ClientError::Closed),
                _ => continue,
            }
        }
        Err(ClientError::Closed)
    }
}
