//! JSON-RPC method dispatch shared by the HTTP and WebSocket endpoints.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, U64, U256, hex};
use evmgw_core::api::{Notifier, SubscribeError};
use evmgw_core::state::{EvmClient, LocalClient, LocalClientError};
use evmgw_sdk::objects::{
    FilterCriteria, RpcErrorCode, RpcRequest, RpcResponse, SubscriptionId, SubscriptionKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::notifier::WsNotifier;
use crate::state::AppState;

/// Result of one dispatched request.
pub(crate) struct Dispatched {
    pub response: RpcResponse,
    /// Set when the request created a subscription. Its pushes are held
    /// until the response has been queued.
    pub subscribed: Option<SubscriptionId>,
}

impl From<RpcResponse> for Dispatched {
    fn from(response: RpcResponse) -> Self {
        Self {
            response,
            subscribed: None,
        }
    }
}

/// A failed call, turned into the error member of the response.
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn invalid_params(message: impl std::fmt::Display) -> Self {
        Self {
            code: RpcErrorCode::INVALID_PARAMS,
            message: format!("invalid params: {message}"),
        }
    }

    fn internal(message: impl std::fmt::Display) -> Self {
        Self {
            code: RpcErrorCode::INTERNAL_ERROR,
            message: message.to_string(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: RpcErrorCode::METHOD_NOT_FOUND,
            message: format!("the method {method} does not exist/is not available"),
        }
    }
}

impl From<LocalClientError> for RpcError {
    fn from(err: LocalClientError) -> Self {
        match err {
            LocalClientError::Reverted(data) => Self {
                code: RpcErrorCode::EXECUTION_REVERTED,
                message: format!("execution reverted: {}", hex::encode_prefixed(&data)),
            },
            LocalClientError::ReadOnly | LocalClientError::FailedTransaction(_) => Self {
                code: RpcErrorCode::SERVER_ERROR,
                message: err.to_string(),
            },
            LocalClientError::Emulator(_) | LocalClientError::Storage(_) => Self::internal(err),
        }
    }
}

impl From<SubscribeError> for RpcError {
    fn from(err: SubscribeError) -> Self {
        let code = match err {
            SubscribeError::NotificationsUnsupported => RpcErrorCode::METHOD_NOT_FOUND,
            SubscribeError::ExceedMaxTopics { .. } | SubscribeError::ExceedMaxAddresses { .. } => {
                RpcErrorCode::INVALID_PARAMS
            }
            SubscribeError::Storage(_) => RpcErrorCode::INTERNAL_ERROR,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

/// Handle one request. `notifier` is `None` on transports that cannot push.
pub(crate) async fn dispatch(
    state: &AppState,
    notifier: Option<&Arc<WsNotifier>>,
    request: RpcRequest,
) -> Dispatched {
    let id = request.id.clone();
    tracing::debug!(method = %request.method, "rpc request");

    let outcome = match request.method.as_str() {
        "eth_subscribe" => subscribe(state, notifier, &request.params)
            .await
            .map(|sub_id| (Value::String(sub_id.to_string()), Some(sub_id))),
        "eth_unsubscribe" => unsubscribe(notifier, &request.params).map(|ok| (Value::Bool(ok), None)),
        "eth_blockNumber" => block_number(state).await.map(|number| (number, None)),
        method @ ("eth_getBalance" | "eth_getTransactionCount" | "eth_getCode"
        | "eth_getStorageAt" | "eth_call" | "eth_estimateGas" | "eth_sendRawTransaction") => {
            match &state.local {
                Some(local) => state_read(local, method, &request.params)
                    .await
                    .map(|result| (result, None)),
                None => Err(RpcError::method_not_found(method)),
            }
        }
        method => Err(RpcError::method_not_found(method)),
    };

    match outcome {
        Ok((result, subscribed)) => Dispatched {
            response: RpcResponse::success(id, result),
            subscribed,
        },
        Err(err) => RpcResponse::failure(id, err.code, err.message).into(),
    }
}

async fn subscribe(
    state: &AppState,
    notifier: Option<&Arc<WsNotifier>>,
    params: &[Value],
) -> Result<SubscriptionId, RpcError> {
    let kind: SubscriptionKind = required_param(params, 0)?;
    let notifier = notifier.map(|notifier| Arc::clone(notifier) as Arc<dyn Notifier>);
    let notifier = notifier.as_ref();

    let handle = match kind {
        SubscriptionKind::NewHeads => state.stream.new_heads(notifier).await?,
        SubscriptionKind::NewPendingTransactions => {
            let full_tx: Option<bool> = optional_param(params, 1)?;
            state
                .stream
                .new_pending_transactions(notifier, full_tx)
                .await?
        }
        SubscriptionKind::Logs => {
            let criteria: Option<FilterCriteria> = optional_param(params, 1)?;
            state
                .stream
                .logs(notifier, criteria.unwrap_or_default())
                .await?
        }
    };
    Ok(handle.id().clone())
}

fn unsubscribe(notifier: Option<&Arc<WsNotifier>>, params: &[Value]) -> Result<bool, RpcError> {
    let notifier = notifier.ok_or(SubscribeError::NotificationsUnsupported)?;
    let id: SubscriptionId = required_param(params, 0)?;
    Ok(notifier.unsubscribe(&id))
}

async fn block_number(state: &AppState) -> Result<Value, RpcError> {
    let height = state.stream.block_number().await.map_err(RpcError::internal)?;
    serde_json::to_value(U64::from(height)).map_err(RpcError::internal)
}

/// `eth_call` / `eth_estimateGas` argument. Fields the local state does
/// not execute with (gas, value, ...) are ignored.
#[derive(Deserialize)]
struct CallArgs {
    #[serde(default)]
    from: Address,
    #[serde(default, alias = "data")]
    input: Bytes,
}

/// Reads answered from the attached state. Block tags are accepted but the
/// state is pinned to the block it was forked at.
async fn state_read(client: &LocalClient, method: &str, params: &[Value]) -> Result<Value, RpcError> {
    let height = client.get_latest_evm_height().await?;
    match method {
        "eth_getBalance" => to_result(client.get_balance(required_param(params, 0)?, height).await?),
        "eth_getTransactionCount" => {
            let nonce = client.get_nonce(required_param(params, 0)?, height).await?;
            to_result(U64::from(nonce))
        }
        "eth_getCode" => to_result(client.get_code(required_param(params, 0)?, height).await?),
        "eth_getStorageAt" => {
            let address: Address = required_param(params, 0)?;
            let slot: U256 = required_param(params, 1)?;
            let slot = B256::from(slot.to_be_bytes::<32>());
            to_result(client.get_storage_at(address, slot, height).await?)
        }
        "eth_call" => {
            let args: CallArgs = required_param(params, 0)?;
            to_result(client.call(args.input, args.from, height).await?)
        }
        "eth_estimateGas" => {
            let args: CallArgs = required_param(params, 0)?;
            let gas = client.estimate_gas(args.input, args.from, height).await?;
            to_result(U64::from(gas))
        }
        "eth_sendRawTransaction" => {
            let raw: Bytes = required_param(params, 0)?;
            to_result(client.send_raw_transaction(raw).await?)
        }
        method => Err(RpcError::method_not_found(method)),
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(RpcError::internal)
}

fn required_param<T: DeserializeOwned>(params: &[Value], index: usize) -> Result<T, RpcError> {
    let value = params
        .get(index)
        .ok_or_else(|| RpcError::invalid_params(format!("missing value for required argument {index}")))?;
    serde_json::from_value(value.clone()).map_err(RpcError::invalid_params)
}

fn optional_param<T: DeserializeOwned>(params: &[Value], index: usize) -> Result<Option<T>, RpcError> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(RpcError::invalid_params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evmgw_core::config::{FilterLimits, StreamConfig};
    use evmgw_core::state::{EmulatorError, ExecutionFailure, ExecutionResult, StateReader};
    use serde_json::json;

    fn state() -> AppState {
        AppState::new(
            StreamConfig {
                filter: FilterLimits {
                    max_topics: 1,
                    max_addresses: 1,
                },
                ..Default::default()
            },
            None,
        )
    }

    const OWNER: Address = Address::repeat_byte(0xaa);

    /// One funded account; calls echo their input, `revert` reverts.
    struct FixedState;

    impl StateReader for FixedState {
        fn balance(&self, address: Address) -> U256 {
            if address == OWNER { U256::from(1000u64) } else { U256::ZERO }
        }

        fn nonce(&self, address: Address) -> u64 {
            if address == OWNER { 5 } else { 0 }
        }

        fn code(&self, _address: Address) -> Bytes {
            Bytes::from_static(&[0x60, 0x00])
        }

        fn storage_at(&self, _address: Address, slot: B256) -> B256 {
            slot
        }

        fn call(&self, _from: Address, data: &Bytes) -> Result<ExecutionResult, EmulatorError> {
            Ok(ExecutionResult {
                tx_hash: B256::ZERO,
                gas_consumed: 21_000,
                returned_data: data.clone(),
                failure: (data.as_ref() == b"revert").then_some(ExecutionFailure::Reverted),
            })
        }
    }

    fn state_with_reads() -> AppState {
        AppState::new(StreamConfig::default(), Some(Arc::new(FixedState) as Arc<dyn StateReader>))
    }

    fn request(method: &str, params: Vec<Value>) -> RpcRequest {
        RpcRequest::new(7, method, params)
    }

    fn error_code(dispatched: &Dispatched) -> i64 {
        dispatched.response.error.as_ref().unwrap().code
    }

    #[tokio::test]
    async fn test_block_number_of_empty_store() {
        let dispatched = dispatch(&state(), None, request("eth_blockNumber", vec![])).await;
        assert_eq!(dispatched.response.id, json!(7));
        assert_eq!(dispatched.response.result, Some(json!("0x0")));
        assert!(dispatched.subscribed.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dispatched = dispatch(&state(), None, request("eth_chainId", vec![])).await;
        assert_eq!(error_code(&dispatched), RpcErrorCode::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_subscribe_without_push_transport() {
        let dispatched = dispatch(&state(), None, request("eth_subscribe", vec![json!("newHeads")])).await;
        let error = dispatched.response.error.unwrap();
        assert_eq!(error.code, RpcErrorCode::METHOD_NOT_FOUND);
        assert_eq!(error.message, "notifications not supported");

        let dispatched = dispatch(&state(), None, request("eth_unsubscribe", vec![json!("0x01")])).await;
        assert_eq!(error_code(&dispatched), RpcErrorCode::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_subscribe_params() {
        let state = state();
        let (notifier, _outbound) = WsNotifier::new();

        let missing = dispatch(&state, Some(&notifier), request("eth_subscribe", vec![])).await;
        assert_eq!(error_code(&missing), RpcErrorCode::INVALID_PARAMS);

        let unknown = dispatch(
            &state,
            Some(&notifier),
            request("eth_subscribe", vec![json!("syncing")]),
        )
        .await;
        assert_eq!(error_code(&unknown), RpcErrorCode::INVALID_PARAMS);

        let bad_flag = dispatch(
            &state,
            Some(&notifier),
            request("eth_subscribe", vec![json!("newPendingTransactions"), json!("yes")]),
        )
        .await;
        assert_eq!(error_code(&bad_flag), RpcErrorCode::INVALID_PARAMS);

        let oversized = dispatch(
            &state,
            Some(&notifier),
            request(
                "eth_subscribe",
                vec![
                    json!("logs"),
                    json!({ "address": [format!("0x{}", "11".repeat(20)), format!("0x{}", "22".repeat(20))] }),
                ],
            ),
        )
        .await;
        assert_eq!(error_code(&oversized), RpcErrorCode::INVALID_PARAMS);
        assert!(oversized.subscribed.is_none());
    }

    #[tokio::test]
    async fn test_subscribe_then_unsubscribe() {
        let state = state();
        let (notifier, _outbound) = WsNotifier::new();

        let dispatched = dispatch(
            &state,
            Some(&notifier),
            request("eth_subscribe", vec![json!("logs"), Value::Null]),
        )
        .await;
        let sub_id = dispatched.subscribed.unwrap();
        assert_eq!(dispatched.response.result, Some(json!(sub_id.as_str())));

        let first = dispatch(
            &state,
            Some(&notifier),
            request("eth_unsubscribe", vec![json!(sub_id.as_str())]),
        )
        .await;
        assert_eq!(first.response.result, Some(json!(true)));

        let second = dispatch(
            &state,
            Some(&notifier),
            request("eth_unsubscribe", vec![json!(sub_id.as_str())]),
        )
        .await;
        assert_eq!(second.response.result, Some(json!(false)));
    }

    #[tokio::test]
    async fn test_state_reads_without_attached_state() {
        let dispatched = dispatch(
            &state(),
            None,
            request("eth_getBalance", vec![json!(OWNER), json!("latest")]),
        )
        .await;
        assert_eq!(error_code(&dispatched), RpcErrorCode::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_state_reads() {
        let state = state_with_reads();
        let result = |dispatched: Dispatched| dispatched.response.result.unwrap();

        let balance = dispatch(&state, None, request("eth_getBalance", vec![json!(OWNER), json!("latest")])).await;
        assert_eq!(result(balance), json!("0x3e8"));

        let nonce = dispatch(&state, None, request("eth_getTransactionCount", vec![json!(OWNER)])).await;
        assert_eq!(result(nonce), json!("0x5"));

        let code = dispatch(&state, None, request("eth_getCode", vec![json!(OWNER)])).await;
        assert_eq!(result(code), json!("0x6000"));

        let slot = dispatch(&state, None, request("eth_getStorageAt", vec![json!(OWNER), json!("0x1")])).await;
        assert_eq!(result(slot), json!(format!("0x{}01", "00".repeat(31))));

        let call = dispatch(&state, None, request("eth_call", vec![json!({ "from": OWNER, "data": "0x1234" })])).await;
        assert_eq!(result(call), json!("0x1234"));

        let gas = dispatch(&state, None, request("eth_estimateGas", vec![json!({ "input": "0x" })])).await;
        assert_eq!(result(gas), json!("0x5208"));
    }

    #[tokio::test]
    async fn test_state_read_errors() {
        let state = state_with_reads();

        let reverted = dispatch(
            &state,
            None,
            request("eth_call", vec![json!({ "data": format!("0x{}", hex::encode(b"revert")) })]),
        )
        .await;
        let error = reverted.response.error.unwrap();
        assert_eq!(error.code, RpcErrorCode::EXECUTION_REVERTED);
        assert!(error.message.starts_with("execution reverted: 0x"));

        let send = dispatch(&state, None, request("eth_sendRawTransaction", vec![json!("0x02")])).await;
        assert_eq!(error_code(&send), RpcErrorCode::SERVER_ERROR);

        let missing = dispatch(&state, None, request("eth_getBalance", vec![])).await;
        assert_eq!(error_code(&missing), RpcErrorCode::INVALID_PARAMS);
    }
}
