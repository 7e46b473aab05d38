//! Answers read queries from local state instead of the remote node.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;

use super::emulator::{EmulatorError, ExecutionFailure, StateReader};
use crate::storage::{BlockIndexer, StorageError};

/// Errors returned by [`LocalClient`].
#[derive(Debug, Error)]
pub enum LocalClientError {
    #[error("local client is read-only")]
    ReadOnly,

    #[error("execution reverted")]
    Reverted(Bytes),

    #[error("failed transaction: {0}")]
    FailedTransaction(String),

    #[error("emulator error: {0}")]
    Emulator(#[from] EmulatorError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Read and submit surface of an EVM node.
#[async_trait]
pub trait EvmClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn send_raw_transaction(&self, data: Bytes) -> Result<B256, Self::Error>;

    async fn get_balance(&self, address: Address, evm_height: u64) -> Result<U256, Self::Error>;

    /// Execute `data` without committing; returns the returned data.
    async fn call(&self, data: Bytes, from: Address, evm_height: u64) -> Result<Bytes, Self::Error>;

    async fn estimate_gas(&self, data: Bytes, from: Address, evm_height: u64) -> Result<u64, Self::Error>;

    async fn get_nonce(&self, address: Address, evm_height: u64) -> Result<u64, Self::Error>;

    async fn get_code(&self, address: Address, evm_height: u64) -> Result<Bytes, Self::Error>;

    async fn get_storage_at(
        &self,
        address: Address,
        slot: B256,
        evm_height: u64,
    ) -> Result<B256, Self::Error>;

    async fn get_latest_evm_height(&self) -> Result<u64, Self::Error>;
}

/// [`EvmClient`] over local state.
///
/// The state is pinned to the block it was forked at; the `evm_height`
/// arguments are not consulted.
pub struct LocalClient {
    state: Arc<dyn StateReader>,
    blocks: Arc<dyn BlockIndexer>,
}

impl LocalClient {
    pub fn new(state: Arc<dyn StateReader>, blocks: Arc<dyn BlockIndexer>) -> Self {
        Self { state, blocks }
    }
}

#[async_trait]
impl EvmClient for LocalClient {
    type Error = LocalClientError;

    async fn send_raw_transaction(&self, _data: Bytes) -> Result<B256, LocalClientError> {
        Err(LocalClientError::ReadOnly)
    }

    async fn get_balance(&self, address: Address, _evm_height: u64) -> Result<U256, LocalClientError> {
        Ok(self.state.balance(address))
    }

    async fn call(&self, data: Bytes, from: Address, _evm_height: u64) -> Result<Bytes, LocalClientError> {
        let result = self.state.call(from, &data)?;
        match result.failure {
            None => Ok(result.returned_data),
            Some(ExecutionFailure::Reverted) => Err(LocalClientError::Reverted(result.returned_data)),
            Some(ExecutionFailure::Failed(message)) => Err(LocalClientError::FailedTransaction(message)),
        }
    }

    async fn estimate_gas(&self, data: Bytes, from: Address, _evm_height: u64) -> Result<u64, LocalClientError> {
        Ok(self.state.call(from, &data)?.gas_consumed)
    }

    async fn get_nonce(&self, address: Address, _evm_height: u64) -> Result<u64, LocalClientError> {
        Ok(self.state.nonce(address))
    }

    async fn get_code(&self, address: Address, _evm_height: u64) -> Result<Bytes, LocalClientError> {
        Ok(self.state.code(address))
    }

    async fn get_storage_at(
        &self,
        address: Address,
        slot: B256,
        _evm_height: u64,
    ) -> Result<B256, LocalClientError> {
        Ok(self.state.storage_at(address, slot))
    }

    async fn get_latest_evm_height(&self) -> Result<u64, LocalClientError> {
        Ok(self.blocks.latest_evm_height().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::MockState;
    use crate::storage::{ChainWriter, InMemoryStore};
    use crate::test_utils;

    async fn client(state: MockState) -> LocalClient {
        let store = Arc::new(InMemoryStore::new());
        store
            .store_block(test_utils::block(1, B256::ZERO, &[]), vec![], vec![])
            .await
            .unwrap();
        LocalClient::new(Arc::new(state), store)
    }

    #[tokio::test]
    async fn test_reads_come_from_state() {
        let owner = Address::repeat_byte(1);
        let mut state = MockState::default();
        state.balances.insert(owner, U256::from(42u64));
        state.nonces.insert(owner, 3);
        state.code.insert(owner, Bytes::from_static(&[0x60, 0x00]));
        state
            .storage
            .insert((owner, B256::ZERO), B256::repeat_byte(7));
        let client = client(state).await;

        assert_eq!(client.get_balance(owner, 1).await.unwrap(), U256::from(42u64));
        assert_eq!(client.get_nonce(owner, 1).await.unwrap(), 3);
        assert_eq!(client.get_code(owner, 1).await.unwrap().len(), 2);
        assert_eq!(
            client.get_storage_at(owner, B256::ZERO, 1).await.unwrap(),
            B256::repeat_byte(7)
        );
        assert_eq!(client.get_latest_evm_height().await.unwrap(), 1);
        assert_eq!(
            client.get_balance(Address::ZERO, 1).await.unwrap(),
            U256::ZERO
        );
    }

    #[tokio::test]
    async fn test_send_is_refused() {
        let client = client(MockState::default()).await;
        assert!(matches!(
            client.send_raw_transaction(Bytes::new()).await,
            Err(LocalClientError::ReadOnly)
        ));
    }

    #[tokio::test]
    async fn test_call_outcomes() {
        let client = client(MockState {
            call_gas: 30_000,
            ..Default::default()
        })
        .await;
        let from = Address::repeat_byte(2);

        let ok = client.call(Bytes::from_static(b"ok"), from, 1).await.unwrap();
        assert_eq!(ok, Bytes::from_static(b"ok"));
        assert_eq!(
            client
                .estimate_gas(Bytes::from_static(b"ok"), from, 1)
                .await
                .unwrap(),
            30_000
        );

        let reverted = client
            .call(Bytes::from_static(b"revert"), from, 1)
            .await
            .unwrap_err();
        assert!(matches!(reverted, LocalClientError::Reverted(data) if data == Bytes::from_static(b"revert")));

        let failed = client
            .call(Bytes::from_static(b"fail"), from, 1)
            .await
            .unwrap_err();
        assert!(matches!(failed, LocalClientError::FailedTransaction(_)));
    }
}
