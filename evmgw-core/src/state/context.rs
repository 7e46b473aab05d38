use alloy_primitives::{Address, B256, Bytes};

use crate::storage::{BlockIndexer, StorageError};

/// Gas charged for every direct call.
pub const DIRECT_CALL_BASE_GAS_USAGE: u64 = 21_000;
/// Direct calls are not priced.
pub const DIRECT_CALL_GAS_PRICE: u64 = 0;
/// How far back `BLOCKHASH` can look.
pub const MAX_BLOCK_HASHES: u64 = 256;

/// Hashes of the blocks preceding a replayed block.
///
/// Resolved before execution starts, so lookups during execution cannot
/// fail. Heights outside the window resolve to the zero hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHashes {
    first: u64,
    hashes: Vec<B256>,
}

impl BlockHashes {
    /// Load the hashes of up to [`MAX_BLOCK_HASHES`] blocks below `height`.
    pub async fn load(blocks: &dyn BlockIndexer, height: u64) -> Result<Self, StorageError> {
        // indexed heights start at 1
        let first = height.saturating_sub(MAX_BLOCK_HASHES).max(1);
        let mut hashes = Vec::with_capacity(height.saturating_sub(first) as usize);
        for n in first..height {
            hashes.push(blocks.get_by_height(n).await?.hash());
        }
        Ok(Self { first, hashes })
    }

    pub fn get(&self, height: u64) -> B256 {
        height
            .checked_sub(self.first)
            .and_then(|offset| self.hashes.get(offset as usize))
            .copied()
            .unwrap_or(B256::ZERO)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Everything the engine needs to know about the block a transaction is
/// replayed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub chain_id: u64,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub direct_call_base_gas_usage: u64,
    pub direct_call_gas_price: u64,
    pub gas_fee_collector: Address,
    pub random: B256,
    pub block_hashes: BlockHashes,
    /// Encoded precompiled-contract calls recorded in the receipt.
    pub precompiled_calls: Bytes,
}
