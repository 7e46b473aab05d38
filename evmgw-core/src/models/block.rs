use alloy_primitives::{B256, keccak256};

/// An indexed EVM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    pub parent_block_hash: B256,
    pub receipt_root: B256,
    pub timestamp: u64,
    pub prev_randao: B256,
    pub transaction_hashes: Vec<B256>,
}

impl Block {
    /// Content hash of the block.
    ///
    /// Keccak-256 over the big-endian height, parent hash, receipt root,
    /// timestamp, prev-randao and every transaction hash, in that order.
    pub fn hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(8 + 32 + 32 + 8 + 32 + 32 * self.transaction_hashes.len());
        buf.extend_from_slice(&self.height.to_be_bytes());
        buf.extend_from_slice(self.parent_block_hash.as_slice());
        buf.extend_from_slice(self.receipt_root.as_slice());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(self.prev_randao.as_slice());
        for hash in &self.transaction_hashes {
            buf.extend_from_slice(hash.as_slice());
        }
        keccak256(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64) -> Block {
        Block {
            height,
            parent_block_hash: B256::repeat_byte(1),
            receipt_root: B256::ZERO,
            timestamp: 1_700_000_000,
            prev_randao: B256::ZERO,
            transaction_hashes: vec![B256::repeat_byte(9)],
        }
    }

    #[test]
    fn test_hash_covers_contents() {
        assert_eq!(block(1).hash(), block(1).hash());
        assert_ne!(block(1).hash(), block(2).hash());

        let mut other = block(1);
        other.transaction_hashes.push(B256::repeat_byte(8));
        assert_ne!(block(1).hash(), other.hash());
    }
}
