//! Builders for chain data used across unit tests.

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};

use crate::models::{Block, Log, Receipt, ReceiptStatus, Transaction, TransactionCall};

/// A signed transaction whose hash and nonce are derived from `n`.
pub fn transaction(n: u64) -> Transaction {
    Transaction::TransactionCall(TransactionCall {
        hash: keccak256(n.to_be_bytes()),
        tx_type: 2,
        chain_id: Some(545),
        from: Address::repeat_byte(0x11),
        to: Some(Address::repeat_byte(0x22)),
        nonce: n,
        value: U256::from(1_000u64),
        gas_limit: 21_000,
        gas_price: 1,
        input: Bytes::new(),
    })
}

pub fn block(height: u64, parent: B256, transactions: &[&Transaction]) -> Block {
    Block {
        height,
        parent_block_hash: parent,
        receipt_root: B256::repeat_byte(0x33),
        timestamp: 1_700_000_000 + height,
        prev_randao: B256::repeat_byte(0x44),
        transaction_hashes: transactions.iter().map(|tx| tx.hash()).collect(),
    }
}

pub fn receipt(tx: &Transaction, height: u64, index: u64) -> Receipt {
    receipt_with_logs(tx, height, index, vec![])
}

pub fn receipt_with_logs(tx: &Transaction, height: u64, index: u64, logs: Vec<Log>) -> Receipt {
    Receipt {
        tx_hash: tx.hash(),
        block_number: height,
        transaction_index: index,
        status: ReceiptStatus::Successful,
        gas_used: 21_000,
        cumulative_gas_used: 21_000 * (index + 1),
        contract_address: None,
        logs,
        revert_reason: Bytes::new(),
        precompiled_calls: Bytes::new(),
    }
}
