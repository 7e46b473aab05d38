use alloy_primitives::{Address, B256, Bytes, U256, keccak256};

/// Prefix byte that separates direct-call hashes from signed-transaction
/// hashes.
const DIRECT_CALL_TX_TYPE: u8 = 0xff;

/// Kinds of calls that the bridge issues without a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectCallKind {
    Deposit = 1,
    Withdraw = 2,
    Transfer = 3,
    Deploy = 4,
    Call = 5,
}

/// A call issued directly by the host chain rather than by a signed
/// EVM transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectCall {
    pub kind: DirectCallKind,
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub nonce: u64,
}

impl DirectCall {
    pub fn hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(2 + 20 + 20 + self.data.len() + 32 + 8 + 8);
        buf.push(DIRECT_CALL_TX_TYPE);
        buf.push(self.kind as u8);
        buf.extend_from_slice(self.from.as_slice());
        buf.extend_from_slice(self.to.as_slice());
        buf.extend_from_slice(&self.data);
        buf.extend_from_slice(&self.value.to_be_bytes::<32>());
        buf.extend_from_slice(&self.gas_limit.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        keccak256(&buf)
    }
}

/// A signed EVM transaction, already decoded by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCall {
    pub hash: B256,
    pub tx_type: u8,
    pub chain_id: Option<u64>,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub input: Bytes,
}

/// Any transaction the indexer stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    DirectCall(DirectCall),
    TransactionCall(TransactionCall),
}

impl Transaction {
    pub fn hash(&self) -> B256 {
        match self {
            Self::DirectCall(call) => call.hash(),
            Self::TransactionCall(tx) => tx.hash,
        }
    }

    pub fn from(&self) -> Address {
        match self {
            Self::DirectCall(call) => call.from,
            Self::TransactionCall(tx) => tx.from,
        }
    }

    pub fn to(&self) -> Option<Address> {
        match self {
            Self::DirectCall(call) => Some(call.to),
            Self::TransactionCall(tx) => tx.to,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Self::DirectCall(call) => call.nonce,
            Self::TransactionCall(tx) => tx.nonce,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            Self::DirectCall(call) => call.value,
            Self::TransactionCall(tx) => tx.value,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::DirectCall(call) => call.gas_limit,
            Self::TransactionCall(tx) => tx.gas_limit,
        }
    }

    /// Direct calls are not priced.
    pub fn gas_price(&self) -> u128 {
        match self {
            Self::DirectCall(_) => 0,
            Self::TransactionCall(tx) => tx.gas_price,
        }
    }

    pub fn input(&self) -> &Bytes {
        match self {
            Self::DirectCall(call) => &call.data,
            Self::TransactionCall(tx) => &tx.input,
        }
    }

    pub fn tx_type(&self) -> u8 {
        match self {
            Self::DirectCall(_) => DIRECT_CALL_TX_TYPE,
            Self::TransactionCall(tx) => tx.tx_type,
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Self::DirectCall(_) => None,
            Self::TransactionCall(tx) => tx.chain_id,
        }
    }
}
