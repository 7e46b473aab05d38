//! Log objects and the filter criteria accepted by `logs` subscriptions.

use alloy_primitives::{Address, B256, Bytes, U64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A log entry matched by a `logs` subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: U64,
    pub transaction_hash: B256,
    pub transaction_index: U64,
    pub block_hash: B256,
    pub log_index: U64,
    pub removed: bool,
}

/// Address and topic constraints of a log subscription.
///
/// An empty address set matches every emitter. Topics are positional: an
/// empty set at position `i` is a wildcard, otherwise the log's `i`-th topic
/// must be one of the listed values.
///
/// On the wire this is the usual `eth_subscribe("logs", ...)` object, where
/// `address` is a single address or a list and every `topics` entry is
/// `null`, a single topic or a list of topics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub addresses: Vec<Address>,
    pub topics: Vec<Vec<B256>>,
}

impl FilterCriteria {
    /// Whether a log emitted by `address` with `topics` satisfies the criteria.
    pub fn matches(&self, address: &Address, topics: &[B256]) -> bool {
        if !self.addresses.is_empty() && !self.addresses.contains(address) {
            return false;
        }
        if self.topics.len() > topics.len() {
            return false;
        }
        self.topics
            .iter()
            .zip(topics)
            .all(|(wanted, topic)| wanted.is_empty() || wanted.contains(topic))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Deserialize)]
struct RawCriteria {
    #[serde(default)]
    address: Option<OneOrMany<Address>>,
    #[serde(default)]
    topics: Option<Vec<Option<OneOrMany<B256>>>>,
}

#[derive(Serialize)]
struct RawCriteriaRef<'a> {
    address: &'a [Address],
    topics: Vec<Option<&'a [B256]>>,
}

impl<'de> Deserialize<'de> for FilterCriteria {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawCriteria::deserialize(deserializer)?;
        Ok(Self {
            addresses: raw.address.map(Vec::from).unwrap_or_default(),
            topics: raw
                .topics
                .unwrap_or_default()
                .into_iter()
                .map(|position| position.map(Vec::from).unwrap_or_default())
                .collect(),
        })
    }
}

impl Serialize for FilterCriteria {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawCriteriaRef {
            address: &self.addresses,
            topics: self
                .topics
                .iter()
                .map(|position| (!position.is_empty()).then_some(position.as_slice()))
                .collect(),
        }
        .serialize(serializer)
    }
}
