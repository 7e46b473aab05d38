use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a push subscription.
///
/// The same value is used by the engine and by the transport so push
/// messages can be correlated with the `eth_subscribe` call that created
/// them. Rendered as `0x` followed by 32 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(format!("0x{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SubscriptionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Event categories a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionKind {
    NewHeads,
    NewPendingTransactions,
    Logs,
}

impl SubscriptionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NewHeads => "newHeads",
            Self::NewPendingTransactions => "newPendingTransactions",
            Self::Logs => "logs",
        }
    }
}

impl std::fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_hex_and_unique() {
        let a = SubscriptionId::random();
        let b = SubscriptionId::random();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("0x"));
        assert_eq!(a.as_str().len(), 34);
    }

    #[test]
    fn test_kind_wire_names() {
        let kind: SubscriptionKind = serde_json::from_str(r#""newPendingTransactions""#).unwrap();
        assert_eq!(kind, SubscriptionKind::NewPendingTransactions);
        assert_eq!(serde_json::to_string(&SubscriptionKind::NewHeads).unwrap(), r#""newHeads""#);
    }
}
