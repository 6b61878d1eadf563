use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Lowercase rendering of contract-runtime addresses. `Display` on
/// [`Address`] is checksummed; scope keys and JSON-RPC parameters need a
/// stable spelling.
pub trait AddressExt {
    fn to_hex(&self) -> String;
}

impl AddressExt for Address {
    fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.as_slice()))
    }
}

/// Wallet-native identity as reported by the wallet extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Textual rendering of the native identifier (SS58 or 0x-hex public key).
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
