use crate::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ContentId(pub u64);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContentId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Snapshot of a content entry as stored by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub content_id: ContentId,
    pub creator: Address,
    pub name: String,
    /// Explicit free flag when the contract exposes one.
    pub is_free: Option<bool>,
    pub price: U256,
    pub max_supply: U256,
    pub current_supply: U256,
}

impl ContentRecord {
    pub fn free(&self) -> bool {
        self.is_free.unwrap_or_else(|| self.price.is_zero())
    }
}

/// Active content package pointer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub payload_uri: String,
    pub spec_uri: String,
    pub manifest_uri: String,
    pub updated_at: u64,
    pub reason: String,
    pub updated_by: Address,
}
