mod address;
pub mod amount;
mod deck;
mod error;
mod records;

pub use address::{Account, AddressExt};
pub use alloy_primitives::{Address, U256};
pub use deck::{
    Deck, DecryptedManifest, ManifestAttribute, ManifestDocument, PackageAssets, PackageFiles,
    PackageImage,
};
pub use error::{ClientError, ClientResult};
pub use records::{ContentId, ContentRecord, VersionRecord};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignerKind {
    Direct,
    Bridging,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub hash: String,
    pub block_hash: Option<String>,
    /// Set when `hash` is a block hash standing in for a missing execution
    /// event. It cannot be looked up as a transaction hash.
    pub approximate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfoResponse {
    pub chain: String,
    pub node_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConnectResponse {
    pub account: Account,
    pub accounts: Vec<Account>,
    pub bridged_address: Option<Address>,
    pub signer: SignerKind,
    pub signer_address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSelectRequest {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDisconnectResponse {
    pub disconnected: bool,
    pub cleared_scope: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Payment in the ledger's smallest unit. Defaults to the on-ledger price.
    #[serde(with = "amount::decimal::option", default)]
    pub value: Option<U256>,
    pub referrer: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPackageRequest {
    pub owner: Option<Address>,
}
