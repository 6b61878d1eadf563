use async_trait::async_trait;
use dg_api_types::{Account, Address, ClientResult, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Partially populated contract transaction; missing fields are filled by the signer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TxRequest {
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
    pub gas_limit: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub nonce: Option<U256>,
    pub chain_id: Option<u64>,
}

/// Ledger-native "execute embedded call" instruction in the fee-market
/// (EIP-1559) format. The legacy gas-price format is not produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvmCall {
    pub source: Address,
    pub target: Address,
    pub input: Vec<u8>,
    pub value: U256,
    pub gas_limit: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub nonce: U256,
    pub chain_id: u64,
    pub access_list: Vec<(Address, Vec<[u8; 32]>)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub section: String,
    pub method: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl LedgerEvent {
    /// Transaction hash carried by an `ethereum.Executed` event, if this is one.
    pub fn executed_transaction_hash(&self) -> Option<String> {
        if !self.section.eq_ignore_ascii_case("ethereum") || self.method != "Executed" {
            return None;
        }
        let field = match &self.data {
            serde_json::Value::Object(map) => map
                .get("transactionHash")
                .or_else(|| map.get("transaction_hash")),
            serde_json::Value::Array(items) => items.get(2),
            _ => None,
        };
        field.and_then(|value| value.as_str()).map(ToOwned::to_owned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchFailure {
    Module {
        section: String,
        name: String,
        docs: Vec<String>,
    },
    Other(String),
}

impl DispatchFailure {
    pub fn message(&self) -> String {
        match self {
            Self::Module { section, name, docs } if docs.is_empty() => format!("{section}.{name}"),
            Self::Module { section, name, docs } => format!("{section}.{name}: {}", docs.join(" ")),
            Self::Other(raw) => raw.clone(),
        }
    }
}

/// Terminal status of a submitted extrinsic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionOutcome {
    pub block_hash: String,
    pub events: Vec<LedgerEvent>,
    pub dispatch_error: Option<DispatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    pub name: String,
    pub version: String,
}

/// Signing capability the wallet extension exposes for one account.
#[async_trait]
pub trait Injector: Send + Sync {
    async fn sign_raw(&self, signer: &str, payload: &[u8]) -> ClientResult<Vec<u8>>;

    /// Signs and broadcasts `call`, resolving once it is included in a block or rejected.
    async fn sign_and_send(&self, signer: &str, call: &EvmCall) -> ClientResult<InclusionOutcome>;
}

#[async_trait]
pub trait WalletExtension: Send + Sync {
    async fn enable(&self, app_name: &str) -> ClientResult<Vec<ExtensionInfo>>;
    async fn list_accounts(&self) -> ClientResult<Vec<Account>>;
    async fn injector_for(&self, address: &str) -> ClientResult<Arc<dyn Injector>>;
}

/// Provider that signs contract transactions natively, without bridging.
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    async fn authorized_accounts(&self) -> ClientResult<Vec<Address>>;
    async fn sign_message(&self, address: &Address, message: &[u8]) -> ClientResult<Vec<u8>>;
    /// Returns the transaction hash once the provider has broadcast it.
    async fn send_transaction(&self, from: &Address, request: &TxRequest) -> ClientResult<String>;
}
