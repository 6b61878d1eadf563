use crate::json_rpc::JsonRpcClient;
use crate::ledger::{data_hex, parse_data, to_quantity};
use async_trait::async_trait;
use dg_api_types::{Address, AddressExt, ClientError, ClientResult};
use dg_chain_client::{InjectedProvider, TxRequest};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Injected provider backed by a node that manages its own accounts
/// (`eth_accounts`, `eth_sign`, `eth_sendTransaction`). Dials on first use
/// and again after the socket drops.
pub struct RpcInjectedProvider {
    endpoint: String,
    client: Mutex<Option<Arc<JsonRpcClient>>>,
}

impl RpcInjectedProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn client(&self) -> ClientResult<Arc<JsonRpcClient>> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(JsonRpcClient::dial(&self.endpoint).await?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn request(&self, method: &str, params: Value) -> ClientResult<Value> {
        let client = self.client().await?;
        let result = client.request(method, params).await;
        if let Err(ClientError::Connection(reason)) = &result {
            warn!("provider {} dropped: {}", self.endpoint, reason);
            let mut slot = self.client.lock().await;
            if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &client)) {
                *slot = None;
            }
        }
        result
    }
}

fn transaction_object(from: &Address, request: &TxRequest) -> Value {
    let mut object = Map::new();
    object.insert("from".to_owned(), json!(from.to_hex()));
    object.insert("to".to_owned(), json!(request.to.to_hex()));
    object.insert("value".to_owned(), json!(to_quantity(request.value)));
    object.insert("data".to_owned(), json!(data_hex(&request.data)));
    let optional = [
        ("gas", request.gas_limit),
        ("maxFeePerGas", request.max_fee_per_gas),
        ("maxPriorityFeePerGas", request.max_priority_fee_per_gas),
        ("nonce", request.nonce),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            object.insert(key.to_owned(), json!(to_quantity(value)));
        }
    }
    if let Some(chain_id) = request.chain_id {
        object.insert("chainId".to_owned(), json!(format!("0x{chain_id:x}")));
    }
    Value::Object(object)
}

#[async_trait]
impl InjectedProvider for RpcInjectedProvider {
    async fn authorized_accounts(&self) -> ClientResult<Vec<Address>> {
        let value = self.request("eth_accounts", json!([])).await?;
        let accounts = value
            .as_array()
            .ok_or_else(|| ClientError::Rpc(format!("eth_accounts: expected array, got {value}")))?;
        accounts
            .iter()
            .map(|account| {
                let bad_entry = || ClientError::Rpc(format!("eth_accounts: bad entry {account}"));
                account.as_str().ok_or_else(bad_entry)?.parse::<Address>().map_err(|_| bad_entry())
            })
            .collect()
    }

    async fn sign_message(&self, address: &Address, message: &[u8]) -> ClientResult<Vec<u8>> {
        let value = self
            .request("eth_sign", json!([address.to_hex(), data_hex(message)]))
            .await?;
        parse_data("eth_sign", &value)
    }

    async fn send_transaction(&self, from: &Address, request: &TxRequest) -> ClientResult<String> {
        let value = self
            .request("eth_sendTransaction", json!([transaction_object(from, request)]))
            .await?;
        let hash = value.as_str().ok_or_else(|| {
            ClientError::Rpc(format!("eth_sendTransaction: expected hash, got {value}"))
        })?;
        info!("transaction {} sent from {}", hash, from);
        Ok(hash.to_owned())
    }
}
