use crate::json_rpc::JsonRpcClient;
use async_trait::async_trait;
use dg_api_types::{Address, AddressExt, ClientError, ClientResult, U256};
use dg_chain_client::{CallRequest, FeeEstimate, LedgerConnector, LedgerRpc, TxReceipt};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dials the ledger node over WebSocket. The endpoint comes from the
/// client configuration.
pub struct WsConnector {
    endpoint: String,
}

impl WsConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl LedgerConnector for WsConnector {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn dial(&self) -> ClientResult<Arc<dyn LedgerRpc>> {
        let client = JsonRpcClient::dial(&self.endpoint).await?;
        Ok(Arc::new(WsLedgerRpc::new(client)))
    }
}

/// Ledger queries mapped onto the node's `system_*` and `eth_*` RPC methods.
pub struct WsLedgerRpc {
    client: JsonRpcClient,
}

impl WsLedgerRpc {
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }
}

/// Parses a JSON-RPC quantity such as `0x1bc16d674ec80000`.
fn from_quantity(raw: &str) -> Option<U256> {
    let digits = raw.trim().strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Minimal hex rendering without leading zeros, `0x0` for zero.
pub(crate) fn to_quantity(value: U256) -> String {
    format!("0x{value:x}")
}

pub(crate) fn parse_quantity(method: &str, value: &Value) -> ClientResult<U256> {
    value
        .as_str()
        .and_then(from_quantity)
        .ok_or_else(|| ClientError::Rpc(format!("{method}: expected hex quantity, got {value}")))
}

pub(crate) fn parse_data(method: &str, value: &Value) -> ClientResult<Vec<u8>> {
    value
        .as_str()
        .and_then(|raw| raw.strip_prefix("0x"))
        .and_then(|raw| hex::decode(raw).ok())
        .ok_or_else(|| ClientError::Rpc(format!("{method}: expected hex data, got {value}")))
}

fn parse_string(method: &str, value: Value) -> ClientResult<String> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(ClientError::Rpc(format!("{method}: expected string, got {other}"))),
    }
}

pub(crate) fn data_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn call_object(request: &CallRequest) -> Value {
    let mut object = Map::new();
    if let Some(from) = request.from {
        object.insert("from".to_owned(), json!(from.to_hex()));
    }
    object.insert("to".to_owned(), json!(request.to.to_hex()));
    object.insert("data".to_owned(), json!(data_hex(&request.data)));
    if let Some(value) = request.value {
        object.insert("value".to_owned(), json!(to_quantity(value)));
    }
    Value::Object(object)
}

fn parse_receipt(value: &Value) -> ClientResult<TxReceipt> {
    let transaction_hash = value
        .get("transactionHash")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Rpc("receipt without transactionHash".to_owned()))?;
    // Pre-Byzantium receipts carry no status; treat them as successful.
    let success = match value.get("status").and_then(Value::as_str) {
        Some(status) => from_quantity(status).is_some_and(|status| !status.is_zero()),
        None => true,
    };
    Ok(TxReceipt {
        transaction_hash: transaction_hash.to_owned(),
        block_hash: value.get("blockHash").and_then(Value::as_str).map(ToOwned::to_owned),
        success,
    })
}

#[async_trait]
impl LedgerRpc for WsLedgerRpc {
    async fn chain_label(&self) -> ClientResult<String> {
        let value = self.client.request("system_chain", json!([])).await?;
        parse_string("system_chain", value)
    }

    async fn node_version(&self) -> ClientResult<String> {
        let value = self.client.request("system_version", json!([])).await?;
        parse_string("system_version", value)
    }

    async fn pending_nonce(&self, address: &Address) -> ClientResult<U256> {
        let value = self
            .client
            .request("eth_getTransactionCount", json!([address.to_hex(), "pending"]))
            .await?;
        parse_quantity("eth_getTransactionCount", &value)
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        let value = self.client.request("eth_chainId", json!([])).await?;
        let chain_id = parse_quantity("eth_chainId", &value)?;
        u64::try_from(chain_id)
            .map_err(|_| ClientError::Rpc(format!("eth_chainId: {value} does not fit u64")))
    }

    async fn fee_estimate(&self) -> ClientResult<FeeEstimate> {
        let priority = self
            .client
            .request("eth_maxPriorityFeePerGas", json!([]))
            .await
            .and_then(|value| parse_quantity("eth_maxPriorityFeePerGas", &value));
        let block = self
            .client
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = block
            .get("baseFeePerGas")
            .map(|value| parse_quantity("baseFeePerGas", value))
            .transpose()?;

        match (priority, base_fee) {
            (Ok(priority), Some(base_fee)) => {
                let max_fee = base_fee
                    .checked_mul(U256::from(2_u64))
                    .and_then(|doubled| doubled.checked_add(priority))
                    .unwrap_or(U256::MAX);
                Ok(FeeEstimate {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority,
                })
            }
            (priority, _) => {
                if let Err(err) = priority {
                    warn!("eth_maxPriorityFeePerGas unavailable, using gas price: {}", err);
                }
                let value = self.client.request("eth_gasPrice", json!([])).await?;
                let gas_price = parse_quantity("eth_gasPrice", &value)?;
                Ok(FeeEstimate {
                    max_fee_per_gas: gas_price,
                    max_priority_fee_per_gas: gas_price,
                })
            }
        }
    }

    async fn call(&self, request: &CallRequest) -> ClientResult<Vec<u8>> {
        debug!("eth_call to {}", request.to);
        let value = self
            .client
            .request("eth_call", json!([call_object(request), "latest"]))
            .await?;
        parse_data("eth_call", &value)
    }

    async fn transaction_receipt(&self, hash: &str) -> ClientResult<Option<TxReceipt>> {
        let value = self
            .client
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        parse_receipt(&value).map(Some)
    }
}
