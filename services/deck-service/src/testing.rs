use crate::AppState;
use crate::dev_keyring::DevKeyring;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use dg_api_types::{Address, ClientError, ClientResult, ContentId, U256};
use dg_chain_client::{CallRequest, FeeEstimate, LedgerConnector, LedgerRpc, TxReceipt};
use dg_content::ManifestFetcher;
use dg_contract::{DynSolType, DynSolValue, InterfaceDescription, encode_params};
use dg_storage::InMemoryStore;
use dg_wallet_core::{ClientConfig, WalletManager};
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) const DEV_SEED: &str =
    "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
const CONTRACT: &str = "0x00000000000000000000000000000000000c0de0";

struct ContractLedger {
    interface: InterfaceDescription,
}

fn uint(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

fn text(value: &str) -> DynSolValue {
    DynSolValue::String(value.to_owned())
}

/// Reads the argument word at `index` as a small integer.
fn arg_at(args: &[u8], index: usize) -> Option<u64> {
    let word = args.get(index * 32..(index + 1) * 32)?;
    U256::try_from_be_slice(word).and_then(|value| u64::try_from(value).ok())
}

impl ContractLedger {
    fn answer(&self, data: &[u8]) -> ClientResult<Vec<u8>> {
        let (selector, args) = data.split_at(4);
        let function = self
            .interface
            .functions()
            .find(|function| function.selector.as_slice() == selector)
            .ok_or_else(|| ClientError::Dispatch("execution reverted".to_owned()))?;
        let creator = DynSolValue::Address(Address::from([0x11; 20]));
        let one_token = U256::from(1_000_000_000_000_000_000_u64);

        match (function.name.as_str(), arg_at(args, 0)) {
            ("getContentInfo", Some(1)) => encode_params(
                &function.outputs,
                &[
                    creator,
                    text("Waite-Smith Rider"),
                    DynSolValue::Bool(true),
                    uint(U256::ZERO),
                    uint(U256::MAX),
                    uint(U256::ZERO),
                ],
            ),
            ("getContentInfo", Some(3)) => encode_params(
                &function.outputs,
                &[
                    creator,
                    text("Marseille"),
                    DynSolValue::Bool(false),
                    uint(one_token),
                    uint(U256::from(500_u64)),
                    uint(U256::from(12_u64)),
                ],
            ),
            ("getActiveVersion", Some(1 | 3)) => encode_params(
                &function.outputs,
                &[text(""), text(""), text(""), uint(U256::ZERO), text(""), creator],
            ),
            ("contentPrice", Some(3)) => {
                encode_params(&[DynSolType::Uint(256)], &[uint(one_token)])
            }
            ("balanceOf", _) => {
                let balance = if arg_at(args, 1) == Some(1) { 1_u64 } else { 0 };
                encode_params(&[DynSolType::Uint(256)], &[uint(U256::from(balance))])
            }
            _ => Err(ClientError::Dispatch("execution reverted: unknown content".to_owned())),
        }
    }
}

#[async_trait]
impl LedgerRpc for ContractLedger {
    async fn chain_label(&self) -> ClientResult<String> {
        Ok("Development".to_owned())
    }

    async fn node_version(&self) -> ClientResult<String> {
        Ok("1.0.0".to_owned())
    }

    async fn pending_nonce(&self, _address: &Address) -> ClientResult<U256> {
        Ok(U256::ZERO)
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        Ok(1281)
    }

    async fn fee_estimate(&self) -> ClientResult<FeeEstimate> {
        Ok(FeeEstimate {
            max_fee_per_gas: U256::from(2_u64),
            max_priority_fee_per_gas: U256::from(1_u64),
        })
    }

    async fn call(&self, request: &CallRequest) -> ClientResult<Vec<u8>> {
        self.answer(&request.data)
    }

    async fn transaction_receipt(&self, _hash: &str) -> ClientResult<Option<TxReceipt>> {
        Ok(None)
    }
}

struct ContractConnector;

#[async_trait]
impl LedgerConnector for ContractConnector {
    fn endpoint(&self) -> &str {
        "ws://test"
    }

    async fn dial(&self) -> ClientResult<Arc<dyn LedgerRpc>> {
        Ok(Arc::new(ContractLedger {
            interface: InterfaceDescription::content_access()?,
        }))
    }
}

struct OfflineFetcher;

#[async_trait]
impl ManifestFetcher for OfflineFetcher {
    async fn fetch_bytes(&self, url: &str) -> ClientResult<Vec<u8>> {
        Err(ClientError::Fetch(format!("{url}: offline")))
    }
}

/// App state over a scripted contract with decks 1 (free, fallback
/// manifest on disk) and 3 (paid). The dev key holds deck 1 only.
pub(crate) fn test_state() -> anyhow::Result<(AppState, TempDir)> {
    let (state, _store, dir) = test_state_with_store()?;
    Ok((state, dir))
}

/// Like `test_state`, also handing back the local store for inspection.
pub(crate) fn test_state_with_store() -> anyhow::Result<(AppState, Arc<InMemoryStore>, TempDir)> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("deck1.json"),
        r#"{"description":"The classic deck","attributes":[{"trait_type":"Year","value":"1909"}]}"#,
    )?;

    let store = Arc::new(InMemoryStore::default());
    let config = ClientConfig {
        contract_address: Some(CONTRACT.parse()?),
        known_ids: vec![ContentId(1), ContentId(3)],
        fallback_dir: dir.path().to_path_buf(),
        ..ClientConfig::default()
    };
    let manager = WalletManager::new(
        config,
        Arc::new(ContractConnector),
        Arc::new(DevKeyring::from_seeds(DEV_SEED)?),
        None,
        Arc::new(OfflineFetcher),
        store.clone(),
    )?;
    Ok((
        AppState {
            manager: Arc::new(manager),
        },
        store,
        dir,
    ))
}

pub(crate) async fn body_json(response: Response<Body>) -> anyhow::Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
