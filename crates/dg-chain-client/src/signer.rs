use crate::ledger::LedgerRpc;
use crate::wallet::{EvmCall, InjectedProvider, Injector, TxRequest, WalletExtension};
use dg_api_types::{
    Account, Address, ClientError, ClientResult, SignerKind, TransactionOutcome, U256,
};
use dg_crypto::derive_bridged_address;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct SignerOptions {
    /// Used when a bridged transaction arrives without a gas limit. This is
    /// a fixed approximation; callers that need precision must set one.
    pub default_gas_limit: U256,
    pub receipt_poll_interval: Duration,
}

impl Default for SignerOptions {
    fn default() -> Self {
        Self {
            default_gas_limit: U256::from(500_000_u64),
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }
}

/// Signs with an injected provider's own account.
#[derive(Clone)]
pub struct DirectSigner {
    provider: Arc<dyn InjectedProvider>,
    address: Address,
    rpc: Arc<dyn LedgerRpc>,
    poll_interval: Duration,
}

/// Signs through the wallet extension on behalf of a native account, using
/// the account's bridged address as the transaction source.
#[derive(Clone)]
pub struct BridgingSigner {
    account: Account,
    bridged: Address,
    injector: Arc<dyn Injector>,
    rpc: Arc<dyn LedgerRpc>,
    default_gas_limit: U256,
}

#[derive(Clone)]
pub enum Signer {
    Direct(DirectSigner),
    Bridging(BridgingSigner),
}

/// Picks the signer for a session: an injected provider with an authorized
/// account wins, otherwise the selected account is bridged.
pub async fn select_signer(
    injected: Option<&Arc<dyn InjectedProvider>>,
    extension: &Arc<dyn WalletExtension>,
    selected: Option<&Account>,
    rpc: Arc<dyn LedgerRpc>,
    options: &SignerOptions,
) -> ClientResult<Signer> {
    if let Some(provider) = injected {
        match provider.authorized_accounts().await {
            Ok(accounts) => {
                if let Some(address) = accounts.first() {
                    debug!("using injected provider account {}", address);
                    return Ok(Signer::Direct(DirectSigner {
                        provider: provider.clone(),
                        address: *address,
                        rpc,
                        poll_interval: options.receipt_poll_interval,
                    }));
                }
            }
            Err(err) => warn!("injected provider unavailable, falling back to bridging: {}", err),
        }
    }

    let account =
        selected.ok_or_else(|| ClientError::NotConnected("no account selected".to_owned()))?;
    let bridged = derive_bridged_address(account).ok_or_else(|| {
        ClientError::UnsupportedOperation(format!("account {} cannot be bridged", account.address))
    })?;
    let injector = extension.injector_for(&account.address).await?;

    debug!("using bridging signer {} -> {}", account.address, bridged);
    Ok(Signer::Bridging(BridgingSigner {
        account: account.clone(),
        bridged,
        injector,
        rpc,
        default_gas_limit: options.default_gas_limit,
    }))
}

impl Signer {
    pub fn kind(&self) -> SignerKind {
        match self {
            Self::Direct(_) => SignerKind::Direct,
            Self::Bridging(_) => SignerKind::Bridging,
        }
    }

    pub fn address(&self) -> Address {
        match self {
            Self::Direct(signer) => signer.address,
            Self::Bridging(signer) => signer.bridged,
        }
    }

    pub async fn sign_message(&self, message: &[u8]) -> ClientResult<Vec<u8>> {
        match self {
            Self::Direct(signer) => signer.provider.sign_message(&signer.address, message).await,
            Self::Bridging(signer) => {
                signer.injector.sign_raw(&signer.account.address, message).await
            }
        }
    }

    pub async fn sign_transaction(&self, request: TxRequest) -> ClientResult<PendingTransaction> {
        match self {
            Self::Direct(signer) => signer.send(request).await,
            Self::Bridging(signer) => signer.send(request).await,
        }
    }
}

impl DirectSigner {
    async fn send(&self, request: TxRequest) -> ClientResult<PendingTransaction> {
        let hash = self.provider.send_transaction(&self.address, &request).await?;
        Ok(PendingTransaction {
            hash,
            state: PendingState::AwaitingReceipt {
                rpc: self.rpc.clone(),
                poll_interval: self.poll_interval,
            },
        })
    }
}

impl BridgingSigner {
    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn bridged_address(&self) -> Address {
        self.bridged
    }

    /// Fills the missing fields and wraps the request in a fee-market embedded call.
    pub async fn populate(&self, request: TxRequest) -> ClientResult<EvmCall> {
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => self.rpc.pending_nonce(&self.bridged).await?,
        };
        let chain_id = match request.chain_id {
            Some(chain_id) => chain_id,
            None => self.rpc.chain_id().await?,
        };
        let gas_limit = request.gas_limit.unwrap_or(self.default_gas_limit);
        let (max_fee_per_gas, max_priority_fee_per_gas) =
            match (request.max_fee_per_gas, request.max_priority_fee_per_gas) {
                (Some(max_fee), Some(priority)) => (max_fee, priority),
                (max_fee, priority) => {
                    let estimate = self.rpc.fee_estimate().await?;
                    (
                        max_fee.unwrap_or(estimate.max_fee_per_gas),
                        priority.unwrap_or(estimate.max_priority_fee_per_gas),
                    )
                }
            };

        Ok(EvmCall {
            source: self.bridged,
            target: request.to,
            input: request.data,
            value: request.value,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            nonce,
            chain_id,
            access_list: Vec::new(),
        })
    }

    async fn send(&self, request: TxRequest) -> ClientResult<PendingTransaction> {
        let call = self.populate(request).await?;
        let outcome = self.injector.sign_and_send(&self.account.address, &call).await?;

        if let Some(failure) = outcome.dispatch_error {
            return Err(ClientError::Dispatch(failure.message()));
        }

        let executed = outcome
            .events
            .iter()
            .find_map(|event| event.executed_transaction_hash());
        let (hash, approximate) = match executed {
            Some(hash) => (hash, false),
            None => {
                warn!(
                    "no execution event in block {}; returning block hash as transaction id",
                    outcome.block_hash
                );
                (outcome.block_hash.clone(), true)
            }
        };

        info!("bridged transaction {} included in block {}", hash, outcome.block_hash);
        Ok(PendingTransaction {
            hash,
            state: PendingState::Included {
                block_hash: outcome.block_hash,
                approximate,
            },
        })
    }
}

enum PendingState {
    Included { block_hash: String, approximate: bool },
    AwaitingReceipt { rpc: Arc<dyn LedgerRpc>, poll_interval: Duration },
}

/// Handle returned by [`Signer::sign_transaction`].
pub struct PendingTransaction {
    hash: String,
    state: PendingState,
}

impl PendingTransaction {
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self.state, PendingState::Included { approximate: true, .. })
    }

    /// Bridged transactions are already included and resolve at once. Direct
    /// transactions poll for a receipt with no upper bound; wrap in a timeout
    /// if the transaction may be dropped.
    pub async fn wait(&self) -> ClientResult<TransactionOutcome> {
        match &self.state {
            PendingState::Included { block_hash, approximate } => Ok(TransactionOutcome {
                hash: self.hash.clone(),
                block_hash: Some(block_hash.clone()),
                approximate: *approximate,
            }),
            PendingState::AwaitingReceipt { rpc, poll_interval } => loop {
                match rpc.transaction_receipt(&self.hash).await? {
                    Some(receipt) if receipt.success => {
                        return Ok(TransactionOutcome {
                            hash: self.hash.clone(),
                            block_hash: receipt.block_hash,
                            approximate: false,
                        });
                    }
                    Some(_) => {
                        let message = format!("transaction {} reverted", self.hash);
                        return Err(ClientError::Dispatch(message));
                    }
                    None => tokio::time::sleep(*poll_interval).await,
                }
            },
        }
    }
}
