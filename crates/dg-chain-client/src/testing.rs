use crate::ledger::{CallRequest, FeeEstimate, LedgerConnector, LedgerRpc, TxReceipt};
use crate::wallet::{
    EvmCall, ExtensionInfo, InclusionOutcome, InjectedProvider, Injector, TxRequest,
    WalletExtension,
};
use async_trait::async_trait;
use dg_api_types::{Account, Address, ClientError, ClientResult, U256};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

#[derive(Default)]
pub(crate) struct FakeLedger {
    pub(crate) fail_version: bool,
    /// Answers the handshake, then rejects `node_version` with an rpc error.
    pub(crate) fail_version_after_handshake: AtomicBool,
    /// Every query fails as if the node had closed the socket.
    pub(crate) closed: AtomicBool,
    pub(crate) receipt_after_polls: usize,
    pub(crate) nonce_queries: AtomicUsize,
    pub(crate) chain_id_queries: AtomicUsize,
    pub(crate) fee_queries: AtomicUsize,
    pub(crate) receipt_queries: AtomicUsize,
}

impl FakeLedger {
    fn open(&self) -> ClientResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("connection closed by node".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn chain_label(&self) -> ClientResult<String> {
        self.open()?;
        Ok("Development".to_owned())
    }

    async fn node_version(&self) -> ClientResult<String> {
        self.open()?;
        if self.fail_version || self.fail_version_after_handshake.load(Ordering::SeqCst) {
            return Err(ClientError::Rpc("method not found".to_owned()));
        }
        Ok("1.0.0".to_owned())
    }

    async fn pending_nonce(&self, _address: &Address) -> ClientResult<U256> {
        self.open()?;
        self.nonce_queries.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(7_u64))
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        self.open()?;
        self.chain_id_queries.fetch_add(1, Ordering::SeqCst);
        Ok(1281)
    }

    async fn fee_estimate(&self) -> ClientResult<FeeEstimate> {
        self.open()?;
        self.fee_queries.fetch_add(1, Ordering::SeqCst);
        Ok(FeeEstimate {
            max_fee_per_gas: U256::from(2_000_u64),
            max_priority_fee_per_gas: U256::from(100_u64),
        })
    }

    async fn call(&self, _request: &CallRequest) -> ClientResult<Vec<u8>> {
        self.open()?;
        Ok(Vec::new())
    }

    async fn transaction_receipt(&self, hash: &str) -> ClientResult<Option<TxReceipt>> {
        self.open()?;
        let polls = self.receipt_queries.fetch_add(1, Ordering::SeqCst);
        if polls < self.receipt_after_polls {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            transaction_hash: hash.to_owned(),
            block_hash: Some("0xreceiptblock".to_owned()),
            success: true,
        }))
    }
}

pub(crate) struct FakeConnector {
    ledger: Option<Arc<FakeLedger>>,
    pub(crate) refuse: AtomicBool,
    dials: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new(ledger: Arc<FakeLedger>) -> Self {
        Self {
            ledger: Some(ledger),
            refuse: AtomicBool::new(false),
            dials: AtomicUsize::new(0),
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            ledger: None,
            refuse: AtomicBool::new(true),
            dials: AtomicUsize::new(0),
        }
    }

    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerConnector for FakeConnector {
    fn endpoint(&self) -> &str {
        "ws://fake"
    }

    async fn dial(&self) -> ClientResult<Arc<dyn LedgerRpc>> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        match &self.ledger {
            Some(ledger) if !self.refuse.load(Ordering::SeqCst) => Ok(ledger.clone()),
            _ => Err(ClientError::Connection("connection refused".to_owned())),
        }
    }
}

pub(crate) struct FakeInjector {
    outcome: InclusionOutcome,
    submitted: Mutex<Vec<(String, EvmCall)>>,
    raw_signers: Mutex<Vec<String>>,
}

#[async_trait]
impl Injector for FakeInjector {
    async fn sign_raw(&self, signer: &str, payload: &[u8]) -> ClientResult<Vec<u8>> {
        if let Ok(mut guard) = self.raw_signers.lock() {
            guard.push(signer.to_owned());
        }
        let mut signature = b"signed:".to_vec();
        signature.extend_from_slice(payload);
        Ok(signature)
    }

    async fn sign_and_send(&self, signer: &str, call: &EvmCall) -> ClientResult<InclusionOutcome> {
        if let Ok(mut guard) = self.submitted.lock() {
            guard.push((signer.to_owned(), call.clone()));
        }
        Ok(self.outcome.clone())
    }
}

pub(crate) struct FakeExtension {
    injector: Arc<FakeInjector>,
}

impl FakeExtension {
    pub(crate) fn new(outcome: InclusionOutcome) -> Self {
        Self {
            injector: Arc::new(FakeInjector {
                outcome,
                submitted: Mutex::new(Vec::new()),
                raw_signers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn submitted(&self) -> Vec<(String, EvmCall)> {
        self.injector.submitted.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub(crate) fn raw_signers(&self) -> Vec<String> {
        self.injector.raw_signers.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl WalletExtension for FakeExtension {
    async fn enable(&self, app_name: &str) -> ClientResult<Vec<ExtensionInfo>> {
        Ok(vec![ExtensionInfo {
            name: app_name.to_owned(),
            version: "0.0.0".to_owned(),
        }])
    }

    async fn list_accounts(&self) -> ClientResult<Vec<Account>> {
        Ok(vec![Account::new(ALICE)])
    }

    async fn injector_for(&self, _address: &str) -> ClientResult<Arc<dyn Injector>> {
        Ok(self.injector.clone())
    }
}

#[derive(Default)]
pub(crate) struct FakeProvider {
    accounts: Vec<Address>,
}

impl FakeProvider {
    pub(crate) fn with_account(address: &str) -> Self {
        Self {
            accounts: address.parse::<Address>().into_iter().collect(),
        }
    }
}

#[async_trait]
impl InjectedProvider for FakeProvider {
    async fn authorized_accounts(&self) -> ClientResult<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn sign_message(&self, _address: &Address, message: &[u8]) -> ClientResult<Vec<u8>> {
        let mut signature = b"direct:".to_vec();
        signature.extend_from_slice(message);
        Ok(signature)
    }

    async fn send_transaction(
        &self,
        _from: &Address,
        _request: &TxRequest,
    ) -> ClientResult<String> {
        Ok("0xdirect".to_owned())
    }
}
