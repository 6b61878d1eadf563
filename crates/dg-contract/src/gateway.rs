use crate::abi::{Function, InterfaceDescription};
use crate::codec::{decode_params, encode_call};
use alloy_dyn_abi::DynSolValue;
use dg_api_types::{
    Address, ClientError, ClientResult, ContentId, ContentRecord, U256, VersionRecord,
};
use dg_chain_client::{CallRequest, LedgerRpc, PendingTransaction, Signer, TxRequest};
use std::sync::Arc;
use tracing::debug;

/// Decoded return values of a read, addressable by position or by the
/// output names in the interface description.
#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    names: Vec<String>,
    values: Vec<DynSolValue>,
}

impl Outputs {
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|index| self.values.get(index))
    }

    pub fn at(&self, index: usize) -> Option<&DynSolValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<DynSolValue> {
        self.values
    }

    fn uint(&self, name: &str) -> ClientResult<U256> {
        self.get(name)
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value)
            .ok_or_else(|| missing_output(name))
    }

    fn address(&self, name: &str) -> ClientResult<Address> {
        self.get(name)
            .and_then(DynSolValue::as_address)
            .ok_or_else(|| missing_output(name))
    }

    fn string(&self, name: &str) -> ClientResult<String> {
        self.get(name)
            .and_then(DynSolValue::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| missing_output(name))
    }
}

fn missing_output(name: &str) -> ClientError {
    ClientError::Encoding(format!("missing output '{name}'"))
}

fn content_arg(content_id: ContentId) -> DynSolValue {
    DynSolValue::Uint(U256::from(content_id.0), 256)
}

fn first_uint(outputs: &Outputs, what: &str) -> ClientResult<U256> {
    outputs
        .at(0)
        .and_then(DynSolValue::as_uint)
        .map(|(value, _)| value)
        .ok_or_else(|| missing_output(what))
}

/// Binds a contract address and interface to a ledger connection. Reads go
/// straight to the ledger; writes need a signer.
#[derive(Clone)]
pub struct ContractGateway {
    address: Address,
    interface: Arc<InterfaceDescription>,
    rpc: Arc<dyn LedgerRpc>,
    signer: Option<Signer>,
}

impl ContractGateway {
    pub fn new(
        address: Address,
        interface: Arc<InterfaceDescription>,
        rpc: Arc<dyn LedgerRpc>,
        signer: Option<Signer>,
    ) -> Self {
        Self {
            address,
            interface,
            rpc,
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    fn resolve(&self, method: &str, args: &[DynSolValue]) -> ClientResult<&Function> {
        self.interface.function(method, args.len())
    }

    pub async fn read(&self, method: &str, args: &[DynSolValue]) -> ClientResult<Outputs> {
        let function = self.resolve(method, args)?;
        if !function.is_read() {
            return Err(ClientError::UnsupportedOperation(format!(
                "{method} modifies state; use write"
            )));
        }

        let request = CallRequest {
            from: self.signer.as_ref().map(Signer::address),
            to: self.address,
            data: encode_call(function, args)?,
            value: None,
        };
        debug!("eth_call {} on {}", function.signature(), self.address);
        let data = self.rpc.call(&request).await?;
        let values = decode_params(&function.outputs, &data)
            .map_err(|err| ClientError::Encoding(format!("{method} result: {err}")))?;

        Ok(Outputs {
            names: function.output_names.clone(),
            values,
        })
    }

    pub async fn write(
        &self,
        method: &str,
        value: U256,
        args: &[DynSolValue],
    ) -> ClientResult<PendingTransaction> {
        let function = self.resolve(method, args)?;
        if function.is_read() {
            return Err(ClientError::UnsupportedOperation(format!(
                "{method} is read-only; use read"
            )));
        }
        if !value.is_zero() && !function.is_payable() {
            return Err(ClientError::UnsupportedOperation(format!(
                "{method} does not accept a payment"
            )));
        }
        let signer = self.signer.as_ref().ok_or_else(|| {
            ClientError::NotConnected(format!("{method} requires a connected wallet"))
        })?;

        let request = TxRequest {
            to: self.address,
            value,
            data: encode_call(function, args)?,
            ..TxRequest::default()
        };
        debug!("sending {} from {}", function.signature(), signer.address());
        signer.sign_transaction(request).await
    }

    pub async fn balance_of(&self, owner: Address, content_id: ContentId) -> ClientResult<U256> {
        let outputs = self
            .read("balanceOf", &[DynSolValue::Address(owner), content_arg(content_id)])
            .await?;
        first_uint(&outputs, "balance")
    }

    pub async fn content_info(&self, content_id: ContentId) -> ClientResult<ContentRecord> {
        let outputs = self.read("getContentInfo", &[content_arg(content_id)]).await?;

        let current_supply = outputs
            .uint("totalMinted")
            .or_else(|_| outputs.uint("currentSupply"))?;

        Ok(ContentRecord {
            content_id,
            creator: outputs.address("creator")?,
            name: outputs.string("name")?,
            is_free: outputs.get("isFree").and_then(DynSolValue::as_bool),
            price: outputs.uint("price")?,
            max_supply: outputs.uint("maxSupply")?,
            current_supply,
        })
    }

    pub async fn active_version(&self, content_id: ContentId) -> ClientResult<VersionRecord> {
        let outputs = self.read("getActiveVersion", &[content_arg(content_id)]).await?;
        let timestamp = outputs.uint("timestamp")?;

        Ok(VersionRecord {
            payload_uri: outputs.string("payloadURI")?,
            spec_uri: outputs.string("specURI")?,
            manifest_uri: outputs.string("manifestURI")?,
            updated_at: u64::try_from(timestamp).unwrap_or(u64::MAX),
            reason: outputs.string("reason")?,
            updated_by: outputs.address("updatedBy")?,
        })
    }

    pub async fn content_price(&self, content_id: ContentId) -> ClientResult<U256> {
        let outputs = self.read("contentPrice", &[content_arg(content_id)]).await?;
        first_uint(&outputs, "price")
    }

    /// Hex-encoded AES key for the content package. The contract only
    /// reveals it to holders, so the call is made from the signer address.
    pub async fn content_key(&self, content_id: ContentId) -> ClientResult<String> {
        let outputs = self.read("getContentKey", &[content_arg(content_id)]).await?;
        outputs
            .at(0)
            .and_then(DynSolValue::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| missing_output("key"))
    }

    pub async fn claim(&self, content_id: ContentId) -> ClientResult<PendingTransaction> {
        self.write("claim", U256::ZERO, &[content_arg(content_id)]).await
    }

    pub async fn purchase(
        &self,
        content_id: ContentId,
        value: U256,
    ) -> ClientResult<PendingTransaction> {
        self.write("purchase", value, &[content_arg(content_id)]).await
    }

    pub async fn purchase_with_referral(
        &self,
        content_id: ContentId,
        referrer: Address,
        value: U256,
    ) -> ClientResult<PendingTransaction> {
        self.write(
            "purchaseWithReferral",
            value,
            &[content_arg(content_id), DynSolValue::Address(referrer)],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_params;
    use alloy_dyn_abi::DynSolType;
    use async_trait::async_trait;
    use dg_api_types::Account;
    use dg_chain_client::{
        ExtensionInfo, FeeEstimate, InjectedProvider, Injector, SignerOptions, TxReceipt,
        WalletExtension, select_signer,
    };
    use std::sync::Mutex;

    const CONTRACT: &str = "0x00000000000000000000000000000000000c0de0";
    const CREATOR: &str = "0x1111111111111111111111111111111111111111";
    const HOLDER: &str = "0x2222222222222222222222222222222222222222";

    fn address(raw: &str) -> Address {
        raw.parse().unwrap()
    }

    fn uint(value: u64) -> DynSolValue {
        DynSolValue::Uint(U256::from(value), 256)
    }

    fn text(value: &str) -> DynSolValue {
        DynSolValue::String(value.to_owned())
    }

    /// Reads the `index`-th argument slot as a small integer.
    fn arg_at(args: &[u8], index: usize) -> Option<u64> {
        let slot = args.get(index * 32..(index + 1) * 32)?;
        U256::try_from_be_slice(slot).and_then(|value| u64::try_from(value).ok())
    }

    struct FakeLedger {
        interface: InterfaceDescription,
        calls: Mutex<Vec<CallRequest>>,
    }

    impl FakeLedger {
        fn new() -> Self {
            Self {
                interface: InterfaceDescription::content_access().unwrap(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn answer(&self, selector: &[u8], args: &[u8]) -> ClientResult<Vec<u8>> {
            let name = self
                .interface
                .functions()
                .find(|function| function.selector.as_slice() == selector)
                .map(|function| function.name.clone())
                .ok_or_else(|| ClientError::Rpc("unknown selector".to_owned()))?;
            let creator = DynSolValue::Address(address(CREATOR));
            match name.as_str() {
                "getContentInfo" => encode_params(
                    &[
                        DynSolType::Address,
                        DynSolType::String,
                        DynSolType::Bool,
                        DynSolType::Uint(256),
                        DynSolType::Uint(256),
                        DynSolType::Uint(256),
                    ],
                    &[
                        creator,
                        text("Waite-Smith Rider"),
                        DynSolValue::Bool(true),
                        uint(0),
                        uint(1000),
                        uint(42),
                    ],
                ),
                "getActiveVersion" => encode_params(
                    &[
                        DynSolType::String,
                        DynSolType::String,
                        DynSolType::String,
                        DynSolType::Uint(256),
                        DynSolType::String,
                        DynSolType::Address,
                    ],
                    &[
                        text("ipfs://payload"),
                        text("ipfs://spec"),
                        text("ipfs://manifest"),
                        uint(1_700_000_000),
                        text("initial"),
                        creator,
                    ],
                ),
                "balanceOf" => {
                    let balance = if arg_at(args, 1) == Some(3) { 0 } else { 1 };
                    encode_params(&[DynSolType::Uint(256)], &[uint(balance)])
                }
                "getContentKey" if arg_at(args, 0) == Some(1) => {
                    encode_params(&[DynSolType::String], &[text(&"00".repeat(32))])
                }
                _ => Ok(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerRpc for FakeLedger {
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
            self.calls.lock().unwrap().push(request.clone());
            let (selector, args) = request.data.split_at(4);
            self.answer(selector, args)
        }

        async fn transaction_receipt(&self, hash: &str) -> ClientResult<Option<TxReceipt>> {
            Ok(Some(TxReceipt {
                transaction_hash: hash.to_owned(),
                block_hash: Some("0xblock".to_owned()),
                success: true,
            }))
        }
    }

    #[derive(Default)]
    struct RecordingProvider {
        sent: Mutex<Vec<TxRequest>>,
    }

    #[async_trait]
    impl InjectedProvider for RecordingProvider {
        async fn authorized_accounts(&self) -> ClientResult<Vec<Address>> {
            Ok(vec![address(HOLDER)])
        }

        async fn sign_message(&self, _address: &Address, message: &[u8]) -> ClientResult<Vec<u8>> {
            Ok(message.to_vec())
        }

        async fn send_transaction(
            &self,
            _from: &Address,
            request: &TxRequest,
        ) -> ClientResult<String> {
            self.sent.lock().unwrap().push(request.clone());
            Ok("0xsent".to_owned())
        }
    }

    struct NoExtension;

    #[async_trait]
    impl WalletExtension for NoExtension {
        async fn enable(&self, _app_name: &str) -> ClientResult<Vec<ExtensionInfo>> {
            Ok(Vec::new())
        }

        async fn list_accounts(&self) -> ClientResult<Vec<Account>> {
            Ok(Vec::new())
        }

        async fn injector_for(&self, address: &str) -> ClientResult<Arc<dyn Injector>> {
            Err(ClientError::NotConnected(format!("no injector for {address}")))
        }
    }

    fn gateway(ledger: Arc<FakeLedger>, signer: Option<Signer>) -> ContractGateway {
        ContractGateway::new(
            address(CONTRACT),
            Arc::new(InterfaceDescription::content_access().unwrap()),
            ledger,
            signer,
        )
    }

    async fn direct_signer(
        ledger: Arc<FakeLedger>,
        provider: Arc<RecordingProvider>,
    ) -> anyhow::Result<Signer> {
        let provider: Arc<dyn InjectedProvider> = provider;
        let extension: Arc<dyn WalletExtension> = Arc::new(NoExtension);
        let options = SignerOptions::default();
        Ok(select_signer(Some(&provider), &extension, None, ledger, &options).await?)
    }

    #[tokio::test]
    async fn content_info_is_decoded_by_output_name() -> anyhow::Result<()> {
        let gateway = gateway(Arc::new(FakeLedger::new()), None);
        let record = gateway.content_info(ContentId(1)).await?;

        assert_eq!(record.name, "Waite-Smith Rider");
        assert_eq!(record.creator, address(CREATOR));
        assert_eq!(record.is_free, Some(true));
        assert!(record.free());
        assert_eq!(record.max_supply, U256::from(1000_u64));
        assert_eq!(record.current_supply, U256::from(42_u64));
        Ok(())
    }

    #[tokio::test]
    async fn active_version_and_balances() -> anyhow::Result<()> {
        let gateway = gateway(Arc::new(FakeLedger::new()), None);
        let version = gateway.active_version(ContentId(1)).await?;
        assert_eq!(version.manifest_uri, "ipfs://manifest");
        assert_eq!(version.updated_at, 1_700_000_000);
        assert_eq!(version.reason, "initial");

        let holder = address(HOLDER);
        assert_eq!(gateway.balance_of(holder, ContentId(1)).await?, U256::from(1_u64));
        assert!(gateway.balance_of(holder, ContentId(3)).await?.is_zero());
        Ok(())
    }

    #[tokio::test]
    async fn empty_return_data_is_an_encoding_error() -> anyhow::Result<()> {
        let gateway = gateway(Arc::new(FakeLedger::new()), None);
        let err = gateway.content_key(ContentId(9)).await.unwrap_err();
        assert!(matches!(err, ClientError::Encoding(_)));
        Ok(())
    }

    #[tokio::test]
    async fn read_and_write_are_not_interchangeable() -> anyhow::Result<()> {
        let ledger = Arc::new(FakeLedger::new());
        let signer = direct_signer(ledger.clone(), Arc::default()).await?;
        let gateway = gateway(ledger, Some(signer));

        let err = gateway.read("claim", &[uint(1)]).await.unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedOperation(_)));

        let err = gateway
            .write("contentPrice", U256::ZERO, &[uint(1)])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::UnsupportedOperation(_)));

        let err = gateway
            .write("claim", U256::from(5_u64), &[uint(1)])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::UnsupportedOperation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn writes_without_signer_are_not_connected() -> anyhow::Result<()> {
        let gateway = gateway(Arc::new(FakeLedger::new()), None);
        let err = gateway.claim(ContentId(1)).await.err().unwrap();
        assert!(matches!(err, ClientError::NotConnected(_)));
        Ok(())
    }

    #[tokio::test]
    async fn purchase_carries_value_and_calldata() -> anyhow::Result<()> {
        let ledger = Arc::new(FakeLedger::new());
        let provider = Arc::new(RecordingProvider::default());
        let signer = direct_signer(ledger.clone(), provider.clone()).await?;
        let gateway = gateway(ledger.clone(), Some(signer));

        let pending = gateway
            .purchase_with_referral(ContentId(2), address(CREATOR), U256::from(10_u64))
            .await?;
        assert_eq!(pending.hash(), "0xsent");
        let outcome = pending.wait().await?;
        assert_eq!(outcome.block_hash.as_deref(), Some("0xblock"));

        let sent = provider.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, U256::from(10_u64));
        assert_eq!(sent[0].data.len(), 4 + 64);
        assert_eq!(sent[0].to, address(CONTRACT));

        // Reads are issued from the signer address once one is connected.
        gateway.content_price(ContentId(2)).await.ok();
        let calls = ledger.calls.lock().unwrap();
        assert_eq!(calls.last().and_then(|call| call.from), Some(address(HOLDER)));
        Ok(())
    }
}
