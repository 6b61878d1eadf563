use anyhow::Result;
use async_trait::async_trait;
use dg_api_types::{Account, ClientError, ClientResult};
use dg_chain_client::{EvmCall, ExtensionInfo, InclusionOutcome, Injector, WalletExtension};
use dg_crypto::{DEFAULT_SS58_FORMAT, Ed25519Keypair};
use std::sync::Arc;

/// Local stand-in for a browser wallet extension: ed25519 keys from
/// `DECKGATE_DEV_SEEDS`, or one random key when unset.
pub(crate) struct DevKeyring {
    keys: Vec<(Account, Arc<Ed25519Keypair>)>,
}

impl DevKeyring {
    pub(crate) fn from_env() -> Result<Self> {
        let seeds = std::env::var("DECKGATE_DEV_SEEDS").unwrap_or_default();
        Self::from_seeds(&seeds)
    }

    pub(crate) fn from_seeds(seeds: &str) -> Result<Self> {
        let mut keypairs = seeds
            .split(',')
            .map(str::trim)
            .filter(|seed| !seed.is_empty())
            .map(Ed25519Keypair::from_seed_hex)
            .collect::<ClientResult<Vec<_>>>()?;
        if keypairs.is_empty() {
            keypairs.push(Ed25519Keypair::new_random());
        }

        let keys = keypairs
            .into_iter()
            .enumerate()
            .map(|(index, keypair)| {
                let account = Account::new(keypair.ss58_address(DEFAULT_SS58_FORMAT))
                    .with_label(format!("dev-{index}"));
                (account, Arc::new(keypair))
            })
            .collect();
        Ok(Self { keys })
    }
}

/// Read-only injector for dev keys. It signs raw payloads but cannot
/// author extrinsics, so every contract write through it fails with
/// `UnsupportedOperation`. Point `DECKGATE_PROVIDER_URL` at a node with
/// managed accounts to submit transactions from the service binary.
struct DevInjector {
    keypair: Arc<Ed25519Keypair>,
}

#[async_trait]
impl Injector for DevInjector {
    async fn sign_raw(&self, _signer: &str, payload: &[u8]) -> ClientResult<Vec<u8>> {
        self.keypair.sign_raw(payload)
    }

    async fn sign_and_send(
        &self,
        signer: &str,
        _call: &EvmCall,
    ) -> ClientResult<InclusionOutcome> {
        Err(ClientError::UnsupportedOperation(format!(
            "dev keyring account {signer} is read-only and cannot author extrinsics; \
             configure DECKGATE_PROVIDER_URL"
        )))
    }
}

#[async_trait]
impl WalletExtension for DevKeyring {
    async fn enable(&self, _app_name: &str) -> ClientResult<Vec<ExtensionInfo>> {
        Ok(vec![ExtensionInfo {
            name: "deckgate-dev-keyring".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }])
    }

    async fn list_accounts(&self) -> ClientResult<Vec<Account>> {
        Ok(self.keys.iter().map(|(account, _)| account.clone()).collect())
    }

    async fn injector_for(&self, address: &str) -> ClientResult<Arc<dyn Injector>> {
        let keypair = self
            .keys
            .iter()
            .find(|(account, _)| account.address == address)
            .map(|(_, keypair)| keypair.clone())
            .ok_or_else(|| ClientError::NotConnected(format!("no dev key for {address}")))?;
        Ok(Arc::new(DevInjector { keypair }))
    }
}
