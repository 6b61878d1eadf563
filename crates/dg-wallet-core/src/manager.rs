use crate::config::ClientConfig;
use dg_api_types::{
    Account, Address, AddressExt, ChainInfoResponse, ClientError, ClientResult,
    WalletConnectResponse, WalletDisconnectResponse,
};
use dg_chain_client::{
    InjectedProvider, LedgerConnection, LedgerConnector, Signer, WalletExtension, select_signer,
};
use dg_contract::{ContractGateway, InterfaceDescription};
use dg_content::{ContentLoader, ManifestFetcher};
use dg_crypto::derive_bridged_address;
use dg_storage::{DeckCache, LocalStore, SessionFlags};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Default)]
struct Session {
    accounts: Vec<Account>,
    selected: Option<Account>,
    signer: Option<Signer>,
}

/// Owns the ledger connection, the wallet session and the persisted
/// session flag. The selected account and signer change only through
/// `connect`, `select_account` and `disconnect`.
pub struct WalletManager {
    config: ClientConfig,
    connection: LedgerConnection,
    extension: Arc<dyn WalletExtension>,
    injected: Option<Arc<dyn InjectedProvider>>,
    fetcher: Arc<dyn ManifestFetcher>,
    flags: SessionFlags,
    deck_cache: DeckCache,
    interface: Arc<InterfaceDescription>,
    session: RwLock<Session>,
}

impl WalletManager {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn LedgerConnector>,
        extension: Arc<dyn WalletExtension>,
        injected: Option<Arc<dyn InjectedProvider>>,
        fetcher: Arc<dyn ManifestFetcher>,
        store: Arc<dyn LocalStore>,
    ) -> ClientResult<Self> {
        let interface = Arc::new(InterfaceDescription::content_access()?);
        Ok(Self {
            connection: LedgerConnection::new(connector),
            extension,
            injected,
            fetcher,
            flags: SessionFlags::new(store.clone()),
            deck_cache: DeckCache::new(store, config.cache_ttl),
            interface,
            session: RwLock::new(Session::default()),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn chain_info(&self) -> ClientResult<ChainInfoResponse> {
        let connection = self.connection.connect().await?;
        Ok(ChainInfoResponse {
            chain: connection.chain_label().to_owned(),
            node_version: connection.node_version().to_owned(),
        })
    }

    /// Connects to the ledger, enables the wallet extension and picks a
    /// signer. A previously selected account is kept if still listed. A
    /// connection failure drops the ledger connection so the next call
    /// dials again.
    pub async fn connect(&self) -> ClientResult<WalletConnectResponse> {
        let result = self.establish().await;
        if let Err(ClientError::Connection(reason)) = &result {
            warn!("ledger connection lost during connect: {}", reason);
            self.connection.reset();
        }
        let response = result?;

        if let Err(err) = self.flags.set_was_connected(true).await {
            warn!("failed to persist session flag: {}", err);
        }
        info!(
            "wallet connected: {} signing as {}",
            response.account.address, response.signer_address
        );
        Ok(response)
    }

    async fn establish(&self) -> ClientResult<WalletConnectResponse> {
        let connection = self.connection.connect().await?;

        // An unauthorized extension leaves only the injected provider path.
        let extensions = self.extension.enable(&self.config.app_name).await?;
        let accounts = if extensions.is_empty() {
            warn!("no wallet extension authorized {}", self.config.app_name);
            Vec::new()
        } else {
            self.extension.list_accounts().await?
        };

        let previous = self.selected_account().await;
        let selected = previous
            .as_ref()
            .and_then(|current| accounts.iter().find(|account| account.address == current.address))
            .or_else(|| accounts.first())
            .cloned();
        // Resolved without the session lock; readers keep going meanwhile.
        let signer = select_signer(
            self.injected.as_ref(),
            &self.extension,
            selected.as_ref(),
            connection.rpc(),
            &self.config.signer_options(),
        )
        .await?;

        let mut session = self.session.write().await;
        session.accounts = accounts;
        session.selected = selected;
        session.signer = Some(signer);
        Self::describe(&session)
    }

    /// Reconnects if the previous run ended connected. Returns `None` when
    /// there was no session to restore.
    pub async fn restore(&self) -> ClientResult<Option<WalletConnectResponse>> {
        let was_connected = match self.flags.was_connected().await {
            Ok(flag) => flag,
            Err(err) => {
                warn!("failed to read session flag: {}", err);
                false
            }
        };
        if !was_connected {
            return Ok(None);
        }
        info!("restoring previous wallet session");
        self.connection.reset();
        self.connect().await.map(Some)
    }

    pub async fn select_account(&self, address: &str) -> ClientResult<WalletConnectResponse> {
        let connection = self.connection.current().ok_or_else(|| {
            ClientError::NotConnected("connect before selecting an account".to_owned())
        })?;

        let account = self
            .accounts()
            .await
            .into_iter()
            .find(|account| account.address == address)
            .ok_or_else(|| {
                ClientError::NotConnected(format!("account {address} is not available"))
            })?;

        let signer = select_signer(
            self.injected.as_ref(),
            &self.extension,
            Some(&account),
            connection.rpc(),
            &self.config.signer_options(),
        )
        .await?;

        info!("selected account {}", account.address);
        let mut session = self.session.write().await;
        session.selected = Some(account);
        session.signer = Some(signer);
        Self::describe(&session)
    }

    /// Forgets the session, clears the persisted flag and drops the
    /// wallet's cached deck listing.
    pub async fn disconnect(&self) -> WalletDisconnectResponse {
        let session = std::mem::take(&mut *self.session.write().await);
        let scope = session.signer.as_ref().map(|signer| signer.address().to_hex());

        if let Some(scope) = &scope {
            self.deck_cache.clear_scope(Some(scope)).await;
        }
        if let Err(err) = self.flags.set_was_connected(false).await {
            warn!("failed to clear session flag: {}", err);
        }

        let disconnected = session.selected.is_some();
        if let Some(account) = &session.selected {
            info!("wallet disconnected: {}", account.address);
        }
        WalletDisconnectResponse {
            disconnected,
            cleared_scope: scope,
        }
    }

    fn describe(session: &Session) -> ClientResult<WalletConnectResponse> {
        let signer = session
            .signer
            .as_ref()
            .ok_or_else(|| ClientError::NotConnected("no signer".to_owned()))?;
        // The direct path may run without a native account selected.
        let account = session
            .selected
            .clone()
            .unwrap_or_else(|| Account::new(signer.address().to_hex()));
        Ok(WalletConnectResponse {
            bridged_address: derive_bridged_address(&account),
            account,
            accounts: session.accounts.clone(),
            signer: signer.kind(),
            signer_address: signer.address(),
        })
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.signer.is_some()
    }

    pub async fn selected_account(&self) -> Option<Account> {
        self.session.read().await.selected.clone()
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.session.read().await.accounts.clone()
    }

    pub async fn bridged_address(&self) -> Option<Address> {
        let session = self.session.read().await;
        session.selected.as_ref().and_then(derive_bridged_address)
    }

    pub async fn signer(&self) -> Option<Signer> {
        self.session.read().await.signer.clone()
    }

    /// Cache scope for the active wallet: the signer's contract address.
    pub async fn wallet_scope(&self) -> Option<String> {
        self.session
            .read()
            .await
            .signer
            .as_ref()
            .map(|signer| signer.address().to_hex())
    }

    /// Gateway bound to the configured contract. Without a session it is
    /// read-only and every write fails with `NotConnected`.
    pub async fn gateway(&self) -> ClientResult<ContractGateway> {
        let address = self.config.contract_address.ok_or_else(|| {
            let message = "DECKGATE_CONTRACT_ADDRESS is not configured".to_owned();
            ClientError::UnsupportedOperation(message)
        })?;
        let connection = self.connection.connect().await?;
        Ok(ContractGateway::new(
            address,
            self.interface.clone(),
            connection.rpc(),
            self.signer().await,
        ))
    }

    pub async fn content_loader(&self) -> ClientResult<ContentLoader> {
        let gateway = self.gateway().await?;
        Ok(ContentLoader::new(
            Arc::new(gateway),
            self.fetcher.clone(),
            self.deck_cache.clone(),
            self.config.loader_config(),
        ))
    }
}
