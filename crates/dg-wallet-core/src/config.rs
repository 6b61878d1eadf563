use anyhow::{Context, Result, anyhow};
use dg_api_types::{Address, ContentId, U256};
use dg_chain_client::SignerOptions;
use dg_content::{DEFAULT_IPFS_GATEWAY, LoaderConfig};
use dg_storage::{DEFAULT_DECK_CACHE_TTL, InMemoryStore, LocalStore, RocksDbStore};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_LEDGER_URL: &str = "ws://127.0.0.1:9944";
pub const DEFAULT_APP_NAME: &str = "deckgate";
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Client settings, read from `DECKGATE_*` environment variables with the
/// defaults below when unset.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ledger_url: String,
    /// Required for every contract operation.
    pub contract_address: Option<Address>,
    pub app_name: String,
    pub known_ids: Vec<ContentId>,
    pub legacy_ids: BTreeSet<ContentId>,
    pub gas_limit: U256,
    pub cache_ttl: Duration,
    pub fallback_dir: PathBuf,
    pub ipfs_gateway: String,
    /// RocksDB directory for persisted local state; in-memory when unset.
    pub store_path: Option<PathBuf>,
    pub receipt_poll_interval: Duration,
    /// Node endpoint offering `eth_accounts`/`eth_sendTransaction`, used as
    /// the injected provider when set.
    pub provider_url: Option<String>,
    /// Listen address of the HTTP service.
    pub bind_addr: SocketAddr,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let loader = LoaderConfig::default();
        Self {
            ledger_url: DEFAULT_LEDGER_URL.to_owned(),
            contract_address: None,
            app_name: DEFAULT_APP_NAME.to_owned(),
            known_ids: loader.known_ids,
            legacy_ids: loader.legacy_ids,
            gas_limit: U256::from(DEFAULT_GAS_LIMIT),
            cache_ttl: DEFAULT_DECK_CACHE_TTL,
            fallback_dir: loader.fallback_dir,
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_owned(),
            store_path: None,
            receipt_poll_interval: SignerOptions::default().receipt_poll_interval,
            provider_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

fn parse_ids(key: &str, raw: &str) -> Result<Vec<ContentId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u64>()
                .map(ContentId)
                .with_context(|| format!("{key}: '{item}' is not a content id"))
        })
        .collect()
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{key}: '{raw}' is not an unsigned integer"))
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("DECKGATE_LEDGER_URL") {
            config.ledger_url = url.trim().trim_end_matches('/').to_owned();
        }
        if let Some(address) = get("DECKGATE_CONTRACT_ADDRESS") {
            let parsed = address
                .trim()
                .parse::<Address>()
                .map_err(|err| anyhow!("DECKGATE_CONTRACT_ADDRESS: {err}"))?;
            config.contract_address = Some(parsed);
        }
        if let Some(name) = get("DECKGATE_APP_NAME") {
            config.app_name = name.trim().to_owned();
        }
        if let Some(raw) = get("DECKGATE_KNOWN_IDS") {
            config.known_ids = parse_ids("DECKGATE_KNOWN_IDS", &raw)?;
        }
        if let Some(raw) = get("DECKGATE_LEGACY_IDS") {
            config.legacy_ids = parse_ids("DECKGATE_LEGACY_IDS", &raw)?.into_iter().collect();
        }
        if let Some(raw) = get("DECKGATE_GAS_LIMIT") {
            config.gas_limit = U256::from(parse_u64("DECKGATE_GAS_LIMIT", &raw)?);
        }
        if let Some(raw) = get("DECKGATE_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(parse_u64("DECKGATE_CACHE_TTL_SECS", &raw)?);
        }
        if let Some(dir) = get("DECKGATE_FALLBACK_DIR") {
            config.fallback_dir = PathBuf::from(dir.trim());
        }
        if let Some(gateway) = get("DECKGATE_IPFS_GATEWAY") {
            config.ipfs_gateway = gateway.trim().to_owned();
        }
        if let Some(path) = get("DECKGATE_STORE_PATH") {
            config.store_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = get("DECKGATE_RECEIPT_POLL_MS") {
            config.receipt_poll_interval =
                Duration::from_millis(parse_u64("DECKGATE_RECEIPT_POLL_MS", &raw)?);
        }
        if let Some(url) = get("DECKGATE_PROVIDER_URL") {
            config.provider_url = Some(url.trim().to_owned());
        }
        if let Some(raw) = get("DECKGATE_BIND_ADDR") {
            config.bind_addr = raw
                .trim()
                .parse()
                .with_context(|| format!("DECKGATE_BIND_ADDR: '{raw}' is not a socket address"))?;
        }

        Ok(config)
    }

    pub fn signer_options(&self) -> SignerOptions {
        SignerOptions {
            default_gas_limit: self.gas_limit,
            receipt_poll_interval: self.receipt_poll_interval,
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            known_ids: self.known_ids.clone(),
            legacy_ids: self.legacy_ids.clone(),
            fallback_dir: self.fallback_dir.clone(),
            ipfs_gateway: self.ipfs_gateway.clone(),
        }
    }

    /// Opens RocksDB at `store_path`, or an in-memory store when unset.
    pub fn open_store(&self) -> Result<Arc<dyn LocalStore>> {
        match &self.store_path {
            Some(path) => {
                let path_str = path
                    .to_str()
                    .ok_or_else(|| anyhow!("DECKGATE_STORE_PATH is not valid UTF-8"))?;
                let store = RocksDbStore::open_default(path_str)
                    .with_context(|| format!("opening local store at {path_str}"))?;
                info!("local state persisted in {}", path_str);
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(InMemoryStore::default())),
        }
    }
}
