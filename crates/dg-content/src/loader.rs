use crate::fetch::{DEFAULT_IPFS_GATEWAY, ManifestFetcher, resolve_uri};
use crate::ledger::DeckLedger;
use dg_api_types::amount::format_amount;
use dg_api_types::{
    Address, AddressExt, ClientError, ClientResult, ContentId, ContentRecord, Deck,
    ManifestDocument, PackageAssets,
};
use dg_crypto::open_package_bytes;
use dg_storage::DeckCache;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

const PRICE_DECIMALS: u8 = 18;

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Content ids listed by `load_all_decks`, in load order.
    pub known_ids: Vec<ContentId>,
    pub legacy_ids: BTreeSet<ContentId>,
    /// Directory holding `deck{id}.json` fallback manifests.
    pub fallback_dir: PathBuf,
    pub ipfs_gateway: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            known_ids: (1..=6).map(ContentId).collect(),
            legacy_ids: [ContentId(3), ContentId(4)].into_iter().collect(),
            fallback_dir: PathBuf::from("./manifests"),
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_owned(),
        }
    }
}

impl LoaderConfig {
    pub fn fallback_path(&self, content_id: ContentId) -> PathBuf {
        self.fallback_dir.join(format!("deck{content_id}.json"))
    }
}

fn is_placeholder(uri: &str) -> bool {
    let uri = uri.trim();
    uri.is_empty() || uri == "ipfs://" || uri.eq_ignore_ascii_case("placeholder")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Merges a ledger snapshot with its manifest. Ledger fields win for name,
/// supply and price; presentation fields come from the manifest.
pub fn merge_deck(
    record: &ContentRecord,
    manifest: Option<&ManifestDocument>,
    legacy: bool,
    ipfs_gateway: &str,
) -> Deck {
    let attribute = |name: &str| non_empty(manifest.and_then(|doc| doc.attribute(name)));

    let name = if record.name.trim().is_empty() {
        manifest.and_then(|doc| doc.name.clone()).unwrap_or_default()
    } else {
        record.name.clone()
    };
    let image = manifest.map(|doc| doc.image.clone()).unwrap_or_default();

    Deck {
        content_id: record.content_id,
        name,
        description: manifest.map(|doc| doc.description.clone()).unwrap_or_default(),
        image: if image.is_empty() { image } else { resolve_uri(&image, ipfs_gateway) },
        year: attribute("Year").unwrap_or_default(),
        creator: attribute("Creator")
            .or_else(|| attribute("Artist"))
            .unwrap_or_else(|| record.creator.to_hex()),
        tradition: attribute("Tradition").unwrap_or_default(),
        license: attribute("License").unwrap_or_default(),
        max_supply: record.max_supply,
        current_supply: record.current_supply,
        total_minted: record.current_supply,
        price: format_amount(record.price, PRICE_DECIMALS),
        price_raw: record.price,
        free: record.free(),
        legacy,
        external_url: manifest
            .map(|doc| doc.external_url.clone())
            .unwrap_or_default(),
    }
}

/// Builds `Deck` records from ledger reads and manifests, behind the
/// wallet-scoped deck cache.
pub struct ContentLoader {
    ledger: Arc<dyn DeckLedger>,
    fetcher: Arc<dyn ManifestFetcher>,
    cache: DeckCache,
    config: LoaderConfig,
}

impl ContentLoader {
    pub fn new(
        ledger: Arc<dyn DeckLedger>,
        fetcher: Arc<dyn ManifestFetcher>,
        cache: DeckCache,
        config: LoaderConfig,
    ) -> Self {
        Self {
            ledger,
            fetcher,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    async fn local_fallback(&self, content_id: ContentId) -> Option<ManifestDocument> {
        if !self.config.known_ids.contains(&content_id) {
            return None;
        }
        let path = self.config.fallback_path(content_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) => {
                debug!("no fallback manifest at {}: {}", path.display(), err);
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(manifest) => {
                info!("using fallback manifest {}", path.display());
                Some(manifest)
            }
            Err(err) => {
                warn!("fallback manifest {} is invalid: {}", path.display(), err);
                None
            }
        }
    }

    async fn fetch_manifest(&self, uri: &str) -> ClientResult<ManifestDocument> {
        let url = resolve_uri(uri, &self.config.ipfs_gateway);
        let value = self.fetcher.fetch_json(&url).await?;
        serde_json::from_value(value)
            .map_err(|err| ClientError::Fetch(format!("{url}: unexpected manifest shape: {err}")))
    }

    async fn resolve_manifest(&self, content_id: ContentId, uri: &str) -> Option<ManifestDocument> {
        if is_placeholder(uri) {
            return self.local_fallback(content_id).await;
        }
        match self.fetch_manifest(uri).await {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                warn!("manifest for deck {} unavailable, trying fallback: {}", content_id, err);
                self.local_fallback(content_id).await
            }
        }
    }

    /// Loads one deck. Ledger failures propagate; manifest failures leave
    /// the manifest-derived fields empty.
    pub async fn load_deck(&self, content_id: ContentId) -> ClientResult<Deck> {
        let record = self.ledger.content_info(content_id).await?;
        let version = self.ledger.active_version(content_id).await?;
        let manifest = self.resolve_manifest(content_id, &version.manifest_uri).await;
        let legacy = self.config.legacy_ids.contains(&content_id);
        Ok(merge_deck(&record, manifest.as_ref(), legacy, &self.config.ipfs_gateway))
    }

    /// Loads every known deck in order, skipping ids that fail, and writes
    /// the result to the cache entry for `wallet_scope`.
    pub async fn load_all_decks(&self, use_cache: bool, wallet_scope: Option<&str>) -> Vec<Deck> {
        if use_cache {
            if let Some(decks) = self.cache.get(wallet_scope).await {
                debug!("deck cache hit for {}", DeckCache::scope_key(wallet_scope));
                return decks;
            }
        }

        let mut decks = Vec::with_capacity(self.config.known_ids.len());
        for content_id in &self.config.known_ids {
            match self.load_deck(*content_id).await {
                Ok(deck) => decks.push(deck),
                Err(err) => warn!("skipping deck {}: {}", content_id, err),
            }
        }

        self.cache.put(wallet_scope, &decks).await;
        decks
    }

    /// Decks `owner` holds at least one pass for. The listing is read
    /// through the cache entry for `wallet_scope` (the global entry when
    /// `None`); balances are always read fresh and never cached. A failed
    /// balance query drops that deck from the listing.
    pub async fn load_owned_decks(&self, owner: Address, wallet_scope: Option<&str>) -> Vec<Deck> {
        let decks = self.load_all_decks(true, wallet_scope).await;

        let mut owned = Vec::new();
        for deck in decks {
            match self.ledger.balance_of(owner, deck.content_id).await {
                Ok(balance) if !balance.is_zero() => owned.push(deck),
                Ok(_) => {}
                Err(err) => {
                    warn!("balance of deck {} for {} failed: {}", deck.content_id, owner, err)
                }
            }
        }
        owned
    }

    /// Clears one wallet scope, or every scope when `wallet_scope` is `None`.
    pub async fn clear_deck_cache(&self, wallet_scope: Option<&str>) {
        match wallet_scope {
            Some(wallet) => self.cache.clear_scope(Some(wallet)).await,
            None => self.cache.clear_all().await,
        }
    }

    /// Ownership check, then payload fetch, key read, decryption and unpacking.
    pub async fn open_package(
        &self,
        content_id: ContentId,
        owner: Address,
    ) -> ClientResult<PackageAssets> {
        let balance = self.ledger.balance_of(owner, content_id).await?;
        if balance.is_zero() {
            return Err(ClientError::NotOwned {
                content_id: content_id.0,
                owner: owner.to_hex(),
            });
        }

        let version = self.ledger.active_version(content_id).await?;
        if is_placeholder(&version.payload_uri) {
            return Err(ClientError::MalformedPackage(format!(
                "deck {content_id} has no active payload"
            )));
        }
        let url = resolve_uri(&version.payload_uri, &self.config.ipfs_gateway);
        let payload = self.fetcher.fetch_bytes(&url).await?;
        let key = self.ledger.content_key(content_id).await?;

        let assets = open_package_bytes(&payload, &key)?;
        info!(
            "opened deck {} package ({} images)",
            content_id,
            assets.images.len()
        );
        Ok(assets)
    }
}
