use crate::{LocalStore, epoch_ms};
use dg_api_types::Deck;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DECK_CACHE_PREFIX: &str = "deckgate:decks";
pub const DEFAULT_DECK_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCacheEntry {
    pub decks: Vec<Deck>,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

/// Deck listings cached per wallet scope. Entries older than the TTL read as
/// absent. Store failures are logged and treated as misses.
#[derive(Clone)]
pub struct DeckCache {
    store: Arc<dyn LocalStore>,
    ttl: Duration,
}

impl DeckCache {
    pub fn new(store: Arc<dyn LocalStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn scope_key(wallet: Option<&str>) -> String {
        match wallet.map(str::trim).filter(|value| !value.is_empty()) {
            Some(address) => format!("{DECK_CACHE_PREFIX}:{}", address.to_lowercase()),
            None => DECK_CACHE_PREFIX.to_owned(),
        }
    }

    pub async fn get(&self, wallet: Option<&str>) -> Option<Vec<Deck>> {
        self.get_at(wallet, epoch_ms()).await
    }

    pub async fn get_at(&self, wallet: Option<&str>, now_ms: u64) -> Option<Vec<Deck>> {
        let key = Self::scope_key(wallet);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("deck cache read failed for {}: {}", key, err);
                return None;
            }
        };

        let entry = match serde_json::from_str::<DeckCacheEntry>(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("discarding unreadable deck cache entry {}: {}", key, err);
                self.remove_key(&key).await;
                return None;
            }
        };

        let age = Duration::from_millis(now_ms.saturating_sub(entry.timestamp));
        if age >= self.ttl {
            debug!("deck cache entry {} expired after {:?}", key, age);
            self.remove_key(&key).await;
            return None;
        }

        debug!("deck cache hit for {} ({} decks)", key, entry.decks.len());
        Some(entry.decks)
    }

    pub async fn put(&self, wallet: Option<&str>, decks: &[Deck]) {
        self.put_at(wallet, decks, epoch_ms()).await;
    }

    pub async fn put_at(&self, wallet: Option<&str>, decks: &[Deck], now_ms: u64) {
        let key = Self::scope_key(wallet);
        let entry = DeckCacheEntry {
            decks: decks.to_vec(),
            timestamp: now_ms,
            wallet_address: wallet.map(str::to_lowercase),
        };
        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!("failed to encode deck cache entry {}: {}", key, err);
                return;
            }
        };
        if let Err(err) = self.store.set(&key, encoded).await {
            warn!("deck cache write failed for {}: {}", key, err);
        }
    }

    /// Drops one scope; `None` is the global scope.
    pub async fn clear_scope(&self, wallet: Option<&str>) {
        self.remove_key(&Self::scope_key(wallet)).await;
    }

    /// Drops the global scope and every wallet scope. Keys that merely share
    /// the prefix text, such as `deckgate:decksX`, are left alone.
    pub async fn clear_all(&self) {
        self.remove_key(DECK_CACHE_PREFIX).await;
        let scoped = format!("{DECK_CACHE_PREFIX}:");
        match self.store.keys_with_prefix(&scoped).await {
            Ok(keys) => {
                for key in keys {
                    self.remove_key(&key).await;
                }
            }
            Err(err) => warn!("failed to enumerate deck cache entries: {}", err),
        }
    }

    async fn remove_key(&self, key: &str) {
        if let Err(err) = self.store.remove(key).await {
            warn!("failed to remove deck cache entry {}: {}", key, err);
        }
    }
}
