mod deck_cache;

pub use deck_cache::{DECK_CACHE_PREFIX, DEFAULT_DECK_CACHE_TTL, DeckCache, DeckCacheEntry};

use anyhow::Result;
use async_trait::async_trait;
use rocksdb::{DB, Direction, IteratorMode, Options};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

pub const WAS_CONNECTED_KEY: &str = "deckgate:wasConnected";

/// String key/value store standing in for browser local storage.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

#[async_trait]
impl LocalStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.entries.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut guard = self.entries.write().await;
        guard.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.write().await;
        guard.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let guard = self.entries.read().await;
        Ok(guard
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    pub fn open_default(path: &str) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path)?;
        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl LocalStore for RocksDbStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.db.get(key.as_bytes())?;
        match value {
            Some(raw) => Ok(Some(String::from_utf8(raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.db.put(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.db.delete(key.as_bytes())?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mode = IteratorMode::From(prefix.as_bytes(), Direction::Forward);
        for item in self.db.iterator(mode) {
            let (key, _) = item?;
            if !key.as_ref().starts_with(prefix.as_bytes()) {
                break;
            }
            keys.push(String::from_utf8(key.to_vec())?);
        }
        Ok(keys)
    }
}

/// Persisted "was connected" flag used to restore a session on start-up.
pub struct SessionFlags {
    store: Arc<dyn LocalStore>,
}

impl SessionFlags {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub async fn was_connected(&self) -> Result<bool> {
        Ok(self.store.get(WAS_CONNECTED_KEY).await?.as_deref() == Some("true"))
    }

    pub async fn set_was_connected(&self, connected: bool) -> Result<()> {
        if connected {
            self.store.set(WAS_CONNECTED_KEY, "true".to_owned()).await
        } else {
            self.store.remove(WAS_CONNECTED_KEY).await
        }
    }
}

pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
