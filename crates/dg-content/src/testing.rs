use crate::fetch::ManifestFetcher;
use crate::ledger::DeckLedger;
use async_trait::async_trait;
use dg_api_types::{
    Address, ClientError, ClientResult, ContentId, ContentRecord, U256, VersionRecord,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) const OWNER: &str = "0xd43593c715fdd31c61141abd04a99fd6822c8558";
pub(crate) const OTHER: &str = "0x8eaf04151687736326c9fea17e25fc5287613693";
const CREATOR: [u8; 20] = [0x11; 20];

pub(crate) fn record(
    id: u64,
    name: &str,
    price: U256,
    max_supply: U256,
    minted: U256,
) -> ContentRecord {
    ContentRecord {
        content_id: ContentId(id),
        creator: Address::from(CREATOR),
        name: name.to_owned(),
        is_free: None,
        price,
        max_supply,
        current_supply: minted,
    }
}

#[derive(Default)]
pub(crate) struct FakeDeckLedger {
    records: HashMap<ContentId, ContentRecord>,
    versions: HashMap<ContentId, VersionRecord>,
    balances: HashMap<(Address, ContentId), U256>,
    failing_balances: BTreeSet<ContentId>,
    keys: HashMap<ContentId, String>,
    pub(crate) reads: AtomicUsize,
}

impl FakeDeckLedger {
    pub(crate) fn insert(&mut self, record: ContentRecord, manifest_uri: &str) {
        let version = self.versions.entry(record.content_id).or_default();
        version.manifest_uri = manifest_uri.to_owned();
        version.reason = "initial".to_owned();
        self.records.insert(record.content_id, record);
    }

    pub(crate) fn set_free_flag(&mut self, content_id: ContentId, free: bool) {
        if let Some(record) = self.records.get_mut(&content_id) {
            record.is_free = Some(free);
        }
    }

    pub(crate) fn set_balance(&mut self, owner: Address, content_id: ContentId, balance: U256) {
        self.balances.insert((owner, content_id), balance);
    }

    pub(crate) fn fail_balance(&mut self, content_id: ContentId) {
        self.failing_balances.insert(content_id);
    }

    pub(crate) fn set_payload(&mut self, content_id: ContentId, payload_uri: &str, key: &str) {
        self.versions.entry(content_id).or_default().payload_uri = payload_uri.to_owned();
        self.keys.insert(content_id, key.to_owned());
    }
}

#[async_trait]
impl DeckLedger for FakeDeckLedger {
    async fn content_info(&self, content_id: ContentId) -> ClientResult<ContentRecord> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(&content_id)
            .cloned()
            .ok_or_else(|| ClientError::Rpc(format!("content {content_id} does not exist")))
    }

    async fn active_version(&self, content_id: ContentId) -> ClientResult<VersionRecord> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.versions
            .get(&content_id)
            .cloned()
            .ok_or_else(|| ClientError::Rpc(format!("content {content_id} has no version")))
    }

    async fn balance_of(&self, owner: Address, content_id: ContentId) -> ClientResult<U256> {
        if self.failing_balances.contains(&content_id) {
            return Err(ClientError::Rpc("balanceOf timed out".to_owned()));
        }
        Ok(self
            .balances
            .get(&(owner, content_id))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn content_key(&self, content_id: ContentId) -> ClientResult<String> {
        self.keys
            .get(&content_id)
            .cloned()
            .ok_or_else(|| ClientError::Dispatch("execution reverted: not a holder".to_owned()))
    }
}

#[derive(Default)]
pub(crate) struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    pub(crate) requests: AtomicUsize,
    pub(crate) last_url: Mutex<Option<String>>,
}

impl FakeFetcher {
    pub(crate) fn with_json(mut self, url: &str, body: serde_json::Value) -> Self {
        self.bodies.insert(url.to_owned(), body.to_string().into_bytes());
        self
    }

    pub(crate) fn with_bytes(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_owned(), body);
        self
    }
}

#[async_trait]
impl ManifestFetcher for FakeFetcher {
    async fn fetch_bytes(&self, url: &str) -> ClientResult<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.to_owned());
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| ClientError::Fetch(format!("{url}: HTTP 404 Not Found")))
    }
}
