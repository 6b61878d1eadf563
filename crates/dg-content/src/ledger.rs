use async_trait::async_trait;
use dg_api_types::{ClientResult, ContentId, ContentRecord, Address, U256, VersionRecord};
use dg_contract::ContractGateway;

/// The ledger reads the content pipeline depends on.
#[async_trait]
pub trait DeckLedger: Send + Sync {
    async fn content_info(&self, content_id: ContentId) -> ClientResult<ContentRecord>;
    async fn active_version(&self, content_id: ContentId) -> ClientResult<VersionRecord>;
    async fn balance_of(&self, owner: Address, content_id: ContentId) -> ClientResult<U256>;
    async fn content_key(&self, content_id: ContentId) -> ClientResult<String>;
}

#[async_trait]
impl DeckLedger for ContractGateway {
    async fn content_info(&self, content_id: ContentId) -> ClientResult<ContentRecord> {
        ContractGateway::content_info(self, content_id).await
    }

    async fn active_version(&self, content_id: ContentId) -> ClientResult<VersionRecord> {
        ContractGateway::active_version(self, content_id).await
    }

    async fn balance_of(&self, owner: Address, content_id: ContentId) -> ClientResult<U256> {
        ContractGateway::balance_of(self, owner, content_id).await
    }

    async fn content_key(&self, content_id: ContentId) -> ClientResult<String> {
        ContractGateway::content_key(self, content_id).await
    }
}
