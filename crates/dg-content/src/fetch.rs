use async_trait::async_trait;
use dg_api_types::{ClientError, ClientResult};
use tracing::debug;

pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Rewrites `ipfs://<cid>` onto `gateway`; other schemes pass through.
pub fn resolve_uri(uri: &str, gateway: &str) -> String {
    match uri.trim().strip_prefix("ipfs://") {
        Some(path) => {
            let path = path.trim_start_matches("ipfs/");
            format!("{}/{}", gateway.trim_end_matches('/'), path)
        }
        None => uri.trim().to_owned(),
    }
}

/// Retrieves manifests and encrypted packages by URL.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> ClientResult<Vec<u8>>;

    async fn fetch_json(&self, url: &str) -> ClientResult<serde_json::Value> {
        let bytes = self.fetch_bytes(url).await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::Fetch(format!("{url}: invalid JSON: {err}")))
    }
}

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ManifestFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> ClientResult<Vec<u8>> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ClientError::Fetch(format!("{url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Fetch(format!("{url}: HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ClientError::Fetch(format!("{url}: {err}")))?;
        Ok(body.to_vec())
    }
}
