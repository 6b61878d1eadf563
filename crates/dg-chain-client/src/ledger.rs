use async_trait::async_trait;
use dg_api_types::{Address, ClientError, ClientResult, U256};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: Option<U256>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub block_hash: Option<String>,
    pub success: bool,
}

/// Named queries the client issues against the ledger endpoint.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn chain_label(&self) -> ClientResult<String>;
    async fn node_version(&self) -> ClientResult<String>;
    async fn pending_nonce(&self, address: &Address) -> ClientResult<U256>;
    async fn chain_id(&self) -> ClientResult<u64>;
    async fn fee_estimate(&self) -> ClientResult<FeeEstimate>;
    /// Read-only contract call; returns the raw return data.
    async fn call(&self, request: &CallRequest) -> ClientResult<Vec<u8>>;
    async fn transaction_receipt(&self, hash: &str) -> ClientResult<Option<TxReceipt>>;
}

/// Opens the transport behind a [`LedgerRpc`].
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    fn endpoint(&self) -> &str;
    async fn dial(&self) -> ClientResult<Arc<dyn LedgerRpc>>;
}

/// An established connection plus the diagnostics read during the handshake.
pub struct Connection {
    rpc: Arc<WatchedRpc>,
    chain_label: String,
    node_version: String,
}

impl Connection {
    pub fn rpc(&self) -> Arc<dyn LedgerRpc> {
        self.rpc.clone()
    }

    pub fn chain_label(&self) -> &str {
        &self.chain_label
    }

    pub fn node_version(&self) -> &str {
        &self.node_version
    }

    /// Set once any query on this connection failed at the transport level.
    pub fn is_lost(&self) -> bool {
        self.rpc.lost.load(Ordering::SeqCst)
    }
}

/// Forwards every query and marks the connection lost on the first
/// [`ClientError::Connection`], so the next `connect` dials again.
struct WatchedRpc {
    inner: Arc<dyn LedgerRpc>,
    endpoint: String,
    lost: AtomicBool,
}

impl WatchedRpc {
    fn watch<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(ClientError::Connection(message)) = &result {
            if !self.lost.swap(true, Ordering::SeqCst) {
                warn!("lost connection to {}: {}", self.endpoint, message);
            }
        }
        result
    }
}

#[async_trait]
impl LedgerRpc for WatchedRpc {
    async fn chain_label(&self) -> ClientResult<String> {
        self.watch(self.inner.chain_label().await)
    }

    async fn node_version(&self) -> ClientResult<String> {
        self.watch(self.inner.node_version().await)
    }

    async fn pending_nonce(&self, address: &Address) -> ClientResult<U256> {
        self.watch(self.inner.pending_nonce(address).await)
    }

    async fn chain_id(&self) -> ClientResult<u64> {
        self.watch(self.inner.chain_id().await)
    }

    async fn fee_estimate(&self) -> ClientResult<FeeEstimate> {
        self.watch(self.inner.fee_estimate().await)
    }

    async fn call(&self, request: &CallRequest) -> ClientResult<Vec<u8>> {
        self.watch(self.inner.call(request).await)
    }

    async fn transaction_receipt(&self, hash: &str) -> ClientResult<Option<TxReceipt>> {
        self.watch(self.inner.transaction_receipt(hash).await)
    }
}

/// Single lazily dialed connection shared by every caller. A connection
/// that has been marked lost is replaced on the next `connect`.
pub struct LedgerConnection {
    connector: Arc<dyn LedgerConnector>,
    slot: RwLock<Option<Arc<Connection>>>,
    dialing: Mutex<()>,
}

impl LedgerConnection {
    pub fn new(connector: Arc<dyn LedgerConnector>) -> Self {
        Self {
            connector,
            slot: RwLock::new(None),
            dialing: Mutex::new(()),
        }
    }

    /// Returns the live connection, dialing when there is none. Concurrent
    /// callers share one dial. A failed attempt leaves the slot empty.
    pub async fn connect(&self) -> ClientResult<Arc<Connection>> {
        if let Some(connection) = self.current() {
            return Ok(connection);
        }
        let _dialing = self.dialing.lock().await;
        if let Some(connection) = self.current() {
            return Ok(connection);
        }

        let connection = Arc::new(self.dial().await?);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(connection.clone());
        Ok(connection)
    }

    async fn dial(&self) -> ClientResult<Connection> {
        let endpoint = self.connector.endpoint().to_owned();
        let inner = self
            .connector
            .dial()
            .await
            .map_err(|err| as_connection_error(&endpoint, err))?;
        let chain_label = inner
            .chain_label()
            .await
            .map_err(|err| as_connection_error(&endpoint, err))?;
        let node_version = inner
            .node_version()
            .await
            .map_err(|err| as_connection_error(&endpoint, err))?;
        info!("connected to {} ({} v{})", endpoint, chain_label, node_version);
        Ok(Connection {
            rpc: Arc::new(WatchedRpc {
                inner,
                endpoint,
                lost: AtomicBool::new(false),
            }),
            chain_label,
            node_version,
        })
    }

    /// Drops the current connection; the next `connect` dials again.
    pub fn reset(&self) {
        if let Some(connection) = self.slot.write().unwrap_or_else(PoisonError::into_inner).take() {
            debug!("dropping connection to {}", connection.rpc.endpoint);
        }
    }

    pub fn current(&self) -> Option<Arc<Connection>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|connection| !connection.is_lost())
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }
}

fn as_connection_error(endpoint: &str, err: ClientError) -> ClientError {
    match err {
        ClientError::Connection(message) => ClientError::Connection(message),
        other => ClientError::Connection(format!("{endpoint}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, FakeLedger};

    #[tokio::test]
    async fn connect_is_idempotent() -> anyhow::Result<()> {
        let ledger = Arc::new(FakeLedger::default());
        let connector = Arc::new(FakeConnector::new(ledger.clone()));
        let connection = LedgerConnection::new(connector.clone());

        assert!(!connection.is_connected());
        let first = connection.connect().await?;
        let second = connection.connect().await?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.dials(), 1);
        assert_eq!(first.chain_label(), "Development");
        assert_eq!(first.node_version(), "1.0.0");
        assert!(connection.current().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let connector = Arc::new(FakeConnector::unreachable());
        let connection = LedgerConnection::new(connector.clone());

        let err = connection.connect().await.err().expect("dial fails");
        assert!(matches!(err, ClientError::Connection(_)));
        assert!(!connection.is_connected());
        assert_eq!(connector.dials(), 1);
    }

    #[tokio::test]
    async fn failed_handshake_is_a_connection_error() {
        let ledger = Arc::new(FakeLedger {
            fail_version: true,
            ..FakeLedger::default()
        });
        let connection = LedgerConnection::new(Arc::new(FakeConnector::new(ledger)));

        let err = connection.connect().await.err().expect("handshake fails");
        assert!(matches!(err, ClientError::Connection(message) if message.contains("ws://fake")));
    }

    #[tokio::test]
    async fn dropped_transport_is_redialed() -> anyhow::Result<()> {
        let ledger = Arc::new(FakeLedger::default());
        let connector = Arc::new(FakeConnector::new(ledger.clone()));
        let connection = LedgerConnection::new(connector.clone());

        let first = connection.connect().await?;
        ledger.closed.store(true, Ordering::SeqCst);
        let err = first.rpc().chain_id().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
        assert!(first.is_lost());
        assert!(!connection.is_connected());

        // While the node stays down, each attempt dials again and fails.
        connector.refuse.store(true, Ordering::SeqCst);
        assert!(matches!(connection.connect().await, Err(ClientError::Connection(_))));
        assert_eq!(connector.dials(), 2);

        connector.refuse.store(false, Ordering::SeqCst);
        ledger.closed.store(false, Ordering::SeqCst);
        let second = connection.connect().await?;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.dials(), 3);
        assert_eq!(second.rpc().chain_id().await?, 1281);
        assert!(connection.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn reset_forces_a_new_dial() -> anyhow::Result<()> {
        let ledger = Arc::new(FakeLedger::default());
        let connector = Arc::new(FakeConnector::new(ledger));
        let connection = LedgerConnection::new(connector.clone());

        let first = connection.connect().await?;
        connection.reset();
        assert!(!connection.is_connected());
        let second = connection.connect().await?;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.dials(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn rpc_errors_keep_the_connection() -> anyhow::Result<()> {
        let ledger = Arc::new(FakeLedger::default());
        let connection = LedgerConnection::new(Arc::new(FakeConnector::new(ledger.clone())));

        let live = connection.connect().await?;
        ledger.fail_version_after_handshake.store(true, Ordering::SeqCst);
        assert!(matches!(live.rpc().node_version().await, Err(ClientError::Rpc(_))));
        assert!(connection.is_connected());
        Ok(())
    }
}
