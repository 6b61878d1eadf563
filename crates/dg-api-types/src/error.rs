use thiserror::Error;

/// Failure taxonomy shared by every client crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Endpoint unreachable or handshake failed.
    #[error("could not reach network: {0}")]
    Connection(String),

    #[error("not connected: {0}")]
    NotConnected(String),

    /// Interface description and contract disagree.
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The ledger rejected a transaction.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("malformed package: {0}")]
    MalformedPackage(String),

    /// The node answered a query with an error object.
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("content {content_id} is not owned by {owner}")]
    NotOwned { content_id: u64, owner: String },

    #[error("storage error: {0}")]
    Storage(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
