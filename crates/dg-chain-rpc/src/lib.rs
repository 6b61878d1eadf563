//! JSON-RPC over WebSocket adapter for the ledger node.

mod json_rpc;
mod ledger;
mod provider;

pub use json_rpc::JsonRpcClient;
pub use ledger::{WsConnector, WsLedgerRpc};
pub use provider::RpcInjectedProvider;
