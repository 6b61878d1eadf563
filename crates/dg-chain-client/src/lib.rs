mod ledger;
mod signer;
mod wallet;

pub use ledger::{
    CallRequest, Connection, FeeEstimate, LedgerConnection, LedgerConnector, LedgerRpc, TxReceipt,
};
pub use signer::{
    BridgingSigner, DEFAULT_RECEIPT_POLL_INTERVAL, DirectSigner, PendingTransaction, Signer,
    SignerOptions, select_signer,
};
pub use wallet::{
    DispatchFailure, EvmCall, ExtensionInfo, InclusionOutcome, InjectedProvider, Injector,
    LedgerEvent, TxRequest, WalletExtension,
};

#[cfg(test)]
pub(crate) mod testing;
