//! Deck listing and content package access on top of the contract gateway.

mod fetch;
mod ledger;
mod loader;

pub use fetch::{DEFAULT_IPFS_GATEWAY, HttpFetcher, ManifestFetcher, resolve_uri};
pub use ledger::DeckLedger;
pub use loader::{ContentLoader, LoaderConfig, merge_deck};

#[cfg(test)]
pub(crate) mod testing;
