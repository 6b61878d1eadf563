mod config;
mod manager;

pub use config::{
    ClientConfig, DEFAULT_APP_NAME, DEFAULT_BIND_ADDR, DEFAULT_GAS_LIMIT, DEFAULT_LEDGER_URL,
};
pub use manager::WalletManager;
