//! Minimal contract-call layer: a validated interface description, a strict
//! wrapper over the dynamic ABI codec and a gateway that dispatches reads
//! and writes.

mod abi;
mod codec;
mod gateway;

pub use abi::{Function, InterfaceDescription};
pub use alloy_dyn_abi::{DynSolType, DynSolValue};
pub use alloy_json_abi::StateMutability;
pub use codec::{decode_params, decode_revert_reason, encode_call, encode_params};
pub use gateway::{ContractGateway, Outputs};
