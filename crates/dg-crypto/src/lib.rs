mod address;
mod keyring;
mod package;

pub use address::{
    DEFAULT_SS58_FORMAT, decode_ss58, derive_bridged_address, encode_ss58, public_key_of,
};
pub use keyring::Ed25519Keypair;
pub use package::{
    KEY_LEN, NONCE_LEN, PACKAGE_HEADER_LEN, TAG_LEN, decrypt_package, encrypt_package,
    open_package_bytes, unpack_archive,
};
