use blake2::{Blake2b512, Digest};
use dg_api_types::{Account, Address};

/// Generic Substrate address format.
pub const DEFAULT_SS58_FORMAT: u16 = 42;

const SS58_CHECKSUM_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;
const PUBLIC_KEY_LEN: usize = 32;

fn ss58_checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_CHECKSUM_PREFIX);
    hasher.update(data);
    let digest = hasher.finalize();
    [digest[0], digest[1]]
}

/// Decodes an SS58 string into its 32-byte public key. Returns `None` on bad
/// base58, an unsupported prefix, wrong length or a checksum mismatch.
pub fn decode_ss58(address: &str) -> Option<[u8; PUBLIC_KEY_LEN]> {
    let data = bs58::decode(address.trim()).into_vec().ok()?;
    let prefix_len = match data.first()? {
        0..=63 => 1,
        64..=127 => 2,
        _ => return None,
    };
    if data.len() != prefix_len + PUBLIC_KEY_LEN + CHECKSUM_LEN {
        return None;
    }

    let (body, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if ss58_checksum(body) != checksum {
        return None;
    }

    body[prefix_len..].try_into().ok()
}

pub fn encode_ss58(public_key: &[u8; PUBLIC_KEY_LEN], format: u16) -> String {
    let ident = format & 0b0011_1111_1111_1111;
    let mut data = match ident {
        0..=63 => vec![ident as u8],
        _ => {
            let first = ((ident & 0b0000_0000_1111_1100) as u8 >> 2) | 0b0100_0000;
            let second = ((ident >> 8) as u8) | (((ident & 0b0000_0000_0000_0011) as u8) << 6);
            vec![first, second]
        }
    };
    data.extend_from_slice(public_key);
    let checksum = ss58_checksum(&data);
    data.extend_from_slice(&checksum);
    bs58::encode(data).into_string()
}

/// Public key behind a native address: SS58 text or a `0x`-prefixed 32-byte hex key.
pub fn public_key_of(address: &str) -> Option<[u8; PUBLIC_KEY_LEN]> {
    let trimmed = address.trim();
    if let Some(digits) = trimmed.strip_prefix("0x") {
        let bytes = hex::decode(digits).ok()?;
        return bytes.try_into().ok();
    }
    decode_ss58(trimmed)
}

/// First 20 bytes of the account's public key. `None` means bridging is not
/// available for this account.
pub fn derive_bridged_address(account: &Account) -> Option<Address> {
    let public_key = public_key_of(&account.address)?;
    let prefix: [u8; 20] = public_key[..20].try_into().ok()?;
    Some(Address::from(prefix))
}
