use crate::address::encode_ss58;
use dg_api_types::{ClientError, ClientResult};
use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Local ed25519 key used by development wallets.
pub struct Ed25519Keypair {
    signing_key: SigningKey,
}

impl Ed25519Keypair {
    pub fn new_random() -> Self {
        let mut rng = OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn from_seed_hex(seed: &str) -> ClientResult<Self> {
        let digits = seed.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits)
            .map_err(|err| ClientError::Encoding(format!("seed is not hex: {err}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ClientError::Encoding("seed must be 32 bytes".to_owned()))?;
        Ok(Self::from_seed(seed))
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn ss58_address(&self, format: u16) -> String {
        encode_ss58(&self.public_key_bytes(), format)
    }

    /// Signs `payload` wrapped in `<Bytes>..</Bytes>`, the framing wallet
    /// extensions apply to raw-byte signing requests.
    pub fn sign_raw(&self, payload: &[u8]) -> ClientResult<Vec<u8>> {
        if payload.is_empty() {
            return Err(ClientError::Encoding("payload cannot be empty".to_owned()));
        }
        let signature: Signature = self.signing_key.sign(&wrap_bytes(payload));
        Ok(signature.to_bytes().to_vec())
    }

    pub fn verify_raw(public_key: &[u8; 32], payload: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(&wrap_bytes(payload), &signature).is_ok()
    }
}

fn wrap_bytes(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + 15);
    framed.extend_from_slice(b"<Bytes>");
    framed.extend_from_slice(payload);
    framed.extend_from_slice(b"</Bytes>");
    framed
}
