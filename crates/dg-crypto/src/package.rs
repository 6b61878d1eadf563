use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use dg_api_types::{ClientError, ClientResult, DecryptedManifest, PackageAssets};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use zeroize::Zeroizing;
use zip::{ZipArchive, result::ZipError};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const PACKAGE_HEADER_LEN: usize = NONCE_LEN + TAG_LEN;
pub const KEY_LEN: usize = 32;

const MANIFEST_ENTRY: &str = "manifest.json";

fn cipher_from_hex(hex_key: &str) -> ClientResult<Aes256Gcm> {
    let digits = hex_key.trim().trim_start_matches("0x");
    let key = Zeroizing::new(
        hex::decode(digits)
            .map_err(|err| ClientError::Decryption(format!("key is not hex: {err}")))?,
    );
    if key.len() != KEY_LEN {
        return Err(ClientError::Decryption(format!(
            "key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(&key)
        .map_err(|_| ClientError::Decryption("invalid key length".to_owned()))
}

/// Decrypts a package laid out as `nonce(12) || tag(16) || ciphertext`.
///
/// Either the exact plaintext comes back or a `Decryption` error; a tag
/// mismatch never yields partial output.
pub fn decrypt_package(buffer: &[u8], hex_key: &str) -> ClientResult<Vec<u8>> {
    if buffer.len() < PACKAGE_HEADER_LEN {
        return Err(ClientError::Decryption(format!(
            "package is {} bytes, need at least {PACKAGE_HEADER_LEN}",
            buffer.len()
        )));
    }
    let cipher = cipher_from_hex(hex_key)?;

    let (nonce, rest) = buffer.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    // The AEAD primitive expects the tag after the ciphertext.
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce), sealed.as_ref())
        .map_err(|_| ClientError::Decryption("authentication failed".to_owned()))
}

/// Inverse of [`decrypt_package`].
pub fn encrypt_package(
    plaintext: &[u8],
    hex_key: &str,
    nonce: [u8; NONCE_LEN],
) -> ClientResult<Vec<u8>> {
    let cipher = cipher_from_hex(hex_key)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| ClientError::Decryption("encryption failed".to_owned()))?;

    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    let mut out = Vec::with_capacity(PACKAGE_HEADER_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(tag);
    out.extend_from_slice(ciphertext);
    Ok(out)
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ClientResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(ClientError::MalformedPackage(format!("entry {name}: {err}"))),
    };
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .map_err(|err| ClientError::MalformedPackage(format!("entry {name}: {err}")))?;
    Ok(Some(contents))
}

fn mime_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Reads `manifest.json` from a decrypted archive and extracts every image it
/// lists as a data URI keyed by filename.
pub fn unpack_archive(plaintext: &[u8]) -> ClientResult<PackageAssets> {
    let mut archive = ZipArchive::new(Cursor::new(plaintext))
        .map_err(|err| ClientError::MalformedPackage(format!("not an archive: {err}")))?;

    let raw_manifest = read_entry(&mut archive, MANIFEST_ENTRY)?
        .ok_or_else(|| ClientError::MalformedPackage(format!("missing {MANIFEST_ENTRY}")))?;
    let manifest: DecryptedManifest = serde_json::from_slice(&raw_manifest)
        .map_err(|err| ClientError::MalformedPackage(format!("{MANIFEST_ENTRY}: {err}")))?;

    let mut images = BTreeMap::new();
    for image in &manifest.files.image_list {
        let path = image.path.trim_start_matches("./");
        let bytes = read_entry(&mut archive, path)?.ok_or_else(|| {
            let message = format!("image {} missing at {}", image.filename, image.path);
            ClientError::MalformedPackage(message)
        })?;
        let mime = mime_for(&image.filename);
        let data_uri = format!("data:{};base64,{}", mime, STANDARD.encode(&bytes));
        images.insert(image.filename.clone(), data_uri);
    }

    Ok(PackageAssets { manifest, images })
}

pub fn open_package_bytes(buffer: &[u8], hex_key: &str) -> ClientResult<PackageAssets> {
    let plaintext = Zeroizing::new(decrypt_package(buffer, hex_key)?);
    unpack_archive(&plaintext)
}
