use crate::amount::decimal;
use crate::{ContentId, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Client-side listing record merged from ledger snapshots and the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub content_id: ContentId,
    pub name: String,
    pub description: String,
    pub image: String,
    pub year: String,
    pub creator: String,
    pub tradition: String,
    pub license: String,
    #[serde(with = "decimal")]
    pub max_supply: U256,
    #[serde(with = "decimal")]
    pub current_supply: U256,
    #[serde(with = "decimal")]
    pub total_minted: U256,
    /// Price in whole units, for display.
    pub price: String,
    #[serde(with = "decimal")]
    pub price_raw: U256,
    pub free: bool,
    pub legacy: bool,
    pub external_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestAttribute {
    pub trait_type: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Listing manifest published alongside a content package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub external_url: String,
    #[serde(default)]
    pub attributes: Vec<ManifestAttribute>,
}

impl ManifestDocument {
    /// Looks up an attribute by trait name, ignoring case. Numbers are
    /// rendered as text.
    pub fn attribute(&self, trait_type: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| attr.trait_type.eq_ignore_ascii_case(trait_type))
            .and_then(|attr| match &attr.value {
                serde_json::Value::String(text) => Some(text.clone()),
                serde_json::Value::Number(number) => Some(number.to_string()),
                serde_json::Value::Bool(flag) => Some(flag.to_string()),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageImage {
    pub filename: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageFiles {
    #[serde(default)]
    pub image_list: Vec<PackageImage>,
}

/// `manifest.json` inside a decrypted package archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecryptedManifest {
    pub files: PackageFiles,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Unpacked package: the manifest plus images keyed by filename as data URIs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageAssets {
    pub manifest: DecryptedManifest,
    pub images: BTreeMap<String, String>,
}
