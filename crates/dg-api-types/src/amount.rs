//! Token amounts as they appear outside the ledger: decimal strings on the
//! wire and trimmed fixed-point text for display.

use alloy_primitives::U256;
use alloy_primitives::utils::format_units;
use serde::{Deserialize, Deserializer, Serializer};

/// Renders a fixed-point amount, e.g. `1500000000000000000` with 18
/// decimals becomes `1.5`.
pub fn format_amount(value: U256, decimals: u8) -> String {
    let Ok(rendered) = format_units(value, decimals) else {
        return value.to_string();
    };
    if !rendered.contains('.') {
        return rendered;
    }
    rendered.trim_end_matches('0').trim_end_matches('.').to_owned()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(u64),
}

impl RawAmount {
    fn into_u256<E: serde::de::Error>(self) -> Result<U256, E> {
        match self {
            Self::Number(value) => Ok(U256::from(value)),
            Self::Text(text) => text
                .trim()
                .parse::<U256>()
                .map_err(|err| E::custom(format!("invalid uint256 '{text}': {err}"))),
        }
    }
}

/// Serde adapter writing [`U256`] as a decimal string. JSON numbers cannot
/// hold 256 bits. Reads accept decimal or `0x` text and plain numbers.
pub mod decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        RawAmount::deserialize(deserializer)?.into_u256()
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<U256>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_str(&value.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<U256>, D::Error> {
            Option::<RawAmount>::deserialize(deserializer)?
                .map(RawAmount::into_u256)
                .transpose()
        }
    }
}
