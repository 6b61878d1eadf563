use crate::abi::Function;
use alloy_dyn_abi::{DynSolType, DynSolValue};
use dg_api_types::{ClientError, ClientResult, U256};

/// `Error(string)`, the payload of a plain `revert("...")`.
const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

fn uint_fits(value: &U256, bits: usize) -> bool {
    value.bit_len() <= bits
}

/// Aligns a value with its declared type. Integer widths come from the
/// interface, so a `uint256` argument is narrowed to the declared slot.
fn coerce(kind: &DynSolType, value: &DynSolValue) -> ClientResult<DynSolValue> {
    let coerced = match (kind, value) {
        (DynSolType::Uint(bits), DynSolValue::Uint(number, _)) => {
            if !uint_fits(number, *bits) {
                return Err(ClientError::Encoding(format!("{number} overflows uint{bits}")));
            }
            DynSolValue::Uint(*number, *bits)
        }
        _ => value.clone(),
    };
    if !kind.matches(&coerced) {
        return Err(ClientError::Encoding(format!("expected {kind}, got {value:?}")));
    }
    Ok(coerced)
}

pub fn encode_params(kinds: &[DynSolType], values: &[DynSolValue]) -> ClientResult<Vec<u8>> {
    if kinds.len() != values.len() {
        return Err(ClientError::Encoding(format!(
            "expected {} arguments, got {}",
            kinds.len(),
            values.len()
        )));
    }
    let values = kinds
        .iter()
        .zip(values)
        .map(|(kind, value)| coerce(kind, value))
        .collect::<ClientResult<Vec<_>>>()?;
    Ok(DynSolValue::Tuple(values).abi_encode_params())
}

pub fn encode_call(function: &Function, args: &[DynSolValue]) -> ClientResult<Vec<u8>> {
    let params = encode_params(&function.inputs, args)
        .map_err(|err| ClientError::Encoding(format!("{}: {err}", function.name)))?;
    let mut data = Vec::with_capacity(4 + params.len());
    data.extend_from_slice(function.selector.as_slice());
    data.extend(params);
    Ok(data)
}

/// Decodes return data strictly: the bytes must be exactly what encoding
/// the decoded values would produce. Dirty padding, out-of-range booleans
/// and invalid UTF-8 are rejected instead of being silently normalised.
pub fn decode_params(kinds: &[DynSolType], data: &[u8]) -> ClientResult<Vec<DynSolValue>> {
    if kinds.is_empty() {
        return Ok(Vec::new());
    }
    if data.is_empty() {
        return Err(ClientError::Encoding(
            "empty return data; the address may not be a contract".to_owned(),
        ));
    }

    let decoded = DynSolType::Tuple(kinds.to_vec())
        .abi_decode_sequence(data)
        .map_err(|err| ClientError::Encoding(format!("return data: {err}")))?;
    if decoded.abi_encode_params() != data {
        return Err(ClientError::Encoding("return data is not canonically encoded".to_owned()));
    }

    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };
    for (kind, value) in kinds.iter().zip(&values) {
        if let (DynSolType::Uint(bits), DynSolValue::Uint(number, _)) = (kind, value) {
            if !uint_fits(number, *bits) {
                return Err(ClientError::Encoding(format!("value overflows uint{bits}")));
            }
        }
    }
    Ok(values)
}

/// Extracts the message from an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&REVERT_SELECTOR[..])?;
    match decode_params(&[DynSolType::String], body).ok()?.pop()? {
        DynSolValue::String(reason) => Some(reason),
        _ => None,
    }
}
