use alloy_dyn_abi::{DynSolType, Specifier};
use alloy_json_abi::{JsonAbi, Param, StateMutability};
use alloy_primitives::Selector;
use dg_api_types::{ClientError, ClientResult};
use std::collections::BTreeMap;

const CONTENT_ACCESS_ABI: &str = include_str!("../abi/content_access.json");

/// A contract method with its parameter types resolved for the codec.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub selector: Selector,
    pub mutability: StateMutability,
    pub inputs: Vec<DynSolType>,
    pub outputs: Vec<DynSolType>,
    pub output_names: Vec<String>,
    signature: String,
}

impl Function {
    pub fn is_read(&self) -> bool {
        matches!(self.mutability, StateMutability::View | StateMutability::Pure)
    }

    pub fn is_payable(&self) -> bool {
        self.mutability == StateMutability::Payable
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    fn from_json(function: &alloy_json_abi::Function) -> ClientResult<Self> {
        if function.name.trim().is_empty() {
            return Err(ClientError::Encoding("function entry without a name".to_owned()));
        }
        let name = &function.name;
        Ok(Self {
            name: name.clone(),
            selector: function.selector(),
            mutability: function.state_mutability,
            inputs: resolve_params(name, &function.inputs)?,
            outputs: resolve_params(name, &function.outputs)?,
            output_names: function.outputs.iter().map(|param| param.name.clone()).collect(),
            signature: function.signature(),
        })
    }
}

/// Only scalar slots are accepted; the content contract has no tuples or
/// arrays in its surface.
fn supported(kind: &DynSolType) -> bool {
    match kind {
        DynSolType::Uint(bits) | DynSolType::Int(bits) => {
            *bits > 0 && *bits <= 256 && bits % 8 == 0
        }
        DynSolType::FixedBytes(size) => *size > 0 && *size <= 32,
        DynSolType::Address | DynSolType::Bool | DynSolType::String | DynSolType::Bytes => true,
        _ => false,
    }
}

fn resolve_params(owner: &str, params: &[Param]) -> ClientResult<Vec<DynSolType>> {
    params
        .iter()
        .map(|param| {
            let kind: DynSolType = param.resolve().map_err(|err| {
                ClientError::Encoding(format!("{owner}: parameter type '{}': {err}", param.ty))
            })?;
            if !supported(&kind) {
                return Err(ClientError::Encoding(format!(
                    "{owner}: unsupported parameter type '{}'",
                    param.ty
                )));
            }
            Ok(kind)
        })
        .collect()
}

/// Contract methods indexed by name. Built once; malformed entries are
/// rejected here rather than at call time.
#[derive(Debug, Clone, Default)]
pub struct InterfaceDescription {
    functions: BTreeMap<String, Vec<Function>>,
}

impl InterfaceDescription {
    pub fn from_json(json: &str) -> ClientResult<Self> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|err| ClientError::Encoding(format!("interface description: {err}")))?;

        let mut functions: BTreeMap<String, Vec<Function>> = BTreeMap::new();
        for entry in abi.functions() {
            let function = Function::from_json(entry)?;
            let overloads = functions.entry(function.name.clone()).or_default();
            if overloads.iter().any(|existing| existing.selector == function.selector) {
                return Err(ClientError::Encoding(format!(
                    "duplicate function {}",
                    function.signature()
                )));
            }
            overloads.push(function);
        }

        Ok(Self { functions })
    }

    /// The bundled description of the content-access contract.
    pub fn content_access() -> ClientResult<Self> {
        Self::from_json(CONTENT_ACCESS_ABI)
    }

    /// Resolves `name`, using the argument count to pick between overloads.
    pub fn function(&self, name: &str, arg_count: usize) -> ClientResult<&Function> {
        let overloads = self.functions.get(name).ok_or_else(|| {
            ClientError::Encoding(format!("method '{name}' not found in interface"))
        })?;
        overloads
            .iter()
            .find(|function| function.inputs.len() == arg_count)
            .ok_or_else(|| {
                let message = format!("method '{name}' does not take {arg_count} arguments");
                ClientError::Encoding(message)
            })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values().flatten()
    }
}
