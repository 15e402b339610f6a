use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::{self, Address};
use crate::error::Error;

/// Name of the mandatory domain type in a v3/v4 schema.
pub const EIP712_DOMAIN: &str = "EIP712Domain";

const REQUIRED_KEYS: [&str; 4] = ["types", "primaryType", "domain", "message"];

/// Deepest array nesting accepted in a field type, e.g. `uint256[][]`.
pub const MAX_ARRAY_DIMENSIONS: usize = 8;

/// 2^53 - 1
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// One `{name, type, value}` entry of `eth_signTypedData` v1 data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V1TypedData {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    pub value: Value,
}

/// EIP-712 typed message as received for v3/v4 signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedMessage {
    pub types: HashMap<String, Vec<TypedDataField>>,

    #[serde(rename = "primaryType")]
    pub primary_type: String,

    pub domain: TypedDataDomain,

    pub message: Map<String, Value>,
}

impl TypedMessage {
    /// Field descriptors of the primary type, in declared order.
    pub fn primary_fields(&self) -> &[TypedDataField] {
        self.types
            .get(&self.primary_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,
}

/// Domain separator values exactly as the dapp sent them.
///
/// Any JSON object is accepted. The well-known keys are read through
/// accessors that return `None` when a value has an unexpected shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypedDataDomain(Map<String, Value>);

impl TypedDataDomain {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Raw `chainId`, if the key is present.
    pub fn chain_id(&self) -> Option<&Value> {
        self.0.get("chainId")
    }

    /// `chainId` as a number. Accepts a JSON integer (including `1.0`) or a
    /// decimal or `0x` hex string.
    pub fn chain_id_u64(&self) -> Option<u64> {
        match self.chain_id()? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && (0.0..=MAX_SAFE_INTEGER).contains(f))
                    .map(|f| f as u64)
            }),
            Value::String(s) => match s.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            },
            _ => None,
        }
    }

    pub fn verifying_contract_address(&self) -> Option<Address> {
        self.0
            .get("verifyingContract")
            .and_then(Value::as_str)
            .and_then(|c| address::validate(c).ok())
    }
}

impl From<Map<String, Value>> for TypedDataDomain {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Validate v1 typed data: a non-empty list whose entries carry a known
/// Solidity type.
pub fn validate_v1(data: &[V1TypedData]) -> Result<(), Error> {
    if data.is_empty() {
        return Err(Error::schema("data", "typed data must contain at least one entry"));
    }
    for entry in data {
        if entry.name.is_empty() {
            return Err(Error::schema("name", "entry name must not be empty"));
        }
        check_field_type(&entry.field_type, &HashMap::new(), true)
            .map_err(|reason| Error::schema("type", reason))?;
    }
    Ok(())
}

/// Validate a v3/v4 payload against the typed-message schema and parse it.
///
/// All of `types`, `primaryType`, `domain` and `message` are required.
/// `types` maps each type name to `{name, type}` descriptors and must declare
/// `EIP712Domain`; `primaryType` must name a declared type. Array field types
/// are only accepted when `allow_arrays` is set (v4).
pub fn parse_typed_message(payload: &Value, allow_arrays: bool) -> Result<TypedMessage, Error> {
    let object = payload
        .as_object()
        .ok_or_else(|| Error::schema("data", "typed data must be a JSON object"))?;

    for key in REQUIRED_KEYS {
        if !object.contains_key(key) {
            return Err(Error::schema(key, "required key is missing"));
        }
    }

    let types = object["types"]
        .as_object()
        .ok_or_else(|| Error::schema("types", "must be an object"))?;
    let mut declared: HashMap<String, Vec<TypedDataField>> = HashMap::new();
    for (type_name, fields) in types {
        let fields: Vec<TypedDataField> = serde_json::from_value(fields.clone()).map_err(|_| {
            Error::schema(
                format!("types.{type_name}"),
                "must be a list of {name, type} descriptors",
            )
        })?;
        declared.insert(type_name.clone(), fields);
    }
    if !declared.contains_key(EIP712_DOMAIN) {
        return Err(Error::schema("types", "EIP712Domain is not declared"));
    }
    for (type_name, fields) in &declared {
        for field in fields {
            check_field_type(&field.field_type, &declared, allow_arrays)
                .map_err(|reason| Error::schema(format!("types.{type_name}.{}", field.name), reason))?;
        }
    }

    let primary_type = object["primaryType"]
        .as_str()
        .ok_or_else(|| Error::schema("primaryType", "must be a string"))?;
    if !declared.contains_key(primary_type) {
        return Err(Error::schema(
            "primaryType",
            format!("'{primary_type}' is not a declared type"),
        ));
    }

    let domain = object["domain"]
        .as_object()
        .cloned()
        .map(TypedDataDomain::from)
        .ok_or_else(|| Error::schema("domain", "must be an object"))?;

    let message = object["message"]
        .as_object()
        .cloned()
        .ok_or_else(|| Error::schema("message", "must be an object"))?;

    Ok(TypedMessage {
        types: declared,
        primary_type: primary_type.to_string(),
        domain,
        message,
    })
}

/// Check a single EIP-712 field type: a primitive, a declared struct, or
/// (with `allow_arrays`) an array of either, nested at most
/// [`MAX_ARRAY_DIMENSIONS`] deep.
fn check_field_type(
    ty: &str,
    declared: &HashMap<String, Vec<TypedDataField>>,
    allow_arrays: bool,
) -> Result<(), String> {
    let mut base = ty.trim();
    let mut dimensions = 0;

    // Strip array suffixes: `type[]` or `type[N]`
    while let Some(inner) = base.strip_suffix(']') {
        let Some(bracket_pos) = inner.rfind('[') else {
            return Err(format!("unbalanced array brackets in type '{base}'"));
        };
        if !allow_arrays {
            return Err(format!("array type '{base}' requires eth_signTypedData_v4"));
        }
        dimensions += 1;
        if dimensions > MAX_ARRAY_DIMENSIONS {
            return Err(format!(
                "array types may nest at most {MAX_ARRAY_DIMENSIONS} dimensions"
            ));
        }
        let size_str = &inner[bracket_pos + 1..];
        if !size_str.is_empty() && size_str.parse::<usize>().is_err() {
            return Err(format!("invalid array size: {size_str}"));
        }
        base = &inner[..bracket_pos];
    }

    match base {
        "address" | "bool" | "string" | "bytes" | "uint" | "int" => Ok(()),
        _ if declared.contains_key(base) => Ok(()),
        _ if base.starts_with("uint") => check_width(base, &base[4..]),
        _ if base.starts_with("int") => check_width(base, &base[3..]),
        _ if base.starts_with("bytes") => match base[5..].parse::<usize>() {
            Ok(size) if (1..=32).contains(&size) => Ok(()),
            _ => Err(format!("invalid bytes width: {base}")),
        },
        _ => Err(format!("unknown type: {base}")),
    }
}

fn check_width(ty: &str, bits: &str) -> Result<(), String> {
    match bits.parse::<usize>() {
        Ok(bits) if bits % 8 == 0 && (8..=256).contains(&bits) => Ok(()),
        _ => Err(format!("invalid integer width: {ty}")),
    }
}
