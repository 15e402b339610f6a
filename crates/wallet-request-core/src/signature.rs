use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::{self, Address};
use crate::eip712::{self, TypedMessage, V1TypedData};
use crate::error::Error;

/// The five JSON-RPC signing methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureMethod {
    #[serde(rename = "personal_sign")]
    PersonalSign,
    #[serde(rename = "eth_signTypedData")]
    SignTypedData,
    #[serde(rename = "eth_signTypedData_v1")]
    SignTypedDataV1,
    #[serde(rename = "eth_signTypedData_v3")]
    SignTypedDataV3,
    #[serde(rename = "eth_signTypedData_v4")]
    SignTypedDataV4,
}

impl SignatureMethod {
    pub const ALL: [SignatureMethod; 5] = [
        SignatureMethod::PersonalSign,
        SignatureMethod::SignTypedData,
        SignatureMethod::SignTypedDataV1,
        SignatureMethod::SignTypedDataV3,
        SignatureMethod::SignTypedDataV4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::PersonalSign => "personal_sign",
            SignatureMethod::SignTypedData => "eth_signTypedData",
            SignatureMethod::SignTypedDataV1 => "eth_signTypedData_v1",
            SignatureMethod::SignTypedDataV3 => "eth_signTypedData_v3",
            SignatureMethod::SignTypedDataV4 => "eth_signTypedData_v4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Version tag handed to the signer.
    pub fn version(&self) -> SignatureVersion {
        match self {
            SignatureMethod::PersonalSign
            | SignatureMethod::SignTypedData
            | SignatureMethod::SignTypedDataV1 => SignatureVersion::V1,
            SignatureMethod::SignTypedDataV3 => SignatureVersion::V3,
            SignatureMethod::SignTypedDataV4 => SignatureVersion::V4,
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureVersion {
    V1,
    V3,
    V4,
}

/// v3/v4 `data` arrives either JSON-encoded in a string or inline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypedDataInput {
    Encoded(String),
    Inline(Value),
}

impl TypedDataInput {
    fn into_value(self) -> Result<Value, Error> {
        match self {
            TypedDataInput::Encoded(json) => serde_json::from_str(&json)
                .map_err(|e| Error::schema("data", format!("invalid JSON: {e}"))),
            TypedDataInput::Inline(value) => Ok(value),
        }
    }
}

/// Positional parameters exactly as the provider delivers them, one variant
/// per method. `personal_sign` and the v1 methods send `[data, account]`;
/// v3 and v4 send `[account, data]`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSignatureParams {
    PersonalSign { data: String, account: String },
    SignTypedData { data: Vec<V1TypedData>, account: String },
    SignTypedDataV1 { data: Vec<V1TypedData>, account: String },
    SignTypedDataV3 { account: String, data: TypedDataInput },
    SignTypedDataV4 { account: String, data: TypedDataInput },
}

impl RawSignatureParams {
    /// Read the positional `params` array of a signing call. Extra trailing
    /// elements are ignored.
    pub fn from_rpc(method: SignatureMethod, params: &Value) -> Result<Self, Error> {
        let params = params
            .as_array()
            .ok_or_else(|| Error::InvalidParams(format!("{method} expects a params array")))?;
        if params.len() < 2 {
            return Err(Error::InvalidParams(format!(
                "{method} expects 2 params, got {}",
                params.len()
            )));
        }

        Ok(match method {
            SignatureMethod::PersonalSign => RawSignatureParams::PersonalSign {
                data: positional(method, params, 0)?,
                account: positional(method, params, 1)?,
            },
            SignatureMethod::SignTypedData => RawSignatureParams::SignTypedData {
                data: positional(method, params, 0)?,
                account: positional(method, params, 1)?,
            },
            SignatureMethod::SignTypedDataV1 => RawSignatureParams::SignTypedDataV1 {
                data: positional(method, params, 0)?,
                account: positional(method, params, 1)?,
            },
            SignatureMethod::SignTypedDataV3 => RawSignatureParams::SignTypedDataV3 {
                account: positional(method, params, 0)?,
                data: positional(method, params, 1)?,
            },
            SignatureMethod::SignTypedDataV4 => RawSignatureParams::SignTypedDataV4 {
                account: positional(method, params, 0)?,
                data: positional(method, params, 1)?,
            },
        })
    }

    pub fn method(&self) -> SignatureMethod {
        match self {
            RawSignatureParams::PersonalSign { .. } => SignatureMethod::PersonalSign,
            RawSignatureParams::SignTypedData { .. } => SignatureMethod::SignTypedData,
            RawSignatureParams::SignTypedDataV1 { .. } => SignatureMethod::SignTypedDataV1,
            RawSignatureParams::SignTypedDataV3 { .. } => SignatureMethod::SignTypedDataV3,
            RawSignatureParams::SignTypedDataV4 { .. } => SignatureMethod::SignTypedDataV4,
        }
    }

    /// Produce the canonical `{address, data}` request. One-shot: either the
    /// whole request is valid or the first violation is returned.
    pub fn normalize(self) -> Result<SignatureRequest, Error> {
        let method = self.method();
        let (account, data) = match self {
            RawSignatureParams::PersonalSign { data, account } => {
                (account, SignaturePayload::Message(data))
            }
            RawSignatureParams::SignTypedData { data, account }
            | RawSignatureParams::SignTypedDataV1 { data, account } => {
                eip712::validate_v1(&data)?;
                (account, SignaturePayload::TypedDataV1(data))
            }
            RawSignatureParams::SignTypedDataV3 { account, data } => {
                let typed = eip712::parse_typed_message(&data.into_value()?, false)?;
                (account, SignaturePayload::Typed(typed))
            }
            RawSignatureParams::SignTypedDataV4 { account, data } => {
                let typed = eip712::parse_typed_message(&data.into_value()?, true)?;
                (account, SignaturePayload::Typed(typed))
            }
        };

        Ok(SignatureRequest {
            method,
            params: SignatureParams {
                address: address::validate(&account)?,
                data,
            },
        })
    }
}

fn positional<T: DeserializeOwned>(
    method: SignatureMethod,
    params: &[Value],
    index: usize,
) -> Result<T, Error> {
    serde_json::from_value(params[index].clone())
        .map_err(|e| Error::InvalidParams(format!("{method} param {index}: {e}")))
}

/// Normalized data to be signed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignaturePayload {
    /// `personal_sign` message: hex-encoded bytes or plain text.
    Message(String),
    TypedDataV1(Vec<V1TypedData>),
    Typed(TypedMessage),
}

impl SignaturePayload {
    /// Bytes of a `personal_sign` message: hex-decoded when `0x`-prefixed
    /// and well-formed, UTF-8 otherwise.
    pub fn message_bytes(&self) -> Option<Vec<u8>> {
        let SignaturePayload::Message(message) = self else {
            return None;
        };
        let decoded = message
            .strip_prefix("0x")
            .and_then(|hex_str| hex::decode(hex_str).ok());
        Some(decoded.unwrap_or_else(|| message.as_bytes().to_vec()))
    }
}

/// Canonical signing request. Immutable once produced.
///
/// Serializes as `{method, params: {address, data}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureRequest {
    method: SignatureMethod,
    params: SignatureParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct SignatureParams {
    address: Address,
    data: SignaturePayload,
}

impl SignatureRequest {
    pub fn method(&self) -> SignatureMethod {
        self.method
    }

    pub fn version(&self) -> SignatureVersion {
        self.method.version()
    }

    pub fn address(&self) -> &Address {
        &self.params.address
    }

    pub fn data(&self) -> &SignaturePayload {
        &self.params.data
    }
}

/// Normalize a signing call in one step.
pub fn normalize(method: SignatureMethod, params: &Value) -> Result<SignatureRequest, Error> {
    RawSignatureParams::from_rpc(method, params)?.normalize()
}
