use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::object_param;
use crate::error::Error;

/// Largest chain id a JavaScript number can carry exactly (`2^53 - 1`).
pub const MAX_SAFE_CHAIN_ID: u64 = 9_007_199_254_740_991;

/// EIP-3085 `wallet_addEthereumChain` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEthereumChainParameter {
    #[serde(rename = "chainId")]
    pub chain_id: String,

    #[serde(rename = "blockExplorerUrls")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_explorer_urls: Option<Vec<String>>,

    #[serde(rename = "chainName")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_name: Option<String>,

    #[serde(rename = "iconUrls")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_urls: Option<Vec<String>>,

    #[serde(rename = "nativeCurrency")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_currency: Option<NativeCurrency>,

    #[serde(rename = "rpcUrls")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl AddEthereumChainParameter {
    pub fn from_rpc(params: &Value) -> Result<Self, Error> {
        object_param("wallet_addEthereumChain", params)
    }

    /// Check the chain id and return it as a number. Everything else is
    /// optional and passed through to the chain collaborator.
    pub fn validate(&self) -> Result<u64, Error> {
        parse_chain_id(&self.chain_id)
    }
}

/// EIP-3326 `wallet_switchEthereumChain` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchEthereumChainParameters {
    #[serde(rename = "chainId")]
    pub chain_id: String,
}

impl SwitchEthereumChainParameters {
    pub fn from_rpc(params: &Value) -> Result<Self, Error> {
        object_param("wallet_switchEthereumChain", params)
    }

    pub fn normalize(&self) -> Result<NormalizedSwitchChainParameters, Error> {
        Ok(NormalizedSwitchChainParameters {
            chain_id: parse_chain_id(&self.chain_id)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedSwitchChainParameters {
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

/// Parse a `0x`-prefixed hex chain id with no leading zeros, bounded by
/// [`MAX_SAFE_CHAIN_ID`].
pub fn parse_chain_id(raw: &str) -> Result<u64, Error> {
    let invalid = |reason: &str| Error::InvalidParams(format!("chainId {raw:?} {reason}"));

    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| invalid("must be a 0x-prefixed hex string"))?;
    if digits.is_empty() {
        return Err(invalid("has no digits"));
    }
    if digits.starts_with('0') {
        return Err(invalid("must not have leading zeros"));
    }

    let value = BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| invalid("is not valid hex"))?;
    if value > BigUint::from(MAX_SAFE_CHAIN_ID) {
        return Err(invalid("exceeds the maximum safe chain id"));
    }
    u64::try_from(&value).map_err(|_| invalid("exceeds the maximum safe chain id"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id("0x1").unwrap(), 1);
        assert_eq!(parse_chain_id("0x89").unwrap(), 137);
        assert_eq!(parse_chain_id("0xA4B1").unwrap(), 42161);
        assert_eq!(parse_chain_id("0x1fffffffffffff").unwrap(), MAX_SAFE_CHAIN_ID);
    }

    #[test]
    fn test_parse_chain_id_rejects() {
        for raw in ["1", "0x", "0x0", "0x01", "0xzz", "0x20000000000000", "0xffffffffffffffffffff"] {
            assert!(
                matches!(parse_chain_id(raw), Err(Error::InvalidParams(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_switch_params_object_or_array() {
        let object = SwitchEthereumChainParameters::from_rpc(&json!({ "chainId": "0x5" })).unwrap();
        let array = SwitchEthereumChainParameters::from_rpc(&json!([{ "chainId": "0x5" }])).unwrap();
        assert_eq!(object, array);
        assert_eq!(object.normalize().unwrap(), NormalizedSwitchChainParameters { chain_id: 5 });

        assert!(SwitchEthereumChainParameters::from_rpc(&json!([])).is_err());
        assert!(SwitchEthereumChainParameters::from_rpc(&json!([{ "id": "0x5" }])).is_err());
    }

    #[test]
    fn test_add_chain_only_requires_chain_id() {
        let params = AddEthereumChainParameter::from_rpc(&json!([{
            "chainId": "0xa",
            "chainName": "Optimism",
            "nativeCurrency": { "name": "Ether", "symbol": "ETH", "decimals": 18 },
            "rpcUrls": ["https://mainnet.optimism.io"]
        }]))
        .unwrap();
        assert_eq!(params.validate().unwrap(), 10);
        assert_eq!(params.native_currency.unwrap().symbol, "ETH");

        let bare = AddEthereumChainParameter::from_rpc(&json!({ "chainId": "0x2a" })).unwrap();
        assert_eq!(bare.validate().unwrap(), 42);
        assert!(bare.rpc_urls.is_none());
    }

    #[test]
    fn test_normalized_wire_shape() {
        let json = serde_json::to_value(NormalizedSwitchChainParameters { chain_id: 137 }).unwrap();
        assert_eq!(json, json!({ "chainId": 137 }));
    }
}
