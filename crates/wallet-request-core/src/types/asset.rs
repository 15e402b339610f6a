use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::object_param;
use crate::address::{self, Address};
use crate::error::Error;
use crate::token::{Token, TokenRegistry};

/// Only ERC-20 assets can be watched.
pub const ERC20: &str = "ERC20";

pub const MAX_SYMBOL_LEN: usize = 11;

pub const MAX_DECIMALS: u32 = 36;

/// EIP-747 `wallet_watchAsset` parameters as sent by the dapp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchAssetParameters {
    #[serde(rename = "type")]
    pub asset_type: String,

    pub options: WatchAssetOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchAssetOptions {
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Validated asset shown to the user for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAssetReqParams {
    pub address: Address,

    pub symbol: String,

    pub decimals: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAssetReq {
    pub params: WatchAssetReqParams,

    /// Account connected to the dapp.
    #[serde(rename = "accountAddress")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_address: Option<Address>,

    /// The token is already in the user's list.
    #[serde(rename = "isUpdate")]
    pub is_update: bool,

    #[serde(rename = "savedToken")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_token: Option<WatchAssetReqParams>,
}

/// Values the user may edit before approving a watch-asset request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAssetConfirmParams {
    pub symbol: String,

    pub decimals: u8,

    #[serde(default)]
    pub image: String,
}

impl WatchAssetParameters {
    pub fn from_rpc(params: &Value) -> Result<Self, Error> {
        object_param("wallet_watchAsset", params)
    }

    /// Validate against the token registry of `chain_id`. Missing symbol or
    /// decimals are taken from a known token with the same address.
    pub fn validate(
        self,
        chain_id: u64,
        tokens: &TokenRegistry,
        account: Option<Address>,
    ) -> Result<WatchAssetReq, Error> {
        if self.asset_type != ERC20 {
            return Err(Error::InvalidParams(format!(
                "asset type {:?} is not supported",
                self.asset_type
            )));
        }

        let options = self.options;
        let address = address::validate(&options.address)?;
        if address.is_zero() {
            return Err(Error::InvalidParams(
                "the native currency cannot be watched".to_string(),
            ));
        }

        let known = tokens.get_token(chain_id, &options.address)?;

        let symbol = options
            .symbol
            .or_else(|| known.as_ref().map(|t| t.symbol.clone()))
            .ok_or_else(|| Error::InvalidParams("symbol is required".to_string()))?;
        check_symbol(&symbol)?;

        let decimals = options
            .decimals
            .or_else(|| known.as_ref().map(|t| u32::from(t.decimals)))
            .ok_or_else(|| Error::InvalidParams("decimals are required".to_string()))?;
        let decimals = check_decimals(decimals)?;

        let image = options
            .image
            .or_else(|| known.as_ref().and_then(|t| t.logo.clone()));

        let saved_token = tokens
            .get_user_tokens(chain_id)
            .remove(&address)
            .map(|t| WatchAssetReqParams {
                address: t.address,
                symbol: t.symbol,
                decimals: t.decimals,
                image: t.logo,
            });

        Ok(WatchAssetReq {
            params: WatchAssetReqParams {
                address,
                symbol,
                decimals,
                image,
            },
            account_address: account,
            is_update: saved_token.is_some(),
            saved_token,
        })
    }
}

impl WatchAssetReq {
    /// Build the token to store, applying the user's edits when given.
    /// `name` is the known token name, if any; the symbol stands in otherwise.
    pub fn to_token(
        &self,
        name: Option<&str>,
        confirm: Option<&WatchAssetConfirmParams>,
    ) -> Result<Token, Error> {
        let (symbol, decimals, image) = match confirm {
            Some(edit) => {
                check_symbol(&edit.symbol)?;
                check_decimals(u32::from(edit.decimals))?;
                let image = (!edit.image.is_empty()).then(|| edit.image.clone());
                (edit.symbol.clone(), edit.decimals, image)
            }
            None => (
                self.params.symbol.clone(),
                self.params.decimals,
                self.params.image.clone(),
            ),
        };

        let mut token = Token::new(self.params.address, name.unwrap_or(&symbol), &symbol, decimals);
        token.logo = image;
        token.token_type = Some(ERC20.to_string());
        Ok(token)
    }
}

fn check_symbol(symbol: &str) -> Result<(), Error> {
    let len = symbol.chars().count();
    if len == 0 || len > MAX_SYMBOL_LEN {
        return Err(Error::InvalidParams(format!(
            "symbol {symbol:?} must be 1 to {MAX_SYMBOL_LEN} characters"
        )));
    }
    Ok(())
}

fn check_decimals(decimals: u32) -> Result<u8, Error> {
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidParams(format!(
            "decimals {decimals} exceed {MAX_DECIMALS}"
        )));
    }
    u8::try_from(decimals).map_err(|_| Error::InvalidParams(format!("decimals {decimals}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ProviderError;
    use crate::token::TokenCatalog;

    const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
    const UNKNOWN: &str = "0x2231234435344D865C8966f4945844843EDAff91";

    fn registry() -> TokenRegistry {
        TokenRegistry::new(TokenCatalog::bundled().unwrap())
    }

    fn watch(options: Value) -> WatchAssetParameters {
        WatchAssetParameters::from_rpc(&json!({ "type": "ERC20", "options": options })).unwrap()
    }

    #[test]
    fn test_fills_known_token() {
        let req = watch(json!({ "address": DAI }))
            .validate(1, &registry(), None)
            .unwrap();
        assert_eq!(req.params.symbol, "DAI");
        assert_eq!(req.params.decimals, 18);
        assert!(!req.is_update);
        assert!(req.saved_token.is_none());
    }

    #[test]
    fn test_unknown_token_needs_symbol_and_decimals() {
        let err = watch(json!({ "address": UNKNOWN }))
            .validate(1, &registry(), None)
            .unwrap_err();
        assert_eq!(ProviderError::from(&err), ProviderError::InvalidParams);

        let account: Address = DAI.parse().unwrap();
        let req = watch(json!({ "address": UNKNOWN, "symbol": "FOO", "decimals": 6 }))
            .validate(1, &registry(), Some(account))
            .unwrap();
        assert_eq!(req.params.decimals, 6);
        assert_eq!(req.account_address, Some(account));
    }

    #[test]
    fn test_rejects_bad_input() {
        let tokens = registry();
        let nft = WatchAssetParameters::from_rpc(&json!([{
            "type": "ERC721",
            "options": { "address": DAI }
        }]))
        .unwrap();
        assert!(matches!(nft.validate(1, &tokens, None), Err(Error::InvalidParams(_))));

        let native = watch(json!({
            "address": "0x0000000000000000000000000000000000000000",
            "symbol": "ETH",
            "decimals": 18
        }));
        assert!(native.validate(1, &tokens, None).is_err());

        let long_symbol = watch(json!({ "address": UNKNOWN, "symbol": "ABCDEFGHIJKL", "decimals": 6 }));
        assert!(long_symbol.validate(1, &tokens, None).is_err());

        let many_decimals = watch(json!({ "address": UNKNOWN, "symbol": "FOO", "decimals": 37 }));
        assert!(many_decimals.validate(1, &tokens, None).is_err());

        let bad_address = watch(json!({ "address": "dai", "symbol": "FOO", "decimals": 6 }));
        assert!(matches!(
            bad_address.validate(1, &tokens, None),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_existing_user_token_is_update() {
        let mut tokens = registry();
        let address: Address = UNKNOWN.parse().unwrap();
        tokens
            .add_custom_token(1, Token::new(address, "Foo Token", "FOO", 6))
            .unwrap();

        let req = watch(json!({ "address": UNKNOWN, "symbol": "FOO2", "decimals": 8 }))
            .validate(1, &tokens, None)
            .unwrap();
        assert!(req.is_update);
        let saved = req.saved_token.as_ref().unwrap();
        assert_eq!(saved.symbol, "FOO");
        assert_eq!(saved.decimals, 6);
    }

    #[test]
    fn test_to_token_applies_edits() {
        let req = watch(json!({ "address": UNKNOWN, "symbol": "FOO", "decimals": 6 }))
            .validate(1, &registry(), None)
            .unwrap();

        let token = req.to_token(None, None).unwrap();
        assert_eq!(token.name, "FOO");
        assert_eq!(token.token_type.as_deref(), Some(ERC20));

        let edit = WatchAssetConfirmParams {
            symbol: "BAR".to_string(),
            decimals: 9,
            image: "https://example.org/bar.png".to_string(),
        };
        let token = req.to_token(Some("Bar Token"), Some(&edit)).unwrap();
        assert_eq!(token.symbol, "BAR");
        assert_eq!(token.decimals, 9);
        assert_eq!(token.name, "Bar Token");
        assert_eq!(token.logo.as_deref(), Some("https://example.org/bar.png"));

        let bad = WatchAssetConfirmParams {
            symbol: String::new(),
            decimals: 9,
            image: String::new(),
        };
        assert!(req.to_token(None, Some(&bad)).is_err());
    }
}
