use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{self, Address};
use crate::error::{Error, MissingParam};

/// Token list bundled at build time, keyed by chain id then address.
const BUNDLED_TOKEN_LIST: &str = include_str!("../assets/token-list.json");

/// Token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,

    pub name: String,

    pub symbol: String,

    pub decimals: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    #[serde(rename = "type")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(rename = "l1Bridge")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_bridge: Option<L1Bridge>,
}

impl Token {
    pub fn new(address: Address, name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            address,
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            logo: None,
            token_type: None,
            l1_bridge: None,
        }
    }

    fn matches(&self, needle: &str, exact: Option<&Address>) -> bool {
        exact == Some(&self.address)
            || self.symbol.to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
    }
}

/// L1 counterpart of a bridged L2 token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1Bridge {
    #[serde(rename = "tokenAddress")]
    pub token_address: Address,

    #[serde(rename = "bridgeAddress")]
    pub bridge_address: Address,
}

/// Trait for token metadata providers.
pub trait TokenSource {
    fn lookup(&self, chain_id: u64, address: &Address) -> Option<Token>;
}

/// Native currency descriptor for a chain, for display only.
pub fn native_token(chain_id: u64) -> Token {
    let (symbol, name) = match chain_id {
        137 | 80001 => ("MATIC", "Polygon"),
        56 | 97 => ("BNB", "BNB"),
        43114 | 43113 => ("AVAX", "Avalanche"),
        250 => ("FTM", "Fantom"),
        100 => ("xDAI", "xDai"),
        _ => ("ETH", "Ether"),
    };
    Token::new(Address::ZERO, name, symbol, 18)
}

/// Read-only catalog of known tokens per chain.
#[derive(Debug, Clone, Default)]
pub struct TokenCatalog {
    chains: HashMap<u64, BTreeMap<Address, Token>>,
}

impl TokenCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shipped with the crate.
    pub fn bundled() -> Result<Self, Error> {
        Self::from_json(BUNDLED_TOKEN_LIST)
    }

    /// Parse a `{ "<chainId>": { "<address>": Token } }` document.
    ///
    /// Tokens are keyed by their own `address` field; the outer key only
    /// needs to be a well-formed address.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: HashMap<u64, HashMap<Address, Token>> = serde_json::from_str(json)
            .map_err(|e| Error::Store(format!("invalid token list: {e}")))?;

        let chains = raw
            .into_iter()
            .map(|(chain_id, tokens)| {
                let tokens = tokens
                    .into_values()
                    .map(|token| (token.address, token))
                    .collect();
                (chain_id, tokens)
            })
            .collect();
        Ok(Self { chains })
    }

    pub fn insert(&mut self, chain_id: u64, token: Token) {
        self.chains
            .entry(chain_id)
            .or_default()
            .insert(token.address, token);
    }

    pub fn tokens(&self, chain_id: u64) -> Option<&BTreeMap<Address, Token>> {
        self.chains.get(&chain_id)
    }
}

/// Per-chain token registry: the read-only catalog, a user-added overlay and
/// a tombstone set of user-deleted tokens.
///
/// An address is never in both the overlay and the tombstone set for the same
/// chain. The catalog is independent of both.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    catalog: TokenCatalog,
    user_tokens: HashMap<u64, BTreeMap<Address, Token>>,
    deleted_user_tokens: HashMap<u64, BTreeMap<Address, Token>>,
}

impl TokenRegistry {
    pub fn new(catalog: TokenCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    /// Rebuild from persisted overlay and tombstones. Should a persisted
    /// address appear in both, the overlay wins.
    pub fn from_parts(
        catalog: TokenCatalog,
        user_tokens: HashMap<u64, BTreeMap<Address, Token>>,
        mut deleted_user_tokens: HashMap<u64, BTreeMap<Address, Token>>,
    ) -> Self {
        for (chain_id, tokens) in &user_tokens {
            if let Some(deleted) = deleted_user_tokens.get_mut(chain_id) {
                deleted.retain(|address, _| !tokens.contains_key(address));
            }
        }
        Self {
            catalog,
            user_tokens,
            deleted_user_tokens,
        }
    }

    pub fn user_token_sets(&self) -> &HashMap<u64, BTreeMap<Address, Token>> {
        &self.user_tokens
    }

    pub fn deleted_user_token_sets(&self) -> &HashMap<u64, BTreeMap<Address, Token>> {
        &self.deleted_user_tokens
    }

    /// Catalog tokens for `chain_id`; empty when the chain has no catalog.
    pub fn get_tokens(&self, chain_id: u64) -> BTreeMap<Address, Token> {
        self.catalog.tokens(chain_id).cloned().unwrap_or_default()
    }

    pub fn get_user_tokens(&self, chain_id: u64) -> BTreeMap<Address, Token> {
        self.user_tokens.get(&chain_id).cloned().unwrap_or_default()
    }

    pub fn get_deleted_user_tokens(&self, chain_id: u64) -> BTreeMap<Address, Token> {
        self.deleted_user_tokens
            .get(&chain_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_contract_addresses(&self, chain_id: u64) -> Vec<Address> {
        keys(self.catalog.tokens(chain_id))
    }

    pub fn get_user_token_contract_addresses(&self, chain_id: u64) -> Vec<Address> {
        keys(self.user_tokens.get(&chain_id))
    }

    pub fn get_deleted_user_token_contract_addresses(&self, chain_id: u64) -> Vec<Address> {
        keys(self.deleted_user_tokens.get(&chain_id))
    }

    /// Catalog first, then the user overlay. Hex input of the wrong length
    /// resolves to `None`.
    pub fn get_token(&self, chain_id: u64, address: &str) -> Result<Option<Token>, Error> {
        if address.is_empty() {
            return Err(MissingParam::TokenAddress.into());
        }
        let Some(address) = address::parse_lenient(address)? else {
            return Ok(None);
        };
        Ok(self.find_token(chain_id, &address))
    }

    /// Case-insensitive match on symbol or name, or exact match on address.
    /// Catalog hits come first; results are unique by address.
    pub fn search(&self, chain_id: u64, query: &str) -> Result<Vec<Token>, Error> {
        if query.is_empty() {
            return Err(MissingParam::Search.into());
        }
        let needle = query.to_lowercase();
        let exact = address::validate(query).ok();

        let mut seen = Vec::new();
        let mut results = Vec::new();
        let sources = [self.catalog.tokens(chain_id), self.user_tokens.get(&chain_id)];
        for token in sources.into_iter().flatten().flat_map(|t| t.values()) {
            if token.matches(&needle, exact.as_ref()) && !seen.contains(&token.address) {
                seen.push(token.address);
                results.push(token.clone());
            }
        }
        Ok(results)
    }

    /// Add or overwrite a user token and lift any tombstone for it.
    pub fn add_custom_token(
        &mut self,
        chain_id: u64,
        token: impl Into<Option<Token>>,
    ) -> Result<(), Error> {
        let token = token.into().ok_or(MissingParam::Token)?;
        let address = token.address;

        if let Some(deleted) = self.deleted_user_tokens.get_mut(&chain_id) {
            deleted.remove(&address);
        }
        self.user_tokens
            .entry(chain_id)
            .or_default()
            .insert(address, token);
        debug!(chain_id, %address, "user token added");
        Ok(())
    }

    /// Move a token from the overlay into the tombstone set. A token the user
    /// never added is tombstoned from catalog metadata, or by address alone.
    pub fn delete_user_token(&mut self, chain_id: u64, address: &str) -> Result<(), Error> {
        if address.is_empty() {
            return Err(MissingParam::TokenAddress.into());
        }
        let address = address::validate(address)?;

        let removed = self
            .user_tokens
            .get_mut(&chain_id)
            .and_then(|tokens| tokens.remove(&address));
        let tombstone = removed
            .or_else(|| {
                self.catalog
                    .tokens(chain_id)
                    .and_then(|t| t.get(&address))
                    .cloned()
            })
            .unwrap_or_else(|| Token::new(address, "", "", 0));

        self.deleted_user_tokens
            .entry(chain_id)
            .or_default()
            .insert(address, tombstone);
        debug!(chain_id, %address, "user token deleted");
        Ok(())
    }

    /// Never fails: malformed input is simply not native.
    pub fn is_native_token(&self, address: &str) -> bool {
        address::is_native(address)
    }

    /// What the user sees as "my tokens": catalog plus overlay, minus
    /// tombstones.
    pub fn visible_tokens(&self, chain_id: u64) -> BTreeMap<Address, Token> {
        let mut visible = self.get_tokens(chain_id);
        visible.extend(self.get_user_tokens(chain_id));
        if let Some(deleted) = self.deleted_user_tokens.get(&chain_id) {
            visible.retain(|address, _| !deleted.contains_key(address));
        }
        visible
    }

    fn find_token(&self, chain_id: u64, address: &Address) -> Option<Token> {
        self.catalog
            .tokens(chain_id)
            .and_then(|t| t.get(address))
            .or_else(|| self.user_tokens.get(&chain_id).and_then(|t| t.get(address)))
            .cloned()
    }
}

impl TokenSource for TokenRegistry {
    fn lookup(&self, chain_id: u64, address: &Address) -> Option<Token> {
        self.find_token(chain_id, address)
    }
}

fn keys(tokens: Option<&BTreeMap<Address, Token>>) -> Vec<Address> {
    tokens
        .map(|t| t.keys().copied().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAINNET: u64 = 1;
    const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

    fn dai() -> Token {
        Token::new(DAI.parse().unwrap(), "Dai Stablecoin", "DAI", 18)
    }

    fn empty_registry() -> TokenRegistry {
        TokenRegistry::new(TokenCatalog::new())
    }

    #[test]
    fn test_bundled_catalog_loads() {
        let registry = TokenRegistry::new(TokenCatalog::bundled().unwrap());
        assert!(!registry.get_tokens(MAINNET).is_empty());
        assert!(registry.get_tokens(42).is_empty());

        let bridged = registry
            .get_token(10, "0x7f5c764cbc14f9669b88837ca1490cca17c31607")
            .unwrap()
            .unwrap();
        let bridge = bridged.l1_bridge.unwrap();
        assert_eq!(
            bridge.token_address,
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap()
        );
    }

    #[test]
    fn test_catalog_rejects_bad_address() {
        let json = r#"{"1": {"0x1234": {"address": "0x1234", "name": "x", "symbol": "X", "decimals": 1}}}"#;
        assert!(TokenCatalog::from_json(json).is_err());
    }

    #[test]
    fn test_empty_overlays() {
        let registry = empty_registry();
        assert!(registry.get_user_tokens(MAINNET).is_empty());
        assert!(registry.get_deleted_user_tokens(MAINNET).is_empty());
        assert!(registry.get_user_token_contract_addresses(42).is_empty());
        assert!(registry.get_deleted_user_token_contract_addresses(42).is_empty());
    }

    #[test]
    fn test_get_token() {
        let mut catalog = TokenCatalog::new();
        catalog.insert(MAINNET, dai());
        let registry = TokenRegistry::new(catalog);

        assert_eq!(
            registry.get_token(MAINNET, ""),
            Err(Error::MissingParam(MissingParam::TokenAddress))
        );
        let token = registry.get_token(MAINNET, DAI).unwrap().unwrap();
        assert_eq!(token.address.to_checksum(), DAI);
        assert_eq!(registry.get_token(5, DAI).unwrap(), None);
        assert_eq!(registry.get_token(MAINNET, "0x6b17").unwrap(), None);
    }

    #[test]
    fn test_get_token_falls_back_to_user_tokens() {
        let mut registry = empty_registry();
        registry.add_custom_token(MAINNET, dai()).unwrap();
        let token = registry
            .get_token(MAINNET, "0x6b175474e89094c44da98b954eedeac495271d0f")
            .unwrap();
        assert_eq!(token, Some(dai()));
    }

    #[test]
    fn test_search() {
        let mut catalog = TokenCatalog::new();
        catalog.insert(MAINNET, dai());
        let registry = TokenRegistry::new(catalog);

        assert_eq!(
            registry.search(MAINNET, ""),
            Err(Error::MissingParam(MissingParam::Search))
        );

        let by_symbol = registry.search(MAINNET, "DAI").unwrap();
        assert!(by_symbol.iter().any(|t| t.address == dai().address));

        let by_name = registry.search(MAINNET, "Dai Stablecoin").unwrap();
        assert_eq!(by_name[0].address, dai().address);

        let by_address = registry.search(MAINNET, DAI).unwrap();
        assert_eq!(by_address[0].address, dai().address);

        assert!(registry.search(MAINNET, "zzz").unwrap().is_empty());
    }

    #[test]
    fn test_search_dedups_catalog_and_user_tokens() {
        let mut catalog = TokenCatalog::new();
        catalog.insert(MAINNET, dai());
        let mut registry = TokenRegistry::new(catalog);
        registry.add_custom_token(MAINNET, dai()).unwrap();
        assert_eq!(registry.search(MAINNET, "dai").unwrap().len(), 1);
    }

    #[test]
    fn test_add_custom_token_requires_token() {
        let mut registry = empty_registry();
        assert_eq!(
            registry.add_custom_token(MAINNET, None::<Token>),
            Err(Error::MissingParam(MissingParam::Token))
        );
    }

    #[test]
    fn test_delete_requires_address() {
        let mut registry = empty_registry();
        assert_eq!(
            registry.delete_user_token(MAINNET, ""),
            Err(Error::MissingParam(MissingParam::TokenAddress))
        );
        assert!(matches!(
            registry.delete_user_token(MAINNET, "nope"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_tombstone_moves() {
        let mut registry = empty_registry();
        let token = dai();

        registry.add_custom_token(MAINNET, token.clone()).unwrap();
        assert!(registry
            .get_user_token_contract_addresses(MAINNET)
            .contains(&token.address));
        assert!(!registry
            .get_deleted_user_token_contract_addresses(MAINNET)
            .contains(&token.address));

        registry
            .delete_user_token(MAINNET, &token.address.to_checksum())
            .unwrap();
        assert!(!registry
            .get_user_token_contract_addresses(MAINNET)
            .contains(&token.address));
        assert!(registry
            .get_deleted_user_token_contract_addresses(MAINNET)
            .contains(&token.address));
        assert_eq!(registry.get_deleted_user_tokens(MAINNET)[&token.address], token);

        registry.add_custom_token(MAINNET, token.clone()).unwrap();
        assert!(registry
            .get_user_token_contract_addresses(MAINNET)
            .contains(&token.address));
        assert!(!registry
            .get_deleted_user_token_contract_addresses(MAINNET)
            .contains(&token.address));
    }

    #[test]
    fn test_delete_unknown_token_synthesizes_tombstone() {
        let mut registry = empty_registry();
        registry.delete_user_token(MAINNET, DAI).unwrap();
        let deleted = registry.get_deleted_user_tokens(MAINNET);
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[&dai().address].symbol, "");
    }

    #[test]
    fn test_visible_tokens_hide_deleted_catalog_entries() {
        let mut catalog = TokenCatalog::new();
        catalog.insert(MAINNET, dai());
        let mut registry = TokenRegistry::new(catalog);

        registry.delete_user_token(MAINNET, DAI).unwrap();
        assert!(registry.visible_tokens(MAINNET).is_empty());
        // deletion never touches the catalog
        assert_eq!(registry.get_tokens(MAINNET).len(), 1);
        assert_eq!(
            registry.get_deleted_user_tokens(MAINNET)[&dai().address].name,
            "Dai Stablecoin"
        );
    }

    #[test]
    fn test_overlays_are_per_chain() {
        let mut registry = empty_registry();
        registry.add_custom_token(MAINNET, dai()).unwrap();
        registry.delete_user_token(5, DAI).unwrap();
        assert_eq!(registry.get_user_token_contract_addresses(MAINNET).len(), 1);
        assert!(registry.get_user_token_contract_addresses(5).is_empty());
        assert_eq!(registry.get_deleted_user_token_contract_addresses(5).len(), 1);
    }

    #[test]
    fn test_from_parts_restores_invariant() {
        let mut user = HashMap::new();
        user.insert(MAINNET, BTreeMap::from([(dai().address, dai())]));
        let deleted = user.clone();
        let registry = TokenRegistry::from_parts(TokenCatalog::new(), user, deleted);
        assert_eq!(registry.get_user_token_contract_addresses(MAINNET).len(), 1);
        assert!(registry
            .get_deleted_user_token_contract_addresses(MAINNET)
            .is_empty());
    }

    #[test]
    fn test_is_native_token() {
        let registry = empty_registry();
        assert!(registry.is_native_token("0x0000000000000000000000000000000000000000"));
        assert!(registry.is_native_token("0x0"));
        assert!(!registry.is_native_token("0x6b175474e89094c44da98b954eedeac495271d0f"));
        assert!(!registry.is_native_token("wrong address"));
    }

    #[test]
    fn test_native_token_descriptor() {
        assert_eq!(native_token(1).symbol, "ETH");
        assert_eq!(native_token(137).symbol, "MATIC");
        assert!(native_token(1).address.is_zero());
    }
}
