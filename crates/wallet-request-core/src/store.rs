use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::address::Address;
use crate::address_book::{AddressBook, AddressBookEntry};
use crate::config::CoreConfig;
use crate::error::Error;
use crate::token::{Token, TokenCatalog, TokenRegistry};

/// Registry state kept across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub address_book: HashMap<Address, AddressBookEntry>,

    #[serde(default)]
    pub recent_addresses: Vec<Address>,

    #[serde(default)]
    pub user_tokens: HashMap<u64, BTreeMap<Address, Token>>,

    #[serde(default)]
    pub deleted_user_tokens: HashMap<u64, BTreeMap<Address, Token>>,
}

impl PersistedState {
    /// Snapshot the mutable parts of both registries.
    pub fn capture(address_book: &AddressBook, tokens: &TokenRegistry) -> Self {
        Self {
            address_book: address_book.get(),
            recent_addresses: address_book.recent_addresses().to_vec(),
            user_tokens: tokens.user_token_sets().clone(),
            deleted_user_tokens: tokens.deleted_user_token_sets().clone(),
        }
    }

    /// Rebuild the registries on top of `catalog`.
    pub fn restore(self, catalog: TokenCatalog, config: &CoreConfig) -> (AddressBook, TokenRegistry) {
        let book = AddressBook::from_parts(
            self.address_book.into_values(),
            self.recent_addresses,
            config.recent_addresses_limit,
        );
        let tokens = TokenRegistry::from_parts(catalog, self.user_tokens, self.deleted_user_tokens);
        (book, tokens)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Store(format!("invalid persisted state: {e}")))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Store(e.to_string()))
    }
}

/// Storage engine collaborator.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedState>, Error>;

    async fn save(&self, state: &PersistedState) -> Result<(), Error>;
}

/// Keeps the last saved state as JSON in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    json: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<PersistedState>, Error> {
        let json = self.json.lock().await;
        json.as_deref().map(PersistedState::from_json).transpose()
    }

    async fn save(&self, state: &PersistedState) -> Result<(), Error> {
        let json = state.to_json()?;
        debug!(bytes = json.len(), "state saved");
        *self.json.lock().await = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS_1: &str = "0x2231234435344D865C8966f4945844843EDAff91";
    const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

    #[tokio::test]
    async fn test_save_and_restore() {
        let mut book = AddressBook::empty();
        book.set(ADDRESS_1, "name 1", Some("note")).unwrap();
        book.add_recent_address(ADDRESS_1.parse().unwrap());

        let mut tokens = TokenRegistry::new(TokenCatalog::bundled().unwrap());
        let dai: Address = DAI.parse().unwrap();
        tokens
            .add_custom_token(1, Token::new(dai, "Dai Stablecoin", "DAI", 18))
            .unwrap();
        tokens.delete_user_token(1, DAI).unwrap();

        let store = MemoryStore::new();
        assert_eq!(store.load().await.unwrap(), None);
        store
            .save(&PersistedState::capture(&book, &tokens))
            .await
            .unwrap();

        let (book, tokens) = store
            .load()
            .await
            .unwrap()
            .unwrap()
            .restore(TokenCatalog::bundled().unwrap(), &CoreConfig::default());
        assert_eq!(book.len(), 1);
        assert_eq!(book.recent_addresses().len(), 1);
        assert!(tokens.get_user_token_contract_addresses(1).is_empty());
        assert_eq!(tokens.get_deleted_user_token_contract_addresses(1), vec![dai]);
    }

    #[test]
    fn test_wire_shape() {
        let json = r#"{
            "addressBook": {
                "0x2231234435344d865c8966f4945844843edaff91": {
                    "address": "0x2231234435344d865c8966f4945844843edaff91",
                    "name": "name 1"
                }
            },
            "recentAddresses": [],
            "userTokens": {
                "1": {
                    "0x6b175474e89094c44da98b954eedeac495271d0f": {
                        "address": "0x6b175474e89094c44da98b954eedeac495271d0f",
                        "name": "Dai Stablecoin",
                        "symbol": "DAI",
                        "decimals": 18
                    }
                }
            },
            "deletedUserTokens": {}
        }"#;
        let state = PersistedState::from_json(json).unwrap();
        assert_eq!(state.address_book.len(), 1);
        assert_eq!(state.user_tokens[&1u64].len(), 1);

        let back = PersistedState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_invalid_state() {
        let err = PersistedState::from_json(r#"{ "recentAddresses": ["nope"] }"#).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(PersistedState::from_json("{}").unwrap(), PersistedState::default());
    }
}
