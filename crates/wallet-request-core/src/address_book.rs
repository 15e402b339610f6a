use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{self, Address};
use crate::error::Error;

/// Default bound on the recent-addresses list.
pub const DEFAULT_RECENT_ADDRESSES_LIMIT: usize = 10;

/// A named address book entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookEntry {
    pub address: Address,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Validated name <-> address store plus recently used counterparties.
///
/// Mutating calls take raw strings and run them through the shared address
/// validator. Non-hex input is raised as [`Error::InvalidAddress`]; hex input
/// of the wrong length is reported as `false`/`None` instead.
#[derive(Debug, Clone)]
pub struct AddressBook {
    entries: HashMap<Address, AddressBookEntry>,
    recent: Vec<Address>,
    recent_limit: usize,
}

impl AddressBook {
    /// Create an empty address book.
    pub fn empty() -> Self {
        Self::with_recent_limit(DEFAULT_RECENT_ADDRESSES_LIMIT)
    }

    pub fn with_recent_limit(recent_limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recent: Vec::new(),
            recent_limit,
        }
    }

    /// Change the recent-addresses bound, dropping the oldest entries past it.
    pub fn set_recent_limit(&mut self, recent_limit: usize) {
        self.recent_limit = recent_limit;
        self.recent.truncate(recent_limit);
    }

    /// Rebuild from persisted entries. Entries are re-keyed by their own
    /// address so a stale key can never disagree with its value.
    pub fn from_parts(
        entries: impl IntoIterator<Item = AddressBookEntry>,
        recent: Vec<Address>,
        recent_limit: usize,
    ) -> Self {
        let mut book = Self::with_recent_limit(recent_limit);
        for entry in entries {
            book.entries.insert(entry.address, entry);
        }
        book.recent = recent;
        book.recent.truncate(recent_limit);
        book
    }

    /// Add or overwrite the entry for `address`.
    pub fn set(&mut self, address: &str, name: &str, note: Option<&str>) -> Result<bool, Error> {
        let Some(address) = address::parse_lenient(address)? else {
            return Ok(false);
        };
        debug!(%address, "address book entry set");
        self.entries.insert(
            address,
            AddressBookEntry {
                address,
                name: name.to_string(),
                note: note.map(str::to_string),
            },
        );
        Ok(true)
    }

    /// Snapshot of every entry.
    pub fn get(&self) -> HashMap<Address, AddressBookEntry> {
        self.entries.clone()
    }

    pub fn get_by_address(&self, address: &str) -> Result<Option<AddressBookEntry>, Error> {
        Ok(address::parse_lenient(address)?.and_then(|a| self.entries.get(&a).cloned()))
    }

    /// Remove the entry for `address`. Returns whether one existed.
    pub fn delete(&mut self, address: &str) -> Result<bool, Error> {
        let Some(address) = address::parse_lenient(address)? else {
            return Ok(false);
        };
        let removed = self.entries.remove(&address).is_some();
        if removed {
            debug!(%address, "address book entry deleted");
        }
        Ok(removed)
    }

    /// Remove every entry. Returns whether the book was non-empty.
    pub fn clear(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.clear();
        true
    }

    /// Look up the label for an already-validated address.
    pub fn resolve_name(&self, address: &Address) -> Option<&str> {
        self.entries.get(address).map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a transaction counterparty: moves it to the front, dropping the
    /// oldest entry past the limit.
    pub fn add_recent_address(&mut self, address: Address) {
        self.recent.retain(|a| *a != address);
        self.recent.insert(0, address);
        self.recent.truncate(self.recent_limit);
    }

    /// Recently used counterparties, most recent first.
    pub fn recent_addresses(&self) -> &[Address] {
        &self.recent
    }
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS_1: &str = "0x2231234435344D865C8966f4945844843EDAff91";
    const ADDRESS_2: &str = "0x2231234435312DaBBD9a1A21B6111cc8Bb3aA407";
    const SHORT_ADDRESS: &str = "0x22312345C8966f4945844843EDAff91";

    #[test]
    fn test_clear() {
        let mut book = AddressBook::empty();
        assert!(book.set(ADDRESS_1, "name 1", None).unwrap());
        assert!(book.set(ADDRESS_2, "name 2", None).unwrap());
        assert_eq!(book.get().len(), 2);

        assert!(book.clear());
        assert!(book.get().is_empty());
        assert!(!book.clear());
    }

    #[test]
    fn test_set_validates_address() {
        let mut book = AddressBook::empty();
        let err = book
            .set("not a valid address", "test entry", Some("note"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "This method only supports 0x-prefixed hex strings but input was: not a valid address"
        );
        assert!(!book.set(SHORT_ADDRESS, "test entry", Some("note")).unwrap());
        assert!(book.is_empty());
    }

    #[test]
    fn test_set_and_get_by_address() {
        let mut book = AddressBook::empty();
        assert!(book.set(ADDRESS_1, "test entry", Some("note")).unwrap());
        assert!(book.set(ADDRESS_2, "test entry 2", Some("note 2")).unwrap());

        let entry = book.get_by_address(ADDRESS_1).unwrap().unwrap();
        assert_eq!(entry.name, "test entry");
        assert_eq!(entry.note.as_deref(), Some("note"));

        // lookups are case-insensitive
        let entry = book
            .get_by_address(&ADDRESS_2.to_lowercase())
            .unwrap()
            .unwrap();
        assert_eq!(entry.name, "test entry 2");

        assert_eq!(
            book.get_by_address("0x0000000000000000000000000000000000000001")
                .unwrap(),
            None
        );
        assert_eq!(book.get_by_address(SHORT_ADDRESS).unwrap(), None);
        assert!(book.get_by_address("nope").is_err());
    }

    #[test]
    fn test_set_overwrites() {
        let mut book = AddressBook::empty();
        book.set(ADDRESS_1, "first", None).unwrap();
        book.set(&ADDRESS_1.to_lowercase(), "second", None).unwrap();
        let all = book.get();
        assert_eq!(all.len(), 1);
        let address: Address = ADDRESS_1.parse().unwrap();
        assert_eq!(all[&address].name, "second");
        assert_eq!(book.resolve_name(&address), Some("second"));
    }

    #[test]
    fn test_delete() {
        let mut book = AddressBook::empty();
        assert!(book.delete("not a valid address").is_err());
        assert!(!book.delete(SHORT_ADDRESS).unwrap());

        book.set(ADDRESS_1, "name 1", None).unwrap();
        book.set(ADDRESS_2, "name 2", None).unwrap();
        assert!(book.delete(ADDRESS_1).unwrap());
        assert!(book.delete(ADDRESS_2).unwrap());
        assert!(!book.delete(ADDRESS_1).unwrap());
        assert!(!book.delete(ADDRESS_2).unwrap());

        book.set(ADDRESS_2, "name 2", None).unwrap();
        assert!(book.delete(ADDRESS_2).unwrap());
    }

    #[test]
    fn test_recent_addresses_move_to_front() {
        let mut book = AddressBook::with_recent_limit(2);
        let a: Address = ADDRESS_1.parse().unwrap();
        let b: Address = ADDRESS_2.parse().unwrap();
        let c = Address::ZERO;

        book.add_recent_address(a);
        book.add_recent_address(b);
        book.add_recent_address(a);
        assert_eq!(book.recent_addresses(), &[a, b]);

        book.add_recent_address(c);
        assert_eq!(book.recent_addresses(), &[c, a]);
    }
}
