use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiny_keccak::{Hasher, Keccak};

use crate::error::Error;

/// Number of hex characters in a 20-byte address.
const ADDRESS_HEX_LEN: usize = 40;

/// Short literal some dapps use for the native currency.
const NATIVE_SHORT_FORM: &str = "0x0";

/// A 20-byte account or contract address.
///
/// Equality is byte-wise, so two inputs differing only in letter case compare
/// equal. `Display` renders lowercase; use [`Address::to_checksum`] for the
/// EIP-55 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// EIP-55 mixed-case checksum encoding.
    pub fn to_checksum(&self) -> String {
        let hex_addr = hex::encode(self.0);
        let mut hasher = Keccak::v256();
        hasher.update(hex_addr.as_bytes());
        let mut hash = [0u8; 32];
        hasher.finalize(&mut hash);

        let mut result = String::with_capacity(42);
        result.push_str("0x");
        for (i, c) in hex_addr.chars().enumerate() {
            let hash_nibble = if i % 2 == 0 {
                (hash[i / 2] >> 4) & 0x0f
            } else {
                hash[i / 2] & 0x0f
            };
            if hash_nibble >= 8 {
                result.push(c.to_ascii_uppercase());
            } else {
                result.push(c);
            }
        }
        result
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        validate(&raw).map_err(serde::de::Error::custom)
    }
}

/// Validate and parse an address.
///
/// Fails with [`Error::InvalidAddress`] when the input is not a `0x`-prefixed
/// hex string, and with [`Error::MalformedAddress`] when it is hex but not
/// exactly 40 characters long. Callers rely on the difference: the first is
/// always raised, the second is often reported as a soft `false`/`None`.
/// Surrounding whitespace is not stripped.
pub fn validate(input: &str) -> Result<Address, Error> {
    let digits = input
        .strip_prefix("0x")
        .filter(|rest| rest.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| Error::InvalidAddress(input.to_string()))?;

    if digits.len() != ADDRESS_HEX_LEN {
        return Err(Error::MalformedAddress {
            input: input.to_string(),
            hex_len: digits.len(),
        });
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes)
        .map_err(|_| Error::InvalidAddress(input.to_string()))?;
    Ok(Address(bytes))
}

/// Soft-failure variant of [`validate`]: malformed-but-hex input yields
/// `Ok(None)`, non-hex input is still an error.
pub fn parse_lenient(input: &str) -> Result<Option<Address>, Error> {
    match validate(input) {
        Ok(address) => Ok(Some(address)),
        Err(Error::MalformedAddress { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Whether `input` denotes the network's native currency: the zero address
/// or the literal `0x0`. Never fails.
pub fn is_native(input: &str) -> bool {
    if input == NATIVE_SHORT_FORM {
        return true;
    }
    validate(input).map(|a| a.is_zero()).unwrap_or(false)
}
