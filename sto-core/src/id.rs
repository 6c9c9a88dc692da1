use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

use crate::error::LedgerError;

/// Longest address accepted by [`Address::validate`].
pub const MAX_ADDRESS_LENGTH: usize = 100;

/// Length bounds shared by contract and currency ids.
pub const MIN_ID_LENGTH: usize = 3;
pub const MAX_ID_LENGTH: usize = 10;

/// Length bounds for partition names.
pub const MIN_PARTITION_LENGTH: usize = 1;
pub const MAX_PARTITION_LENGTH: usize = 10;

const ID_SPECIAL_CHARS: &[char] = &['_', '.', '!', '$', '*', '@'];

// Address identifies an account on the ledger. The format is owned by the
// account layer; here it is only required to be safe to embed in state keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Address(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the address is non-empty, bounded and uses only
    /// alphanumerics, `-` and `_`
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.0.is_empty() {
            return Err(LedgerError::Validation("empty address".to_string()));
        }
        if self.0.len() > MAX_ADDRESS_LENGTH {
            return Err(LedgerError::Validation(format!(
                "address too long, {} > {}",
                self.0.len(),
                MAX_ADDRESS_LENGTH
            )));
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(LedgerError::Validation(format!(
                "invalid address characters, {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::new(s)
    }
}

/// Check an identifier made of a bounded run of id characters whose first and
/// last characters are alphanumeric
fn validate_id_chars(
    kind: &str,
    value: &str,
    min: usize,
    max: usize,
    allow_lowercase: bool,
) -> Result<(), LedgerError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(LedgerError::Validation(format!(
            "invalid length of {}, {:?}: {} not in {}..={}",
            kind, value, len, min, max
        )));
    }

    let is_alnum = |c: char| {
        c.is_ascii_digit() || c.is_ascii_uppercase() || (allow_lowercase && c.is_ascii_lowercase())
    };

    let valid_body = value
        .chars()
        .all(|c| is_alnum(c) || ID_SPECIAL_CHARS.contains(&c));
    let first_ok = value.chars().next().map(is_alnum).unwrap_or(false);
    let last_ok = value.chars().last().map(is_alnum).unwrap_or(false);

    if !(valid_body && first_ok && last_ok) {
        return Err(LedgerError::Validation(format!(
            "wrong {} format, {:?}",
            kind, value
        )));
    }

    Ok(())
}

/// Identifies a security token or a KYC service within a contract account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(String);

impl ContractId {
    pub fn new(id: impl Into<String>) -> Self {
        ContractId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_id_chars("contract id", &self.0, MIN_ID_LENGTH, MAX_ID_LENGTH, false)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContractId {
    fn from(s: &str) -> Self {
        ContractId::new(s)
    }
}

/// Identifies a currency of the underlying ledger, used to pay fees
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyId(String);

impl CurrencyId {
    pub fn new(id: impl Into<String>) -> Self {
        CurrencyId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_id_chars("currency id", &self.0, MIN_ID_LENGTH, MAX_ID_LENGTH, false)
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyId {
    fn from(s: &str) -> Self {
        CurrencyId::new(s)
    }
}

/// A named subdivision of a security token's supply
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Partition(String);

impl Partition {
    pub fn new(name: impl Into<String>) -> Self {
        Partition(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_id_chars(
            "partition",
            &self.0,
            MIN_PARTITION_LENGTH,
            MAX_PARTITION_LENGTH,
            true,
        )
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Partition {
    fn from(s: &str) -> Self {
        Partition::new(s)
    }
}

/// Public key registered on an account, as referenced by a detached sign
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(key: impl Into<String>) -> Self {
        PublicKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PublicKey {
    fn from(s: &str) -> Self {
        PublicKey::new(s)
    }
}

// FactHash is the content address of a fact: a SHA-256 digest over its
// canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactHash([u8; 32]);

impl fmt::Display for FactHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short hex prefix is enough to tell facts apart in logs
        write!(f, "fact:{}", hex::encode(&self.0[0..8]))
    }
}

impl Default for FactHash {
    fn default() -> Self {
        FactHash([0; 32])
    }
}

impl Deref for FactHash {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FactHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        FactHash(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest the given byte segments with a domain separator
    pub fn digest(segments: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"STO_Fact");

        for segment in segments {
            hasher.update((segment.len() as u64).to_le_bytes());
            hasher.update(segment);
        }

        FactHash(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        assert!(Address::new("alice01").validate().is_ok());
        assert!(Address::new("holder_1-mca").validate().is_ok());
        assert!(Address::new("").validate().is_err());
        assert!(Address::new("a:b").validate().is_err());
        assert!(Address::new("a".repeat(MAX_ADDRESS_LENGTH + 1)).validate().is_err());
    }

    #[test]
    fn test_contract_id_validation() {
        assert!(ContractId::new("STO01").validate().is_ok());
        assert!(ContractId::new("A.B").validate().is_ok());
        assert!(ContractId::new("AB").validate().is_err());
        assert!(ContractId::new("sto01").validate().is_err());
        assert!(ContractId::new("_STO").validate().is_err());
        assert!(ContractId::new("STO_").validate().is_err());
        assert!(ContractId::new("ABCDEFGHIJK").validate().is_err());
    }

    #[test]
    fn test_partition_validation() {
        assert!(Partition::new("p1").validate().is_ok());
        assert!(Partition::new("P").validate().is_ok());
        assert!(Partition::new("").validate().is_err());
        assert!(Partition::new("p 1").validate().is_err());
        assert!(Partition::new("p1:x").validate().is_err());
    }

    #[test]
    fn test_fact_hash_digest() {
        let h1 = FactHash::digest(&[b"token", b"sender"]);
        let h2 = FactHash::digest(&[b"token", b"sender"]);
        assert_eq!(h1, h2);

        // Segment boundaries are part of the digest
        let h3 = FactHash::digest(&[b"tokens", b"ender"]);
        assert_ne!(h1, h3);

        assert_ne!(h1, FactHash::default());
        assert!(h1.to_string().starts_with("fact:"));
    }
}
