//! Records owned by the currency layer that the engine reads.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::id::{Address, CurrencyId, PublicKey};

/// A key registered on an account together with its signing weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKey {
    pub key: PublicKey,
    pub weight: u64,
}

/// Weighted key set of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKeys {
    pub keys: Vec<AccountKey>,
    pub threshold: u64,
}

impl AccountKeys {
    pub fn new(keys: Vec<AccountKey>, threshold: u64) -> Self {
        Self { keys, threshold }
    }

    /// Single key account with weight equal to the threshold
    pub fn single(key: PublicKey) -> Self {
        Self {
            keys: vec![AccountKey { key, weight: 100 }],
            threshold: 100,
        }
    }

    /// Sum of weights of the registered keys that appear among `signers`
    pub fn signed_weight<'a, I>(&self, signers: I) -> u64
    where
        I: IntoIterator<Item = &'a PublicKey> + Clone,
    {
        self.keys
            .iter()
            .filter(|k| signers.clone().into_iter().any(|s| *s == k.key))
            .fold(0u64, |acc, k| acc.saturating_add(k.weight))
    }

    pub fn is_satisfied_by<'a, I>(&self, signers: I) -> bool
    where
        I: IntoIterator<Item = &'a PublicKey> + Clone,
    {
        self.signed_weight(signers) >= self.threshold
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub keys: AccountKeys,
}

/// Marks an account as a contract account and names the owner allowed to
/// manage what it hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAccount {
    pub owner: Address,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeePolicy {
    /// No fee
    Nil,
    /// Fixed fee charged once per item
    Fixed(Amount),
}

impl FeePolicy {
    pub fn per_item(&self) -> Amount {
        match self {
            FeePolicy::Nil => Amount::zero(),
            FeePolicy::Fixed(amount) => *amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDesign {
    pub currency: CurrencyId,
    pub fee: FeePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multisig_threshold() {
        let keys = AccountKeys::new(
            vec![
                AccountKey { key: PublicKey::new("k1"), weight: 50 },
                AccountKey { key: PublicKey::new("k2"), weight: 30 },
                AccountKey { key: PublicKey::new("k3"), weight: 20 },
            ],
            70,
        );

        let k1 = PublicKey::new("k1");
        let k2 = PublicKey::new("k2");
        let k3 = PublicKey::new("k3");
        let other = PublicKey::new("zz");

        assert!(keys.is_satisfied_by(&[k1.clone(), k2.clone()]));
        assert!(keys.is_satisfied_by(&[k1.clone(), k3.clone()]));
        assert!(!keys.is_satisfied_by(&[k2.clone(), k3.clone()]));
        assert!(!keys.is_satisfied_by(&[other]));
        assert_eq!(keys.signed_weight(&[k1, k2, k3]), 100);
    }

    #[test]
    fn test_fee_policy() {
        assert!(FeePolicy::Nil.per_item().is_zero());
        assert_eq!(FeePolicy::Fixed(Amount::from(3)).per_item(), Amount::from(3));
    }
}
