use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Non-negative token or currency amount
///
/// Arithmetic is always checked; callers decide whether an overflow is a
/// rejection or an internal inconsistency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(U256);

impl Amount {
    pub fn zero() -> Self {
        Amount(U256::zero())
    }

    pub fn from_u256(value: U256) -> Self {
        Amount(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(&self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn checked_mul(&self, factor: u64) -> Option<Amount> {
        self.0.checked_mul(U256::from(factor)).map(Amount)
    }

    /// Whether the amount is an exact multiple of `granularity`.
    /// A zero granularity divides nothing.
    pub fn is_multiple_of(&self, granularity: u64) -> bool {
        if granularity == 0 {
            return false;
        }
        (self.0 % U256::from(granularity)).is_zero()
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(U256::from(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_dec_str(s)
            .map(Amount)
            .map_err(|e| LedgerError::Validation(format!("invalid amount {:?}: {:?}", s, e)))
    }
}
