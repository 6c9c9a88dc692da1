use anyhow::Context;
use serde::{Deserialize, Serialize};

use sto_core::{
    Account, Address, Amount, ContractAccount, CurrencyDesign, Design, KycDesign, LedgerError,
    Partition,
};

use crate::keys::StateKey;

/// Partitions in which a holder has a nonzero balance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolderPartitions(pub Vec<Partition>);

/// Balance of one holder on one partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolderPartitionBalance(pub Amount);

/// Operators a holder delegated one partition to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolderPartitionOperators(pub Vec<Address>);

/// Holders that delegated one partition to an operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorTokenHolders(pub Vec<Address>);

/// Outstanding supply of one partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionBalance(pub Amount);

/// Currency balance of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyBalance(pub Amount);

/// Approval status of a KYC customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerStatus(pub bool);

/// Every value the engine reads from or writes to state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateValue {
    Account(Account),
    ContractAccount(ContractAccount),
    CurrencyDesign(CurrencyDesign),
    CurrencyBalance(CurrencyBalance),
    Design(Design),
    PartitionBalance(PartitionBalance),
    TokenHolderPartitions(TokenHolderPartitions),
    TokenHolderPartitionBalance(TokenHolderPartitionBalance),
    TokenHolderPartitionOperators(TokenHolderPartitionOperators),
    OperatorTokenHolders(OperatorTokenHolders),
    KycDesign(KycDesign),
    CustomerStatus(CustomerStatus),
}

impl StateValue {
    pub fn name(&self) -> &'static str {
        match self {
            StateValue::Account(_) => Account::NAME,
            StateValue::ContractAccount(_) => ContractAccount::NAME,
            StateValue::CurrencyDesign(_) => CurrencyDesign::NAME,
            StateValue::CurrencyBalance(_) => CurrencyBalance::NAME,
            StateValue::Design(_) => Design::NAME,
            StateValue::PartitionBalance(_) => PartitionBalance::NAME,
            StateValue::TokenHolderPartitions(_) => TokenHolderPartitions::NAME,
            StateValue::TokenHolderPartitionBalance(_) => TokenHolderPartitionBalance::NAME,
            StateValue::TokenHolderPartitionOperators(_) => TokenHolderPartitionOperators::NAME,
            StateValue::OperatorTokenHolders(_) => OperatorTokenHolders::NAME,
            StateValue::KycDesign(_) => KycDesign::NAME,
            StateValue::CustomerStatus(_) => CustomerStatus::NAME,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        let bytes = bincode::serialize(self)
            .with_context(|| format!("Failed to encode {} state value", self.name()))?;
        Ok(bytes)
    }

    pub fn decode(key: &StateKey, bytes: &[u8]) -> Result<Self, LedgerError> {
        let value = bincode::deserialize(bytes)
            .with_context(|| format!("Failed to decode state value at {}", key))?;
        Ok(value)
    }
}

/// A typed record stored under one state key
pub trait StateRecord: Sized + Clone {
    const NAME: &'static str;

    fn into_value(self) -> StateValue;

    fn from_value(value: StateValue) -> Option<Self>;

    /// Unwrap `value`, failing if the entry at `key` holds another record type
    fn expect_from(key: &StateKey, value: StateValue) -> Result<Self, LedgerError> {
        let found = value.name();
        Self::from_value(value).ok_or_else(|| {
            LedgerError::InternalInconsistency(format!(
                "expected {} at {}, found {}",
                Self::NAME,
                key,
                found
            ))
        })
    }
}

macro_rules! state_record {
    ($ty:ident, $name:literal) => {
        impl StateRecord for $ty {
            const NAME: &'static str = $name;

            fn into_value(self) -> StateValue {
                StateValue::$ty(self)
            }

            fn from_value(value: StateValue) -> Option<Self> {
                match value {
                    StateValue::$ty(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

state_record!(Account, "account");
state_record!(ContractAccount, "contract account");
state_record!(CurrencyDesign, "currency design");
state_record!(CurrencyBalance, "currency balance");
state_record!(Design, "security token design");
state_record!(PartitionBalance, "partition balance");
state_record!(TokenHolderPartitions, "token holder partitions");
state_record!(TokenHolderPartitionBalance, "token holder partition balance");
state_record!(TokenHolderPartitionOperators, "token holder partition operators");
state_record!(OperatorTokenHolders, "operator token holders");
state_record!(KycDesign, "kyc design");
state_record!(CustomerStatus, "customer status");
