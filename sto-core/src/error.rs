use std::fmt;
use thiserror::Error;

use crate::amount::Amount;
use crate::id::{Address, ContractId, CurrencyId, Partition};

/// The role check that failed when a sender tried to act on a token or KYC service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    /// Address that attempted the action
    pub sender: Address,
    /// Contract account owning the token or KYC service, if the check was scoped to one
    pub contract: Option<Address>,
    /// Security token id or KYC service id
    pub id: Option<ContractId>,
    /// Partition, for partition-scoped checks
    pub partition: Option<Partition>,
}

impl RoleContext {
    pub fn new(sender: &Address, contract: &Address, id: &ContractId) -> Self {
        Self {
            sender: sender.clone(),
            contract: Some(contract.clone()),
            id: Some(id.clone()),
            partition: None,
        }
    }

    /// Context for a sender whose signs do not reach its account threshold
    pub fn signing(sender: &Address) -> Self {
        Self {
            sender: sender.clone(),
            contract: None,
            id: None,
            partition: None,
        }
    }

    pub fn with_partition(mut self, partition: &Partition) -> Self {
        self.partition = Some(partition.clone());
        self
    }
}

impl fmt::Display for RoleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.contract, &self.id) {
            (Some(contract), Some(id)) => write!(
                f,
                "sender {} has no role on contract {}, id {}",
                self.sender, contract, id
            )?,
            _ => write!(f, "signs of sender {} do not reach the threshold", self.sender)?,
        }
        if let Some(partition) = &self.partition {
            write!(f, ", partition {}", partition)?;
        }
        Ok(())
    }
}

/// Represents every way an operation can be rejected or fail
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Malformed structural input
    #[error("Validation error: {0}")]
    Validation(String),

    /// A state entry required by the operation is missing
    #[error("State not found: {0}")]
    StateNotFound(String),

    /// A state entry the operation would create already exists
    #[error("State already exists: {0}")]
    StateAlreadyExists(String),

    /// The sender holds no role that allows the action
    #[error("Unauthorized: {0}")]
    Unauthorized(RoleContext),

    /// An amount is not a multiple of the token granularity
    #[error("Granularity violation: amount {amount} is not a multiple of {granularity}")]
    GranularityViolation { amount: Amount, granularity: u64 },

    /// A partition balance or partition supply is lower than the batch requires
    #[error("Insufficient partition balance for {key}: required {required}, available {available}")]
    InsufficientPartitionBalance {
        key: String,
        required: Amount,
        available: Amount,
    },

    /// The sender cannot pay the operation fee
    #[error("Insufficient {currency} balance: required {required}, available {available}")]
    InsufficientCurrencyBalance {
        currency: CurrencyId,
        required: Amount,
        available: Amount,
    },

    /// Unexpected state shape, or a failure in Process after a passing PreProcess
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// The state back-end failed to serve a read or a commit
    #[error("State access error: {0}")]
    StateAccess(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl LedgerError {
    /// Whether the error must be treated as unrecoverable for the operation
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::InternalInconsistency(_))
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Context(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Context(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_context_display() {
        let ctx = RoleContext::new(
            &Address::new("mallory"),
            &Address::new("issuer"),
            &ContractId::new("STO01"),
        );
        assert_eq!(
            ctx.to_string(),
            "sender mallory has no role on contract issuer, id STO01"
        );

        let ctx = ctx.with_partition(&Partition::new("p1"));
        assert!(ctx.to_string().ends_with(", partition p1"));

        let ctx = RoleContext::signing(&Address::new("alice"));
        assert_eq!(ctx.to_string(), "signs of sender alice do not reach the threshold");
    }

    #[test]
    fn test_only_internal_inconsistency_is_fatal() {
        assert!(LedgerError::InternalInconsistency("x".into()).is_fatal());
        assert!(!LedgerError::StateNotFound("x".into()).is_fatal());
        assert!(!LedgerError::Validation("x".into()).is_fatal());
        assert!(!LedgerError::StateAccess("x".into()).is_fatal());
    }
}
