use serde::{Deserialize, Serialize};

use sto_core::LedgerError;

use crate::keys::StateKey;
use crate::values::{StateRecord, StateValue};

/// A key with its full replacement value, as emitted by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeValue {
    pub key: StateKey,
    pub value: StateValue,
}

impl MergeValue {
    pub fn new<T: StateRecord>(key: StateKey, record: T) -> Self {
        Self {
            key,
            value: record.into_value(),
        }
    }

    /// Typed view of the value, failing if it holds another record type
    pub fn record<T: StateRecord>(&self) -> Result<T, LedgerError> {
        T::expect_from(&self.key, self.value.clone())
    }
}

/// Point-read access to a consistent snapshot of ledger state
///
/// All reads made through one accessor during a PreProcess or Process pass
/// must observe the same snapshot.
pub trait StateAccessor {
    /// Read the encoded value stored at `key`
    fn get_raw(&self, key: &StateKey) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Read and decode the value stored at `key`
    fn get_value(&self, key: &StateKey) -> Result<Option<StateValue>, LedgerError> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(StateValue::decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn contains(&self, key: &StateKey) -> Result<bool, LedgerError> {
        Ok(self.get_raw(key)?.is_some())
    }
}

impl<S: StateAccessor + ?Sized> StateAccessor for &S {
    fn get_raw(&self, key: &StateKey) -> Result<Option<Vec<u8>>, LedgerError> {
        (**self).get_raw(key)
    }

    fn get_value(&self, key: &StateKey) -> Result<Option<StateValue>, LedgerError> {
        (**self).get_value(key)
    }

    fn contains(&self, key: &StateKey) -> Result<bool, LedgerError> {
        (**self).contains(key)
    }
}

/// Typed reads and existence predicates over any [`StateAccessor`]
pub trait StateReader {
    fn get<T: StateRecord>(&self, key: &StateKey) -> Result<Option<T>, LedgerError>;

    fn exists(&self, key: &StateKey) -> Result<bool, LedgerError>;

    /// Read a record that must be present
    fn must_get<T: StateRecord>(&self, key: &StateKey) -> Result<T, LedgerError> {
        self.get(key)?
            .ok_or_else(|| LedgerError::StateNotFound(format!("{} at {}", T::NAME, key)))
    }

    fn must_exist(&self, key: &StateKey) -> Result<(), LedgerError> {
        if self.exists(key)? {
            Ok(())
        } else {
            Err(LedgerError::StateNotFound(key.to_string()))
        }
    }

    fn must_not_exist(&self, key: &StateKey) -> Result<(), LedgerError> {
        if self.exists(key)? {
            Err(LedgerError::StateAlreadyExists(key.to_string()))
        } else {
            Ok(())
        }
    }
}

impl<S: StateAccessor + ?Sized> StateReader for S {
    fn get<T: StateRecord>(&self, key: &StateKey) -> Result<Option<T>, LedgerError> {
        match self.get_value(key)? {
            Some(value) => Ok(Some(T::expect_from(key, value)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, key: &StateKey) -> Result<bool, LedgerError> {
        self.contains(key)
    }
}
