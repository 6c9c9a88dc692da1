use log::debug;
use std::collections::BTreeMap;

use sto_core::LedgerError;

use crate::accessor::{MergeValue, StateAccessor};
use crate::keys::StateKey;
use crate::values::StateRecord;

/// In-process snapshot backed by an ordered map of encoded values
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    entries: BTreeMap<StateKey, Vec<u8>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a single record, replacing any previous value
    pub fn insert<T: StateRecord>(&mut self, key: StateKey, record: T) -> Result<(), LedgerError> {
        let bytes = record.into_value().encode()?;
        self.entries.insert(key, bytes);
        Ok(())
    }

    /// Apply the outputs of one operation. Either every value is applied or,
    /// if any fails to encode, none is.
    pub fn commit(&mut self, merge_values: &[MergeValue]) -> Result<(), LedgerError> {
        let encoded = merge_values
            .iter()
            .map(|mv| Ok((mv.key.clone(), mv.value.encode()?)))
            .collect::<Result<Vec<_>, LedgerError>>()?;

        debug!("Committing {} state values to memory", encoded.len());
        self.entries.extend(encoded);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.entries.keys()
    }
}

impl StateAccessor for MemoryState {
    fn get_raw(&self, key: &StateKey) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.entries.get(key).cloned())
    }

    fn contains(&self, key: &StateKey) -> Result<bool, LedgerError> {
        Ok(self.entries.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::StateReader;
    use crate::values::CurrencyBalance;
    use sto_core::{Address, Amount, CurrencyId};

    #[test]
    fn test_commit_replaces_values() {
        let mut state = MemoryState::new();
        let key = StateKey::balance(&Address::new("alice"), &CurrencyId::new("MCC"));
        state.insert(key.clone(), CurrencyBalance(Amount::from(10))).unwrap();

        state
            .commit(&[MergeValue::new(key.clone(), CurrencyBalance(Amount::from(7)))])
            .unwrap();

        let balance: CurrencyBalance = state.must_get(&key).unwrap();
        assert_eq!(balance.0, Amount::from(7));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let state = MemoryState::new();
        let key = StateKey::account(&Address::new("nobody"));
        assert!(state.get::<CurrencyBalance>(&key).unwrap().is_none());
        assert!(matches!(
            state.must_exist(&key),
            Err(LedgerError::StateNotFound(_))
        ));
        assert!(state.is_empty());
    }
}
