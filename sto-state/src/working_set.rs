use log::debug;
use std::collections::HashMap;

use sto_core::LedgerError;

use crate::accessor::{MergeValue, StateAccessor};
use crate::keys::StateKey;
use crate::values::{StateRecord, StateValue};

/// Owned write overlay over a read-only snapshot
///
/// Reads see the latest value put into the overlay, falling back to the
/// snapshot. Every key written is recorded once, in first-write order, and
/// its last value is what [`WorkingSet::into_merge_values`] emits.
pub struct WorkingSet<S: StateAccessor> {
    base: S,
    overlay: HashMap<StateKey, StateValue>,
    order: Vec<StateKey>,
}

impl<S: StateAccessor> WorkingSet<S> {
    pub fn new(base: S) -> Self {
        Self {
            base,
            overlay: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Replace the value at `key`
    pub fn put<T: StateRecord>(&mut self, key: StateKey, record: T) {
        self.put_value(key, record.into_value());
    }

    pub fn put_value(&mut self, key: StateKey, value: StateValue) {
        if !self.overlay.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.overlay.insert(key, value);
    }

    pub fn is_dirty(&self, key: &StateKey) -> bool {
        self.overlay.contains_key(key)
    }

    pub fn dirty_len(&self) -> usize {
        self.order.len()
    }

    /// Final value of every written key, in first-write order
    pub fn into_merge_values(mut self) -> Vec<MergeValue> {
        debug!("Collecting {} merge values from working set", self.order.len());

        let mut merged = Vec::with_capacity(self.order.len());
        for key in self.order {
            if let Some(value) = self.overlay.remove(&key) {
                merged.push(MergeValue { key, value });
            }
        }
        merged
    }
}

impl<S: StateAccessor> StateAccessor for WorkingSet<S> {
    fn get_raw(&self, key: &StateKey) -> Result<Option<Vec<u8>>, LedgerError> {
        match self.overlay.get(key) {
            Some(value) => Ok(Some(value.encode()?)),
            None => self.base.get_raw(key),
        }
    }

    fn get_value(&self, key: &StateKey) -> Result<Option<StateValue>, LedgerError> {
        match self.overlay.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => self.base.get_value(key),
        }
    }

    fn contains(&self, key: &StateKey) -> Result<bool, LedgerError> {
        if self.overlay.contains_key(key) {
            return Ok(true);
        }
        self.base.contains(key)
    }
}
