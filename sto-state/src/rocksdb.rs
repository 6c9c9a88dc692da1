#[cfg(feature = "rocksdb")]
use anyhow::Context;
#[cfg(feature = "rocksdb")]
use log::debug;
#[cfg(feature = "rocksdb")]
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
#[cfg(feature = "rocksdb")]
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
#[cfg(feature = "rocksdb")]
use sto_core::LedgerError;

#[cfg(feature = "rocksdb")]
use crate::accessor::{MergeValue, StateAccessor};
#[cfg(feature = "rocksdb")]
use crate::keys::StateKey;
#[cfg(feature = "rocksdb")]
use crate::values::StateRecord;

#[cfg(feature = "rocksdb")]
// Column family holding every state entry
const CF_STATE: &str = "state";

#[cfg(feature = "rocksdb")]
/// RocksDB implementation of the state accessor
pub struct RocksDbState {
    db: Arc<DB>,
    db_path: PathBuf,
}

#[cfg(feature = "rocksdb")]
impl RocksDbState {
    /// Opens or creates a RocksDB state store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db_path = path.as_ref().to_path_buf();

        // Set up database options
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_state = ColumnFamilyDescriptor::new(CF_STATE, Options::default());

        let db = DB::open_cf_descriptors(&opts, &db_path, vec![cf_state])
            .with_context(|| format!("Failed to open RocksDB database at {:?}", db_path))?;

        debug!("Opened RocksDB state at {:?}", db_path);

        Ok(Self {
            db: Arc::new(db),
            db_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn state_cf(&self) -> Result<&ColumnFamily, LedgerError> {
        self.db
            .cf_handle(CF_STATE)
            .ok_or_else(|| LedgerError::StateAccess("State column family not found".to_string()))
    }

    /// Seed a single record, replacing any previous value
    pub fn insert<T: StateRecord>(&self, key: StateKey, record: T) -> Result<(), LedgerError> {
        self.commit(&[MergeValue::new(key, record)])
    }

    /// Write the outputs of one operation in a single atomic batch
    pub fn commit(&self, merge_values: &[MergeValue]) -> Result<(), LedgerError> {
        let cf = self.state_cf()?;

        let mut batch = WriteBatch::default();
        for mv in merge_values {
            batch.put_cf(cf, mv.key.as_bytes(), mv.value.encode()?);
        }

        self.db
            .write(batch)
            .map_err(|e| LedgerError::StateAccess(format!("Failed to commit batch: {}", e)))?;

        debug!("Committed {} state values to {:?}", merge_values.len(), self.db_path);
        Ok(())
    }
}

#[cfg(feature = "rocksdb")]
impl StateAccessor for RocksDbState {
    fn get_raw(&self, key: &StateKey) -> Result<Option<Vec<u8>>, LedgerError> {
        let cf = self.state_cf()?;
        self.db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| LedgerError::StateAccess(format!("Failed to read {}: {}", key, e)))
    }
}

#[cfg(all(test, feature = "rocksdb"))]
mod tests {
    use super::*;
    use crate::accessor::StateReader;
    use crate::values::{CustomerStatus, TokenHolderPartitions};
    use sto_core::{Address, ContractId, Partition};
    use tempfile::tempdir;

    #[test]
    fn test_commit_and_reopen() {
        let dir = tempdir().unwrap();
        let contract = Address::new("issuer");
        let sto = ContractId::new("STO01");
        let holder = Address::new("alice");
        let partitions_key = StateKey::token_holder_partitions(&contract, &sto, &holder);
        let customer_key = StateKey::customer(&contract, &ContractId::new("KYC01"), &holder);

        {
            let state = RocksDbState::new(dir.path()).unwrap();
            state
                .commit(&[
                    MergeValue::new(
                        partitions_key.clone(),
                        TokenHolderPartitions(vec![Partition::new("p1")]),
                    ),
                    MergeValue::new(customer_key.clone(), CustomerStatus(true)),
                ])
                .unwrap();
        }

        let state = RocksDbState::new(dir.path()).unwrap();
        let partitions: TokenHolderPartitions = state.must_get(&partitions_key).unwrap();
        assert_eq!(partitions.0, vec![Partition::new("p1")]);
        assert!(state.must_exist(&customer_key).is_ok());
        assert!(state
            .must_not_exist(&StateKey::account(&holder))
            .is_ok());
    }
}
