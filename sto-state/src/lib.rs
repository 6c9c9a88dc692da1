pub mod accessor;
pub mod keys;
pub mod memory;
pub mod values;
pub mod working_set;

#[cfg(feature = "rocksdb")]
pub mod rocksdb;

// Re-export the main types for convenience
pub use accessor::{MergeValue, StateAccessor, StateReader};
pub use keys::StateKey;
pub use memory::MemoryState;
pub use values::{
    CurrencyBalance, CustomerStatus, OperatorTokenHolders, PartitionBalance, StateRecord,
    StateValue, TokenHolderPartitionBalance, TokenHolderPartitionOperators, TokenHolderPartitions,
};
pub use working_set::WorkingSet;

#[cfg(feature = "rocksdb")]
pub use crate::rocksdb::RocksDbState;
