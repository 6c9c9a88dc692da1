pub mod auth;
pub mod fee;
pub mod kyc;
pub mod ledger;
pub mod processor;
pub mod registry;
pub mod sto_ops;
pub mod testing;

// Re-export the main types for convenience
pub use fee::{CurrencyLedger, StateCurrencyLedger};
pub use ledger::outstanding_supply;
pub use processor::{execute, OperationProcessor, ProcessorState};
pub use registry::Registry;
