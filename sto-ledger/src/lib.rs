//! Security token ledger extension
//!
//! This crate re-exports the core types, the state layer and the operation
//! processing engine.

pub use sto_core::*;
pub use sto_runtime::*;
pub use sto_state::*;
