pub mod account;
pub mod amount;
pub mod config;
pub mod design;
pub mod error;
pub mod fact;
pub mod id;

// Re-export the main types for convenience
pub use account::{Account, AccountKey, AccountKeys, ContractAccount, CurrencyDesign, FeePolicy};
pub use amount::Amount;
pub use config::EngineConfig;
pub use design::{Design, Document, KycDesign, KycPolicy, Policy};
pub use error::{LedgerError, RoleContext};
pub use fact::{
    ControllerItem, CreateKycServiceFact, CreateSecurityTokensItem, CustomerItem, Fact, FactBody,
    IssueSecurityTokensItem, Operation, OperatorItem, RedeemTokensItem, SetDocumentFact, Sign,
    TransferSecurityTokensPartitionItem,
};
pub use id::{Address, ContractId, CurrencyId, FactHash, Partition, PublicKey};
