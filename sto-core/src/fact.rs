use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::amount::Amount;
use crate::config::EngineConfig;
use crate::error::LedgerError;
use crate::id::{Address, ContractId, CurrencyId, FactHash, Partition, PublicKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecurityTokensItem {
    pub contract: Address,
    pub sto_id: ContractId,
    pub granularity: u64,
    pub default_partition: Partition,
    pub controllers: Vec<Address>,
    pub currency: CurrencyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSecurityTokensItem {
    pub contract: Address,
    pub sto_id: ContractId,
    pub receiver: Address,
    pub amount: Amount,
    pub partition: Partition,
    pub currency: CurrencyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemTokensItem {
    pub contract: Address,
    pub sto_id: ContractId,
    pub tokenholder: Address,
    pub amount: Amount,
    pub partition: Partition,
    pub currency: CurrencyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSecurityTokensPartitionItem {
    pub contract: Address,
    pub sto_id: ContractId,
    pub tokenholder: Address,
    pub receiver: Address,
    pub partition: Partition,
    pub amount: Amount,
    pub currency: CurrencyId,
}

/// Item of an authorize or revoke operator operation. The holder is the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorItem {
    pub contract: Address,
    pub sto_id: ContractId,
    pub operator: Address,
    pub partition: Partition,
    pub currency: CurrencyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDocumentFact {
    pub contract: Address,
    pub sto_id: ContractId,
    pub title: String,
    pub uri: String,
    pub document_hash: String,
    pub currency: CurrencyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateKycServiceFact {
    pub contract: Address,
    pub kyc_id: ContractId,
    pub controllers: Vec<Address>,
    pub currency: CurrencyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerItem {
    pub contract: Address,
    pub kyc_id: ContractId,
    pub controller: Address,
    pub currency: CurrencyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerItem {
    pub contract: Address,
    pub kyc_id: ContractId,
    pub customer: Address,
    pub status: bool,
    pub currency: CurrencyId,
}

/// Every kind of operation the engine accepts, with its typed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactBody {
    CreateSecurityTokens(Vec<CreateSecurityTokensItem>),
    IssueSecurityTokens(Vec<IssueSecurityTokensItem>),
    RedeemTokens(Vec<RedeemTokensItem>),
    TransferSecurityTokensPartition(Vec<TransferSecurityTokensPartitionItem>),
    AuthorizeOperators(Vec<OperatorItem>),
    RevokeOperators(Vec<OperatorItem>),
    SetDocument(SetDocumentFact),
    CreateKycService(CreateKycServiceFact),
    AddControllers(Vec<ControllerItem>),
    RemoveControllers(Vec<ControllerItem>),
    AddCustomers(Vec<CustomerItem>),
    UpdateCustomers(Vec<CustomerItem>),
}

impl FactBody {
    pub fn kind(&self) -> &'static str {
        match self {
            FactBody::CreateSecurityTokens(_) => "create-security-tokens",
            FactBody::IssueSecurityTokens(_) => "issue-security-tokens",
            FactBody::RedeemTokens(_) => "redeem-tokens",
            FactBody::TransferSecurityTokensPartition(_) => "transfer-security-tokens-partition",
            FactBody::AuthorizeOperators(_) => "authorize-operators",
            FactBody::RevokeOperators(_) => "revoke-operators",
            FactBody::SetDocument(_) => "set-document",
            FactBody::CreateKycService(_) => "create-kyc-service",
            FactBody::AddControllers(_) => "add-controllers",
            FactBody::RemoveControllers(_) => "remove-controllers",
            FactBody::AddCustomers(_) => "add-customers",
            FactBody::UpdateCustomers(_) => "update-customers",
        }
    }

    /// Fee currency of every item, in item order
    pub fn currencies(&self) -> Vec<CurrencyId> {
        fn collect<T>(items: &[T], f: impl Fn(&T) -> &CurrencyId) -> Vec<CurrencyId> {
            items.iter().map(|i| f(i).clone()).collect()
        }

        match self {
            FactBody::CreateSecurityTokens(items) => collect(items, |i| &i.currency),
            FactBody::IssueSecurityTokens(items) => collect(items, |i| &i.currency),
            FactBody::RedeemTokens(items) => collect(items, |i| &i.currency),
            FactBody::TransferSecurityTokensPartition(items) => collect(items, |i| &i.currency),
            FactBody::AuthorizeOperators(items) | FactBody::RevokeOperators(items) => {
                collect(items, |i| &i.currency)
            }
            FactBody::SetDocument(fact) => vec![fact.currency.clone()],
            FactBody::CreateKycService(fact) => vec![fact.currency.clone()],
            FactBody::AddControllers(items) | FactBody::RemoveControllers(items) => {
                collect(items, |i| &i.currency)
            }
            FactBody::AddCustomers(items) | FactBody::UpdateCustomers(items) => {
                collect(items, |i| &i.currency)
            }
        }
    }

    /// Structural validation of the payload, independent of ledger state
    pub fn validate(&self, sender: &Address, config: &EngineConfig) -> Result<(), LedgerError> {
        match self {
            FactBody::CreateSecurityTokens(items) => {
                check_item_count(items.len(), config)?;
                let mut seen = BTreeSet::new();
                for item in items {
                    check_contract(&item.contract, &item.sto_id, sender)?;
                    if item.granularity == 0 {
                        return Err(LedgerError::Validation("zero granularity".to_string()));
                    }
                    item.default_partition.validate()?;
                    check_addresses(&item.controllers, config.max_controllers, "controllers")?;
                    item.currency.validate()?;
                    check_unique(&mut seen, (&item.contract, &item.sto_id))?;
                }
            }
            FactBody::IssueSecurityTokens(items) => {
                check_item_count(items.len(), config)?;
                for item in items {
                    check_contract(&item.contract, &item.sto_id, sender)?;
                    item.receiver.validate()?;
                    if item.receiver == item.contract {
                        return Err(LedgerError::Validation(
                            "receiver is the contract account".to_string(),
                        ));
                    }
                    check_amount(&item.amount)?;
                    item.partition.validate()?;
                    item.currency.validate()?;
                }
            }
            FactBody::RedeemTokens(items) => {
                check_item_count(items.len(), config)?;
                for item in items {
                    check_contract(&item.contract, &item.sto_id, sender)?;
                    item.tokenholder.validate()?;
                    check_amount(&item.amount)?;
                    item.partition.validate()?;
                    item.currency.validate()?;
                }
            }
            FactBody::TransferSecurityTokensPartition(items) => {
                check_item_count(items.len(), config)?;
                for item in items {
                    check_contract(&item.contract, &item.sto_id, sender)?;
                    item.tokenholder.validate()?;
                    item.receiver.validate()?;
                    if item.receiver == item.tokenholder {
                        return Err(LedgerError::Validation(format!(
                            "receiver is the tokenholder, {}",
                            item.receiver
                        )));
                    }
                    check_amount(&item.amount)?;
                    item.partition.validate()?;
                    item.currency.validate()?;
                }
            }
            FactBody::AuthorizeOperators(items) | FactBody::RevokeOperators(items) => {
                check_item_count(items.len(), config)?;
                let mut seen = BTreeSet::new();
                for item in items {
                    check_contract(&item.contract, &item.sto_id, sender)?;
                    item.operator.validate()?;
                    if &item.operator == sender {
                        return Err(LedgerError::Validation(format!(
                            "operator is the sender, {}",
                            sender
                        )));
                    }
                    item.partition.validate()?;
                    item.currency.validate()?;
                    check_unique(
                        &mut seen,
                        (&item.contract, &item.sto_id, &item.operator, &item.partition),
                    )?;
                }
            }
            FactBody::SetDocument(fact) => {
                check_contract(&fact.contract, &fact.sto_id, sender)?;
                check_text(&fact.title, "title", config.max_document_field)?;
                check_text(&fact.uri, "uri", config.max_document_field)?;
                if fact.document_hash.is_empty() {
                    return Err(LedgerError::Validation("empty document hash".to_string()));
                }
                fact.currency.validate()?;
            }
            FactBody::CreateKycService(fact) => {
                check_contract(&fact.contract, &fact.kyc_id, sender)?;
                check_addresses(&fact.controllers, config.max_controllers, "controllers")?;
                if fact.controllers.contains(&fact.contract) {
                    return Err(LedgerError::Validation(
                        "contract account named as kyc controller".to_string(),
                    ));
                }
                fact.currency.validate()?;
            }
            FactBody::AddControllers(items) | FactBody::RemoveControllers(items) => {
                check_item_count(items.len(), config)?;
                let mut seen = BTreeSet::new();
                for item in items {
                    check_contract(&item.contract, &item.kyc_id, sender)?;
                    item.controller.validate()?;
                    if item.controller == item.contract {
                        return Err(LedgerError::Validation(
                            "contract account named as kyc controller".to_string(),
                        ));
                    }
                    item.currency.validate()?;
                    check_unique(&mut seen, (&item.contract, &item.kyc_id, &item.controller))?;
                }
            }
            FactBody::AddCustomers(items) | FactBody::UpdateCustomers(items) => {
                check_item_count(items.len(), config)?;
                let mut seen = BTreeSet::new();
                for item in items {
                    check_contract(&item.contract, &item.kyc_id, sender)?;
                    item.customer.validate()?;
                    item.currency.validate()?;
                    check_unique(&mut seen, (&item.contract, &item.kyc_id, &item.customer))?;
                }
            }
        }
        Ok(())
    }
}

fn check_item_count(len: usize, config: &EngineConfig) -> Result<(), LedgerError> {
    if len == 0 {
        return Err(LedgerError::Validation("empty items".to_string()));
    }
    if len > config.max_items {
        return Err(LedgerError::Validation(format!(
            "items over allowed, {} > {}",
            len, config.max_items
        )));
    }
    Ok(())
}

fn check_contract(contract: &Address, id: &ContractId, sender: &Address) -> Result<(), LedgerError> {
    contract.validate()?;
    id.validate()?;
    if contract == sender {
        return Err(LedgerError::Validation(format!(
            "contract address is same with sender, {}",
            sender
        )));
    }
    Ok(())
}

fn check_amount(amount: &Amount) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::Validation("zero amount".to_string()));
    }
    Ok(())
}

fn check_addresses(addresses: &[Address], max: usize, what: &str) -> Result<(), LedgerError> {
    if addresses.len() > max {
        return Err(LedgerError::Validation(format!(
            "{} over allowed, {} > {}",
            what,
            addresses.len(),
            max
        )));
    }
    let mut seen = BTreeSet::new();
    for address in addresses {
        address.validate()?;
        if !seen.insert(address) {
            return Err(LedgerError::Validation(format!(
                "duplicate address in {}, {}",
                what, address
            )));
        }
    }
    Ok(())
}

fn check_text(value: &str, what: &str, max: usize) -> Result<(), LedgerError> {
    if value.is_empty() {
        return Err(LedgerError::Validation(format!("empty document {}", what)));
    }
    if value.len() > max {
        return Err(LedgerError::Validation(format!(
            "document {} too long, {} > {}",
            what,
            value.len(),
            max
        )));
    }
    Ok(())
}

fn check_unique<K: Ord + std::fmt::Debug>(seen: &mut BTreeSet<K>, key: K) -> Result<(), LedgerError> {
    let description = format!("{:?}", key);
    if !seen.insert(key) {
        return Err(LedgerError::Validation(format!(
            "duplicate item found, {}",
            description
        )));
    }
    Ok(())
}

/// Immutable, content-addressed intent of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Opaque per-operation token
    pub token: Vec<u8>,
    pub sender: Address,
    pub body: FactBody,
}

impl Fact {
    pub fn new(token: impl Into<Vec<u8>>, sender: Address, body: FactBody) -> Self {
        Self {
            token: token.into(),
            sender,
            body,
        }
    }

    /// Content address of the fact
    pub fn hash(&self) -> Result<FactHash, LedgerError> {
        let encoded = bincode::serialize(self)?;
        Ok(FactHash::digest(&[&encoded]))
    }

    pub fn validate(&self, config: &EngineConfig) -> Result<(), LedgerError> {
        if self.token.is_empty() {
            return Err(LedgerError::Validation("empty fact token".to_string()));
        }
        self.sender.validate()?;
        self.body.validate(&self.sender, config)
    }
}

/// Detached signature, already verified by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sign {
    pub signer: PublicKey,
    pub signature: Vec<u8>,
}

/// A fact together with the signatures collected for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub fact: Fact,
    pub signs: Vec<Sign>,
}

impl Operation {
    pub fn new(fact: Fact) -> Self {
        Self {
            fact,
            signs: Vec::new(),
        }
    }

    pub fn signed_by(mut self, signer: PublicKey, signature: impl Into<Vec<u8>>) -> Self {
        self.signs.push(Sign {
            signer,
            signature: signature.into(),
        });
        self
    }

    pub fn signers(&self) -> impl Iterator<Item = &PublicKey> + Clone {
        self.signs.iter().map(|s| &s.signer)
    }
}
