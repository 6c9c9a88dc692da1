use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::id::{Address, ContractId, Partition};

/// Document attached to a security token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub uri: String,
    pub document_hash: String,
}

/// Mutable rule set of a security token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Globally registered partitions of the token
    pub partitions: Vec<Partition>,
    /// Outstanding supply across all holders and partitions
    pub aggregate: Amount,
    /// Addresses allowed to act for any holder
    pub controllers: Vec<Address>,
    /// Attached documents, in attachment order
    pub documents: Vec<Document>,
}

impl Policy {
    pub fn new(partitions: Vec<Partition>, controllers: Vec<Address>) -> Self {
        Self {
            partitions,
            aggregate: Amount::zero(),
            controllers,
            documents: Vec::new(),
        }
    }

    pub fn is_controller(&self, address: &Address) -> bool {
        self.controllers.contains(address)
    }

    pub fn has_partition(&self, partition: &Partition) -> bool {
        self.partitions.contains(partition)
    }

    pub fn document(&self, document_hash: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.document_hash == document_hash)
    }
}

/// Persistent configuration of one security token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    pub asset_id: ContractId,
    pub granularity: u64,
    pub policy: Policy,
}

impl Design {
    pub fn new(asset_id: ContractId, granularity: u64, policy: Policy) -> Self {
        Self {
            asset_id,
            granularity,
            policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycPolicy {
    pub controllers: Vec<Address>,
}

/// Configuration of a KYC service hosted by a contract account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycDesign {
    pub kyc_id: ContractId,
    pub policy: KycPolicy,
}

impl KycDesign {
    pub fn new(kyc_id: ContractId, controllers: Vec<Address>) -> Self {
        Self {
            kyc_id,
            policy: KycPolicy { controllers },
        }
    }

    pub fn controllers(&self) -> &[Address] {
        &self.policy.controllers
    }
}
