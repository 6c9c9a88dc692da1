use serde::{Deserialize, Serialize};
use std::fmt;

use sto_core::{Address, ContractId, CurrencyId, Partition};

const STO_PREFIX: &str = "sto";
const KYC_PREFIX: &str = "kyc";

/// Deterministic key of one state entry
///
/// Keys are `:`-joined tuples ending in a record suffix. Identifiers never
/// contain `:`, so two distinct tuples never produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey(String);

impl StateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    fn sto(contract: &Address, sto_id: &ContractId, rest: &[&str], suffix: &str) -> Self {
        let mut key = format!("{}:{}:{}", STO_PREFIX, contract, sto_id);
        for part in rest {
            key.push(':');
            key.push_str(part);
        }
        key.push(':');
        key.push_str(suffix);
        StateKey(key)
    }

    pub fn design(contract: &Address, sto_id: &ContractId) -> Self {
        Self::sto(contract, sto_id, &[], "design")
    }

    pub fn partition_balance(contract: &Address, sto_id: &ContractId, partition: &Partition) -> Self {
        Self::sto(contract, sto_id, &[partition.as_str()], "partitionbalance")
    }

    pub fn token_holder_partitions(contract: &Address, sto_id: &ContractId, holder: &Address) -> Self {
        Self::sto(contract, sto_id, &[holder.as_str()], "tokenholderpartitions")
    }

    pub fn token_holder_partition_balance(
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
    ) -> Self {
        Self::sto(
            contract,
            sto_id,
            &[holder.as_str(), partition.as_str()],
            "tokenholderpartitionbalance",
        )
    }

    pub fn token_holder_partition_operators(
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
    ) -> Self {
        Self::sto(
            contract,
            sto_id,
            &[holder.as_str(), partition.as_str()],
            "tokenholderpartitionoperators",
        )
    }

    pub fn operator_token_holders(
        contract: &Address,
        sto_id: &ContractId,
        operator: &Address,
        partition: &Partition,
    ) -> Self {
        Self::sto(
            contract,
            sto_id,
            &[operator.as_str(), partition.as_str()],
            "operatortokenholders",
        )
    }

    pub fn kyc_design(contract: &Address, kyc_id: &ContractId) -> Self {
        StateKey(format!("{}:{}:{}:design", KYC_PREFIX, contract, kyc_id))
    }

    pub fn customer(contract: &Address, kyc_id: &ContractId, customer: &Address) -> Self {
        StateKey(format!(
            "{}:{}:{}:{}:customer",
            KYC_PREFIX, contract, kyc_id, customer
        ))
    }

    pub fn account(address: &Address) -> Self {
        StateKey(format!("{}:account", address))
    }

    pub fn contract_account(address: &Address) -> Self {
        StateKey(format!("{}:contractaccount", address))
    }

    pub fn currency_design(currency: &CurrencyId) -> Self {
        StateKey(format!("{}:currencydesign", currency))
    }

    pub fn balance(address: &Address, currency: &CurrencyId) -> Self {
        StateKey(format!("{}:{}:balance", address, currency))
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
