//! Partitioned balance arithmetic.
//!
//! Every mutation keeps the holder partition sets in step with the balances
//! and keeps `Policy.aggregate` equal to the outstanding supply.

use log::debug;
use std::collections::BTreeMap;

use sto_core::{Address, Amount, ContractId, Design, LedgerError, Partition};
use sto_state::{StateAccessor, StateKey, StateReader, TokenHolderPartitionBalance, TokenHolderPartitions};

use crate::auth::{require_acts_for_contract_policy, require_acts_for_holder};
use crate::registry::{insert_member, remove_member, Registry};

pub fn check_granularity(design: &Design, amount: &Amount) -> Result<(), LedgerError> {
    if amount.is_multiple_of(design.granularity) {
        Ok(())
    } else {
        Err(LedgerError::GranularityViolation {
            amount: *amount,
            granularity: design.granularity,
        })
    }
}

fn insufficient(key: StateKey, required: Amount, available: Amount) -> LedgerError {
    LedgerError::InsufficientPartitionBalance {
        key: key.to_string(),
        required,
        available,
    }
}

fn overflow(what: &str, key: &StateKey) -> LedgerError {
    LedgerError::InternalInconsistency(format!("{} overflow at {}", what, key))
}

/// Amounts an operation takes out of holder balances and partition supplies,
/// summed per key so each key is checked once against the snapshot
#[derive(Debug, Default)]
pub struct BatchDebits {
    holders: BTreeMap<(Address, ContractId, Address, Partition), Amount>,
    supplies: BTreeMap<(Address, ContractId, Partition), Amount>,
}

impl BatchDebits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debit_holder(&mut self, contract: &Address, sto_id: &ContractId, holder: &Address, partition: &Partition, amount: Amount) {
        let total = self
            .holders
            .entry((contract.clone(), sto_id.clone(), holder.clone(), partition.clone()))
            .or_default();
        // A saturated total exceeds every balance and is rejected below
        *total = total.saturating_add(amount);
    }

    pub fn debit_supply(&mut self, contract: &Address, sto_id: &ContractId, partition: &Partition, amount: Amount) {
        let total = self
            .supplies
            .entry((contract.clone(), sto_id.clone(), partition.clone()))
            .or_default();
        *total = total.saturating_add(amount);
    }

    /// Fail with `InsufficientPartitionBalance` if any summed debit exceeds
    /// what the state holds
    pub fn check<S: StateAccessor>(&self, registry: &Registry<S>) -> Result<(), LedgerError> {
        for ((contract, sto_id, holder, partition), required) in &self.holders {
            let available = registry.balance(contract, sto_id, holder, partition)?;
            if available < *required {
                return Err(insufficient(
                    StateKey::token_holder_partition_balance(contract, sto_id, holder, partition),
                    *required,
                    available,
                ));
            }
        }
        for ((contract, sto_id, partition), required) in &self.supplies {
            let available = registry.partition_supply(contract, sto_id, partition)?;
            if available < *required {
                return Err(insufficient(
                    StateKey::partition_balance(contract, sto_id, partition),
                    *required,
                    available,
                ));
            }
        }
        Ok(())
    }
}

/// Move `amount` of `partition` from `from` to `to`
#[allow(clippy::too_many_arguments)]
pub fn transfer<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    contract: &Address,
    sto_id: &ContractId,
    partition: &Partition,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> Result<(), LedgerError> {
    let design = registry.design(contract, sto_id)?;
    registry.require_plain_account(from)?;
    registry.require_plain_account(to)?;
    check_granularity(&design, &amount)?;
    require_acts_for_holder(registry, sender, from, contract, sto_id, partition, &design.policy)?;

    let from_key = StateKey::token_holder_partition_balance(contract, sto_id, from, partition);
    let from_balance = registry.balance(contract, sto_id, from, partition)?;
    let remaining = from_balance
        .checked_sub(amount)
        .ok_or_else(|| insufficient(from_key, amount, from_balance))?;

    let to_key = StateKey::token_holder_partition_balance(contract, sto_id, to, partition);
    let to_balance = registry.balance(contract, sto_id, to, partition)?;
    let received = to_balance
        .checked_add(amount)
        .ok_or_else(|| overflow("balance", &to_key))?;

    registry.put_balance(contract, sto_id, from, partition, remaining);
    registry.put_balance(contract, sto_id, to, partition, received);

    if remaining.is_zero() {
        registry.on_balance_zero(contract, sto_id, from, partition)?;
    }
    if to_balance.is_zero() {
        registry.on_balance_nonzero_from_zero(contract, sto_id, to, partition)?;
    }

    debug!(
        "Transferred {} of {}/{}/{} from {} to {}",
        amount, contract, sto_id, partition, from, to
    );
    Ok(())
}

/// Extinguish `amount` of `partition` held by `holder`
///
/// When the holder's balance reaches zero the partition leaves
/// `Policy.partitions`, even if other holders still carry it.
pub fn redeem<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    contract: &Address,
    sto_id: &ContractId,
    partition: &Partition,
    holder: &Address,
    amount: Amount,
) -> Result<(), LedgerError> {
    let mut design = registry.design(contract, sto_id)?;
    registry.require_plain_account(holder)?;
    check_granularity(&design, &amount)?;
    require_acts_for_holder(registry, sender, holder, contract, sto_id, partition, &design.policy)?;

    let balance_key = StateKey::token_holder_partition_balance(contract, sto_id, holder, partition);
    let balance = registry.balance(contract, sto_id, holder, partition)?;
    let remaining = balance
        .checked_sub(amount)
        .ok_or_else(|| insufficient(balance_key, amount, balance))?;

    let supply_key = StateKey::partition_balance(contract, sto_id, partition);
    let supply = registry.partition_supply(contract, sto_id, partition)?;
    let supply_left = supply
        .checked_sub(amount)
        .ok_or_else(|| insufficient(supply_key, amount, supply))?;

    design.policy.aggregate = design.policy.aggregate.checked_sub(amount).ok_or_else(|| {
        LedgerError::InternalInconsistency(format!(
            "aggregate of {}/{} below redeemed amount {}",
            contract, sto_id, amount
        ))
    })?;

    registry.put_balance(contract, sto_id, holder, partition, remaining);
    registry.put_partition_supply(contract, sto_id, partition, supply_left);

    if remaining.is_zero() {
        registry.on_balance_zero(contract, sto_id, holder, partition)?;
        // Redemption is the only place the registered partition set shrinks
        remove_member(&mut design.policy.partitions, partition);
    }
    registry.put_design(contract, design);

    debug!(
        "Redeemed {} of {}/{}/{} held by {}",
        amount, contract, sto_id, partition, holder
    );
    Ok(())
}

/// Create `amount` of `partition` for `receiver`
pub fn issue<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    contract: &Address,
    sto_id: &ContractId,
    partition: &Partition,
    receiver: &Address,
    amount: Amount,
) -> Result<(), LedgerError> {
    let mut design = registry.design(contract, sto_id)?;
    require_acts_for_contract_policy(registry, sender, contract, sto_id, &design.policy.controllers)?;
    registry.require_plain_account(receiver)?;
    check_granularity(&design, &amount)?;

    let balance_key = StateKey::token_holder_partition_balance(contract, sto_id, receiver, partition);
    let balance = registry.balance(contract, sto_id, receiver, partition)?;
    let received = balance
        .checked_add(amount)
        .ok_or_else(|| overflow("balance", &balance_key))?;

    let supply_key = StateKey::partition_balance(contract, sto_id, partition);
    let supply = registry
        .partition_supply(contract, sto_id, partition)?
        .checked_add(amount)
        .ok_or_else(|| overflow("partition supply", &supply_key))?;

    design.policy.aggregate = design
        .policy
        .aggregate
        .checked_add(amount)
        .ok_or_else(|| overflow("aggregate", &StateKey::design(contract, sto_id)))?;
    insert_member(&mut design.policy.partitions, partition.clone());

    registry.put_balance(contract, sto_id, receiver, partition, received);
    registry.put_partition_supply(contract, sto_id, partition, supply);
    registry.put_design(contract, design);

    if balance.is_zero() {
        registry.on_balance_nonzero_from_zero(contract, sto_id, receiver, partition)?;
    }

    debug!(
        "Issued {} of {}/{}/{} to {}",
        amount, contract, sto_id, partition, receiver
    );
    Ok(())
}

/// Sum of every partition balance held by `holders`
///
/// Equals `Policy.aggregate` when `holders` covers every holder of the token.
pub fn outstanding_supply<S: StateAccessor + ?Sized>(
    state: &S,
    contract: &Address,
    sto_id: &ContractId,
    holders: &[Address],
) -> Result<Amount, LedgerError> {
    let mut total = Amount::zero();
    for holder in holders {
        let partitions = state
            .get::<TokenHolderPartitions>(&StateKey::token_holder_partitions(contract, sto_id, holder))?
            .map(|p| p.0)
            .unwrap_or_default();
        for partition in &partitions {
            let key = StateKey::token_holder_partition_balance(contract, sto_id, holder, partition);
            let balance = state
                .get::<TokenHolderPartitionBalance>(&key)?
                .map(|b| b.0)
                .unwrap_or_default();
            total = total
                .checked_add(balance)
                .ok_or_else(|| overflow("outstanding supply", &key))?;
        }
    }
    Ok(total)
}
