use sto_core::{Address, ContractId, LedgerError, Partition, Policy, RoleContext};
use sto_state::StateAccessor;

use crate::registry::Registry;

/// Whether `sender` may act for `holder`: the holder itself, a token
/// controller, or an operator the holder delegated the partition to.
pub fn acts_for_holder(
    sender: &Address,
    holder: &Address,
    controllers: &[Address],
    operators: &[Address],
) -> bool {
    sender == holder || controllers.contains(sender) || operators.contains(sender)
}

/// Whether `sender` may act on a contract-scoped policy: the contract owner
/// or one of the policy controllers.
pub fn acts_for_contract_policy(sender: &Address, owner: &Address, controllers: &[Address]) -> bool {
    sender == owner || controllers.contains(sender)
}

/// Fail with `Unauthorized` unless `sender` acts for `holder` on `partition`
pub fn require_acts_for_holder<S: StateAccessor>(
    registry: &Registry<S>,
    sender: &Address,
    holder: &Address,
    contract: &Address,
    sto_id: &ContractId,
    partition: &Partition,
    policy: &Policy,
) -> Result<(), LedgerError> {
    // Cheap checks first, operators only when needed
    if sender == holder || policy.is_controller(sender) {
        return Ok(());
    }
    let operators = registry.operators(contract, sto_id, holder, partition)?;
    if acts_for_holder(sender, holder, &policy.controllers, &operators) {
        return Ok(());
    }
    Err(LedgerError::Unauthorized(
        RoleContext::new(sender, contract, sto_id).with_partition(partition),
    ))
}

/// Fail with `Unauthorized` unless `sender` owns the contract account or
/// controls the policy
pub fn require_acts_for_contract_policy<S: StateAccessor>(
    registry: &Registry<S>,
    sender: &Address,
    contract: &Address,
    id: &ContractId,
    controllers: &[Address],
) -> Result<(), LedgerError> {
    let owner = contract_owner(registry, contract)?;
    if acts_for_contract_policy(sender, &owner, controllers) {
        return Ok(());
    }
    Err(LedgerError::Unauthorized(RoleContext::new(sender, contract, id)))
}

/// Fail with `Unauthorized` unless `sender` owns the active contract account
pub fn require_contract_owner<S: StateAccessor>(
    registry: &Registry<S>,
    sender: &Address,
    contract: &Address,
    id: &ContractId,
) -> Result<(), LedgerError> {
    let account = registry
        .contract_account(contract)?
        .ok_or_else(|| LedgerError::StateNotFound(format!("contract account {}", contract)))?;
    if account.is_active && &account.owner == sender {
        return Ok(());
    }
    Err(LedgerError::Unauthorized(RoleContext::new(sender, contract, id)))
}

fn contract_owner<S: StateAccessor>(registry: &Registry<S>, contract: &Address) -> Result<Address, LedgerError> {
    registry
        .contract_account(contract)?
        .map(|account| account.owner)
        .ok_or_else(|| LedgerError::StateNotFound(format!("contract account {}", contract)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sto_core::ContractAccount;
    use sto_state::{MemoryState, StateKey};

    #[test]
    fn test_acts_for_holder() {
        let holder = Address::new("alice");
        let controller = Address::new("ctrl");
        let operator = Address::new("bob");
        let stranger = Address::new("mallory");
        let controllers = vec![controller.clone()];
        let operators = vec![operator.clone()];

        assert!(acts_for_holder(&holder, &holder, &controllers, &operators));
        assert!(acts_for_holder(&controller, &holder, &controllers, &operators));
        assert!(acts_for_holder(&operator, &holder, &controllers, &operators));
        assert!(!acts_for_holder(&stranger, &holder, &controllers, &operators));
    }

    #[test]
    fn test_acts_for_contract_policy() {
        let owner = Address::new("owner");
        let controller = Address::new("ctrl");
        let controllers = vec![controller.clone()];

        assert!(acts_for_contract_policy(&owner, &owner, &controllers));
        assert!(acts_for_contract_policy(&controller, &owner, &controllers));
        assert!(!acts_for_contract_policy(&Address::new("x"), &owner, &controllers));
    }

    #[test]
    fn test_unauthorized_carries_context() {
        let contract = Address::new("issuer");
        let sto = ContractId::new("STO01");
        let p1 = Partition::new("p1");
        let snapshot = MemoryState::new();
        let registry = Registry::new(&snapshot);
        let policy = Policy::new(vec![p1.clone()], vec![]);

        let err = require_acts_for_holder(
            &registry,
            &Address::new("mallory"),
            &Address::new("alice"),
            &contract,
            &sto,
            &p1,
            &policy,
        )
        .unwrap_err();

        match err {
            LedgerError::Unauthorized(ctx) => {
                assert_eq!(ctx.contract, Some(contract));
                assert_eq!(ctx.id, Some(sto));
                assert_eq!(ctx.partition, Some(p1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inactive_contract_has_no_owner_role() {
        let contract = Address::new("issuer");
        let owner = Address::new("owner");
        let mut snapshot = MemoryState::new();
        snapshot
            .insert(
                StateKey::contract_account(&contract),
                ContractAccount {
                    owner: owner.clone(),
                    is_active: false,
                },
            )
            .unwrap();
        let registry = Registry::new(&snapshot);

        let err = require_contract_owner(&registry, &owner, &contract, &ContractId::new("STO01"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
    }
}
