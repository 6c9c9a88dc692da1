//! Owned, typed view over the working set of one operation, and the index
//! maintenance that keeps holder, partition and operator sets consistent.

use log::debug;

use sto_core::{
    Account, Address, Amount, ContractAccount, ContractId, Design, KycDesign, LedgerError,
    Partition,
};
use sto_state::{
    CustomerStatus, MergeValue, OperatorTokenHolders, PartitionBalance, StateAccessor, StateKey,
    StateReader, TokenHolderPartitionBalance, TokenHolderPartitionOperators,
    TokenHolderPartitions, WorkingSet,
};

/// Insert `item` if absent. Returns whether the set changed.
pub fn insert_member<T: PartialEq>(set: &mut Vec<T>, item: T) -> bool {
    if set.contains(&item) {
        return false;
    }
    set.push(item);
    true
}

/// Remove `item` if present. Element order is not preserved.
pub fn remove_member<T: PartialEq>(set: &mut Vec<T>, item: &T) -> bool {
    match set.iter().position(|x| x == item) {
        Some(index) => {
            set.swap_remove(index);
            true
        }
        None => false,
    }
}

/// Add `operator` to the forward set of `holder` and `holder` to the reverse
/// set of `operator`. Fails if either side already has the entry.
pub fn add_operator_sets(
    forward: &mut Vec<Address>,
    reverse: &mut Vec<Address>,
    holder: &Address,
    operator: &Address,
) -> Result<(), LedgerError> {
    if forward.contains(operator) || reverse.contains(holder) {
        return Err(LedgerError::StateAlreadyExists(format!(
            "operator {} already authorized by {}",
            operator, holder
        )));
    }
    forward.push(operator.clone());
    reverse.push(holder.clone());
    Ok(())
}

/// Remove the pair from both sets. Fails unless both sides hold the entry.
pub fn revoke_operator_sets(
    forward: &mut Vec<Address>,
    reverse: &mut Vec<Address>,
    holder: &Address,
    operator: &Address,
) -> Result<(), LedgerError> {
    if !forward.contains(operator) || !reverse.contains(holder) {
        return Err(LedgerError::StateNotFound(format!(
            "operator {} not authorized by {}",
            operator, holder
        )));
    }
    remove_member(forward, operator);
    remove_member(reverse, holder);
    Ok(())
}

/// The single mutable registry threaded through every item of an operation
pub struct Registry<S: StateAccessor> {
    ws: WorkingSet<S>,
}

impl<S: StateAccessor> Registry<S> {
    pub fn new(snapshot: S) -> Self {
        Self {
            ws: WorkingSet::new(snapshot),
        }
    }

    /// Read access to the current view, snapshot plus pending writes
    pub fn state(&self) -> &WorkingSet<S> {
        &self.ws
    }

    /// Apply values computed by a collaborator, such as a fee debit
    pub fn apply(&mut self, merge_values: Vec<MergeValue>) {
        for mv in merge_values {
            self.ws.put_value(mv.key, mv.value);
        }
    }

    pub fn into_merge_values(self) -> Vec<MergeValue> {
        self.ws.into_merge_values()
    }

    // Accounts

    pub fn account(&self, address: &Address) -> Result<Account, LedgerError> {
        self.ws.must_get(&StateKey::account(address))
    }

    pub fn contract_account(&self, address: &Address) -> Result<Option<ContractAccount>, LedgerError> {
        self.ws.get(&StateKey::contract_account(address))
    }

    /// Fails unless `address` is a registered account that is not a contract account
    pub fn require_plain_account(&self, address: &Address) -> Result<(), LedgerError> {
        self.ws.must_exist(&StateKey::account(address))?;
        if self.ws.exists(&StateKey::contract_account(address))? {
            return Err(LedgerError::StateAlreadyExists(format!(
                "contract account {}",
                address
            )));
        }
        Ok(())
    }

    // Security token records

    pub fn design(&self, contract: &Address, sto_id: &ContractId) -> Result<Design, LedgerError> {
        self.ws.must_get(&StateKey::design(contract, sto_id))
    }

    pub fn design_exists(&self, contract: &Address, sto_id: &ContractId) -> Result<bool, LedgerError> {
        self.ws.exists(&StateKey::design(contract, sto_id))
    }

    pub fn put_design(&mut self, contract: &Address, design: Design) {
        let key = StateKey::design(contract, &design.asset_id);
        self.ws.put(key, design);
    }

    pub fn balance(
        &self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
    ) -> Result<Amount, LedgerError> {
        let key = StateKey::token_holder_partition_balance(contract, sto_id, holder, partition);
        Ok(self
            .ws
            .get::<TokenHolderPartitionBalance>(&key)?
            .map(|b| b.0)
            .unwrap_or_default())
    }

    pub fn put_balance(
        &mut self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
        amount: Amount,
    ) {
        let key = StateKey::token_holder_partition_balance(contract, sto_id, holder, partition);
        self.ws.put(key, TokenHolderPartitionBalance(amount));
    }

    pub fn partition_supply(
        &self,
        contract: &Address,
        sto_id: &ContractId,
        partition: &Partition,
    ) -> Result<Amount, LedgerError> {
        let key = StateKey::partition_balance(contract, sto_id, partition);
        Ok(self
            .ws
            .get::<PartitionBalance>(&key)?
            .map(|b| b.0)
            .unwrap_or_default())
    }

    pub fn put_partition_supply(
        &mut self,
        contract: &Address,
        sto_id: &ContractId,
        partition: &Partition,
        amount: Amount,
    ) {
        let key = StateKey::partition_balance(contract, sto_id, partition);
        self.ws.put(key, PartitionBalance(amount));
    }

    pub fn holder_partitions(
        &self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
    ) -> Result<Vec<Partition>, LedgerError> {
        let key = StateKey::token_holder_partitions(contract, sto_id, holder);
        Ok(self
            .ws
            .get::<TokenHolderPartitions>(&key)?
            .map(|p| p.0)
            .unwrap_or_default())
    }

    fn put_holder_partitions(
        &mut self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partitions: Vec<Partition>,
    ) {
        let key = StateKey::token_holder_partitions(contract, sto_id, holder);
        self.ws.put(key, TokenHolderPartitions(partitions));
    }

    pub fn operators(
        &self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
    ) -> Result<Vec<Address>, LedgerError> {
        let key = StateKey::token_holder_partition_operators(contract, sto_id, holder, partition);
        Ok(self
            .ws
            .get::<TokenHolderPartitionOperators>(&key)?
            .map(|o| o.0)
            .unwrap_or_default())
    }

    pub fn holders_of(
        &self,
        contract: &Address,
        sto_id: &ContractId,
        operator: &Address,
        partition: &Partition,
    ) -> Result<Vec<Address>, LedgerError> {
        let key = StateKey::operator_token_holders(contract, sto_id, operator, partition);
        Ok(self
            .ws
            .get::<OperatorTokenHolders>(&key)?
            .map(|h| h.0)
            .unwrap_or_default())
    }

    // KYC records

    pub fn kyc_design(&self, contract: &Address, kyc_id: &ContractId) -> Result<KycDesign, LedgerError> {
        self.ws.must_get(&StateKey::kyc_design(contract, kyc_id))
    }

    pub fn kyc_design_exists(&self, contract: &Address, kyc_id: &ContractId) -> Result<bool, LedgerError> {
        self.ws.exists(&StateKey::kyc_design(contract, kyc_id))
    }

    pub fn put_kyc_design(&mut self, contract: &Address, design: KycDesign) {
        let key = StateKey::kyc_design(contract, &design.kyc_id);
        self.ws.put(key, design);
    }

    pub fn customer(
        &self,
        contract: &Address,
        kyc_id: &ContractId,
        customer: &Address,
    ) -> Result<Option<bool>, LedgerError> {
        let key = StateKey::customer(contract, kyc_id, customer);
        Ok(self.ws.get::<CustomerStatus>(&key)?.map(|s| s.0))
    }

    pub fn put_customer(&mut self, contract: &Address, kyc_id: &ContractId, customer: &Address, status: bool) {
        let key = StateKey::customer(contract, kyc_id, customer);
        self.ws.put(key, CustomerStatus(status));
    }

    // Index maintenance

    /// Delegate `partition` of `holder` to `operator`, in both directions
    pub fn add_operator(
        &mut self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
        operator: &Address,
    ) -> Result<(), LedgerError> {
        let mut forward = self.operators(contract, sto_id, holder, partition)?;
        let mut reverse = self.holders_of(contract, sto_id, operator, partition)?;
        add_operator_sets(&mut forward, &mut reverse, holder, operator)?;

        self.ws.put(
            StateKey::token_holder_partition_operators(contract, sto_id, holder, partition),
            TokenHolderPartitionOperators(forward),
        );
        self.ws.put(
            StateKey::operator_token_holders(contract, sto_id, operator, partition),
            OperatorTokenHolders(reverse),
        );
        Ok(())
    }

    /// Withdraw a delegation, in both directions
    pub fn revoke_operator(
        &mut self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
        operator: &Address,
    ) -> Result<(), LedgerError> {
        let mut forward = self.operators(contract, sto_id, holder, partition)?;
        let mut reverse = self.holders_of(contract, sto_id, operator, partition)?;
        revoke_operator_sets(&mut forward, &mut reverse, holder, operator)?;

        self.ws.put(
            StateKey::token_holder_partition_operators(contract, sto_id, holder, partition),
            TokenHolderPartitionOperators(forward),
        );
        self.ws.put(
            StateKey::operator_token_holders(contract, sto_id, operator, partition),
            OperatorTokenHolders(reverse),
        );
        Ok(())
    }

    /// Cascade after the balance of `holder` on `partition` reached zero:
    /// clear its operators, drop it from every reverse index and drop the
    /// partition from its set. Returns the operators that were cleared.
    pub fn on_balance_zero(
        &mut self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
    ) -> Result<Vec<Address>, LedgerError> {
        let operators_key =
            StateKey::token_holder_partition_operators(contract, sto_id, holder, partition);
        let cleared = self.operators(contract, sto_id, holder, partition)?;

        for operator in &cleared {
            let mut reverse = self.holders_of(contract, sto_id, operator, partition)?;
            remove_member(&mut reverse, holder);
            self.ws.put(
                StateKey::operator_token_holders(contract, sto_id, operator, partition),
                OperatorTokenHolders(reverse),
            );
        }
        if self.ws.exists(&operators_key)? {
            self.ws.put(operators_key, TokenHolderPartitionOperators::default());
        }

        let mut partitions = self.holder_partitions(contract, sto_id, holder)?;
        if remove_member(&mut partitions, partition) {
            self.put_holder_partitions(contract, sto_id, holder, partitions);
        }

        debug!(
            "Balance of {} on {}/{}/{} reached zero, cleared {} operators",
            holder,
            contract,
            sto_id,
            partition,
            cleared.len()
        );
        Ok(cleared)
    }

    /// Register `partition` in the set of `holder` after its balance left zero
    pub fn on_balance_nonzero_from_zero(
        &mut self,
        contract: &Address,
        sto_id: &ContractId,
        holder: &Address,
        partition: &Partition,
    ) -> Result<(), LedgerError> {
        let mut partitions = self.holder_partitions(contract, sto_id, holder)?;
        if insert_member(&mut partitions, partition.clone()) {
            self.put_holder_partitions(contract, sto_id, holder, partitions);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sto_state::MemoryState;

    fn ids() -> (Address, ContractId, Partition) {
        (
            Address::new("issuer"),
            ContractId::new("STO01"),
            Partition::new("p1"),
        )
    }

    #[test]
    fn test_set_helpers() {
        let mut set = vec![1, 2, 3];
        assert!(!insert_member(&mut set, 2));
        assert!(insert_member(&mut set, 4));
        assert!(remove_member(&mut set, &1));
        assert!(!remove_member(&mut set, &1));
        set.sort();
        assert_eq!(set, vec![2, 3, 4]);
    }

    #[test]
    fn test_operator_pair_is_symmetric() {
        let (contract, sto, p1) = ids();
        let holder = Address::new("alice");
        let operator = Address::new("bob");
        let snapshot = MemoryState::new();
        let mut registry = Registry::new(&snapshot);

        registry.add_operator(&contract, &sto, &holder, &p1, &operator).unwrap();
        assert_eq!(
            registry.operators(&contract, &sto, &holder, &p1).unwrap(),
            vec![operator.clone()]
        );
        assert_eq!(
            registry.holders_of(&contract, &sto, &operator, &p1).unwrap(),
            vec![holder.clone()]
        );

        let err = registry
            .add_operator(&contract, &sto, &holder, &p1, &operator)
            .unwrap_err();
        assert!(matches!(err, LedgerError::StateAlreadyExists(_)));

        registry.revoke_operator(&contract, &sto, &holder, &p1, &operator).unwrap();
        assert!(registry.operators(&contract, &sto, &holder, &p1).unwrap().is_empty());
        assert!(registry.holders_of(&contract, &sto, &operator, &p1).unwrap().is_empty());

        let err = registry
            .revoke_operator(&contract, &sto, &holder, &p1, &operator)
            .unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));
    }

    #[test]
    fn test_revoke_requires_both_sides() {
        let holder = Address::new("alice");
        let operator = Address::new("bob");
        let mut forward = vec![operator.clone()];
        let mut reverse = Vec::new();

        let err = revoke_operator_sets(&mut forward, &mut reverse, &holder, &operator).unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));
        assert_eq!(forward.len(), 1);
    }

    #[test]
    fn test_balance_zero_cascade() {
        let (contract, sto, p1) = ids();
        let p2 = Partition::new("p2");
        let holder = Address::new("alice");
        let bob = Address::new("bob");
        let carol = Address::new("carol");
        let snapshot = MemoryState::new();
        let mut registry = Registry::new(&snapshot);

        registry.on_balance_nonzero_from_zero(&contract, &sto, &holder, &p1).unwrap();
        registry.on_balance_nonzero_from_zero(&contract, &sto, &holder, &p2).unwrap();
        registry.add_operator(&contract, &sto, &holder, &p1, &bob).unwrap();
        registry.add_operator(&contract, &sto, &holder, &p1, &carol).unwrap();
        registry.add_operator(&contract, &sto, &holder, &p2, &bob).unwrap();

        let mut cleared = registry.on_balance_zero(&contract, &sto, &holder, &p1).unwrap();
        cleared.sort();
        assert_eq!(cleared, vec![bob.clone(), carol.clone()]);

        assert!(registry.operators(&contract, &sto, &holder, &p1).unwrap().is_empty());
        assert!(registry.holders_of(&contract, &sto, &bob, &p1).unwrap().is_empty());
        assert!(registry.holders_of(&contract, &sto, &carol, &p1).unwrap().is_empty());
        assert_eq!(
            registry.holder_partitions(&contract, &sto, &holder).unwrap(),
            vec![p2.clone()]
        );

        // Delegation on the other partition survives
        assert_eq!(
            registry.holders_of(&contract, &sto, &bob, &p2).unwrap(),
            vec![holder]
        );
    }

    #[test]
    fn test_nonzero_from_zero_is_idempotent() {
        let (contract, sto, p1) = ids();
        let holder = Address::new("alice");
        let snapshot = MemoryState::new();
        let mut registry = Registry::new(&snapshot);

        registry.on_balance_nonzero_from_zero(&contract, &sto, &holder, &p1).unwrap();
        registry.on_balance_nonzero_from_zero(&contract, &sto, &holder, &p1).unwrap();
        assert_eq!(
            registry.holder_partitions(&contract, &sto, &holder).unwrap(),
            vec![p1]
        );
        assert_eq!(registry.into_merge_values().len(), 1);
    }
}
