use log::debug;

use sto_core::{
    Address, Amount, CreateSecurityTokensItem, Design, Document, LedgerError, OperatorItem, Policy,
    SetDocumentFact,
};
use sto_state::StateAccessor;

use crate::auth::{require_acts_for_contract_policy, require_contract_owner};
use crate::registry::Registry;

/// Register a new security token on a contract account owned by `sender`
pub fn create_security_token<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    item: &CreateSecurityTokensItem,
) -> Result<(), LedgerError> {
    require_contract_owner(registry, sender, &item.contract, &item.sto_id)?;
    if registry.design_exists(&item.contract, &item.sto_id)? {
        return Err(LedgerError::StateAlreadyExists(format!(
            "security token {}/{}",
            item.contract, item.sto_id
        )));
    }
    for controller in &item.controllers {
        registry.require_plain_account(controller)?;
    }

    let policy = Policy::new(vec![item.default_partition.clone()], item.controllers.clone());
    let design = Design::new(item.sto_id.clone(), item.granularity, policy);
    registry.put_design(&item.contract, design);
    registry.put_partition_supply(
        &item.contract,
        &item.sto_id,
        &item.default_partition,
        Amount::zero(),
    );

    debug!(
        "Created security token {}/{} with granularity {}",
        item.contract, item.sto_id, item.granularity
    );
    Ok(())
}

/// Delegate the sender's partition to an operator
pub fn authorize_operator<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    item: &OperatorItem,
) -> Result<(), LedgerError> {
    registry.design(&item.contract, &item.sto_id)?;

    let held = registry.holder_partitions(&item.contract, &item.sto_id, sender)?;
    if !held.contains(&item.partition) {
        return Err(LedgerError::StateNotFound(format!(
            "partition {} not held by {} in {}/{}",
            item.partition, sender, item.contract, item.sto_id
        )));
    }
    registry.require_plain_account(&item.operator)?;

    registry.add_operator(&item.contract, &item.sto_id, sender, &item.partition, &item.operator)
}

/// Withdraw a delegation the sender granted earlier
pub fn revoke_operator<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    item: &OperatorItem,
) -> Result<(), LedgerError> {
    registry.design(&item.contract, &item.sto_id)?;
    registry.revoke_operator(&item.contract, &item.sto_id, sender, &item.partition, &item.operator)
}

/// Attach a document to a security token
pub fn set_document<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    fact: &SetDocumentFact,
) -> Result<(), LedgerError> {
    let mut design = registry.design(&fact.contract, &fact.sto_id)?;
    require_acts_for_contract_policy(
        registry,
        sender,
        &fact.contract,
        &fact.sto_id,
        &design.policy.controllers,
    )?;

    if design.policy.document(&fact.document_hash).is_some() {
        return Err(LedgerError::StateAlreadyExists(format!(
            "document {} on {}/{}",
            fact.document_hash, fact.contract, fact.sto_id
        )));
    }

    design.policy.documents.push(Document {
        title: fact.title.clone(),
        uri: fact.uri.clone(),
        document_hash: fact.document_hash.clone(),
    });
    registry.put_design(&fact.contract, design);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LedgerFixture, CONTROLLER, FEE_CURRENCY, ISSUER, OWNER, STO_ID};
    use sto_core::{ContractId, CurrencyId, Partition};

    fn create_item(sto_id: &str) -> CreateSecurityTokensItem {
        CreateSecurityTokensItem {
            contract: Address::new(ISSUER),
            sto_id: ContractId::new(sto_id),
            granularity: 5,
            default_partition: Partition::new("main"),
            controllers: vec![Address::new(CONTROLLER)],
            currency: CurrencyId::new(FEE_CURRENCY),
        }
    }

    fn operator_item(operator: &str) -> OperatorItem {
        OperatorItem {
            contract: Address::new(ISSUER),
            sto_id: ContractId::new(STO_ID),
            operator: Address::new(operator),
            partition: Partition::new("p1"),
            currency: CurrencyId::new(FEE_CURRENCY),
        }
    }

    #[test]
    fn test_create_security_token() {
        let state = LedgerFixture::standard().build().unwrap();
        let mut registry = Registry::new(&state);
        let owner = Address::new(OWNER);

        create_security_token(&mut registry, &owner, &create_item("STO02")).unwrap();
        let design = registry
            .design(&Address::new(ISSUER), &ContractId::new("STO02"))
            .unwrap();
        assert_eq!(design.granularity, 5);
        assert_eq!(design.policy.partitions, vec![Partition::new("main")]);
        assert!(design.policy.aggregate.is_zero());

        // Existing design
        let err = create_security_token(&mut registry, &owner, &create_item(STO_ID)).unwrap_err();
        assert!(matches!(err, LedgerError::StateAlreadyExists(_)));

        // Only the owner
        let err = create_security_token(&mut registry, &Address::new("alice"), &create_item("STO03"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
    }

    #[test]
    fn test_create_rejects_unknown_controller() {
        let state = LedgerFixture::standard().build().unwrap();
        let mut registry = Registry::new(&state);
        let mut item = create_item("STO02");
        item.controllers = vec![Address::new("ghost")];

        let err = create_security_token(&mut registry, &Address::new(OWNER), &item).unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));
    }

    #[test]
    fn test_authorize_requires_held_partition() {
        let state = LedgerFixture::standard()
            .holding(ISSUER, STO_ID, "alice", "p1", 10)
            .build()
            .unwrap();
        let mut registry = Registry::new(&state);

        let err = authorize_operator(&mut registry, &Address::new("bob"), &operator_item("carol"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));

        let alice = Address::new("alice");
        authorize_operator(&mut registry, &alice, &operator_item("carol")).unwrap();
        let err = authorize_operator(&mut registry, &alice, &operator_item("carol")).unwrap_err();
        assert!(matches!(err, LedgerError::StateAlreadyExists(_)));

        revoke_operator(&mut registry, &alice, &operator_item("carol")).unwrap();
        let err = revoke_operator(&mut registry, &alice, &operator_item("carol")).unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));
    }

    #[test]
    fn test_set_document() {
        let state = LedgerFixture::standard().build().unwrap();
        let mut registry = Registry::new(&state);
        let fact = SetDocumentFact {
            contract: Address::new(ISSUER),
            sto_id: ContractId::new(STO_ID),
            title: "prospectus".to_string(),
            uri: "https://example.org/p.pdf".to_string(),
            document_hash: "abcd".to_string(),
            currency: CurrencyId::new(FEE_CURRENCY),
        };

        let err = set_document(&mut registry, &Address::new("alice"), &fact).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));

        set_document(&mut registry, &Address::new(CONTROLLER), &fact).unwrap();
        let design = registry
            .design(&Address::new(ISSUER), &ContractId::new(STO_ID))
            .unwrap();
        assert_eq!(design.policy.documents.len(), 1);

        let err = set_document(&mut registry, &Address::new(OWNER), &fact).unwrap_err();
        assert!(matches!(err, LedgerError::StateAlreadyExists(_)));
    }
}
