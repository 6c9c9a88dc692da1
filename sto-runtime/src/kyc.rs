use log::debug;

use sto_core::{
    Address, ControllerItem, CreateKycServiceFact, CustomerItem, EngineConfig, KycDesign,
    LedgerError,
};
use sto_state::StateAccessor;

use crate::auth::{require_acts_for_contract_policy, require_contract_owner};
use crate::registry::{insert_member, remove_member, Registry};

pub fn create_kyc_service<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    fact: &CreateKycServiceFact,
) -> Result<(), LedgerError> {
    require_contract_owner(registry, sender, &fact.contract, &fact.kyc_id)?;
    if registry.kyc_design_exists(&fact.contract, &fact.kyc_id)? {
        return Err(LedgerError::StateAlreadyExists(format!(
            "kyc service {}/{}",
            fact.contract, fact.kyc_id
        )));
    }
    for controller in &fact.controllers {
        registry.require_plain_account(controller)?;
    }

    registry.put_kyc_design(
        &fact.contract,
        KycDesign::new(fact.kyc_id.clone(), fact.controllers.clone()),
    );
    debug!("Created kyc service {}/{}", fact.contract, fact.kyc_id);
    Ok(())
}

pub fn add_controller<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    item: &ControllerItem,
    config: &EngineConfig,
) -> Result<(), LedgerError> {
    let mut design = registry.kyc_design(&item.contract, &item.kyc_id)?;
    require_acts_for_contract_policy(registry, sender, &item.contract, &item.kyc_id, design.controllers())?;
    registry.require_plain_account(&item.controller)?;

    if !insert_member(&mut design.policy.controllers, item.controller.clone()) {
        return Err(LedgerError::StateAlreadyExists(format!(
            "controller {} of {}/{}",
            item.controller, item.contract, item.kyc_id
        )));
    }
    if design.policy.controllers.len() > config.max_controllers {
        return Err(LedgerError::Validation(format!(
            "controllers over allowed, {} > {}",
            design.policy.controllers.len(),
            config.max_controllers
        )));
    }

    registry.put_kyc_design(&item.contract, design);
    Ok(())
}

pub fn remove_controller<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    item: &ControllerItem,
) -> Result<(), LedgerError> {
    let mut design = registry.kyc_design(&item.contract, &item.kyc_id)?;
    require_acts_for_contract_policy(registry, sender, &item.contract, &item.kyc_id, design.controllers())?;

    if !remove_member(&mut design.policy.controllers, &item.controller) {
        return Err(LedgerError::StateNotFound(format!(
            "controller {} of {}/{}",
            item.controller, item.contract, item.kyc_id
        )));
    }

    registry.put_kyc_design(&item.contract, design);
    Ok(())
}

/// Record a customer status. Creation only; an existing entry is rejected.
pub fn add_customer<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    item: &CustomerItem,
) -> Result<(), LedgerError> {
    let design = registry.kyc_design(&item.contract, &item.kyc_id)?;
    require_acts_for_contract_policy(registry, sender, &item.contract, &item.kyc_id, design.controllers())?;

    if registry.customer(&item.contract, &item.kyc_id, &item.customer)?.is_some() {
        return Err(LedgerError::StateAlreadyExists(format!(
            "customer {} of {}/{}",
            item.customer, item.contract, item.kyc_id
        )));
    }

    registry.put_customer(&item.contract, &item.kyc_id, &item.customer, item.status);
    Ok(())
}

/// Overwrite the status of an existing customer
pub fn update_customer<S: StateAccessor>(
    registry: &mut Registry<S>,
    sender: &Address,
    item: &CustomerItem,
) -> Result<(), LedgerError> {
    let design = registry.kyc_design(&item.contract, &item.kyc_id)?;
    require_acts_for_contract_policy(registry, sender, &item.contract, &item.kyc_id, design.controllers())?;

    if registry.customer(&item.contract, &item.kyc_id, &item.customer)?.is_none() {
        return Err(LedgerError::StateNotFound(format!(
            "customer {} of {}/{}",
            item.customer, item.contract, item.kyc_id
        )));
    }

    registry.put_customer(&item.contract, &item.kyc_id, &item.customer, item.status);
    Ok(())
}
