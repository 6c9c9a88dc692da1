use log::{debug, error, warn};
use std::fmt;

use sto_core::{EngineConfig, FactBody, FactHash, LedgerError, Operation, RoleContext};
use sto_state::{MergeValue, StateAccessor};

use crate::fee::{require_currencies, settle_fee, CurrencyLedger};
use crate::ledger::{self, BatchDebits};
use crate::registry::Registry;
use crate::{kyc, sto_ops};

/// Lifecycle of an operation processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Created,
    PreProcessed,
    Processed,
    Closed,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorState::Created => "created",
            ProcessorState::PreProcessed => "pre-processed",
            ProcessorState::Processed => "processed",
            ProcessorState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Two-phase driver for one operation against one snapshot
///
/// `pre_process` runs every check and discards the computed values;
/// `process` recomputes them from the same snapshot and returns one final
/// value per written key, fee debits included. A `process` failure after a
/// passing `pre_process` is reported as `InternalInconsistency`.
pub struct OperationProcessor<S: StateAccessor, C: CurrencyLedger> {
    state: S,
    currency: C,
    config: EngineConfig,
    phase: ProcessorState,
    fact_hash: Option<FactHash>,
}

impl<S: StateAccessor, C: CurrencyLedger> OperationProcessor<S, C> {
    pub fn new(state: S, currency: C, config: EngineConfig) -> Self {
        Self {
            state,
            currency,
            config,
            phase: ProcessorState::Created,
            fact_hash: None,
        }
    }

    pub fn phase(&self) -> ProcessorState {
        self.phase
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate the operation against the snapshot without producing output
    pub fn pre_process(&mut self, op: &Operation) -> Result<(), LedgerError> {
        self.expect_phase(ProcessorState::Created, "pre-process")?;
        let hash = op.fact.hash()?;

        debug!("Pre-processing {} {}", op.fact.body.kind(), hash);
        if let Err(e) = self.compute(op) {
            warn!("Rejected {} {}: {}", op.fact.body.kind(), hash, e);
            return Err(e);
        }

        self.fact_hash = Some(hash);
        self.phase = ProcessorState::PreProcessed;
        Ok(())
    }

    /// Compute the final state values of a pre-processed operation
    pub fn process(&mut self, op: &Operation) -> Result<Vec<MergeValue>, LedgerError> {
        self.expect_phase(ProcessorState::PreProcessed, "process")?;
        let hash = op.fact.hash()?;
        if self.fact_hash != Some(hash) {
            error!("Process called with {} after pre-processing another fact", hash);
            return Err(LedgerError::InternalInconsistency(format!(
                "{} was not pre-processed",
                hash
            )));
        }

        let merge_values = self.compute(op).map_err(|e| {
            error!("Process failed for {} {}: {}", op.fact.body.kind(), hash, e);
            if e.is_fatal() {
                e
            } else {
                LedgerError::InternalInconsistency(format!(
                    "process of {} failed after pre-process: {}",
                    hash, e
                ))
            }
        })?;

        debug!("Processed {} into {} state values", hash, merge_values.len());
        self.phase = ProcessorState::Processed;
        Ok(merge_values)
    }

    /// Drop everything tied to the current operation
    pub fn close(&mut self) {
        self.fact_hash = None;
        self.phase = ProcessorState::Closed;
    }

    /// Reuse a closed processor for the next operation against `state`
    pub fn reset(&mut self, state: S) -> Result<(), LedgerError> {
        self.expect_phase(ProcessorState::Closed, "reset")?;
        self.state = state;
        self.phase = ProcessorState::Created;
        Ok(())
    }

    fn expect_phase(&self, expected: ProcessorState, action: &str) -> Result<(), LedgerError> {
        if self.phase != expected {
            return Err(LedgerError::InternalInconsistency(format!(
                "cannot {} in {} state",
                action, self.phase
            )));
        }
        Ok(())
    }

    fn compute(&self, op: &Operation) -> Result<Vec<MergeValue>, LedgerError> {
        let fact = &op.fact;
        fact.validate(&self.config)?;

        let mut registry = Registry::new(&self.state);
        check_sender(&registry, op)?;

        let currencies = fact.body.currencies();
        require_currencies(&self.currency, registry.state(), &currencies)?;

        check_batch(&registry, &fact.body)?;
        apply_items(&mut registry, op, &self.config)?;

        let debits = settle_fee(&self.currency, registry.state(), &fact.sender, &currencies)?;
        registry.apply(debits);

        Ok(registry.into_merge_values())
    }
}

/// Sender must be a registered non-contract account whose signs reach its threshold
fn check_sender<S: StateAccessor>(registry: &Registry<S>, op: &Operation) -> Result<(), LedgerError> {
    let sender = &op.fact.sender;
    let account = registry.account(sender)?;

    if registry.contract_account(sender)?.is_some() {
        return Err(LedgerError::StateAlreadyExists(format!(
            "contract account {} cannot be the sender",
            sender
        )));
    }
    if !account.keys.is_satisfied_by(op.signers()) {
        return Err(LedgerError::Unauthorized(RoleContext::signing(sender)));
    }
    Ok(())
}

/// Sum the debits of all items per key and check each total once
fn check_batch<S: StateAccessor>(registry: &Registry<S>, body: &FactBody) -> Result<(), LedgerError> {
    let mut debits = BatchDebits::new();
    match body {
        FactBody::RedeemTokens(items) => {
            for item in items {
                debits.debit_holder(&item.contract, &item.sto_id, &item.tokenholder, &item.partition, item.amount);
                debits.debit_supply(&item.contract, &item.sto_id, &item.partition, item.amount);
            }
        }
        FactBody::TransferSecurityTokensPartition(items) => {
            for item in items {
                debits.debit_holder(&item.contract, &item.sto_id, &item.tokenholder, &item.partition, item.amount);
            }
        }
        _ => return Ok(()),
    }
    debits.check(registry)
}

fn apply_items<S: StateAccessor>(
    registry: &mut Registry<S>,
    op: &Operation,
    config: &EngineConfig,
) -> Result<(), LedgerError> {
    let sender = &op.fact.sender;
    match &op.fact.body {
        FactBody::CreateSecurityTokens(items) => {
            for item in items {
                sto_ops::create_security_token(registry, sender, item)?;
            }
        }
        FactBody::IssueSecurityTokens(items) => {
            for item in items {
                ledger::issue(
                    registry,
                    sender,
                    &item.contract,
                    &item.sto_id,
                    &item.partition,
                    &item.receiver,
                    item.amount,
                )?;
            }
        }
        FactBody::RedeemTokens(items) => {
            for item in items {
                ledger::redeem(
                    registry,
                    sender,
                    &item.contract,
                    &item.sto_id,
                    &item.partition,
                    &item.tokenholder,
                    item.amount,
                )?;
            }
        }
        FactBody::TransferSecurityTokensPartition(items) => {
            for item in items {
                ledger::transfer(
                    registry,
                    sender,
                    &item.contract,
                    &item.sto_id,
                    &item.partition,
                    &item.tokenholder,
                    &item.receiver,
                    item.amount,
                )?;
            }
        }
        FactBody::AuthorizeOperators(items) => {
            for item in items {
                sto_ops::authorize_operator(registry, sender, item)?;
            }
        }
        FactBody::RevokeOperators(items) => {
            for item in items {
                sto_ops::revoke_operator(registry, sender, item)?;
            }
        }
        FactBody::SetDocument(fact) => sto_ops::set_document(registry, sender, fact)?,
        FactBody::CreateKycService(fact) => kyc::create_kyc_service(registry, sender, fact)?,
        FactBody::AddControllers(items) => {
            for item in items {
                kyc::add_controller(registry, sender, item, config)?;
            }
        }
        FactBody::RemoveControllers(items) => {
            for item in items {
                kyc::remove_controller(registry, sender, item)?;
            }
        }
        FactBody::AddCustomers(items) => {
            for item in items {
                kyc::add_customer(registry, sender, item)?;
            }
        }
        FactBody::UpdateCustomers(items) => {
            for item in items {
                kyc::update_customer(registry, sender, item)?;
            }
        }
    }
    Ok(())
}

/// Run one operation through the full cycle and return its state values
pub fn execute<S: StateAccessor, C: CurrencyLedger>(
    state: S,
    currency: C,
    config: EngineConfig,
    op: &Operation,
) -> Result<Vec<MergeValue>, LedgerError> {
    let mut processor = OperationProcessor::new(state, currency, config);
    processor.pre_process(op)?;
    let merge_values = processor.process(op)?;
    processor.close();
    Ok(merge_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::StateCurrencyLedger;
    use crate::testing::{signed, LedgerFixture, FEE_CURRENCY, ISSUER, STO_ID};
    use sto_core::{Address, Amount, ContractId, CurrencyId, Fact, Partition, TransferSecurityTokensPartitionItem};
    use sto_state::MemoryState;

    fn transfer_body(amount: u64) -> FactBody {
        FactBody::TransferSecurityTokensPartition(vec![TransferSecurityTokensPartitionItem {
            contract: Address::new(ISSUER),
            sto_id: ContractId::new(STO_ID),
            tokenholder: Address::new("alice"),
            receiver: Address::new("bob"),
            partition: Partition::new("p1"),
            amount: Amount::from(amount),
            currency: CurrencyId::new(FEE_CURRENCY),
        }])
    }

    fn state() -> MemoryState {
        LedgerFixture::standard()
            .holding(ISSUER, STO_ID, "alice", "p1", 100)
            .build()
            .unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let state = state();
        let op = signed("alice", "t1", transfer_body(30));
        let mut processor = OperationProcessor::new(&state, StateCurrencyLedger, EngineConfig::default());

        // Process before pre-process is a caller defect
        assert!(processor.process(&op).unwrap_err().is_fatal());

        processor.pre_process(&op).unwrap();
        assert_eq!(processor.phase(), ProcessorState::PreProcessed);
        let merged = processor.process(&op).unwrap();
        assert_eq!(processor.phase(), ProcessorState::Processed);
        assert!(!merged.is_empty());

        assert!(processor.reset(&state).is_err());
        processor.close();
        processor.reset(&state).unwrap();
        assert_eq!(processor.phase(), ProcessorState::Created);
    }

    #[test]
    fn test_process_requires_same_fact() {
        let state = state();
        let op = signed("alice", "t1", transfer_body(30));
        let other = signed("alice", "t2", transfer_body(30));
        let mut processor = OperationProcessor::new(&state, StateCurrencyLedger, EngineConfig::default());

        processor.pre_process(&op).unwrap();
        let err = processor.process(&other).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rejected_pre_process_stays_created() {
        let state = state();
        let op = signed("alice", "t1", transfer_body(200));
        let mut processor = OperationProcessor::new(&state, StateCurrencyLedger, EngineConfig::default());

        let err = processor.pre_process(&op).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientPartitionBalance { .. }));
        assert_eq!(processor.phase(), ProcessorState::Created);
    }

    #[test]
    fn test_sender_checks() {
        let state = state();

        // Unknown sender
        let op = signed("ghost", "t1", transfer_body(10));
        let err = execute(&state, StateCurrencyLedger, EngineConfig::default(), &op).unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));

        // Signed with a key the sender does not own
        let fact = Fact::new(b"t2".to_vec(), Address::new("alice"), transfer_body(10));
        let op = Operation::new(fact).signed_by(crate::testing::key_of("bob"), b"sig".to_vec());
        let err = execute(&state, StateCurrencyLedger, EngineConfig::default(), &op).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));

        // Contract account as sender
        let op = signed(crate::testing::KYC_ACCOUNT, "t3", transfer_body(10));
        let err = execute(&state, StateCurrencyLedger, EngineConfig::default(), &op).unwrap_err();
        assert!(matches!(err, LedgerError::StateAlreadyExists(_)));
    }

    #[test]
    fn test_unknown_item_currency() {
        let state = state();
        let mut body = transfer_body(10);
        if let FactBody::TransferSecurityTokensPartition(items) = &mut body {
            items[0].currency = CurrencyId::new("NOPE");
        }
        let op = signed("alice", "t1", body);
        let err = execute(&state, StateCurrencyLedger, EngineConfig::default(), &op).unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));
    }
}
