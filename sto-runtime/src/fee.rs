use log::debug;
use std::collections::BTreeMap;

use sto_core::{Address, Amount, CurrencyDesign, CurrencyId, LedgerError};
use sto_state::{CurrencyBalance, MergeValue, StateAccessor, StateKey, StateReader};

/// Currency layer collaborator used for fee settlement
///
/// Every call reads through the accessor it is given, so it observes the
/// same snapshot as the rest of the operation.
pub trait CurrencyLedger {
    fn currency_exists(&self, state: &dyn StateAccessor, currency: &CurrencyId) -> Result<bool, LedgerError>;

    /// Fee owed per currency for items paying in `currencies`
    fn required_fee(
        &self,
        state: &dyn StateAccessor,
        currencies: &[CurrencyId],
    ) -> Result<BTreeMap<CurrencyId, Amount>, LedgerError>;

    /// Check that `sender` can pay `required` and return the debited balances
    fn check_and_debit(
        &self,
        state: &dyn StateAccessor,
        sender: &Address,
        required: &BTreeMap<CurrencyId, Amount>,
    ) -> Result<Vec<MergeValue>, LedgerError>;
}

/// Currency ledger reading currency designs and balances from state
#[derive(Debug, Clone, Copy, Default)]
pub struct StateCurrencyLedger;

impl CurrencyLedger for StateCurrencyLedger {
    fn currency_exists(&self, state: &dyn StateAccessor, currency: &CurrencyId) -> Result<bool, LedgerError> {
        state.exists(&StateKey::currency_design(currency))
    }

    fn required_fee(
        &self,
        state: &dyn StateAccessor,
        currencies: &[CurrencyId],
    ) -> Result<BTreeMap<CurrencyId, Amount>, LedgerError> {
        let mut required: BTreeMap<CurrencyId, Amount> = BTreeMap::new();
        for currency in currencies {
            let design: CurrencyDesign = state.must_get(&StateKey::currency_design(currency))?;
            let total = required.entry(currency.clone()).or_default();
            *total = total.checked_add(design.fee.per_item()).ok_or_else(|| {
                LedgerError::Validation(format!("fee overflow for currency {}", currency))
            })?;
        }
        Ok(required)
    }

    fn check_and_debit(
        &self,
        state: &dyn StateAccessor,
        sender: &Address,
        required: &BTreeMap<CurrencyId, Amount>,
    ) -> Result<Vec<MergeValue>, LedgerError> {
        let mut debits = Vec::new();
        for (currency, amount) in required {
            if amount.is_zero() {
                continue;
            }
            let key = StateKey::balance(sender, currency);
            let available = state
                .get::<CurrencyBalance>(&key)?
                .map(|b| b.0)
                .unwrap_or_default();
            let left = available.checked_sub(*amount).ok_or_else(|| {
                LedgerError::InsufficientCurrencyBalance {
                    currency: currency.clone(),
                    required: *amount,
                    available,
                }
            })?;
            debits.push(MergeValue::new(key, CurrencyBalance(left)));
        }
        Ok(debits)
    }
}

/// Fee settlement for one operation: fail if any item currency is unknown or
/// the sender cannot pay, otherwise return the sender balance debits.
pub fn settle_fee<C: CurrencyLedger + ?Sized>(
    currency: &C,
    state: &dyn StateAccessor,
    sender: &Address,
    currencies: &[CurrencyId],
) -> Result<Vec<MergeValue>, LedgerError> {
    let required = currency.required_fee(state, currencies)?;
    let debits = currency.check_and_debit(state, sender, &required)?;
    debug!(
        "Fee for {} items of {}: {:?}",
        currencies.len(),
        sender,
        required
    );
    Ok(debits)
}

/// Fail with `StateNotFound` for the first item currency that does not exist
pub fn require_currencies<C: CurrencyLedger + ?Sized>(
    currency: &C,
    state: &dyn StateAccessor,
    currencies: &[CurrencyId],
) -> Result<(), LedgerError> {
    for id in currencies {
        if !currency.currency_exists(state, id)? {
            return Err(LedgerError::StateNotFound(format!("currency {}", id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LedgerFixture, FEE_CURRENCY};

    #[test]
    fn test_fee_is_charged_per_item() {
        let state = LedgerFixture::standard().build().unwrap();
        let mcc = CurrencyId::new(FEE_CURRENCY);
        let alice = Address::new("alice");

        let debits = settle_fee(
            &StateCurrencyLedger,
            &state,
            &alice,
            &[mcc.clone(), mcc.clone(), mcc.clone()],
        )
        .unwrap();

        assert_eq!(debits.len(), 1);
        assert_eq!(debits[0].key, StateKey::balance(&alice, &mcc));
        assert_eq!(debits[0].record::<CurrencyBalance>().unwrap().0, Amount::from(997));
    }

    #[test]
    fn test_insufficient_currency_balance() {
        let state = LedgerFixture::standard()
            .account("dave")
            .currency_balance("dave", FEE_CURRENCY, 1)
            .build()
            .unwrap();
        let mcc = CurrencyId::new(FEE_CURRENCY);

        let err = settle_fee(&StateCurrencyLedger, &state, &Address::new("dave"), &[mcc.clone(), mcc])
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientCurrencyBalance { .. }));
    }

    #[test]
    fn test_nil_fee_emits_nothing() {
        let state = LedgerFixture::new().currency("FREE", 0).build().unwrap();
        let debits = settle_fee(
            &StateCurrencyLedger,
            &state,
            &Address::new("alice"),
            &[CurrencyId::new("FREE")],
        )
        .unwrap();
        assert!(debits.is_empty());
    }

    #[test]
    fn test_unknown_currency() {
        let state = LedgerFixture::standard().build().unwrap();
        let err = require_currencies(&StateCurrencyLedger, &state, &[CurrencyId::new("NOPE")])
            .unwrap_err();
        assert!(matches!(err, LedgerError::StateNotFound(_)));
    }
}
