//! Builders for seeding a [`MemoryState`] with ledger records.
//!
//! Used by the unit tests of this crate, by its scenario tests and by
//! embedders that want to exercise the engine against an in-process store.

use std::collections::BTreeMap;

use sto_core::{
    Account, AccountKeys, Address, Amount, ContractAccount, ContractId, CurrencyDesign, CurrencyId,
    Design, Fact, FactBody, FeePolicy, KycDesign, LedgerError, Operation, Partition, Policy,
    PublicKey,
};
use sto_state::{
    CurrencyBalance, CustomerStatus, MemoryState, MergeValue, OperatorTokenHolders,
    PartitionBalance, StateKey, TokenHolderPartitionBalance, TokenHolderPartitionOperators,
    TokenHolderPartitions,
};

use crate::registry::insert_member;

pub const FEE_CURRENCY: &str = "MCC";
pub const ISSUER: &str = "issuer";
pub const KYC_ACCOUNT: &str = "kycacct";
pub const OWNER: &str = "owner";
pub const CONTROLLER: &str = "ctrl";
pub const STO_ID: &str = "STO01";
pub const KYC_ID: &str = "KYC01";

/// Key registered for `address` by [`LedgerFixture::account`]
pub fn key_of(address: &str) -> PublicKey {
    PublicKey::new(format!("{}-key", address))
}

/// Operation from `sender`, signed with its fixture key
pub fn signed(sender: &str, token: &str, body: FactBody) -> Operation {
    let fact = Fact::new(token.as_bytes().to_vec(), Address::new(sender), body);
    Operation::new(fact).signed_by(key_of(sender), b"sig".to_vec())
}

type HolderKey = (Address, ContractId, Address, Partition);

#[derive(Debug, Default)]
pub struct LedgerFixture {
    records: Vec<MergeValue>,
    designs: BTreeMap<(Address, ContractId), Design>,
    balances: BTreeMap<HolderKey, Amount>,
    operators: BTreeMap<HolderKey, Vec<Address>>,
}

impl LedgerFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts `owner`, `alice`, `bob`, `carol` and `ctrl` funded with
    /// 1000 of a currency charging 1 per item; contract accounts `issuer` and
    /// `kycacct` owned by `owner`; token `STO01` on `issuer` with
    /// granularity 10, partition `p1` and controller `ctrl`
    pub fn standard() -> Self {
        let mut fixture = Self::new()
            .currency(FEE_CURRENCY, 1)
            .contract_account(ISSUER, OWNER)
            .contract_account(KYC_ACCOUNT, OWNER)
            .security_token(ISSUER, STO_ID, 10, &["p1"], &[CONTROLLER]);
        for name in [OWNER, "alice", "bob", "carol", CONTROLLER] {
            fixture = fixture
                .account(name)
                .currency_balance(name, FEE_CURRENCY, 1000);
        }
        fixture
    }

    fn record<T: sto_state::StateRecord>(mut self, key: StateKey, value: T) -> Self {
        self.records.push(MergeValue::new(key, value));
        self
    }

    pub fn account(self, address: &str) -> Self {
        let address = Address::new(address);
        let account = Account {
            address: address.clone(),
            keys: AccountKeys::single(key_of(address.as_str())),
        };
        self.record(StateKey::account(&address), account)
    }

    pub fn contract_account(self, address: &str, owner: &str) -> Self {
        let contract = ContractAccount {
            owner: Address::new(owner),
            is_active: true,
        };
        self.account(address)
            .record(StateKey::contract_account(&Address::new(address)), contract)
    }

    pub fn currency(self, currency: &str, fee_per_item: u64) -> Self {
        let currency = CurrencyId::new(currency);
        let fee = if fee_per_item == 0 {
            FeePolicy::Nil
        } else {
            FeePolicy::Fixed(Amount::from(fee_per_item))
        };
        let design = CurrencyDesign {
            currency: currency.clone(),
            fee,
        };
        self.record(StateKey::currency_design(&currency), design)
    }

    pub fn currency_balance(self, address: &str, currency: &str, amount: u64) -> Self {
        let key = StateKey::balance(&Address::new(address), &CurrencyId::new(currency));
        self.record(key, CurrencyBalance(Amount::from(amount)))
    }

    pub fn security_token(
        mut self,
        contract: &str,
        sto_id: &str,
        granularity: u64,
        partitions: &[&str],
        controllers: &[&str],
    ) -> Self {
        let policy = Policy::new(
            partitions.iter().map(|p| Partition::new(*p)).collect(),
            controllers.iter().map(|c| Address::new(*c)).collect(),
        );
        let design = Design::new(ContractId::new(sto_id), granularity, policy);
        self.designs
            .insert((Address::new(contract), ContractId::new(sto_id)), design);
        self
    }

    /// Balance of `holder` on `partition`, reflected in the holder's
    /// partition set, the partition supply and the token aggregate
    pub fn holding(mut self, contract: &str, sto_id: &str, holder: &str, partition: &str, amount: u64) -> Self {
        let key = (
            Address::new(contract),
            ContractId::new(sto_id),
            Address::new(holder),
            Partition::new(partition),
        );
        let entry = self.balances.entry(key).or_default();
        *entry = entry.saturating_add(Amount::from(amount));
        self
    }

    pub fn operator(mut self, contract: &str, sto_id: &str, holder: &str, partition: &str, operator: &str) -> Self {
        let key = (
            Address::new(contract),
            ContractId::new(sto_id),
            Address::new(holder),
            Partition::new(partition),
        );
        insert_member(self.operators.entry(key).or_default(), Address::new(operator));
        self
    }

    pub fn kyc_service(self, contract: &str, kyc_id: &str, controllers: &[&str]) -> Self {
        let design = KycDesign::new(
            ContractId::new(kyc_id),
            controllers.iter().map(|c| Address::new(*c)).collect(),
        );
        let key = StateKey::kyc_design(&Address::new(contract), &ContractId::new(kyc_id));
        self.record(key, design)
    }

    pub fn customer(self, contract: &str, kyc_id: &str, customer: &str, status: bool) -> Self {
        let key = StateKey::customer(
            &Address::new(contract),
            &ContractId::new(kyc_id),
            &Address::new(customer),
        );
        self.record(key, CustomerStatus(status))
    }

    pub fn build(self) -> Result<MemoryState, LedgerError> {
        let LedgerFixture {
            mut records,
            mut designs,
            balances,
            operators,
        } = self;

        let mut holder_partitions: BTreeMap<(Address, ContractId, Address), Vec<Partition>> =
            BTreeMap::new();
        let mut supplies: BTreeMap<(Address, ContractId, Partition), Amount> = BTreeMap::new();

        for ((contract, sto_id, holder, partition), amount) in &balances {
            records.push(MergeValue::new(
                StateKey::token_holder_partition_balance(contract, sto_id, holder, partition),
                TokenHolderPartitionBalance(*amount),
            ));
            if amount.is_zero() {
                continue;
            }
            insert_member(
                holder_partitions
                    .entry((contract.clone(), sto_id.clone(), holder.clone()))
                    .or_default(),
                partition.clone(),
            );
            let supply = supplies
                .entry((contract.clone(), sto_id.clone(), partition.clone()))
                .or_default();
            *supply = supply.saturating_add(*amount);

            let design = designs
                .get_mut(&(contract.clone(), sto_id.clone()))
                .ok_or_else(|| {
                    LedgerError::StateNotFound(format!("fixture design {}/{}", contract, sto_id))
                })?;
            design.policy.aggregate = design.policy.aggregate.saturating_add(*amount);
            insert_member(&mut design.policy.partitions, partition.clone());
        }

        for ((contract, sto_id, holder), partitions) in holder_partitions {
            records.push(MergeValue::new(
                StateKey::token_holder_partitions(&contract, &sto_id, &holder),
                TokenHolderPartitions(partitions),
            ));
        }
        for ((contract, sto_id, partition), amount) in supplies {
            records.push(MergeValue::new(
                StateKey::partition_balance(&contract, &sto_id, &partition),
                PartitionBalance(amount),
            ));
        }

        let mut reverse: BTreeMap<HolderKey, Vec<Address>> = BTreeMap::new();
        for ((contract, sto_id, holder, partition), ops) in operators {
            for operator in &ops {
                insert_member(
                    reverse
                        .entry((contract.clone(), sto_id.clone(), operator.clone(), partition.clone()))
                        .or_default(),
                    holder.clone(),
                );
            }
            records.push(MergeValue::new(
                StateKey::token_holder_partition_operators(&contract, &sto_id, &holder, &partition),
                TokenHolderPartitionOperators(ops),
            ));
        }
        for ((contract, sto_id, operator, partition), holders) in reverse {
            records.push(MergeValue::new(
                StateKey::operator_token_holders(&contract, &sto_id, &operator, &partition),
                OperatorTokenHolders(holders),
            ));
        }

        for ((contract, _), design) in designs {
            records.push(MergeValue::new(
                StateKey::design(&contract, &design.asset_id),
                design,
            ));
        }

        let mut state = MemoryState::new();
        state.commit(&records)?;
        Ok(state)
    }
}
