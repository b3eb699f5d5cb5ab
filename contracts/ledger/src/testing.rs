//! In-memory Environment
//!
//! A self-contained host for exercising the ledger: base and synthetic
//! balances, vault adapters with configurable slippage and yield, a
//! distribution sink recorder and fixed oracle answers. Checkpointing is a
//! full clone.

use std::collections::{BTreeMap, BTreeSet};

use synthvault_common::precision::PERCENT_RESOLUTION;
use synthvault_common::{safe_add, safe_sub, Address, BlockNumber, CdpError, CdpResult};

use crate::interfaces::{
    BaseAsset, DistributionSink, Environment, ExecutionContext, PegOracle, SyntheticAsset, VaultAdapter,
};

/// Simulated yield adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAdapter {
    /// Asset the adapter reports accepting
    pub token: Address,
    /// Principal deployed through `adapter_deposit`
    pub principal: u64,
    /// Withdrawal haircut in basis points
    pub slippage_bps: u64,
}

/// In-memory host
#[derive(Debug, Clone)]
pub struct MockEnvironment {
    base_asset: Address,
    block: BlockNumber,
    sender: Address,
    origin: Address,
    contracts: BTreeSet<Address>,
    base_balances: BTreeMap<Address, u64>,
    synthetic_balances: BTreeMap<Address, u64>,
    minted_counter_lowered: u64,
    adapters: BTreeMap<Address, MockAdapter>,
    distributions: BTreeMap<Address, u64>,
    oracle_answers: BTreeMap<Address, i128>,
    reject_distributions: bool,
}

impl MockEnvironment {
    /// Fresh host at block 1 with no balances
    pub fn new(base_asset: Address) -> Self {
        Self {
            base_asset,
            block: 1,
            sender: [0u8; 32],
            origin: [0u8; 32],
            contracts: BTreeSet::new(),
            base_balances: BTreeMap::new(),
            synthetic_balances: BTreeMap::new(),
            minted_counter_lowered: 0,
            adapters: BTreeMap::new(),
            distributions: BTreeMap::new(),
            oracle_answers: BTreeMap::new(),
            reject_distributions: false,
        }
    }

    // ============ Execution Context ============

    /// Make `caller` both the sender and the transaction origin
    pub fn set_caller(&mut self, caller: Address) {
        self.sender = caller;
        self.origin = caller;
    }

    /// Call from contract code deployed at `caller`, inside a transaction
    /// signed by `origin`
    pub fn set_contract_caller(&mut self, caller: Address, origin: Address) {
        self.contracts.insert(caller);
        self.sender = caller;
        self.origin = origin;
    }

    pub fn set_block(&mut self, block: BlockNumber) {
        self.block = block;
    }

    pub fn advance_block(&mut self) {
        self.block += 1;
    }

    // ============ Balances ============

    /// Credit base asset out of thin air
    pub fn fund(&mut self, owner: &Address, amount: u64) {
        *self.base_balances.entry(*owner).or_default() += amount;
    }

    pub fn synthetic_balance_of(&self, owner: &Address) -> u64 {
        self.synthetic_balances.get(owner).copied().unwrap_or(0)
    }

    pub fn fund_synthetic(&mut self, owner: &Address, amount: u64) {
        *self.synthetic_balances.entry(*owner).or_default() += amount;
    }

    /// Total handed to `sink` through `distribute`
    pub fn distributed_to(&self, sink: &Address) -> u64 {
        self.distributions.get(sink).copied().unwrap_or(0)
    }

    /// Cumulative amount passed to `lower_minted_counter`
    pub fn minted_counter_lowered(&self) -> u64 {
        self.minted_counter_lowered
    }

    // ============ Adapters ============

    pub fn add_adapter(&mut self, adapter: Address, token: Address) {
        self.adapters.insert(
            adapter,
            MockAdapter {
                token,
                principal: 0,
                slippage_bps: 0,
            },
        );
    }

    /// Register an adapter that accepts this host's base asset
    pub fn add_base_adapter(&mut self, adapter: Address) {
        let token = self.base_asset;
        self.add_adapter(adapter, token);
    }

    pub fn set_slippage(&mut self, adapter: &Address, slippage_bps: u64) {
        if let Some(a) = self.adapters.get_mut(adapter) {
            a.slippage_bps = slippage_bps;
        }
    }

    /// Simulate yield earned by an adapter's strategy
    pub fn accrue_yield(&mut self, adapter: &Address, amount: u64) {
        self.fund(adapter, amount);
    }

    pub fn adapter(&self, adapter: &Address) -> Option<&MockAdapter> {
        self.adapters.get(adapter)
    }

    // ============ Sink & Oracle ============

    /// Make every `distribute` call fail
    pub fn set_reject_distributions(&mut self, reject: bool) {
        self.reject_distributions = reject;
    }

    pub fn set_oracle_answer(&mut self, oracle: Address, answer: i128) {
        self.oracle_answers.insert(oracle, answer);
    }

    fn adapter_mut(&mut self, adapter: &Address) -> CdpResult<&mut MockAdapter> {
        self.adapters.get_mut(adapter).ok_or(CdpError::ExternalCallFailed {
            target: *adapter,
            reason: "unknown adapter",
        })
    }

    fn debit_base(&mut self, owner: &Address, amount: u64) -> CdpResult<()> {
        let available = self.base_balance_of(owner);
        if available < amount {
            return Err(CdpError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.base_balances.insert(*owner, available - amount);
        Ok(())
    }
}

impl ExecutionContext for MockEnvironment {
    fn block_number(&self) -> BlockNumber {
        self.block
    }

    fn msg_sender(&self) -> Address {
        self.sender
    }

    fn tx_origin(&self) -> Address {
        self.origin
    }

    fn is_contract(&self, address: &Address) -> bool {
        self.contracts.contains(address)
    }
}

impl BaseAsset for MockEnvironment {
    fn base_balance_of(&self, owner: &Address) -> u64 {
        self.base_balances.get(owner).copied().unwrap_or(0)
    }

    fn transfer_base(&mut self, from: &Address, to: &Address, amount: u64) -> CdpResult<()> {
        self.debit_base(from, amount)?;
        let balance = self.base_balances.entry(*to).or_default();
        *balance = safe_add(*balance, amount)?;
        Ok(())
    }
}

impl SyntheticAsset for MockEnvironment {
    fn mint_synthetic(&mut self, to: &Address, amount: u64) -> CdpResult<()> {
        let balance = self.synthetic_balances.entry(*to).or_default();
        *balance = safe_add(*balance, amount)?;
        Ok(())
    }

    fn burn_synthetic_from(&mut self, from: &Address, amount: u64) -> CdpResult<()> {
        let available = self.synthetic_balance_of(from);
        if available < amount {
            return Err(CdpError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.synthetic_balances.insert(*from, available - amount);
        Ok(())
    }

    fn lower_minted_counter(&mut self, amount: u64) -> CdpResult<()> {
        self.minted_counter_lowered = safe_add(self.minted_counter_lowered, amount)?;
        Ok(())
    }
}

impl VaultAdapter for MockEnvironment {
    fn adapter_token(&self, adapter: &Address) -> CdpResult<Address> {
        self.adapters
            .get(adapter)
            .map(|a| a.token)
            .ok_or(CdpError::ExternalCallFailed {
                target: *adapter,
                reason: "unknown adapter",
            })
    }

    fn adapter_deposit(&mut self, adapter: &Address, amount: u64) -> CdpResult<()> {
        let a = self.adapter_mut(adapter)?;
        a.principal = safe_add(a.principal, amount)?;
        Ok(())
    }

    fn adapter_withdraw(&mut self, adapter: &Address, recipient: &Address, amount: u64) -> CdpResult<(u64, u64)> {
        let a = self.adapter_mut(adapter)?;
        if a.principal < amount {
            return Err(CdpError::InsufficientBalance {
                available: a.principal,
                requested: amount,
            });
        }
        a.principal -= amount;
        let haircut = (amount as u128 * a.slippage_bps as u128 / PERCENT_RESOLUTION as u128) as u64;
        let withdrawn = safe_sub(amount, haircut)?;

        // The haircut is lost to the strategy
        self.debit_base(adapter, haircut)?;
        self.transfer_base(adapter, recipient, withdrawn)?;
        Ok((withdrawn, amount))
    }

    fn adapter_harvest(&mut self, adapter: &Address, recipient: &Address) -> CdpResult<(u64, u64)> {
        let principal = self.adapter_mut(adapter)?.principal;
        let earned = self.base_balance_of(adapter).saturating_sub(principal);
        if earned > 0 {
            self.transfer_base(adapter, recipient, earned)?;
        }
        Ok((earned, earned))
    }
}

impl DistributionSink for MockEnvironment {
    fn distribute(&mut self, sink: &Address, origin: &Address, amount: u64) -> CdpResult<()> {
        if self.reject_distributions {
            return Err(CdpError::ExternalCallFailed {
                target: *sink,
                reason: "sink rejected distribution",
            });
        }
        self.transfer_base(origin, sink, amount)?;
        let total = self.distributions.entry(*sink).or_default();
        *total = safe_add(*total, amount)?;
        Ok(())
    }
}

impl PegOracle for MockEnvironment {
    fn latest_answer(&self, oracle: &Address) -> CdpResult<i128> {
        self.oracle_answers
            .get(oracle)
            .copied()
            .ok_or(CdpError::ExternalCallFailed {
                target: *oracle,
                reason: "oracle has no answer",
            })
    }
}

impl Environment for MockEnvironment {
    type Checkpoint = MockEnvironment;

    fn checkpoint(&mut self) -> Self::Checkpoint {
        self.clone()
    }

    fn rollback(&mut self, checkpoint: Self::Checkpoint) {
        *self = checkpoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Address = [0xB0; 32];
    const A: Address = [1u8; 32];
    const B: Address = [2u8; 32];

    #[test]
    fn test_transfer_checks_balance() {
        let mut env = MockEnvironment::new(BASE);
        env.fund(&A, 10);

        assert_eq!(
            env.transfer_base(&A, &B, 11),
            Err(CdpError::InsufficientBalance { available: 10, requested: 11 })
        );
        env.transfer_base(&A, &B, 4).unwrap();
        assert_eq!(env.base_balance_of(&A), 6);
        assert_eq!(env.base_balance_of(&B), 4);
    }

    #[test]
    fn test_checkpoint_restores_everything() {
        let mut env = MockEnvironment::new(BASE);
        env.fund(&A, 10);
        let checkpoint = env.checkpoint();

        env.transfer_base(&A, &B, 10).unwrap();
        env.mint_synthetic(&A, 5).unwrap();
        env.rollback(checkpoint);

        assert_eq!(env.base_balance_of(&A), 10);
        assert_eq!(env.synthetic_balance_of(&A), 0);
    }

    #[test]
    fn test_contract_caller_flags() {
        let mut env = MockEnvironment::new(BASE);
        env.set_contract_caller(B, A);
        assert!(env.is_contract(&B));
        assert_eq!(env.msg_sender(), B);
        assert_eq!(env.tx_origin(), A);
    }
}
