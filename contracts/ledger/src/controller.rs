//! Yield / Self-Repay Controller
//!
//! Self-repay mode gates every interaction with external vaults. While it
//! is off the ledger is plain buffer-only custody. While it is on, buffered
//! collateral is flushed into the active vault and harvested yield is split
//! into a protocol fee and a net amount handed to the distribution sink.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::info;

use synthvault_common::{
    calculate_harvest_fee, fees, is_zero_address, safe_sub, Address, CdpError, CdpResult,
    FixedDecimal, VaultId, ZERO_ADDRESS,
};

use crate::cdp::AccrualContext;
use crate::interfaces::Environment;
use crate::vault_registry::VaultRegistry;

/// Mode flag plus the addresses that only exist while it is on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SelfRepayState {
    pub enabled: bool,
    /// Distribution sink receiving net yield and repaid base asset
    pub sink: Address,
    /// Recipient of the harvest fee
    pub rewards: Address,
}

/// Outcome of one harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestOutcome {
    pub harvested: u64,
    pub decreased_value: u64,
    pub fee: u64,
    pub distributed: u64,
    /// Amount added to the accumulator; zero when nothing is deposited
    pub weight_increment: FixedDecimal,
}

/// Fail unless `fee` is within 0..=100%
pub fn validate_harvest_fee(fee: u64) -> CdpResult<()> {
    if fee > fees::MAX_HARVEST_FEE {
        return Err(CdpError::OutOfBounds {
            param: "harvest fee",
            value: fee as u128,
            minimum: 0,
            maximum: fees::MAX_HARVEST_FEE as u128,
        });
    }
    Ok(())
}

/// Split a harvest into `(fee, net)`
pub fn split_harvest(harvested: u64, fee_rate: u64) -> CdpResult<(u64, u64)> {
    let fee = calculate_harvest_fee(harvested, fee_rate)?;
    Ok((fee, safe_sub(harvested, fee)?))
}

/// Whether a single movement is large enough to flush the buffer
pub fn should_flush(amount: u64, flush_activator: u64) -> bool {
    amount >= flush_activator
}

impl SelfRepayState {
    pub fn ensure_enabled(&self) -> CdpResult<()> {
        if !self.enabled {
            return Err(CdpError::ModeDisabled);
        }
        Ok(())
    }

    /// Switch the mode on and register the first active vault
    ///
    /// Returns the id of the new vault.
    pub fn turn_on<E: Environment>(
        &mut self,
        env: &E,
        registry: &mut VaultRegistry,
        base_asset: &Address,
        sink: Address,
        rewards: Address,
        adapter: Address,
    ) -> CdpResult<VaultId> {
        if self.enabled {
            return Err(CdpError::AlreadyOn);
        }
        if is_zero_address(&sink) {
            return Err(CdpError::ZeroAddress { field: "sink" });
        }
        if is_zero_address(&rewards) {
            return Err(CdpError::ZeroAddress { field: "rewards" });
        }

        let vault_id = registry.append(env, adapter, base_asset)?;

        self.sink = sink;
        self.rewards = rewards;
        self.enabled = true;
        Ok(vault_id)
    }

    /// Switch the mode off
    ///
    /// Funds still sitting in vaults are not recalled here; governance
    /// drains them separately. An inert record is appended so the active
    /// slot never points at a live adapter.
    pub fn turn_off(&mut self, registry: &mut VaultRegistry) -> CdpResult<VaultId> {
        if !self.enabled {
            return Err(CdpError::AlreadyOff);
        }

        self.sink = ZERO_ADDRESS;
        self.rewards = ZERO_ADDRESS;
        self.enabled = false;
        Ok(registry.append_inert())
    }

    /// Harvest a vault and share the yield
    ///
    /// The fee goes to the rewards address, the net amount to the sink, and
    /// the accumulator grows by `net / total_deposited`. With nothing
    /// deposited the transfers still happen but no weight is added.
    #[allow(clippy::too_many_arguments)]
    pub fn harvest_and_distribute<E: Environment>(
        &self,
        env: &mut E,
        registry: &mut VaultRegistry,
        ctx: &mut AccrualContext,
        vault_id: VaultId,
        ledger: &Address,
        fee_rate: u64,
        total_deposited: u64,
    ) -> CdpResult<HarvestOutcome> {
        self.ensure_enabled()?;

        let (harvested, decreased_value) = registry.harvest(env, vault_id, ledger)?;
        let mut outcome = HarvestOutcome {
            harvested,
            decreased_value,
            ..Default::default()
        };
        if harvested == 0 {
            return Ok(outcome);
        }

        let (fee, net) = split_harvest(harvested, fee_rate)?;
        outcome.fee = fee;
        outcome.distributed = net;
        outcome.weight_increment = ctx.accrue(net, total_deposited)?;

        if fee > 0 {
            env.transfer_base(ledger, &self.rewards, fee)?;
        }
        if net > 0 {
            env.distribute(&self.sink, ledger, net)?;
            env.lower_minted_counter(net)?;
        }

        info!(
            vault_id,
            harvested,
            fee,
            distributed = net,
            weight = %ctx.accumulated_yield_weight,
            "yield harvested"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::BaseAsset;
    use crate::testing::MockEnvironment;

    const LEDGER: Address = [0xAA; 32];
    const BASE: Address = [0xB0; 32];
    const ADAPTER: Address = [0xA1; 32];
    const SINK: Address = [0x5A; 32];
    const REWARDS: Address = [0x4E; 32];

    fn enabled(env: &mut MockEnvironment, registry: &mut VaultRegistry) -> SelfRepayState {
        env.add_adapter(ADAPTER, BASE);
        let mut state = SelfRepayState::default();
        state.turn_on(&*env, registry, &BASE, SINK, REWARDS, ADAPTER).unwrap();
        state
    }

    #[test]
    fn test_turn_on_validation() {
        let mut env = MockEnvironment::new(BASE);
        env.add_adapter(ADAPTER, BASE);
        let mut registry = VaultRegistry::new();
        let mut state = SelfRepayState::default();

        assert_eq!(
            state.turn_on(&env, &mut registry, &BASE, ZERO_ADDRESS, REWARDS, ADAPTER),
            Err(CdpError::ZeroAddress { field: "sink" })
        );
        assert_eq!(
            state.turn_on(&env, &mut registry, &BASE, SINK, ZERO_ADDRESS, ADAPTER),
            Err(CdpError::ZeroAddress { field: "rewards" })
        );
        assert_eq!(
            state.turn_on(&env, &mut registry, &BASE, SINK, REWARDS, ZERO_ADDRESS),
            Err(CdpError::ZeroAdapter)
        );
        assert!(!state.enabled);

        assert_eq!(state.turn_on(&env, &mut registry, &BASE, SINK, REWARDS, ADAPTER), Ok(0));
        assert_eq!(
            state.turn_on(&env, &mut registry, &BASE, SINK, REWARDS, ADAPTER),
            Err(CdpError::AlreadyOn)
        );
    }

    #[test]
    fn test_turn_off_appends_inert_record() {
        let mut env = MockEnvironment::new(BASE);
        let mut registry = VaultRegistry::new();
        let mut state = enabled(&mut env, &mut registry);

        assert_eq!(state.turn_off(&mut registry), Ok(1));
        assert!(registry.active().unwrap().is_inert());
        assert_eq!(state.sink, ZERO_ADDRESS);
        assert_eq!(state.turn_off(&mut registry), Err(CdpError::AlreadyOff));
    }

    #[test]
    fn test_fee_split() {
        assert_eq!(split_harvest(100, 1_000), Ok((10, 90)));
        assert_eq!(split_harvest(100, 0), Ok((0, 100)));
        assert_eq!(split_harvest(100, 10_000), Ok((100, 0)));
        assert_eq!(split_harvest(7, 1_000), Ok((0, 7)));

        assert!(validate_harvest_fee(10_000).is_ok());
        assert!(validate_harvest_fee(10_001).is_err());
    }

    #[test]
    fn test_flush_threshold_is_inclusive() {
        assert!(should_flush(100, 100));
        assert!(!should_flush(99, 100));
    }

    #[test]
    fn test_harvest_and_distribute() {
        let mut env = MockEnvironment::new(BASE);
        let mut registry = VaultRegistry::new();
        let state = enabled(&mut env, &mut registry);
        let mut ctx = AccrualContext::new(FixedDecimal::from_u64(2));

        env.fund(&LEDGER, 1000);
        registry.deposit_all_buffered(&mut env, &LEDGER).unwrap();
        env.accrue_yield(&ADAPTER, 100);

        let outcome = state
            .harvest_and_distribute(&mut env, &mut registry, &mut ctx, 0, &LEDGER, 1_000, 1000)
            .unwrap();

        assert_eq!(outcome.fee, 10);
        assert_eq!(outcome.distributed, 90);
        assert_eq!(env.base_balance_of(&REWARDS), 10);
        assert_eq!(env.distributed_to(&SINK), 90);
        assert_eq!(env.minted_counter_lowered(), 90);
        assert_eq!(ctx.accumulated_yield_weight, FixedDecimal::from_ratio(90, 1000).unwrap());
    }

    #[test]
    fn test_harvest_without_deposits_keeps_weight() {
        let mut env = MockEnvironment::new(BASE);
        let mut registry = VaultRegistry::new();
        let state = enabled(&mut env, &mut registry);
        let mut ctx = AccrualContext::new(FixedDecimal::from_u64(2));

        env.accrue_yield(&ADAPTER, 50);
        let outcome = state
            .harvest_and_distribute(&mut env, &mut registry, &mut ctx, 0, &LEDGER, 1_000, 0)
            .unwrap();

        assert_eq!(outcome.weight_increment, FixedDecimal::ZERO);
        assert_eq!(ctx.accumulated_yield_weight, FixedDecimal::ZERO);
        assert_eq!(env.distributed_to(&SINK), 45);
    }

    #[test]
    fn test_harvest_requires_mode() {
        let mut env = MockEnvironment::new(BASE);
        let mut registry = VaultRegistry::new();
        let mut ctx = AccrualContext::new(FixedDecimal::from_u64(2));

        assert_eq!(
            SelfRepayState::default().harvest_and_distribute(&mut env, &mut registry, &mut ctx, 0, &LEDGER, 0, 0),
            Err(CdpError::ModeDisabled)
        );
    }
}
