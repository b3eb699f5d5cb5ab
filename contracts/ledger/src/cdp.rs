//! CDP Accounts
//!
//! Per-account collateral, debt and credit, plus the shared accrual context.
//!
//! Yield is shared with a reward-per-share accumulator: each harvest bumps
//! `accumulated_yield_weight` by `distributed / total_deposited`, and an
//! account's newly earned credit is the weight delta since its last
//! snapshot times its deposit. Accounts reconcile lazily, on their next
//! operation.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use synthvault_common::{CdpError, CdpResult, FixedDecimal};

// ============================================================================
// Accrual Context
// ============================================================================

/// Shared accrual state, one per ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccrualContext {
    /// Minimum ratio of collateral to debt
    pub collateralization_limit: FixedDecimal,
    /// Reward-per-unit-deposited accumulator; never decreases
    pub accumulated_yield_weight: FixedDecimal,
}

impl AccrualContext {
    pub fn new(collateralization_limit: FixedDecimal) -> Self {
        Self {
            collateralization_limit,
            accumulated_yield_weight: FixedDecimal::ZERO,
        }
    }

    /// Spread `distributed` over `total_deposited`
    ///
    /// With nothing deposited there is nobody to credit, so the weight is
    /// left unchanged. Returns the weight increment applied.
    pub fn accrue(&mut self, distributed: u64, total_deposited: u64) -> CdpResult<FixedDecimal> {
        if distributed == 0 || total_deposited == 0 {
            return Ok(FixedDecimal::ZERO);
        }

        let increment = FixedDecimal::from_ratio(distributed, total_deposited)?;
        self.accumulated_yield_weight = self.accumulated_yield_weight.checked_add(increment)?;
        Ok(increment)
    }
}

// ============================================================================
// CDP Account
// ============================================================================

/// One account's position; a zeroed account is the same as a missing one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CdpAccount {
    /// Collateral attributed to the account (buffer or vault)
    pub total_deposited: u64,
    /// Outstanding synthetic debt
    pub total_debt: u64,
    /// Accrued yield not yet spent on minting
    pub total_credit: u64,
    /// Accumulator snapshot at the last reconciliation
    pub last_accumulated_weight: FixedDecimal,
    /// Block of the most recent deposit
    pub last_deposit_block: u64,
}

impl CdpAccount {
    /// Credit earned since the last reconciliation
    pub fn earned_yield(&self, ctx: &AccrualContext) -> CdpResult<u64> {
        let delta = ctx
            .accumulated_yield_weight
            .checked_sub(self.last_accumulated_weight)?;
        delta.mul_decode(self.total_deposited)
    }

    /// Credit including accrual not yet materialized
    pub fn updated_total_credit(&self, ctx: &AccrualContext) -> CdpResult<u64> {
        self.total_credit
            .checked_add(self.earned_yield(ctx)?)
            .ok_or(CdpError::Overflow)
    }

    /// Materialize earned credit and bring the snapshot current
    ///
    /// Must run before any change to `total_deposited` and before any
    /// health check. Returns the credit accrued by this call.
    pub fn reconcile(&mut self, ctx: &AccrualContext) -> CdpResult<u64> {
        let accrued = self.earned_yield(ctx)?;

        self.total_credit = self.total_credit.checked_add(accrued).ok_or(CdpError::Overflow)?;
        self.last_accumulated_weight = ctx.accumulated_yield_weight;

        if accrued > 0 {
            debug!(accrued, total_credit = self.total_credit, "credit reconciled");
        }
        Ok(accrued)
    }

    /// Collateral required to back the current debt, in fixed point
    pub fn required_collateral(&self, ctx: &AccrualContext) -> CdpResult<FixedDecimal> {
        ctx.collateralization_limit.checked_mul_u64(self.total_debt)
    }

    /// deposited >= debt * collateralization_limit
    pub fn is_healthy(&self, ctx: &AccrualContext) -> CdpResult<bool> {
        let required = match self.required_collateral(ctx) {
            Ok(required) => required,
            // More than any u64 deposit can back
            Err(CdpError::Overflow) => return Ok(false),
            Err(e) => return Err(e),
        };
        Ok(FixedDecimal::from_u64(self.total_deposited) >= required)
    }

    /// Fail with `on_breach(deposited, required)` unless healthy
    pub fn check_health(
        &self,
        ctx: &AccrualContext,
        on_breach: fn(u64, u64) -> CdpError,
    ) -> CdpResult<()> {
        if self.is_healthy(ctx)? {
            return Ok(());
        }

        let required = self
            .required_collateral(ctx)
            .map(FixedDecimal::ceil)
            .unwrap_or(u64::MAX);
        Err(on_breach(self.total_deposited, required))
    }
}

/// Health failure raised by withdrawals
pub fn under_collateralized(deposited: u64, required: u64) -> CdpError {
    CdpError::UnderCollateralized { deposited, required }
}

/// Health failure raised by minting
pub fn loan_to_value_breached(deposited: u64, required: u64) -> CdpError {
    CdpError::LoanToValueBreached { deposited, required }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(limit: u64) -> AccrualContext {
        AccrualContext::new(FixedDecimal::from_u64(limit))
    }

    #[test]
    fn test_reconcile_accrues_weight_delta() {
        let mut ctx = ctx(2);
        let mut account = CdpAccount {
            total_deposited: 1000,
            ..Default::default()
        };

        ctx.accrue(90, 1000).unwrap();
        assert_eq!(account.updated_total_credit(&ctx).unwrap(), 89);

        assert_eq!(account.reconcile(&ctx).unwrap(), 89);
        assert_eq!(account.total_credit, 89);
        assert_eq!(account.last_accumulated_weight, ctx.accumulated_yield_weight);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut ctx = ctx(2);
        let mut account = CdpAccount {
            total_deposited: 500,
            ..Default::default()
        };
        ctx.accrue(100, 500).unwrap();

        account.reconcile(&ctx).unwrap();
        let credit = account.total_credit;
        assert_eq!(account.reconcile(&ctx).unwrap(), 0);
        assert_eq!(account.total_credit, credit);
    }

    #[test]
    fn test_accrue_with_no_deposits_is_noop() {
        let mut ctx = ctx(2);
        assert_eq!(ctx.accrue(100, 0).unwrap(), FixedDecimal::ZERO);
        assert_eq!(ctx.accumulated_yield_weight, FixedDecimal::ZERO);
    }

    #[test]
    fn test_new_account_does_not_inherit_history() {
        let mut ctx = ctx(2);
        ctx.accrue(100, 100).unwrap();

        let mut account = CdpAccount::default();
        account.reconcile(&ctx).unwrap();
        account.total_deposited = 100;

        // Snapshot is current, so past yield is not claimable
        assert_eq!(account.earned_yield(&ctx).unwrap(), 0);
    }

    #[test]
    fn test_health_boundary_is_inclusive() {
        let ctx = ctx(2);
        let mut account = CdpAccount {
            total_deposited: 1000,
            total_debt: 500,
            ..Default::default()
        };
        assert!(account.is_healthy(&ctx).unwrap());

        account.total_debt = 501;
        assert_eq!(
            account.check_health(&ctx, loan_to_value_breached),
            Err(CdpError::LoanToValueBreached { deposited: 1000, required: 1002 })
        );
    }

    #[test]
    fn test_fractional_limit() {
        let ctx = AccrualContext::new(FixedDecimal::from_bps(15_000).unwrap());
        let account = CdpAccount {
            total_deposited: 149,
            total_debt: 100,
            ..Default::default()
        };
        assert_eq!(
            account.check_health(&ctx, under_collateralized),
            Err(CdpError::UnderCollateralized { deposited: 149, required: 150 })
        );
    }

    #[test]
    fn test_debt_free_account_is_healthy() {
        let ctx = ctx(4);
        assert!(CdpAccount::default().is_healthy(&ctx).unwrap());
    }
}
