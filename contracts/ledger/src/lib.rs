//! Synthvault Ledger - CDP Accounting and Vault Orchestration
//!
//! Users deposit a base asset as collateral and mint a synthetic asset
//! against it. Collateral sits in a local buffer until it is flushed into
//! an external yield vault; harvested yield is shared across depositors as
//! credit that offsets future minting.
//!
//! ## Core Operations
//!
//! - **Deposit / Withdraw**: Move collateral in and out of an account
//! - **Mint / Repay**: Take on or pay down synthetic debt
//! - **Liquidate**: Burn an account's own collateral against its debt
//! - **Harvest / Recall / Flush / Migrate**: Vault orchestration
//!
//! ## Execution Model
//!
//! The engine owns all ledger state. Tokens, vault adapters, the
//! distribution sink and the peg oracle live in the host, reached through
//! [`interfaces::Environment`]. Every public operation runs under a
//! reentrancy lock and is all-or-nothing: on error the ledger state, the
//! event log and the host are restored to where they were.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub mod cdp;
pub mod config;
pub mod controller;
pub mod interfaces;
pub mod router;
pub mod vault_registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;


use synthvault_common::{
    ensure_externally_owned, is_zero_address, limits, safe_add, safe_sub, AccessControl, Address,
    CdpError, CdpResult, EmergencyState, EventLog, FixedDecimal, LedgerEvent, PegGate,
    ReentrancyGuard, ShortHex, VaultId, ZERO_ADDRESS,
};

use crate::cdp::{loan_to_value_breached, under_collateralized, AccrualContext, CdpAccount};
use crate::config::LedgerConfig;
use crate::controller::{should_flush, validate_harvest_fee, HarvestOutcome, SelfRepayState};
use crate::interfaces::Environment;
use crate::router::{route_withdrawal, Withdrawal};
use crate::vault_registry::{VaultRegistry, VaultStatus};

// ============ Ledger State ============

/// Everything the ledger persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LedgerState {
    /// The ledger's own address; its base balance is the buffer
    pub address: Address,
    pub base_asset: Address,
    pub synthetic_asset: Address,
    pub access: AccessControl,
    pub emergency: EmergencyState,
    pub peg: PegGate,
    pub context: AccrualContext,
    pub accounts: BTreeMap<Address, CdpAccount>,
    pub vaults: VaultRegistry,
    pub self_repay: SelfRepayState,
    /// Share of harvested yield kept as a fee (of `PERCENT_RESOLUTION`)
    pub harvest_fee: u64,
    /// Single-movement size that flushes the buffer
    pub flush_activator: u64,
    /// Collateral attributed across all accounts
    pub total_deposited: u64,
}

impl LedgerState {
    pub fn new(config: &LedgerConfig) -> CdpResult<Self> {
        config.validate()?;

        Ok(Self {
            address: config.address,
            base_asset: config.base_asset,
            synthetic_asset: config.synthetic_asset,
            access: config.access_control()?,
            emergency: EmergencyState::new(),
            peg: config.peg_gate()?,
            context: AccrualContext::new(config.collateralization_limit()?),
            accounts: BTreeMap::new(),
            vaults: VaultRegistry::new(),
            self_repay: SelfRepayState::default(),
            harvest_fee: 0,
            flush_activator: config.flush_activator,
            total_deposited: 0,
        })
    }

    /// Account record, or a zeroed one if the address never interacted
    pub fn account(&self, owner: &Address) -> CdpAccount {
        self.accounts.get(owner).cloned().unwrap_or_default()
    }

    /// SHA-256 commitment over the borsh encoding
    pub fn state_hash(&self) -> CdpResult<[u8; 32]> {
        let bytes = borsh::to_vec(self).map_err(CdpError::serialization)?;
        Ok(Sha256::digest(&bytes).into())
    }
}

// ============ Operation Context ============

/// Borrowed view of the ledger for the duration of one operation
struct OperationContext<'a, E: Environment> {
    state: &'a mut LedgerState,
    events: &'a mut EventLog,
    env: &'a mut E,
    caller: Address,
    block: u64,
}

impl<'a, E: Environment> OperationContext<'a, E> {
    fn ensure_externally_owned(&self) -> CdpResult<()> {
        let origin = self.env.tx_origin();
        ensure_externally_owned(&self.caller, &origin, self.env.is_contract(&self.caller))
    }

    fn ensure_governance(&self) -> CdpResult<()> {
        self.state.access.ensure_governance(&self.caller)
    }

    /// Load an account and materialize its pending credit
    fn reconciled_account(&mut self, owner: &Address) -> CdpResult<CdpAccount> {
        let mut account = self.state.account(owner);
        let accrued = account.reconcile(&self.state.context)?;

        if accrued > 0 {
            self.events.emit(LedgerEvent::CreditAccrued {
                account: *owner,
                accrued,
                total_credit: account.total_credit,
                block_height: self.block,
            });
        }
        Ok(account)
    }

    fn store_account(&mut self, owner: Address, account: CdpAccount) {
        self.state.accounts.insert(owner, account);
    }

    // ============ Buffer ============

    /// Move the whole buffer into the active vault
    fn flush_active_vault(&mut self) -> CdpResult<u64> {
        let ledger = self.state.address;
        let amount = self.state.vaults.deposit_all_buffered(&mut *self.env, &ledger)?;

        if amount > 0 {
            if let Some(vault_id) = self.state.vaults.active_id() {
                self.events.emit(LedgerEvent::FundsFlushed {
                    vault_id,
                    amount,
                    block_height: self.block,
                });
            }
        }
        Ok(amount)
    }

    /// Flush when a single movement meets the activator
    fn flush_if_large(&mut self, amount: u64) -> CdpResult<()> {
        if self.state.self_repay.enabled
            && !self.state.emergency.is_active()
            && should_flush(amount, self.state.flush_activator)
        {
            let flushed = self.flush_active_vault()?;
            debug!(amount, flushed, "flush activated");
        }
        Ok(())
    }

    // ============ Account Operations ============

    fn deposit(&mut self, amount: u64) -> CdpResult<()> {
        self.state.emergency.ensure_not_paused()?;
        self.ensure_externally_owned()?;

        let owner = self.caller;
        let ledger = self.state.address;
        let mut account = self.reconciled_account(&owner)?;

        account.total_deposited = safe_add(account.total_deposited, amount)?;
        account.last_deposit_block = self.block;
        self.state.total_deposited = safe_add(self.state.total_deposited, amount)?;
        let total_deposited = account.total_deposited;
        self.store_account(owner, account);

        self.env.transfer_base(&owner, &ledger, amount)?;
        self.flush_if_large(amount)?;

        self.events.emit(LedgerEvent::TokensDeposited {
            account: owner,
            amount,
            total_deposited,
            block_height: self.block,
        });
        info!(account = %ShortHex(&owner), amount, total_deposited, "deposit");
        Ok(())
    }

    fn withdraw(&mut self, amount: u64) -> CdpResult<Withdrawal> {
        self.ensure_externally_owned()?;

        let owner = self.caller;
        let ledger = self.state.address;
        let mut account = self.reconciled_account(&owner)?;

        if self.block == account.last_deposit_block {
            return Err(CdpError::SameBlockDeposit { block: self.block });
        }
        if amount > account.total_deposited {
            return Err(CdpError::InsufficientCollateral {
                available: account.total_deposited,
                requested: amount,
            });
        }

        let result = route_withdrawal(
            &mut *self.env,
            &mut self.state.vaults,
            self.state.self_repay.enabled,
            &ledger,
            &owner,
            amount,
        )?;

        account.total_deposited = safe_sub(account.total_deposited, result.decreased_value)?;
        self.state.total_deposited = safe_sub(self.state.total_deposited, result.decreased_value)?;
        account.check_health(&self.state.context, under_collateralized)?;

        let (total_deposited, total_debt) = (account.total_deposited, account.total_debt);
        self.store_account(owner, account);
        self.flush_if_large(amount)?;

        self.events.emit(LedgerEvent::TokensWithdrawn {
            account: owner,
            requested: amount,
            withdrawn: result.withdrawn,
            decreased_value: result.decreased_value,
            total_deposited,
            total_debt,
            block_height: self.block,
        });
        info!(
            account = %ShortHex(&owner),
            amount,
            withdrawn = result.withdrawn,
            decreased_value = result.decreased_value,
            "withdraw"
        );
        Ok(result)
    }

    /// Reduce `owner`'s debt with tokens pulled from the caller
    fn repay(&mut self, owner: Address, base_amount: u64, synthetic_amount: u64) -> CdpResult<()> {
        if base_amount > 0 {
            self.state.self_repay.ensure_enabled()?;
        }

        let payer = self.caller;
        let ledger = self.state.address;
        let mut account = self.reconciled_account(&owner)?;

        let repaid = safe_add(base_amount, synthetic_amount)?;
        account.total_debt = account.total_debt.checked_sub(repaid).ok_or(CdpError::DebtUnderflow {
            debt: account.total_debt,
            repaid,
        })?;
        let total_debt = account.total_debt;
        self.store_account(owner, account);

        if base_amount > 0 {
            let sink = self.state.self_repay.sink;
            self.env.transfer_base(&payer, &ledger, base_amount)?;
            self.env.distribute(&sink, &ledger, base_amount)?;
        }
        if synthetic_amount > 0 {
            self.env.burn_synthetic_from(&payer, synthetic_amount)?;
        }
        if repaid > 0 {
            self.env.lower_minted_counter(repaid)?;
        }

        self.events.emit(LedgerEvent::TokensRepaid {
            account: owner,
            payer,
            base_amount,
            synthetic_amount,
            total_debt,
            block_height: self.block,
        });
        info!(account = %ShortHex(&owner), base_amount, synthetic_amount, total_debt, "repay");
        Ok(())
    }

    fn mint(&mut self, amount: u64) -> CdpResult<()> {
        self.state.emergency.ensure_not_paused()?;
        self.ensure_externally_owned()?;

        if self.state.peg.is_enabled() {
            let answer = self.env.latest_answer(&self.state.peg.oracle)?;
            self.state.peg.check(answer)?;
        }

        let owner = self.caller;
        let mut account = self.reconciled_account(&owner)?;

        let credit_used = amount.min(account.total_credit);
        let debt_added = amount - credit_used;
        account.total_credit -= credit_used;

        if debt_added > 0 {
            account.total_debt = safe_add(account.total_debt, debt_added)?;
            account.check_health(&self.state.context, loan_to_value_breached)?;
        }

        let (total_debt, total_credit) = (account.total_debt, account.total_credit);
        self.store_account(owner, account);

        self.env.mint_synthetic(&owner, amount)?;
        self.flush_if_large(amount)?;

        self.events.emit(LedgerEvent::TokensMinted {
            account: owner,
            amount,
            credit_used,
            debt_added,
            total_debt,
            total_credit,
            block_height: self.block,
        });
        info!(account = %ShortHex(&owner), amount, credit_used, debt_added, "mint");
        Ok(())
    }

    fn liquidate(&mut self, amount: u64) -> CdpResult<Withdrawal> {
        self.ensure_externally_owned()?;
        self.state.self_repay.ensure_enabled()?;

        let owner = self.caller;
        let ledger = self.state.address;
        let sink = self.state.self_repay.sink;
        let mut account = self.reconciled_account(&owner)?;

        if self.block == account.last_deposit_block {
            return Err(CdpError::SameBlockDeposit { block: self.block });
        }

        let requested = amount.min(account.total_debt);
        let result = route_withdrawal(
            &mut *self.env,
            &mut self.state.vaults,
            true,
            &ledger,
            &ledger,
            requested,
        )?;

        account.total_deposited = safe_sub(account.total_deposited, result.decreased_value)?;
        account.total_debt = safe_sub(account.total_debt, result.withdrawn)?;
        self.state.total_deposited = safe_sub(self.state.total_deposited, result.decreased_value)?;
        let (total_deposited, total_debt) = (account.total_deposited, account.total_debt);
        self.store_account(owner, account);

        if result.withdrawn > 0 {
            self.env.distribute(&sink, &ledger, result.withdrawn)?;
            self.env.lower_minted_counter(result.withdrawn)?;
        }

        self.events.emit(LedgerEvent::TokensLiquidated {
            account: owner,
            requested,
            withdrawn: result.withdrawn,
            decreased_value: result.decreased_value,
            total_deposited,
            total_debt,
            block_height: self.block,
        });
        info!(
            account = %ShortHex(&owner),
            requested,
            withdrawn = result.withdrawn,
            total_debt,
            "liquidate"
        );
        Ok(result)
    }

    // ============ Vault Operations ============

    fn turn_on(&mut self, sink: Address, rewards: Address, harvest_fee: u64, adapter: Address) -> CdpResult<VaultId> {
        self.ensure_governance()?;
        validate_harvest_fee(harvest_fee)?;

        let base_asset = self.state.base_asset;
        let vault_id = self.state.self_repay.turn_on(
            &*self.env,
            &mut self.state.vaults,
            &base_asset,
            sink,
            rewards,
            adapter,
        )?;
        self.state.harvest_fee = harvest_fee;

        self.events.emit(LedgerEvent::SelfRepayEnabled {
            sink,
            rewards,
            harvest_fee,
            block_height: self.block,
        });
        self.events.emit(LedgerEvent::ActiveVaultUpdated {
            vault_id,
            adapter,
            block_height: self.block,
        });
        info!(vault_id, adapter = %ShortHex(&adapter), harvest_fee, "self-repay enabled");
        Ok(vault_id)
    }

    fn turn_off(&mut self) -> CdpResult<VaultId> {
        self.ensure_governance()?;

        let vault_id = self.state.self_repay.turn_off(&mut self.state.vaults)?;

        self.events.emit(LedgerEvent::SelfRepayDisabled { block_height: self.block });
        self.events.emit(LedgerEvent::ActiveVaultUpdated {
            vault_id,
            adapter: ZERO_ADDRESS,
            block_height: self.block,
        });
        info!(vault_id, "self-repay disabled");
        Ok(vault_id)
    }

    fn migrate(&mut self, adapter: Address) -> CdpResult<VaultId> {
        self.ensure_governance()?;
        self.state.self_repay.ensure_enabled()?;

        let base_asset = self.state.base_asset;
        let vault_id = self.state.vaults.append(&*self.env, adapter, &base_asset)?;

        self.events.emit(LedgerEvent::ActiveVaultUpdated {
            vault_id,
            adapter,
            block_height: self.block,
        });
        info!(vault_id, adapter = %ShortHex(&adapter), "vault migrated");
        Ok(vault_id)
    }

    fn harvest(&mut self, vault_id: VaultId) -> CdpResult<HarvestOutcome> {
        let ledger = self.state.address;
        let fee_rate = self.state.harvest_fee;
        let total_deposited = self.state.total_deposited;

        let outcome = self.state.self_repay.harvest_and_distribute(
            &mut *self.env,
            &mut self.state.vaults,
            &mut self.state.context,
            vault_id,
            &ledger,
            fee_rate,
            total_deposited,
        )?;

        self.events.emit(LedgerEvent::FundsHarvested {
            vault_id,
            harvested: outcome.harvested,
            decreased_value: outcome.decreased_value,
            fee: outcome.fee,
            distributed: outcome.distributed,
            accumulated_weight: self.state.context.accumulated_yield_weight,
            block_height: self.block,
        });
        Ok(outcome)
    }

    fn recall(&mut self, vault_id: VaultId, amount: u64) -> CdpResult<Withdrawal> {
        // Existence first so a bad id is not reported as a permission error
        self.state.vaults.get(vault_id)?;

        if self.state.vaults.is_active(vault_id)
            && !self.state.emergency.is_active()
            && !self.state.access.is_governance(&self.caller)
        {
            return Err(CdpError::Unauthorized { caller: self.caller });
        }

        let ledger = self.state.address;
        let (withdrawn, decreased_value) = self.state.vaults.withdraw(&mut *self.env, vault_id, &ledger, amount)?;

        self.events.emit(LedgerEvent::FundsRecalled {
            vault_id,
            withdrawn,
            decreased_value,
            block_height: self.block,
        });
        info!(vault_id, amount, withdrawn, decreased_value, "funds recalled");
        Ok(Withdrawal { withdrawn, decreased_value })
    }

    fn flush(&mut self) -> CdpResult<u64> {
        self.state.emergency.ensure_not_paused()?;
        self.state.self_repay.ensure_enabled()?;

        let amount = self.flush_active_vault()?;
        info!(amount, "buffer flushed");
        Ok(amount)
    }
}

// ============ Ledger ============

/// The CDP ledger engine
#[derive(Debug)]
pub struct Ledger {
    state: LedgerState,
    guard: ReentrancyGuard,
    events: EventLog,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> CdpResult<Self> {
        let state = LedgerState::new(&config)?;
        info!(
            ledger = %ShortHex(&state.address),
            limit = %state.context.collateralization_limit,
            "ledger created"
        );
        Ok(Self::from_state(state))
    }

    /// Resume from persisted state with an empty event log
    pub fn from_state(state: LedgerState) -> Self {
        Self {
            state,
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    /// Run `op` atomically under the reentrancy lock
    fn transact<E, T, F>(&mut self, env: &mut E, operation: &'static str, op: F) -> CdpResult<T>
    where
        E: Environment,
        F: FnOnce(&mut OperationContext<'_, E>) -> CdpResult<T>,
    {
        self.guard.enter(env.block_number())?;

        let snapshot = self.state.clone();
        let mark = self.events.len();
        let checkpoint = env.checkpoint();

        let result = {
            let mut ctx = OperationContext {
                caller: env.msg_sender(),
                block: env.block_number(),
                state: &mut self.state,
                events: &mut self.events,
                env: &mut *env,
            };
            op(&mut ctx)
        };

        if let Err(err) = &result {
            warn!(
                operation,
                sequence = self.guard.operation_count,
                code = err.code(),
                error = %err,
                "operation reverted"
            );
            self.state = snapshot;
            self.events.truncate(mark);
            env.rollback(checkpoint);
        }

        self.guard.exit()?;
        result
    }

    // ============ Account Operations ============

    /// Deposit `amount` of base asset from the caller
    pub fn deposit<E: Environment>(&mut self, env: &mut E, amount: u64) -> CdpResult<()> {
        self.transact(env, "deposit", |ctx| ctx.deposit(amount))
    }

    /// Withdraw up to `amount` of collateral to the caller
    pub fn withdraw<E: Environment>(&mut self, env: &mut E, amount: u64) -> CdpResult<Withdrawal> {
        self.transact(env, "withdraw", |ctx| ctx.withdraw(amount))
    }

    /// Repay the caller's debt with base and/or synthetic asset
    pub fn repay<E: Environment>(&mut self, env: &mut E, base_amount: u64, synthetic_amount: u64) -> CdpResult<()> {
        self.transact(env, "repay", |ctx| {
            ctx.ensure_externally_owned()?;
            let owner = ctx.caller;
            ctx.repay(owner, base_amount, synthetic_amount)
        })
    }

    /// Repay `account`'s debt; caller must be a whitelisted repayer
    pub fn repay_for<E: Environment>(
        &mut self,
        env: &mut E,
        account: Address,
        base_amount: u64,
        synthetic_amount: u64,
    ) -> CdpResult<()> {
        self.transact(env, "repay_for", |ctx| {
            if !ctx.state.access.is_whitelisted(&ctx.caller) {
                return Err(CdpError::Unauthorized { caller: ctx.caller });
            }
            ctx.repay(account, base_amount, synthetic_amount)
        })
    }

    /// Mint `amount` of synthetic asset, spending credit before adding debt
    pub fn mint<E: Environment>(&mut self, env: &mut E, amount: u64) -> CdpResult<()> {
        self.transact(env, "mint", |ctx| ctx.mint(amount))
    }

    /// Settle up to `amount` of the caller's debt with their collateral
    pub fn liquidate<E: Environment>(&mut self, env: &mut E, amount: u64) -> CdpResult<Withdrawal> {
        self.transact(env, "liquidate", |ctx| ctx.liquidate(amount))
    }

    // ============ Vault Operations ============

    pub fn turn_on<E: Environment>(
        &mut self,
        env: &mut E,
        sink: Address,
        rewards: Address,
        harvest_fee: u64,
        adapter: Address,
    ) -> CdpResult<VaultId> {
        self.transact(env, "turn_on", |ctx| ctx.turn_on(sink, rewards, harvest_fee, adapter))
    }

    pub fn turn_off<E: Environment>(&mut self, env: &mut E) -> CdpResult<VaultId> {
        self.transact(env, "turn_off", |ctx| ctx.turn_off())
    }

    /// Append a new active vault
    pub fn migrate<E: Environment>(&mut self, env: &mut E, adapter: Address) -> CdpResult<VaultId> {
        self.transact(env, "migrate", |ctx| ctx.migrate(adapter))
    }

    /// Harvest a vault and distribute the yield; callable by anyone
    pub fn harvest<E: Environment>(&mut self, env: &mut E, vault_id: VaultId) -> CdpResult<HarvestOutcome> {
        self.transact(env, "harvest", |ctx| ctx.harvest(vault_id))
    }

    /// Pull `amount` from a vault back into the buffer
    ///
    /// Anyone may recall from a retired vault. The active vault needs
    /// governance or an active emergency exit.
    pub fn recall<E: Environment>(&mut self, env: &mut E, vault_id: VaultId, amount: u64) -> CdpResult<Withdrawal> {
        self.transact(env, "recall", |ctx| ctx.recall(vault_id, amount))
    }

    /// Recall everything a vault record holds
    pub fn recall_all<E: Environment>(&mut self, env: &mut E, vault_id: VaultId) -> CdpResult<Withdrawal> {
        self.transact(env, "recall_all", |ctx| {
            let amount = ctx.state.vaults.get(vault_id)?.total_deposited;
            ctx.recall(vault_id, amount)
        })
    }

    /// Move the buffer into the active vault
    pub fn flush<E: Environment>(&mut self, env: &mut E) -> CdpResult<u64> {
        self.transact(env, "flush", |ctx| ctx.flush())
    }

    // ============ Administration ============

    pub fn set_pending_governance<E: Environment>(&mut self, env: &mut E, pending: Address) -> CdpResult<()> {
        self.transact(env, "set_pending_governance", |ctx| {
            ctx.state.access.set_pending_governance(&ctx.caller, pending)?;
            ctx.events.emit(LedgerEvent::PendingGovernanceUpdated {
                pending,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    pub fn accept_governance<E: Environment>(&mut self, env: &mut E) -> CdpResult<()> {
        self.transact(env, "accept_governance", |ctx| {
            let governance = ctx.state.access.accept_governance(&ctx.caller)?;
            ctx.events.emit(LedgerEvent::GovernanceUpdated {
                governance,
                block_height: ctx.block,
            });
            info!(governance = %ShortHex(&governance), "governance accepted");
            Ok(())
        })
    }

    pub fn set_sentinel<E: Environment>(&mut self, env: &mut E, sentinel: Address) -> CdpResult<()> {
        self.transact(env, "set_sentinel", |ctx| {
            ctx.state.access.set_sentinel(&ctx.caller, sentinel)?;
            ctx.events.emit(LedgerEvent::SentinelUpdated {
                sentinel,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    pub fn set_collateralization_limit<E: Environment>(&mut self, env: &mut E, limit: FixedDecimal) -> CdpResult<()> {
        self.transact(env, "set_collateralization_limit", |ctx| {
            ctx.ensure_governance()?;

            let minimum = FixedDecimal::from_bps(limits::MIN_COLLATERALIZATION_LIMIT_BPS)?;
            let maximum = FixedDecimal::from_bps(limits::MAX_COLLATERALIZATION_LIMIT_BPS)?;
            if limit < minimum || limit > maximum {
                return Err(CdpError::OutOfBounds {
                    param: "collateralization limit",
                    value: limit.raw(),
                    minimum: minimum.raw(),
                    maximum: maximum.raw(),
                });
            }

            ctx.state.context.collateralization_limit = limit;
            ctx.events.emit(LedgerEvent::CollateralizationLimitUpdated {
                limit,
                block_height: ctx.block,
            });
            info!(limit = %limit, "collateralization limit updated");
            Ok(())
        })
    }

    /// Toggle emergency exit; governance or sentinel
    pub fn set_emergency_exit<E: Environment>(&mut self, env: &mut E, enabled: bool) -> CdpResult<()> {
        self.transact(env, "set_emergency_exit", |ctx| {
            ctx.state.access.ensure_governance_or_sentinel(&ctx.caller)?;
            ctx.state.emergency.set(enabled, ctx.caller, ctx.block);
            ctx.events.emit(LedgerEvent::EmergencyExitUpdated {
                enabled,
                by: ctx.caller,
                block_height: ctx.block,
            });
            warn!(enabled, by = %ShortHex(&ctx.caller), "emergency exit toggled");
            Ok(())
        })
    }

    pub fn set_harvest_fee<E: Environment>(&mut self, env: &mut E, fee: u64) -> CdpResult<()> {
        self.transact(env, "set_harvest_fee", |ctx| {
            ctx.ensure_governance()?;
            validate_harvest_fee(fee)?;
            ctx.state.harvest_fee = fee;
            ctx.events.emit(LedgerEvent::HarvestFeeUpdated {
                fee,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    pub fn set_flush_activator<E: Environment>(&mut self, env: &mut E, threshold: u64) -> CdpResult<()> {
        self.transact(env, "set_flush_activator", |ctx| {
            ctx.ensure_governance()?;
            ctx.state.flush_activator = threshold;
            ctx.events.emit(LedgerEvent::FlushActivatorUpdated {
                threshold,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    /// Point the peg gate at `oracle`; a zero `floor` disables it
    pub fn set_peg_oracle<E: Environment>(&mut self, env: &mut E, oracle: Address, floor: i128) -> CdpResult<()> {
        self.transact(env, "set_peg_oracle", |ctx| {
            ctx.ensure_governance()?;
            ctx.state.peg = PegGate::new(oracle, floor)?;
            ctx.events.emit(LedgerEvent::PegOracleUpdated {
                oracle,
                floor,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    pub fn set_whitelisted<E: Environment>(&mut self, env: &mut E, account: Address, whitelisted: bool) -> CdpResult<()> {
        self.transact(env, "set_whitelisted", |ctx| {
            ctx.state.access.set_whitelisted(&ctx.caller, account, whitelisted)?;
            ctx.events.emit(LedgerEvent::WhitelistUpdated {
                account,
                whitelisted,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    pub fn set_sink<E: Environment>(&mut self, env: &mut E, sink: Address) -> CdpResult<()> {
        self.transact(env, "set_sink", |ctx| {
            ctx.ensure_governance()?;
            ctx.state.self_repay.ensure_enabled()?;
            if is_zero_address(&sink) {
                return Err(CdpError::ZeroAddress { field: "sink" });
            }
            ctx.state.self_repay.sink = sink;
            ctx.events.emit(LedgerEvent::SinkUpdated {
                sink,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    pub fn set_rewards<E: Environment>(&mut self, env: &mut E, rewards: Address) -> CdpResult<()> {
        self.transact(env, "set_rewards", |ctx| {
            ctx.ensure_governance()?;
            ctx.state.self_repay.ensure_enabled()?;
            if is_zero_address(&rewards) {
                return Err(CdpError::ZeroAddress { field: "rewards" });
            }
            ctx.state.self_repay.rewards = rewards;
            ctx.events.emit(LedgerEvent::RewardsUpdated {
                rewards,
                block_height: ctx.block,
            });
            Ok(())
        })
    }

    // ============ Views ============

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Hand the recorded events to an indexer and start a fresh log
    pub fn drain_events(&mut self) -> EventLog {
        std::mem::take(&mut self.events)
    }

    pub fn state_hash(&self) -> CdpResult<[u8; 32]> {
        self.state.state_hash()
    }

    pub fn governance(&self) -> Address {
        self.state.access.governance
    }

    pub fn pending_governance(&self) -> Address {
        self.state.access.pending_governance
    }

    pub fn sentinel(&self) -> Address {
        self.state.access.sentinel
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.state.access.is_whitelisted(account)
    }

    pub fn collateralization_limit(&self) -> FixedDecimal {
        self.state.context.collateralization_limit
    }

    pub fn accumulated_yield_weight(&self) -> FixedDecimal {
        self.state.context.accumulated_yield_weight
    }

    pub fn harvest_fee(&self) -> u64 {
        self.state.harvest_fee
    }

    pub fn flush_activator(&self) -> u64 {
        self.state.flush_activator
    }

    pub fn is_self_repay_enabled(&self) -> bool {
        self.state.self_repay.enabled
    }

    pub fn sink(&self) -> Address {
        self.state.self_repay.sink
    }

    pub fn rewards(&self) -> Address {
        self.state.self_repay.rewards
    }

    pub fn emergency_exit(&self) -> bool {
        self.state.emergency.is_active()
    }

    pub fn peg_gate(&self) -> &PegGate {
        &self.state.peg
    }

    /// Collateral attributed across all accounts
    pub fn total_deposited(&self) -> u64 {
        self.state.total_deposited
    }

    pub fn vault_count(&self) -> usize {
        self.state.vaults.len()
    }

    /// Sum of what every vault record believes it holds
    pub fn total_in_vaults(&self) -> CdpResult<u64> {
        self.state.vaults.total_in_vaults()
    }

    pub fn vault_adapter(&self, vault_id: VaultId) -> CdpResult<Address> {
        Ok(self.state.vaults.get(vault_id)?.adapter)
    }

    pub fn vault_total_deposited(&self, vault_id: VaultId) -> CdpResult<u64> {
        Ok(self.state.vaults.get(vault_id)?.total_deposited)
    }

    pub fn vault_status(&self, vault_id: VaultId) -> CdpResult<VaultStatus> {
        self.state.vaults.status(vault_id)
    }

    pub fn cdp_total_deposited(&self, account: &Address) -> u64 {
        self.state.account(account).total_deposited
    }

    pub fn cdp_total_debt(&self, account: &Address) -> u64 {
        self.state.account(account).total_debt
    }

    /// Credit including accrual the account has not reconciled yet
    pub fn cdp_total_credit(&self, account: &Address) -> CdpResult<u64> {
        self.state.account(account).updated_total_credit(&self.state.context)
    }

    pub fn cdp_last_deposit(&self, account: &Address) -> u64 {
        self.state.account(account).last_deposit_block
    }

    /// Whether `account` currently meets the collateralization limit
    pub fn is_healthy(&self, account: &Address) -> CdpResult<bool> {
        self.state.account(account).is_healthy(&self.state.context)
    }
}
