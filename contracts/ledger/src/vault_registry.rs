//! Vault Registry
//!
//! Append-only list of vault records. The last record is the active vault
//! and the only one that receives flushed funds; earlier records are
//! retired and only drain through harvest and recall. Records are never
//! removed, so vault ids stay stable for audit.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use synthvault_common::{
    is_zero_address, safe_add, safe_sub, Address, CdpError, CdpResult, ShortHex, VaultId,
    ZERO_ADDRESS,
};

use crate::interfaces::Environment;

/// Lifecycle position of a vault record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum VaultStatus {
    /// Last record; receives flushes
    Active = 0,
    /// Superseded, still holding funds
    Retired = 1,
    /// Superseded and empty
    Drained = 2,
}

/// Bookkeeping for one external adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultRecord {
    /// Handle of the adapter; zero for the inert record left by turn-off
    pub adapter: Address,
    /// Amount this record believes its adapter holds
    pub total_deposited: u64,
}

impl VaultRecord {
    pub fn new(adapter: Address) -> Self {
        Self {
            adapter,
            total_deposited: 0,
        }
    }

    /// Whether this record has no adapter behind it
    pub fn is_inert(&self) -> bool {
        is_zero_address(&self.adapter)
    }

    fn ensure_live(&self) -> CdpResult<&Address> {
        if self.is_inert() {
            return Err(CdpError::ZeroAdapter);
        }
        Ok(&self.adapter)
    }
}

/// Ordered vault records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct VaultRegistry {
    records: Vec<VaultRecord>,
}

impl VaultRegistry {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, vault_id: VaultId) -> CdpResult<&VaultRecord> {
        self.records
            .get(vault_id as usize)
            .ok_or(CdpError::VaultNotFound { vault_id })
    }

    fn get_mut(&mut self, vault_id: VaultId) -> CdpResult<&mut VaultRecord> {
        self.records
            .get_mut(vault_id as usize)
            .ok_or(CdpError::VaultNotFound { vault_id })
    }

    /// Id of the active vault, if any record exists
    pub fn active_id(&self) -> Option<VaultId> {
        self.records.len().checked_sub(1).map(|i| i as VaultId)
    }

    /// The active record, if any
    pub fn active(&self) -> Option<&VaultRecord> {
        self.records.last()
    }

    pub fn is_active(&self, vault_id: VaultId) -> bool {
        self.active_id() == Some(vault_id)
    }

    pub fn status(&self, vault_id: VaultId) -> CdpResult<VaultStatus> {
        let record = self.get(vault_id)?;
        Ok(if self.is_active(vault_id) {
            VaultStatus::Active
        } else if record.total_deposited == 0 {
            VaultStatus::Drained
        } else {
            VaultStatus::Retired
        })
    }

    /// Sum of every record's counter
    pub fn total_in_vaults(&self) -> CdpResult<u64> {
        self.records
            .iter()
            .try_fold(0u64, |acc, r| safe_add(acc, r.total_deposited))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Append a new active vault backed by `adapter`
    ///
    /// The adapter must accept `base_asset`. The previous active record is
    /// retired.
    pub fn append<E: Environment>(
        &mut self,
        env: &E,
        adapter: Address,
        base_asset: &Address,
    ) -> CdpResult<VaultId> {
        if is_zero_address(&adapter) {
            return Err(CdpError::ZeroAdapter);
        }

        let token = env.adapter_token(&adapter)?;
        if &token != base_asset {
            return Err(CdpError::AssetMismatch {
                expected: *base_asset,
                actual: token,
            });
        }

        self.records.push(VaultRecord::new(adapter));
        let vault_id = (self.records.len() - 1) as VaultId;
        debug!(vault_id, adapter = %ShortHex(&adapter), "vault appended");
        Ok(vault_id)
    }

    /// Append the inert record that leaves `active()` defined after turn-off
    pub fn append_inert(&mut self) -> VaultId {
        self.records.push(VaultRecord::new(ZERO_ADDRESS));
        (self.records.len() - 1) as VaultId
    }

    // ========================================================================
    // Fund Movement
    // ========================================================================

    /// Move the ledger's whole buffer into the active vault
    ///
    /// Returns the amount moved; an empty buffer moves nothing.
    pub fn deposit_all_buffered<E: Environment>(&mut self, env: &mut E, ledger: &Address) -> CdpResult<u64> {
        let vault_id = self.active_id().ok_or(CdpError::VaultNotFound { vault_id: 0 })?;
        let adapter = *self.get(vault_id)?.ensure_live()?;

        let amount = env.base_balance_of(ledger);
        if amount == 0 {
            return Ok(0);
        }

        let record = self.get_mut(vault_id)?;
        record.total_deposited = safe_add(record.total_deposited, amount)?;

        env.transfer_base(ledger, &adapter, amount)?;
        env.adapter_deposit(&adapter, amount)?;

        debug!(vault_id, amount, "buffer flushed");
        Ok(amount)
    }

    /// Collect accrued yield from a vault into `recipient`
    ///
    /// Returns `(harvested, decreased_value)`. The record's counter tracks
    /// principal only and is left alone.
    pub fn harvest<E: Environment>(
        &mut self,
        env: &mut E,
        vault_id: VaultId,
        recipient: &Address,
    ) -> CdpResult<(u64, u64)> {
        let adapter = *self.get(vault_id)?.ensure_live()?;
        env.adapter_harvest(&adapter, recipient)
    }

    /// Withdraw `amount` from a vault to `recipient`
    ///
    /// The record's counter drops by the decreased value the adapter
    /// reports, which can differ from `amount`. Returns
    /// `(withdrawn, decreased_value)`.
    pub fn withdraw<E: Environment>(
        &mut self,
        env: &mut E,
        vault_id: VaultId,
        recipient: &Address,
        amount: u64,
    ) -> CdpResult<(u64, u64)> {
        let adapter = *self.get(vault_id)?.ensure_live()?;

        let (withdrawn, decreased_value) = env.adapter_withdraw(&adapter, recipient, amount)?;

        let record = self.get_mut(vault_id)?;
        record.total_deposited = safe_sub(record.total_deposited, decreased_value)?;

        debug!(vault_id, amount, withdrawn, decreased_value, "vault withdrawal");
        Ok((withdrawn, decreased_value))
    }
}
