//! Access Control Module
//!
//! Governance and sentinel permissioning for the ledger.
//!
//! ## Key Features
//!
//! - **Governance**: Sole authority over parameters and vault lifecycle
//! - **Two-Phase Handover**: A pending governance must accept before it
//!   takes over, so a mistyped address can never lock the ledger
//! - **Sentinel**: May flip the emergency exit alongside governance
//! - **Whitelist**: Callers allowed to repay on behalf of other accounts

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{CdpError, CdpResult};
use crate::types::{is_zero_address, Address, ZERO_ADDRESS};

// ============================================================================
// Types
// ============================================================================

/// Access control state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccessControl {
    /// Current governance address
    pub governance: Address,
    /// Proposed governance awaiting acceptance (zero = none)
    pub pending_governance: Address,
    /// Sentinel address (emergency exit only)
    pub sentinel: Address,
    /// Accounts allowed to repay on behalf of others
    pub whitelist: BTreeSet<Address>,
}

impl AccessControl {
    /// Create access control state with a governance and a sentinel
    pub fn new(governance: Address, sentinel: Address) -> CdpResult<Self> {
        if is_zero_address(&governance) {
            return Err(CdpError::ZeroAddress { field: "governance" });
        }
        if is_zero_address(&sentinel) {
            return Err(CdpError::ZeroAddress { field: "sentinel" });
        }

        Ok(Self {
            governance,
            pending_governance: ZERO_ADDRESS,
            sentinel,
            whitelist: BTreeSet::new(),
        })
    }

    /// Check if address is the governance
    pub fn is_governance(&self, address: &Address) -> bool {
        self.governance == *address
    }

    /// Check if address is the sentinel
    pub fn is_sentinel(&self, address: &Address) -> bool {
        self.sentinel == *address
    }

    /// Check if address may repay on behalf of others
    pub fn is_whitelisted(&self, address: &Address) -> bool {
        self.whitelist.contains(address)
    }

    /// Fail unless `caller` is the governance
    pub fn ensure_governance(&self, caller: &Address) -> CdpResult<()> {
        if !self.is_governance(caller) {
            return Err(CdpError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Fail unless `caller` is the governance or the sentinel
    pub fn ensure_governance_or_sentinel(&self, caller: &Address) -> CdpResult<()> {
        if !self.is_governance(caller) && !self.is_sentinel(caller) {
            return Err(CdpError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Propose a new governance (first phase of the handover)
    pub fn set_pending_governance(&mut self, caller: &Address, pending: Address) -> CdpResult<()> {
        self.ensure_governance(caller)?;
        if is_zero_address(&pending) {
            return Err(CdpError::ZeroAddress { field: "pending governance" });
        }

        self.pending_governance = pending;
        Ok(())
    }

    /// Accept a pending governance (second phase of the handover)
    ///
    /// Returns the new governance address.
    pub fn accept_governance(&mut self, caller: &Address) -> CdpResult<Address> {
        if is_zero_address(&self.pending_governance) || self.pending_governance != *caller {
            return Err(CdpError::Unauthorized { caller: *caller });
        }

        self.governance = self.pending_governance;
        self.pending_governance = ZERO_ADDRESS;
        Ok(self.governance)
    }

    /// Replace the sentinel
    pub fn set_sentinel(&mut self, caller: &Address, sentinel: Address) -> CdpResult<()> {
        self.ensure_governance(caller)?;
        if is_zero_address(&sentinel) {
            return Err(CdpError::ZeroAddress { field: "sentinel" });
        }

        self.sentinel = sentinel;
        Ok(())
    }

    /// Add or remove an on-behalf-of repayer
    pub fn set_whitelisted(&mut self, caller: &Address, account: Address, whitelisted: bool) -> CdpResult<()> {
        self.ensure_governance(caller)?;

        if whitelisted {
            self.whitelist.insert(account);
        } else {
            self.whitelist.remove(&account);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governance() -> Address {
        [1u8; 32]
    }

    fn sentinel() -> Address {
        [2u8; 32]
    }

    fn stranger() -> Address {
        [9u8; 32]
    }

    #[test]
    fn test_new_rejects_zero_addresses() {
        assert_eq!(
            AccessControl::new(ZERO_ADDRESS, sentinel()),
            Err(CdpError::ZeroAddress { field: "governance" })
        );
        assert_eq!(
            AccessControl::new(governance(), ZERO_ADDRESS),
            Err(CdpError::ZeroAddress { field: "sentinel" })
        );
    }

    #[test]
    fn test_two_phase_handover() {
        let mut access = AccessControl::new(governance(), sentinel()).unwrap();
        let successor = [5u8; 32];

        // Only governance can propose
        assert!(access.set_pending_governance(&stranger(), successor).is_err());
        access.set_pending_governance(&governance(), successor).unwrap();

        // Proposal alone does not transfer control
        assert!(access.is_governance(&governance()));

        // Only the pending address can accept
        assert_eq!(
            access.accept_governance(&stranger()),
            Err(CdpError::Unauthorized { caller: stranger() })
        );
        assert_eq!(access.accept_governance(&successor), Ok(successor));
        assert!(access.is_governance(&successor));
        assert_eq!(access.pending_governance, ZERO_ADDRESS);

        // A second accept has nothing to accept
        assert!(access.accept_governance(&successor).is_err());
    }

    #[test]
    fn test_sentinel_permissions() {
        let mut access = AccessControl::new(governance(), sentinel()).unwrap();

        assert!(access.ensure_governance_or_sentinel(&sentinel()).is_ok());
        assert!(access.ensure_governance_or_sentinel(&governance()).is_ok());
        assert!(access.ensure_governance_or_sentinel(&stranger()).is_err());

        // Sentinel cannot replace itself
        assert!(access.set_sentinel(&sentinel(), stranger()).is_err());
        access.set_sentinel(&governance(), stranger()).unwrap();
        assert!(access.is_sentinel(&stranger()));
    }

    #[test]
    fn test_whitelist() {
        let mut access = AccessControl::new(governance(), sentinel()).unwrap();
        let repayer = [7u8; 32];

        assert!(access.set_whitelisted(&stranger(), repayer, true).is_err());
        access.set_whitelisted(&governance(), repayer, true).unwrap();
        assert!(access.is_whitelisted(&repayer));

        access.set_whitelisted(&governance(), repayer, false).unwrap();
        assert!(!access.is_whitelisted(&repayer));
    }
}
