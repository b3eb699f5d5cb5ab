//! Execution Guards
//!
//! Reentrancy lock and the "no contract caller" check. The lock is held for
//! the full duration of every state-mutating operation; a nested entry is
//! rejected instead of observing half-applied bookkeeping.

use crate::errors::{CdpError, CdpResult};
use crate::types::Address;

/// Reentrancy guard states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReentrancyState {
    /// Ready for a new operation
    #[default]
    NotEntered,
    /// Operation in progress
    Entered,
}

/// Reentrancy lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReentrancyGuard {
    /// Current state
    pub state: ReentrancyState,
    /// Block of the last successful entry
    pub last_block: u64,
    /// Entries taken since the ledger was loaded
    pub operation_count: u64,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock, failing if it is already held
    pub fn enter(&mut self, current_block: u64) -> CdpResult<()> {
        match self.state {
            ReentrancyState::NotEntered => {
                self.state = ReentrancyState::Entered;
                self.last_block = current_block;
                self.operation_count = self.operation_count.saturating_add(1);
                Ok(())
            }
            ReentrancyState::Entered => Err(CdpError::ReentrantCall),
        }
    }

    /// Release the lock
    pub fn exit(&mut self) -> CdpResult<()> {
        match self.state {
            ReentrancyState::Entered => {
                self.state = ReentrancyState::NotEntered;
                Ok(())
            }
            ReentrancyState::NotEntered => Err(CdpError::InvalidGuardState),
        }
    }

    pub fn is_entered(&self) -> bool {
        self.state == ReentrancyState::Entered
    }
}

/// Reject callers that are contract code or not the transaction origin
pub fn ensure_externally_owned(caller: &Address, origin: &Address, caller_is_contract: bool) -> CdpResult<()> {
    if caller_is_contract || caller != origin {
        return Err(CdpError::ContractCallerRejected { caller: *caller });
    }
    Ok(())
}
