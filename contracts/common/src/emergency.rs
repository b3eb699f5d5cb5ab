//! Emergency Module
//!
//! The emergency exit switch. While it is on, new deposits, new debt and
//! buffer flushes are refused, and any caller may recall funds from the
//! active vault so depositors can get out.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{CdpError, CdpResult};
use crate::types::{Address, ZERO_ADDRESS};

/// Emergency state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct EmergencyState {
    /// Whether emergency exit is active
    pub emergency_exit: bool,
    /// Who last toggled the switch
    pub toggled_by: Address,
    /// Block of the last toggle
    pub toggled_at: u64,
}

impl EmergencyState {
    /// Create new emergency state (exit off)
    pub fn new() -> Self {
        Self {
            emergency_exit: false,
            toggled_by: ZERO_ADDRESS,
            toggled_at: 0,
        }
    }

    /// Check if emergency exit is active
    pub fn is_active(&self) -> bool {
        self.emergency_exit
    }

    /// Fail while emergency exit is active
    pub fn ensure_not_paused(&self) -> CdpResult<()> {
        if self.emergency_exit {
            return Err(CdpError::EmergencyPaused);
        }
        Ok(())
    }

    /// Set the switch; authorization is checked by the caller
    pub fn set(&mut self, enabled: bool, by: Address, current_block: u64) {
        self.emergency_exit = enabled;
        self.toggled_by = by;
        self.toggled_at = current_block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut state = EmergencyState::new();
        assert!(state.ensure_not_paused().is_ok());

        state.set(true, [3u8; 32], 42);
        assert!(state.is_active());
        assert_eq!(state.ensure_not_paused(), Err(CdpError::EmergencyPaused));
        assert_eq!(state.toggled_at, 42);

        state.set(false, [3u8; 32], 43);
        assert!(state.ensure_not_paused().is_ok());
    }
}
