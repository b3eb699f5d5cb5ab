//! Peg Oracle Gate
//!
//! Minting is refused while the synthetic asset trades at or below a
//! governance-configured floor. The oracle is only consulted when the floor
//! is non-zero; a zero floor disables the gate entirely.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{CdpError, CdpResult};
use crate::types::{is_zero_address, Address, ZERO_ADDRESS};

/// Peg gate configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PegGate {
    /// Oracle reporting the synthetic asset's price
    pub oracle: Address,
    /// Minimum acceptable answer (0 = gate disabled)
    pub floor: i128,
}

impl PegGate {
    /// Disabled gate
    pub fn disabled() -> Self {
        Self {
            oracle: ZERO_ADDRESS,
            floor: 0,
        }
    }

    /// Create a gate, validating that an enabled gate has an oracle
    pub fn new(oracle: Address, floor: i128) -> CdpResult<Self> {
        if floor != 0 && is_zero_address(&oracle) {
            return Err(CdpError::ZeroAddress { field: "peg oracle" });
        }
        Ok(Self { oracle, floor })
    }

    /// Whether the oracle needs to be consulted
    pub fn is_enabled(&self) -> bool {
        self.floor != 0
    }

    /// Fail unless `answer` is strictly above the floor
    pub fn check(&self, answer: i128) -> CdpResult<()> {
        if self.is_enabled() && answer <= self.floor {
            return Err(CdpError::OffPeg {
                answer,
                floor: self.floor,
            });
        }
        Ok(())
    }
}
