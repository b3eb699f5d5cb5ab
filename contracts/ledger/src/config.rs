//! Deployment Configuration
//!
//! Everything a ledger needs at construction. Tunables default to the
//! values in `synthvault_common::constants` when omitted from a serialized
//! config.

use serde::{Deserialize, Serialize};

use synthvault_common::{
    flush, is_zero_address, limits, AccessControl, Address, CdpError, CdpResult, FixedDecimal,
    PegGate, ZERO_ADDRESS,
};

fn default_collateralization_limit_bps() -> u64 {
    limits::DEFAULT_COLLATERALIZATION_LIMIT_BPS
}

fn default_flush_activator() -> u64 {
    flush::DEFAULT_FLUSH_ACTIVATOR
}

/// Ledger construction parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The ledger's own address; holds the buffer
    pub address: Address,
    pub base_asset: Address,
    pub synthetic_asset: Address,
    pub governance: Address,
    pub sentinel: Address,
    /// Collateralization limit in basis points (20_000 = 200%)
    #[serde(default = "default_collateralization_limit_bps")]
    pub collateralization_limit_bps: u64,
    /// Single-movement size that flushes the buffer
    #[serde(default = "default_flush_activator")]
    pub flush_activator: u64,
    #[serde(default)]
    pub peg_oracle: Address,
    /// Peg floor; zero disables the gate
    #[serde(default)]
    pub peg_floor: i128,
}

impl LedgerConfig {
    /// Config with default tunables and no peg gate
    pub fn new(
        address: Address,
        base_asset: Address,
        synthetic_asset: Address,
        governance: Address,
        sentinel: Address,
    ) -> Self {
        Self {
            address,
            base_asset,
            synthetic_asset,
            governance,
            sentinel,
            collateralization_limit_bps: default_collateralization_limit_bps(),
            flush_activator: default_flush_activator(),
            peg_oracle: ZERO_ADDRESS,
            peg_floor: 0,
        }
    }

    pub fn with_collateralization_limit_bps(mut self, bps: u64) -> Self {
        self.collateralization_limit_bps = bps;
        self
    }

    pub fn with_flush_activator(mut self, threshold: u64) -> Self {
        self.flush_activator = threshold;
        self
    }

    pub fn with_peg_gate(mut self, oracle: Address, floor: i128) -> Self {
        self.peg_oracle = oracle;
        self.peg_floor = floor;
        self
    }

    /// Collateralization limit as a fixed-point ratio, bounds-checked
    pub fn collateralization_limit(&self) -> CdpResult<FixedDecimal> {
        let bps = self.collateralization_limit_bps;
        if !(limits::MIN_COLLATERALIZATION_LIMIT_BPS..=limits::MAX_COLLATERALIZATION_LIMIT_BPS).contains(&bps) {
            return Err(CdpError::OutOfBounds {
                param: "collateralization limit (bps)",
                value: bps as u128,
                minimum: limits::MIN_COLLATERALIZATION_LIMIT_BPS as u128,
                maximum: limits::MAX_COLLATERALIZATION_LIMIT_BPS as u128,
            });
        }
        FixedDecimal::from_bps(bps)
    }

    pub fn access_control(&self) -> CdpResult<AccessControl> {
        AccessControl::new(self.governance, self.sentinel)
    }

    pub fn peg_gate(&self) -> CdpResult<PegGate> {
        PegGate::new(self.peg_oracle, self.peg_floor)
    }

    /// Check every field without building anything
    pub fn validate(&self) -> CdpResult<()> {
        if is_zero_address(&self.address) {
            return Err(CdpError::ZeroAddress { field: "ledger" });
        }
        if is_zero_address(&self.base_asset) {
            return Err(CdpError::ZeroAddress { field: "base asset" });
        }
        if is_zero_address(&self.synthetic_asset) {
            return Err(CdpError::ZeroAddress { field: "synthetic asset" });
        }
        if self.base_asset == self.synthetic_asset {
            return Err(CdpError::InvalidConfig {
                reason: "base and synthetic assets must differ",
            });
        }

        self.access_control()?;
        self.collateralization_limit()?;
        self.peg_gate()?;
        Ok(())
    }
}
