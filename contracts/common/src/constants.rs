//! Protocol Constants
//!
//! All magic numbers and configuration bounds for the Synthvault ledger.
//! Governance can move the tunable values at runtime, but only inside the
//! ranges declared here.

/// Token Metadata
pub mod token {
    /// One unit with decimals (1 token = 100_000_000 base units)
    pub const ONE: u64 = 100_000_000;
}

/// Precision constants
pub mod precision {
    /// Fractional bits carried by `FixedDecimal`
    pub const FIXED_POINT_RESOLUTION: u32 = 64;

    /// Denominator for harvest fees and other percentages (10_000 = 100%)
    pub const PERCENT_RESOLUTION: u64 = 10_000;
}

/// Collateralization limits (in basis points of `PERCENT_RESOLUTION`)
pub mod limits {
    /// Lowest collateralization limit governance may set (100%)
    pub const MIN_COLLATERALIZATION_LIMIT_BPS: u64 = 10_000;

    /// Highest collateralization limit governance may set (400%)
    pub const MAX_COLLATERALIZATION_LIMIT_BPS: u64 = 40_000;

    /// Limit applied when a deployment does not configure one (200%)
    pub const DEFAULT_COLLATERALIZATION_LIMIT_BPS: u64 = 20_000;
}

/// Fee Configuration
pub mod fees {
    /// Maximum harvest fee (100% of harvested yield)
    pub const MAX_HARVEST_FEE: u64 = super::precision::PERCENT_RESOLUTION;
}

/// Buffer management
pub mod flush {
    use super::token::ONE;

    /// Default single-operation amount that triggers a buffer flush
    pub const DEFAULT_FLUSH_ACTIVATOR: u64 = 100_000 * ONE;
}
