//! Synthvault Common Library
//!
//! Shared types, constants, and utilities for the Synthvault CDP ledger.
//!
//! The ledger lets users deposit a base asset as collateral and borrow a
//! synthetic asset against it. Idle collateral can be parked in an external
//! yield vault; harvested yield accrues to depositors as credit.
//!
//! ## Contents
//!
//! - **Fixed-point math**: `FixedDecimal` with 64 fractional bits for
//!   collateralization ratios and the yield accumulator
//! - **Errors**: One typed error enum with stable codes
//! - **Events**: Indexable record of every state change
//! - **Access Control**: Governance, two-phase handover, sentinel, whitelist
//! - **Emergency**: Emergency exit switch
//! - **Peg Gate**: Oracle floor check for minting
//! - **Guards**: Reentrancy lock and externally-owned caller check

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod access_control;
pub mod emergency;
pub mod oracle;
pub mod guard;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use access_control::*;
pub use emergency::*;
pub use oracle::*;
pub use guard::*;
