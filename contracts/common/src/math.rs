//! Mathematical Utilities for the Synthvault Ledger
//!
//! Fixed-point arithmetic for ratios and accrual weights, plus the checked
//! integer helpers used by every balance update.

use core::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::precision::{FIXED_POINT_RESOLUTION, PERCENT_RESOLUTION};
use crate::errors::{CdpError, CdpResult};

const FRACTION_MASK: u128 = (1u128 << FIXED_POINT_RESOLUTION) - 1;

/// Unsigned fixed-point number with 64 fractional bits
///
/// The raw `u128` holds `value * 2^64`. Every operation is checked; none
/// silently drops bits of the integer part. Division and decoding truncate
/// toward zero.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct FixedDecimal(u128);

impl FixedDecimal {
    /// 0.0
    pub const ZERO: Self = Self(0);
    /// 1.0
    pub const ONE: Self = Self(1u128 << FIXED_POINT_RESOLUTION);

    /// Wrap a raw `value * 2^64` representation
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw `value * 2^64` representation
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Encode an integer; always exact
    pub const fn from_u64(value: u64) -> Self {
        Self((value as u128) << FIXED_POINT_RESOLUTION)
    }

    /// `numerator / denominator`, truncated
    pub fn from_ratio(numerator: u64, denominator: u64) -> CdpResult<Self> {
        if denominator == 0 {
            return Err(CdpError::DivisionByZero);
        }
        Ok(Self(((numerator as u128) << FIXED_POINT_RESOLUTION) / denominator as u128))
    }

    /// Basis points of `PERCENT_RESOLUTION` (e.g. 15_000 = 1.5)
    pub fn from_bps(bps: u64) -> CdpResult<Self> {
        Self::from_ratio(bps, PERCENT_RESOLUTION)
    }

    pub fn checked_add(self, rhs: Self) -> CdpResult<Self> {
        self.0.checked_add(rhs.0).map(Self).ok_or(CdpError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> CdpResult<Self> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(CdpError::Underflow)
    }

    /// Multiply by an integer, keeping the full fractional resolution
    pub fn checked_mul_u64(self, rhs: u64) -> CdpResult<Self> {
        self.0
            .checked_mul(rhs as u128)
            .map(Self)
            .ok_or(CdpError::Overflow)
    }

    /// Divide by an integer, truncating
    pub fn checked_div_u64(self, rhs: u64) -> CdpResult<Self> {
        if rhs == 0 {
            return Err(CdpError::DivisionByZero);
        }
        Ok(Self(self.0 / rhs as u128))
    }

    /// Fixed-point product, truncating the bits below 2^-64
    pub fn checked_mul(self, rhs: Self) -> CdpResult<Self> {
        let (a_hi, a_lo) = (self.0 >> FIXED_POINT_RESOLUTION, self.0 & FRACTION_MASK);
        let (b_hi, b_lo) = (rhs.0 >> FIXED_POINT_RESOLUTION, rhs.0 & FRACTION_MASK);

        let whole = a_hi
            .checked_mul(b_hi)
            .and_then(|v| v.checked_mul(1u128 << FIXED_POINT_RESOLUTION))
            .ok_or(CdpError::Overflow)?;
        let cross = a_hi
            .checked_mul(b_lo)
            .and_then(|v| v.checked_add(a_lo.checked_mul(b_hi)?))
            .ok_or(CdpError::Overflow)?;
        // a_lo, b_lo < 2^64, so the product fits
        let low = (a_lo * b_lo) >> FIXED_POINT_RESOLUTION;

        whole
            .checked_add(cross)
            .and_then(|v| v.checked_add(low))
            .map(Self)
            .ok_or(CdpError::Overflow)
    }

    /// Integer part, truncating the fraction
    pub fn decode(self) -> u64 {
        (self.0 >> FIXED_POINT_RESOLUTION) as u64
    }

    /// Integer part, rounding any fraction up
    pub fn ceil(self) -> u64 {
        let whole = self.decode();
        if self.0 & FRACTION_MASK == 0 {
            whole
        } else {
            whole.saturating_add(1)
        }
    }

    /// `self * rhs` decoded to an integer, truncated
    ///
    /// Computed without a 256-bit intermediate: the integer and fractional
    /// parts are multiplied separately.
    pub fn mul_decode(self, rhs: u64) -> CdpResult<u64> {
        let whole = (self.0 >> FIXED_POINT_RESOLUTION)
            .checked_mul(rhs as u128)
            .ok_or(CdpError::Overflow)?;
        let fraction = ((self.0 & FRACTION_MASK) * rhs as u128) >> FIXED_POINT_RESOLUTION;
        let total = whole.checked_add(fraction).ok_or(CdpError::Overflow)?;
        u64::try_from(total).map_err(|_| CdpError::Overflow)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let micros = ((self.0 & FRACTION_MASK) * 1_000_000) >> FIXED_POINT_RESOLUTION;
        write!(f, "{}.{:06}", self.0 >> FIXED_POINT_RESOLUTION, micros)
    }
}

/// Calculate the protocol's cut of a harvest
///
/// fee = harvested * fee_rate / PERCENT_RESOLUTION
pub fn calculate_harvest_fee(harvested: u64, fee_rate: u64) -> CdpResult<u64> {
    let fee = (harvested as u128)
        .checked_mul(fee_rate as u128)
        .ok_or(CdpError::Overflow)?
        / PERCENT_RESOLUTION as u128;

    u64::try_from(fee).map_err(|_| CdpError::Overflow)
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> CdpResult<u64> {
    a.checked_add(b).ok_or(CdpError::Overflow)
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> CdpResult<u64> {
    a.checked_sub(b).ok_or(CdpError::Underflow)
}
