//! Core Types for the Synthvault Ledger
//!
//! Identities and small value types shared by every module.

use core::fmt;

/// Type alias for addresses (32-byte identity)
pub type Address = [u8; 32];

/// Type alias for block numbers
pub type BlockNumber = u64;

/// Index of a vault record in the registry
pub type VaultId = u32;

/// The null address
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Check whether an address is the null address
pub fn is_zero_address(address: &Address) -> bool {
    *address == ZERO_ADDRESS
}

/// Short hex rendering of an address for log fields
///
/// Prints the first four bytes, enough to tell test actors and
/// deployments apart without flooding log lines.
pub struct ShortHex<'a>(pub &'a Address);

impl fmt::Display for ShortHex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        f.write_str("..")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(is_zero_address(&ZERO_ADDRESS));
        assert!(!is_zero_address(&[1u8; 32]));
    }

    #[test]
    fn test_short_hex() {
        let mut address = [0u8; 32];
        address[0] = 0xab;
        address[3] = 0x01;
        assert_eq!(ShortHex(&address).to_string(), "ab000001..");
    }
}
