//! Error Types for the Synthvault Ledger
//!
//! Every failure aborts the operation in progress; the engine rolls back
//! all of its effects before handing the error to the caller. Errors carry
//! enough context to tell the caller what to fix before resubmitting.

use thiserror::Error;

use crate::types::Address;

/// Result type alias for ledger operations
pub type CdpResult<T> = Result<T, CdpError>;

/// Main error enum for all ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CdpError {
    // ============ Configuration Errors ============
    /// A governance, sentinel, sink, rewards or oracle address was zero
    #[error("{field} cannot be the zero address")]
    ZeroAddress { field: &'static str },

    /// A tunable parameter was outside its permitted range
    #[error("{param} = {value} outside [{minimum}, {maximum}]")]
    OutOfBounds {
        param: &'static str,
        value: u128,
        minimum: u128,
        maximum: u128,
    },

    /// Deployment configuration rejected
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },

    // ============ Authorization Errors ============
    /// Caller lacks governance, sentinel or whitelist standing
    #[error("caller is not authorized")]
    Unauthorized { caller: Address },

    /// Caller is contract code or not the transaction origin
    #[error("contract callers are not allowed")]
    ContractCallerRejected { caller: Address },

    /// Nested entry into a state-mutating operation
    #[error("reentrant call rejected")]
    ReentrantCall,

    /// Guard released without being held
    #[error("reentrancy guard is not entered")]
    InvalidGuardState,

    // ============ Safety Errors ============
    /// Operation blocked while emergency exit is active
    #[error("emergency exit is active")]
    EmergencyPaused,

    /// Synthetic asset trades at or below the configured peg floor
    #[error("peg answer {answer} at or below floor {floor}")]
    OffPeg { answer: i128, floor: i128 },

    // ============ Account Errors ============
    /// Withdrawal or liquidation in the same block as the account's last deposit
    #[error("account deposited in block {block}; wait for the next block")]
    SameBlockDeposit { block: u64 },

    /// Requested more collateral than the account holds
    #[error("insufficient collateral: available {available}, requested {requested}")]
    InsufficientCollateral { available: u64, requested: u64 },

    /// Withdrawal would leave the account below the collateralization limit
    #[error("unhealthy collateralization: deposited {deposited}, required {required}")]
    UnderCollateralized { deposited: u64, required: u64 },

    /// Minting would push the account past its loan-to-value ceiling
    #[error("loan-to-value ratio breached: deposited {deposited}, required {required}")]
    LoanToValueBreached { deposited: u64, required: u64 },

    /// Repayment larger than outstanding debt
    #[error("repayment {repaid} exceeds outstanding debt {debt}")]
    DebtUnderflow { debt: u64, repaid: u64 },

    // ============ Vault Errors ============
    /// Vault-touching operation while self-repay mode is off
    #[error("self-repay mode is disabled")]
    ModeDisabled,

    /// Self-repay mode is already enabled
    #[error("self-repay mode is already on")]
    AlreadyOn,

    /// Self-repay mode is already disabled
    #[error("self-repay mode is already off")]
    AlreadyOff,

    /// Buffer cannot cover a withdrawal and no vault may be tapped
    #[error("{remaining} units are parked in a vault and need a governance recall")]
    PendingVaultRecall { remaining: u64 },

    /// Vault adapter handle is null
    #[error("vault adapter cannot be the zero address")]
    ZeroAdapter,

    /// Adapter accepts a different asset than the ledger's base asset
    #[error("adapter token does not match the base asset")]
    AssetMismatch { expected: Address, actual: Address },

    /// No vault record at the given index
    #[error("vault {vault_id} does not exist")]
    VaultNotFound { vault_id: u32 },

    // ============ Collaborator Errors ============
    /// A token balance could not cover a transfer or burn
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    /// An external collaborator rejected the call
    #[error("external call to {target:?} failed: {reason}")]
    ExternalCallFailed { target: Address, reason: &'static str },

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic underflow occurred
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    // ============ Encoding Errors ============
    /// State or event could not be encoded or decoded
    #[error("serialization failed: {reason}")]
    Serialization { reason: String },
}

impl CdpError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroAddress { .. } => "E001_ZERO_ADDRESS",
            Self::OutOfBounds { .. } => "E002_OUT_OF_BOUNDS",
            Self::InvalidConfig { .. } => "E003_INVALID_CONFIG",
            Self::Unauthorized { .. } => "E010_UNAUTHORIZED",
            Self::ContractCallerRejected { .. } => "E011_CONTRACT_CALLER",
            Self::ReentrantCall => "E012_REENTRANT",
            Self::InvalidGuardState => "E013_GUARD_STATE",
            Self::EmergencyPaused => "E020_EMERGENCY",
            Self::OffPeg { .. } => "E021_OFF_PEG",
            Self::SameBlockDeposit { .. } => "E030_SAME_BLOCK",
            Self::InsufficientCollateral { .. } => "E031_INSUFFICIENT_COLL",
            Self::UnderCollateralized { .. } => "E032_UNDERCOLLATERALIZED",
            Self::LoanToValueBreached { .. } => "E033_LTV_BREACHED",
            Self::DebtUnderflow { .. } => "E034_DEBT_UNDERFLOW",
            Self::ModeDisabled => "E040_MODE_DISABLED",
            Self::AlreadyOn => "E041_ALREADY_ON",
            Self::AlreadyOff => "E042_ALREADY_OFF",
            Self::PendingVaultRecall { .. } => "E043_PENDING_RECALL",
            Self::ZeroAdapter => "E044_ZERO_ADAPTER",
            Self::AssetMismatch { .. } => "E045_ASSET_MISMATCH",
            Self::VaultNotFound { .. } => "E046_VAULT_NOT_FOUND",
            Self::InsufficientBalance { .. } => "E050_INSUFFICIENT_BALANCE",
            Self::ExternalCallFailed { .. } => "E051_EXTERNAL_CALL",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
            Self::Serialization { .. } => "E090_SERIALIZATION",
        }
    }

    /// Wrap an encoder or decoder failure
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }

    /// Returns true if the caller can fix the condition and resubmit
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::SameBlockDeposit { .. } => true,       // Wait a block
            Self::UnderCollateralized { .. } => true,    // Repay or deposit more
            Self::LoanToValueBreached { .. } => true,    // Deposit more
            Self::InsufficientCollateral { .. } => true, // Request less
            Self::PendingVaultRecall { .. } => true,     // Governance recall
            Self::InsufficientBalance { .. } => true,    // Get more funds
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            CdpError::ZeroAddress { field: "governance" },
            CdpError::Unauthorized { caller: [1u8; 32] },
            CdpError::SameBlockDeposit { block: 7 },
            CdpError::UnderCollateralized { deposited: 1, required: 2 },
            CdpError::LoanToValueBreached { deposited: 1, required: 2 },
            CdpError::ModeDisabled,
            CdpError::PendingVaultRecall { remaining: 5 },
            CdpError::ReentrantCall,
            CdpError::InvalidGuardState,
            CdpError::Overflow,
            CdpError::serialization("truncated input"),
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_display_carries_context() {
        let err = CdpError::DebtUnderflow { debt: 10, repaid: 11 };
        assert_eq!(err.to_string(), "repayment 11 exceeds outstanding debt 10");
        assert!(!err.is_recoverable());
        assert!(CdpError::SameBlockDeposit { block: 3 }.is_recoverable());
    }
}
