//! Ledger Events
//!
//! Events are emitted during execution and can be indexed off-chain for
//! building UIs, analytics, and notifications. Every state-mutating
//! operation records the account, the amounts moved, and the balances
//! left behind.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{CdpError, CdpResult};
use crate::math::FixedDecimal;
use crate::types::{Address, VaultId};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Account Events (0x01 - 0x1F)
    TokensDeposited = 0x01,
    TokensWithdrawn = 0x02,
    TokensRepaid = 0x03,
    TokensMinted = 0x04,
    TokensLiquidated = 0x05,
    CreditAccrued = 0x06,

    // Vault Events (0x20 - 0x3F)
    FundsHarvested = 0x20,
    FundsRecalled = 0x21,
    FundsFlushed = 0x22,
    ActiveVaultUpdated = 0x23,
    SelfRepayEnabled = 0x24,
    SelfRepayDisabled = 0x25,

    // Admin Events (0x80 - 0x9F)
    PendingGovernanceUpdated = 0x80,
    GovernanceUpdated = 0x81,
    SentinelUpdated = 0x82,
    SinkUpdated = 0x83,
    RewardsUpdated = 0x84,
    HarvestFeeUpdated = 0x85,
    CollateralizationLimitUpdated = 0x86,
    FlushActivatorUpdated = 0x87,
    PegOracleUpdated = 0x88,
    EmergencyExitUpdated = 0x89,
    WhitelistUpdated = 0x8A,
}

/// Main event enum containing all ledger events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum LedgerEvent {
    // ============ Account Events ============

    /// Collateral deposited into an account
    TokensDeposited {
        account: Address,
        amount: u64,
        total_deposited: u64,
        block_height: u64,
    },

    /// Collateral withdrawn from an account
    TokensWithdrawn {
        account: Address,
        requested: u64,
        withdrawn: u64,
        decreased_value: u64,
        total_deposited: u64,
        total_debt: u64,
        block_height: u64,
    },

    /// Debt repaid, possibly by a whitelisted third party
    TokensRepaid {
        account: Address,
        payer: Address,
        base_amount: u64,
        synthetic_amount: u64,
        total_debt: u64,
        block_height: u64,
    },

    /// Synthetic asset minted against credit and/or new debt
    TokensMinted {
        account: Address,
        amount: u64,
        credit_used: u64,
        debt_added: u64,
        total_debt: u64,
        total_credit: u64,
        block_height: u64,
    },

    /// Collateral seized to extinguish debt
    TokensLiquidated {
        account: Address,
        requested: u64,
        withdrawn: u64,
        decreased_value: u64,
        total_deposited: u64,
        total_debt: u64,
        block_height: u64,
    },

    /// Yield credit materialized during reconciliation
    CreditAccrued {
        account: Address,
        accrued: u64,
        total_credit: u64,
        block_height: u64,
    },

    // ============ Vault Events ============

    /// Yield harvested from a vault and distributed
    FundsHarvested {
        vault_id: VaultId,
        harvested: u64,
        decreased_value: u64,
        fee: u64,
        distributed: u64,
        accumulated_weight: FixedDecimal,
        block_height: u64,
    },

    /// Funds pulled back from a vault into the buffer
    FundsRecalled {
        vault_id: VaultId,
        withdrawn: u64,
        decreased_value: u64,
        block_height: u64,
    },

    /// Buffer moved into the active vault
    FundsFlushed {
        vault_id: VaultId,
        amount: u64,
        block_height: u64,
    },

    /// New vault record appended and made active
    ActiveVaultUpdated {
        vault_id: VaultId,
        adapter: Address,
        block_height: u64,
    },

    /// Self-repay mode switched on
    SelfRepayEnabled {
        sink: Address,
        rewards: Address,
        harvest_fee: u64,
        block_height: u64,
    },

    /// Self-repay mode switched off
    SelfRepayDisabled {
        block_height: u64,
    },

    // ============ Admin Events ============

    PendingGovernanceUpdated {
        pending: Address,
        block_height: u64,
    },

    GovernanceUpdated {
        governance: Address,
        block_height: u64,
    },

    SentinelUpdated {
        sentinel: Address,
        block_height: u64,
    },

    SinkUpdated {
        sink: Address,
        block_height: u64,
    },

    RewardsUpdated {
        rewards: Address,
        block_height: u64,
    },

    HarvestFeeUpdated {
        fee: u64,
        block_height: u64,
    },

    CollateralizationLimitUpdated {
        limit: FixedDecimal,
        block_height: u64,
    },

    FlushActivatorUpdated {
        threshold: u64,
        block_height: u64,
    },

    PegOracleUpdated {
        oracle: Address,
        floor: i128,
        block_height: u64,
    },

    EmergencyExitUpdated {
        enabled: bool,
        by: Address,
        block_height: u64,
    },

    WhitelistUpdated {
        account: Address,
        whitelisted: bool,
        block_height: u64,
    },
}

impl LedgerEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TokensDeposited { .. } => EventType::TokensDeposited,
            Self::TokensWithdrawn { .. } => EventType::TokensWithdrawn,
            Self::TokensRepaid { .. } => EventType::TokensRepaid,
            Self::TokensMinted { .. } => EventType::TokensMinted,
            Self::TokensLiquidated { .. } => EventType::TokensLiquidated,
            Self::CreditAccrued { .. } => EventType::CreditAccrued,
            Self::FundsHarvested { .. } => EventType::FundsHarvested,
            Self::FundsRecalled { .. } => EventType::FundsRecalled,
            Self::FundsFlushed { .. } => EventType::FundsFlushed,
            Self::ActiveVaultUpdated { .. } => EventType::ActiveVaultUpdated,
            Self::SelfRepayEnabled { .. } => EventType::SelfRepayEnabled,
            Self::SelfRepayDisabled { .. } => EventType::SelfRepayDisabled,
            Self::PendingGovernanceUpdated { .. } => EventType::PendingGovernanceUpdated,
            Self::GovernanceUpdated { .. } => EventType::GovernanceUpdated,
            Self::SentinelUpdated { .. } => EventType::SentinelUpdated,
            Self::SinkUpdated { .. } => EventType::SinkUpdated,
            Self::RewardsUpdated { .. } => EventType::RewardsUpdated,
            Self::HarvestFeeUpdated { .. } => EventType::HarvestFeeUpdated,
            Self::CollateralizationLimitUpdated { .. } => EventType::CollateralizationLimitUpdated,
            Self::FlushActivatorUpdated { .. } => EventType::FlushActivatorUpdated,
            Self::PegOracleUpdated { .. } => EventType::PegOracleUpdated,
            Self::EmergencyExitUpdated { .. } => EventType::EmergencyExitUpdated,
            Self::WhitelistUpdated { .. } => EventType::WhitelistUpdated,
        }
    }

    /// Get the block height when event occurred
    pub fn block_height(&self) -> u64 {
        match self {
            Self::TokensDeposited { block_height, .. }
            | Self::TokensWithdrawn { block_height, .. }
            | Self::TokensRepaid { block_height, .. }
            | Self::TokensMinted { block_height, .. }
            | Self::TokensLiquidated { block_height, .. }
            | Self::CreditAccrued { block_height, .. }
            | Self::FundsHarvested { block_height, .. }
            | Self::FundsRecalled { block_height, .. }
            | Self::FundsFlushed { block_height, .. }
            | Self::ActiveVaultUpdated { block_height, .. }
            | Self::SelfRepayEnabled { block_height, .. }
            | Self::SelfRepayDisabled { block_height }
            | Self::PendingGovernanceUpdated { block_height, .. }
            | Self::GovernanceUpdated { block_height, .. }
            | Self::SentinelUpdated { block_height, .. }
            | Self::SinkUpdated { block_height, .. }
            | Self::RewardsUpdated { block_height, .. }
            | Self::HarvestFeeUpdated { block_height, .. }
            | Self::CollateralizationLimitUpdated { block_height, .. }
            | Self::FlushActivatorUpdated { block_height, .. }
            | Self::PegOracleUpdated { block_height, .. }
            | Self::EmergencyExitUpdated { block_height, .. }
            | Self::WhitelistUpdated { block_height, .. } => *block_height,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> CdpResult<Vec<u8>> {
        borsh::to_vec(self).map_err(CdpError::serialization)
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> CdpResult<Self> {
        borsh::from_slice(bytes).map_err(CdpError::serialization)
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Most recent event, if any
    pub fn last(&self) -> Option<&LedgerEvent> {
        self.events.last()
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&LedgerEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Drop every event recorded after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = LedgerEvent::TokensDeposited {
            account: [2u8; 32],
            amount: 1000,
            total_deposited: 1000,
            block_height: 100,
        };

        assert_eq!(event.event_type(), EventType::TokensDeposited);
        assert_eq!(event.block_height(), 100);
    }

    #[test]
    fn test_event_serialization() {
        let event = LedgerEvent::FundsHarvested {
            vault_id: 0,
            harvested: 100,
            decreased_value: 100,
            fee: 10,
            distributed: 90,
            accumulated_weight: FixedDecimal::from_ratio(90, 1000).unwrap(),
            block_height: 200,
        };

        let bytes = event.to_bytes().unwrap();
        let restored = LedgerEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, restored);
        assert!(matches!(
            LedgerEvent::from_bytes(&bytes[..bytes.len() - 1]),
            Err(CdpError::Serialization { .. })
        ));
    }

    #[test]
    fn test_event_log_truncate() {
        let mut log = EventLog::new();

        log.emit(LedgerEvent::SelfRepayDisabled { block_height: 1 });
        log.emit(LedgerEvent::HarvestFeeUpdated { fee: 500, block_height: 2 });
        log.emit(LedgerEvent::HarvestFeeUpdated { fee: 700, block_height: 3 });

        assert_eq!(log.filter_by_type(EventType::HarvestFeeUpdated).len(), 2);

        log.truncate(1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().map(|e| e.event_type()), Some(EventType::SelfRepayDisabled));
    }
}
