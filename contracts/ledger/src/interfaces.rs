//! Collaborator Interfaces
//!
//! The ledger never owns tokens, vault strategies, the distribution sink or
//! the peg oracle. It reaches them through these traits, implemented by the
//! host that embeds the engine. Collaborators are addressed by identity so
//! the vault registry can hold plain adapter handles.

use synthvault_common::{Address, BlockNumber, CdpResult};

/// Who is calling, from where, and when
pub trait ExecutionContext {
    /// Current block number
    fn block_number(&self) -> BlockNumber;

    /// Immediate caller of the operation
    fn msg_sender(&self) -> Address;

    /// Account that signed the enclosing transaction
    fn tx_origin(&self) -> Address;

    /// Whether `address` holds contract code
    fn is_contract(&self, address: &Address) -> bool;
}

/// The base (collateral) asset
pub trait BaseAsset {
    fn base_balance_of(&self, owner: &Address) -> u64;

    /// Move base asset; the host enforces any allowance `from` granted
    fn transfer_base(&mut self, from: &Address, to: &Address, amount: u64) -> CdpResult<()>;
}

/// The synthetic (debt) asset
pub trait SyntheticAsset {
    fn mint_synthetic(&mut self, to: &Address, amount: u64) -> CdpResult<()>;

    fn burn_synthetic_from(&mut self, from: &Address, amount: u64) -> CdpResult<()>;

    /// Lower the debt-ceiling counter when synthetic debt is extinguished
    fn lower_minted_counter(&mut self, amount: u64) -> CdpResult<()>;
}

/// External yield adapters, addressed by handle
pub trait VaultAdapter {
    /// Asset the adapter accepts
    fn adapter_token(&self, adapter: &Address) -> CdpResult<Address>;

    /// Deploy `amount` already transferred to the adapter
    fn adapter_deposit(&mut self, adapter: &Address, amount: u64) -> CdpResult<()>;

    /// Withdraw `amount` to `recipient`; returns `(withdrawn, decreased_value)`
    fn adapter_withdraw(&mut self, adapter: &Address, recipient: &Address, amount: u64) -> CdpResult<(u64, u64)>;

    /// Send accrued yield to `recipient`; returns `(harvested, decreased_value)`
    fn adapter_harvest(&mut self, adapter: &Address, recipient: &Address) -> CdpResult<(u64, u64)>;
}

/// Downstream consumer of harvested yield and repaid base asset
pub trait DistributionSink {
    /// Hand `amount` of base asset held by `origin` to `sink`
    fn distribute(&mut self, sink: &Address, origin: &Address, amount: u64) -> CdpResult<()>;
}

/// Price feed for the synthetic asset
pub trait PegOracle {
    fn latest_answer(&self, oracle: &Address) -> CdpResult<i128>;
}

/// Everything the engine needs from its host
///
/// `checkpoint` and `rollback` let the engine undo collaborator side
/// effects when an operation fails after an external call.
pub trait Environment:
    ExecutionContext + BaseAsset + SyntheticAsset + VaultAdapter + DistributionSink + PegOracle
{
    type Checkpoint;

    fn checkpoint(&mut self) -> Self::Checkpoint;

    fn rollback(&mut self, checkpoint: Self::Checkpoint);
}
