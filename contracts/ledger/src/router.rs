//! Withdrawal Router
//!
//! Serves a withdrawal from the ledger's local buffer first and from the
//! active vault second. Pulling from the vault is only possible while
//! self-repay mode is on; otherwise the shortfall has to wait for a
//! governance recall.

use tracing::debug;

use synthvault_common::{safe_add, Address, CdpError, CdpResult};

use crate::interfaces::Environment;
use crate::vault_registry::VaultRegistry;

/// Result of a routed withdrawal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Withdrawal {
    /// Base asset that actually reached the recipient
    pub withdrawn: u64,
    /// Collateral value consumed; bookkeeping is reduced by this
    pub decreased_value: u64,
}

/// Route `amount` of base asset to `recipient`
///
/// When `recipient` is the ledger itself the buffered part stays where it
/// is and only counts as withdrawn.
pub fn route_withdrawal<E: Environment>(
    env: &mut E,
    registry: &mut VaultRegistry,
    self_repay_enabled: bool,
    ledger: &Address,
    recipient: &Address,
    amount: u64,
) -> CdpResult<Withdrawal> {
    let buffer = env.base_balance_of(ledger);
    let buffered = amount.min(buffer);
    let remaining = amount - buffered;

    // Refuse before anything moves
    if remaining > 0 && !self_repay_enabled {
        return Err(CdpError::PendingVaultRecall { remaining });
    }

    let mut result = Withdrawal {
        withdrawn: buffered,
        decreased_value: buffered,
    };

    if buffered > 0 && recipient != ledger {
        env.transfer_base(ledger, recipient, buffered)?;
    }

    if remaining > 0 {
        let vault_id = registry
            .active_id()
            .ok_or(CdpError::VaultNotFound { vault_id: 0 })?;
        let (withdrawn, decreased_value) = registry.withdraw(env, vault_id, recipient, remaining)?;

        result.withdrawn = safe_add(result.withdrawn, withdrawn)?;
        result.decreased_value = safe_add(result.decreased_value, decreased_value)?;
    }

    debug!(
        amount,
        buffered,
        remaining,
        withdrawn = result.withdrawn,
        decreased_value = result.decreased_value,
        "withdrawal routed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::BaseAsset;
    use crate::testing::MockEnvironment;

    const LEDGER: Address = [0xAA; 32];
    const BASE: Address = [0xB0; 32];
    const ADAPTER: Address = [0xA1; 32];
    const USER: Address = [0x01; 32];

    fn setup(buffer: u64, in_vault: u64) -> (MockEnvironment, VaultRegistry) {
        let mut env = MockEnvironment::new(BASE);
        env.add_adapter(ADAPTER, BASE);
        let mut registry = VaultRegistry::new();
        registry.append(&env, ADAPTER, &BASE).unwrap();

        env.fund(&LEDGER, in_vault);
        registry.deposit_all_buffered(&mut env, &LEDGER).unwrap();
        env.fund(&LEDGER, buffer);
        (env, registry)
    }

    #[test]
    fn test_buffer_only() {
        let (mut env, mut registry) = setup(1000, 0);

        let result = route_withdrawal(&mut env, &mut registry, false, &LEDGER, &USER, 400).unwrap();
        assert_eq!(result, Withdrawal { withdrawn: 400, decreased_value: 400 });
        assert_eq!(env.base_balance_of(&USER), 400);
        assert_eq!(env.base_balance_of(&LEDGER), 600);
    }

    #[test]
    fn test_remainder_needs_self_repay_mode() {
        let (mut env, mut registry) = setup(100, 900);

        assert_eq!(
            route_withdrawal(&mut env, &mut registry, false, &LEDGER, &USER, 300),
            Err(CdpError::PendingVaultRecall { remaining: 200 })
        );
        // Nothing moved
        assert_eq!(env.base_balance_of(&USER), 0);
        assert_eq!(env.base_balance_of(&LEDGER), 100);
    }

    #[test]
    fn test_buffer_then_vault() {
        let (mut env, mut registry) = setup(100, 900);
        env.set_slippage(&ADAPTER, 50); // 0.5%

        let result = route_withdrawal(&mut env, &mut registry, true, &LEDGER, &USER, 300).unwrap();
        assert_eq!(result.withdrawn, 100 + 199);
        assert_eq!(result.decreased_value, 300);
        assert_eq!(env.base_balance_of(&USER), 299);
        assert_eq!(registry.get(0).unwrap().total_deposited, 700);
    }

    #[test]
    fn test_ledger_recipient_keeps_buffer() {
        let (mut env, mut registry) = setup(100, 900);

        let result = route_withdrawal(&mut env, &mut registry, true, &LEDGER, &LEDGER, 250).unwrap();
        assert_eq!(result, Withdrawal { withdrawn: 250, decreased_value: 250 });
        // Buffer kept its 100 and received the 150 pulled from the vault
        assert_eq!(env.base_balance_of(&LEDGER), 250);
    }
}
