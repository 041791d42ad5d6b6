//! Share and asset balance reads for one vault.

use alloy::primitives::{Address, U256};
use tracing::debug;

use numu_evm::{Evm, EvmError};

use crate::amount::format_amount;
use crate::bindings::IERC20;
use crate::registry::VaultConfig;

/// Share and asset holdings of one owner in one vault.
///
/// Both halves come from the same refresh; a failed read never leaves a
/// half-updated pair behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub share_balance: String,
    pub asset_balance: String,
    pub shares: U256,
    pub assets: U256,
}

impl Balance {
    pub fn zero() -> Self {
        Self {
            share_balance: "0".to_string(),
            asset_balance: "0".to_string(),
            shares: U256::ZERO,
            assets: U256::ZERO,
        }
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

/// Reads vault share and asset balances.
pub struct BalanceReconciler<'a, E> {
    evm: &'a E,
}

impl<'a, E: Evm> BalanceReconciler<'a, E> {
    pub fn new(evm: &'a E) -> Self {
        Self { evm }
    }

    /// Reads both balances concurrently and returns them only when both
    /// reads succeed.
    pub async fn fetch(&self, owner: Address, vault: &VaultConfig) -> Result<Balance, EvmError> {
        let (shares, assets) = tokio::try_join!(
            self.evm
                .view(vault.address, IERC20::balanceOfCall { account: owner }),
            self.evm
                .view(vault.asset.address, IERC20::balanceOfCall { account: owner }),
        )?;

        debug!(%owner, vault = %vault.key, %shares, %assets, "Fetched balances");

        Ok(Balance {
            share_balance: format_amount(shares, vault.decimals),
            asset_balance: format_amount(assets, vault.asset.decimals),
            shares,
            assets,
        })
    }

    /// Native coin balance, for vaults whose asset wraps it.
    pub async fn fetch_native(&self, owner: Address) -> Result<U256, EvmError> {
        self.evm.native_balance(owner).await
    }
}
