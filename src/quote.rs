//! Read-only conversion quotes between vault assets and vault shares.
//!
//! The user-facing [`QuoteEngine::quote`] never fails: an empty or
//! invalid amount, or a failed read, yields `"0"` so callers can show
//! "no quote available" without special error handling. The orchestrator
//! uses the fallible [`QuoteEngine::quote_units`] instead.

use alloy::primitives::{Address, U256};
use tracing::{debug, warn};

use numu_evm::{Evm, EvmError};

use crate::amount::{AmountError, format_amount, parse_amount};
use crate::bindings::IYoGateway;
use crate::registry::VaultConfig;

/// Which way a quote converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDirection {
    /// Assets in, shares out (`quoteConvertToShares`).
    Deposit,
    /// Shares in, assets out (`quoteConvertToAssets`).
    Withdraw,
}

impl QuoteDirection {
    /// Decimals of the amount the user types.
    pub fn input_decimals(self, vault: &VaultConfig) -> u8 {
        match self {
            Self::Deposit => vault.asset.decimals,
            Self::Withdraw => vault.decimals,
        }
    }

    /// Decimals of the quoted output.
    pub fn output_decimals(self, vault: &VaultConfig) -> u8 {
        match self {
            Self::Deposit => vault.decimals,
            Self::Withdraw => vault.asset.decimals,
        }
    }
}

/// Which token a gateway allowance view reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceKind {
    Asset,
    Share,
}

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("Quote unavailable: {0}")]
    Evm(#[from] EvmError),
}

/// Quotes conversions through the gateway's view functions.
pub struct QuoteEngine<'a, E> {
    evm: &'a E,
    gateway: Address,
}

impl<'a, E: Evm> QuoteEngine<'a, E> {
    pub fn new(evm: &'a E, gateway: Address) -> Self {
        Self { evm, gateway }
    }

    /// Quotes `amount` (a decimal string in the input token's units) and
    /// formats the result with the output token's decimals.
    ///
    /// Returns `"0"` for empty, non-positive or unparsable input and when
    /// the read call fails.
    pub async fn quote(&self, vault: &VaultConfig, direction: QuoteDirection, amount: &str) -> String {
        let input = match parse_amount(amount, direction.input_decimals(vault)) {
            Ok(input) => input,
            Err(error) => {
                debug!(vault = %vault.key, ?direction, amount, %error, "Not quoting invalid amount");
                return "0".to_string();
            }
        };

        match self.quote_units(vault, direction, input).await {
            Ok(output) => format_amount(output, direction.output_decimals(vault)),
            Err(error) => {
                warn!(vault = %vault.key, ?direction, %input, %error, "Quote failed, reporting zero");
                "0".to_string()
            }
        }
    }

    /// Quotes an amount already in input-token base units.
    pub async fn quote_units(
        &self,
        vault: &VaultConfig,
        direction: QuoteDirection,
        input: U256,
    ) -> Result<U256, QuoteError> {
        let output = match direction {
            QuoteDirection::Deposit => {
                self.evm
                    .view(
                        self.gateway,
                        IYoGateway::quoteConvertToSharesCall {
                            yoVault: vault.address,
                            assets: input,
                        },
                    )
                    .await?
            }
            QuoteDirection::Withdraw => {
                self.evm
                    .view(
                        self.gateway,
                        IYoGateway::quoteConvertToAssetsCall {
                            yoVault: vault.address,
                            shares: input,
                        },
                    )
                    .await?
            }
        };

        debug!(vault = %vault.key, ?direction, %input, %output, "Quoted conversion");

        Ok(output)
    }

    /// Allowance `owner` has granted the gateway on the vault's asset or
    /// share token, as reported by the gateway.
    pub async fn gateway_allowance(
        &self,
        vault: &VaultConfig,
        owner: Address,
        kind: AllowanceKind,
    ) -> Result<U256, QuoteError> {
        let allowance = match kind {
            AllowanceKind::Asset => {
                self.evm
                    .view(
                        self.gateway,
                        IYoGateway::getAssetAllowanceCall {
                            yoVault: vault.address,
                            owner,
                        },
                    )
                    .await?
            }
            AllowanceKind::Share => {
                self.evm
                    .view(
                        self.gateway,
                        IYoGateway::getShareAllowanceCall {
                            yoVault: vault.address,
                            owner,
                        },
                    )
                    .await?
            }
        };

        Ok(allowance)
    }
}
