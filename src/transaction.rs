//! Deposit and withdrawal flows through the YO gateway.
//!
//! Each flow is a fixed sequence of chain interactions: validate the
//! amount, make sure the gateway may pull the input token, quote the
//! expected output, derive a slippage guard from the quote, submit the
//! gateway call and wait for it to be mined. Every step returns early
//! with a [`TransactionError`]; nothing is retried.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use tracing::{error, info};

use numu_evm::{EvmError, Wallet};

use crate::allowance::{AllowanceError, AllowanceOutcome, ensure_allowance_observed};
use crate::amount::{AmountError, parse_amount};
use crate::bindings::{IERC20, IWETH, IYoGateway};
use crate::quote::{QuoteDirection, QuoteEngine, QuoteError};
use crate::registry::{ContractRegistry, TokenConfig, VaultConfig};

mod phase;
mod slippage;

pub use phase::{PhaseObserver, TransactionPhase};
pub use slippage::{InvalidSlippage, SlippageBps};

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
    #[error("Insufficient {symbol} balance")]
    InsufficientBalance { symbol: String },
    #[error("{symbol} is not a wrapped native token")]
    NotNative { symbol: String },
    #[error(transparent)]
    Allowance(#[from] AllowanceError),
    #[error("{0}")]
    Quote(#[source] QuoteError),
    #[error("Gateway quoted zero output for a positive amount")]
    ZeroQuote,
    #[error("Failed to read {symbol} balance: {source}")]
    BalanceRead { symbol: String, source: EvmError },
    #[error("Wrapping failed: {0}")]
    Wrap(#[source] EvmError),
    #[error("Deposit failed: {0}")]
    Deposit(#[source] EvmError),
    #[error("Withdrawal failed: {0}")]
    Withdraw(#[source] EvmError),
    #[error("Unwrapping failed: {0}")]
    Unwrap(#[source] EvmError),
}

impl TransactionError {
    /// Failed after at least one chain call, so balances may have moved.
    pub fn reached_chain(&self) -> bool {
        !matches!(
            self,
            Self::InvalidAmount(_) | Self::InsufficientBalance { .. } | Self::NotNative { .. }
        )
    }
}

/// What a successful flow did on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// The mined gateway `deposit` or `redeem` transaction.
    pub tx_hash: TxHash,
    /// Input amount in base units (assets for deposits, shares for
    /// withdrawals).
    pub input: U256,
    pub quoted_output: U256,
    pub min_output: U256,
    pub approval: AllowanceOutcome,
    pub wrap_tx: Option<TxHash>,
    pub unwrap_tx: Option<TxHash>,
    /// WETH unwrapped back to the native coin after a native withdrawal.
    pub unwrapped: U256,
}

/// Sequences allowance, quote and gateway calls for one signer.
pub struct TransactionOrchestrator<'a, W> {
    wallet: &'a W,
    registry: &'a ContractRegistry,
    slippage: SlippageBps,
}

/// Gateway call a flow ends with, before the guard is known.
#[derive(Debug, Clone, Copy)]
enum GatewayAction {
    Deposit,
    Redeem,
}

impl<'a, W: Wallet> TransactionOrchestrator<'a, W> {
    pub fn new(wallet: &'a W, registry: &'a ContractRegistry, slippage: SlippageBps) -> Self {
        Self {
            wallet,
            registry,
            slippage,
        }
    }

    /// Deposits `amount` of the vault's asset token.
    ///
    /// `available` is the caller's last known asset balance in base units;
    /// when given, amounts above it are rejected before any chain call.
    #[tracing::instrument(skip(self, vault, available, observer), fields(vault = %vault.key), level = tracing::Level::INFO)]
    pub async fn deposit(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        finish(
            self.deposit_flow(vault, amount, available, observer).await,
            observer,
        )
    }

    /// Redeems `amount` vault shares for the vault's asset token.
    #[tracing::instrument(skip(self, vault, available, observer), fields(vault = %vault.key), level = tracing::Level::INFO)]
    pub async fn withdraw(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        finish(
            self.withdraw_flow(vault, amount, available, observer).await,
            observer,
        )
    }

    /// Wraps `amount` of the native coin and deposits the wrapped token.
    ///
    /// Only valid for vaults whose asset wraps the native coin. `available`
    /// is the caller's last known native balance.
    #[tracing::instrument(skip(self, vault, available, observer), fields(vault = %vault.key), level = tracing::Level::INFO)]
    pub async fn deposit_native(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        finish(
            self.deposit_native_flow(vault, amount, available, observer).await,
            observer,
        )
    }

    /// Redeems `amount` shares and unwraps exactly the wrapped tokens the
    /// redemption paid out.
    #[tracing::instrument(skip(self, vault, available, observer), fields(vault = %vault.key), level = tracing::Level::INFO)]
    pub async fn withdraw_native(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        finish(
            self.withdraw_native_flow(vault, amount, available, observer).await,
            observer,
        )
    }

    async fn deposit_flow(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        observer.on_phase(TransactionPhase::Validating);
        let assets = validate(amount, &vault.asset, available)?;

        self.run(vault, GatewayAction::Deposit, assets, observer)
            .await
    }

    async fn withdraw_flow(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        observer.on_phase(TransactionPhase::Validating);
        let shares = validate(amount, &vault.share_token(), available)?;

        self.run(vault, GatewayAction::Redeem, shares, observer)
            .await
    }

    async fn deposit_native_flow(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        observer.on_phase(TransactionPhase::Validating);
        let weth = native_wrapper(vault)?;
        let native = TokenConfig {
            symbol: "ETH".to_string(),
            ..weth.clone()
        };
        let assets = validate(amount, &native, available)?;

        observer.on_phase(TransactionPhase::Wrapping);
        info!(%assets, "Wrapping native coin");
        let wrap_tx = self
            .send(weth.address, IWETH::depositCall {}, assets, "WETH deposit")
            .await
            .map_err(TransactionError::Wrap)?;

        let mut receipt = self
            .run(vault, GatewayAction::Deposit, assets, observer)
            .await?;
        receipt.wrap_tx = Some(wrap_tx);
        Ok(receipt)
    }

    async fn withdraw_native_flow(
        &self,
        vault: &VaultConfig,
        amount: &str,
        available: Option<U256>,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        observer.on_phase(TransactionPhase::Validating);
        let weth = native_wrapper(vault)?;
        let shares = validate(amount, &vault.share_token(), available)?;

        let before = self.token_balance(weth).await?;
        let mut receipt = self
            .run(vault, GatewayAction::Redeem, shares, observer)
            .await?;
        let after = self.token_balance(weth).await?;

        let received = after.saturating_sub(before);
        if !received.is_zero() {
            observer.on_phase(TransactionPhase::Unwrapping);
            info!(%received, "Unwrapping redeemed tokens");
            let unwrap_tx = self
                .send(
                    weth.address,
                    IWETH::withdrawCall { wad: received },
                    U256::ZERO,
                    "WETH withdraw",
                )
                .await
                .map_err(TransactionError::Unwrap)?;
            receipt.unwrap_tx = Some(unwrap_tx);
            receipt.unwrapped = received;
        }

        Ok(receipt)
    }

    /// Allowance, quote, guard, submit, confirm.
    async fn run(
        &self,
        vault: &VaultConfig,
        action: GatewayAction,
        input: U256,
        observer: &dyn PhaseObserver,
    ) -> Result<TransactionReceipt, TransactionError> {
        let gateway = self.registry.gateway();
        let (input_token, direction) = match action {
            GatewayAction::Deposit => (vault.asset.address, QuoteDirection::Deposit),
            GatewayAction::Redeem => (vault.address, QuoteDirection::Withdraw),
        };

        let approval =
            ensure_allowance_observed(self.wallet, input_token, gateway, input, observer).await?;

        observer.on_phase(TransactionPhase::Quoting);
        let quoted_output = QuoteEngine::new(self.wallet, gateway)
            .quote_units(vault, direction, input)
            .await
            .map_err(TransactionError::Quote)?;
        if quoted_output.is_zero() {
            return Err(TransactionError::ZeroQuote);
        }

        let min_output = self.slippage.min_output(quoted_output);
        let receiver = self.wallet.address();
        let partner_id = self.registry.partner_id();

        observer.on_phase(TransactionPhase::Submitting);
        info!(
            ?action,
            %input,
            %quoted_output,
            %min_output,
            slippage = %self.slippage,
            "Submitting gateway call"
        );

        let (calldata, note) = match action {
            GatewayAction::Deposit => (
                IYoGateway::depositCall {
                    yoVault: vault.address,
                    assets: input,
                    minSharesOut: min_output,
                    receiver,
                    partnerId: partner_id,
                }
                .abi_encode(),
                "YO gateway deposit",
            ),
            GatewayAction::Redeem => (
                IYoGateway::redeemCall {
                    yoVault: vault.address,
                    shares: input,
                    minAssetsOut: min_output,
                    receiver,
                    partnerId: partner_id,
                }
                .abi_encode(),
                "YO gateway redeem",
            ),
        };

        let to_error = |err| match action {
            GatewayAction::Deposit => TransactionError::Deposit(err),
            GatewayAction::Redeem => TransactionError::Withdraw(err),
        };

        let tx_hash = self
            .wallet
            .broadcast(gateway, Bytes::from(calldata), U256::ZERO, note)
            .await
            .map_err(to_error)?;

        observer.on_phase(TransactionPhase::Confirming);
        let tx_hash = self.wallet.confirm(tx_hash, note).await.map_err(to_error)?;

        Ok(TransactionReceipt {
            tx_hash,
            input,
            quoted_output,
            min_output,
            approval,
            wrap_tx: None,
            unwrap_tx: None,
            unwrapped: U256::ZERO,
        })
    }

    async fn send<C: SolCall>(
        &self,
        contract: Address,
        call: C,
        value: U256,
        note: &str,
    ) -> Result<TxHash, EvmError> {
        self.wallet
            .send(contract, Bytes::from(call.abi_encode()), value, note)
            .await
    }

    async fn token_balance(&self, token: &TokenConfig) -> Result<U256, TransactionError> {
        self.wallet
            .view(
                token.address,
                IERC20::balanceOfCall {
                    account: self.wallet.address(),
                },
            )
            .await
            .map_err(|source| TransactionError::BalanceRead {
                symbol: token.symbol.clone(),
                source,
            })
    }
}

/// Parses `amount` in `token` units and checks it against a known balance.
fn validate(
    amount: &str,
    token: &TokenConfig,
    available: Option<U256>,
) -> Result<U256, TransactionError> {
    let units = parse_amount(amount, token.decimals)?;

    if let Some(available) = available
        && units > available
    {
        return Err(TransactionError::InsufficientBalance {
            symbol: token.symbol.clone(),
        });
    }

    Ok(units)
}

fn native_wrapper(vault: &VaultConfig) -> Result<&TokenConfig, TransactionError> {
    if vault.asset.wraps_native {
        Ok(&vault.asset)
    } else {
        Err(TransactionError::NotNative {
            symbol: vault.asset.symbol.clone(),
        })
    }
}

fn finish(
    result: Result<TransactionReceipt, TransactionError>,
    observer: &dyn PhaseObserver,
) -> Result<TransactionReceipt, TransactionError> {
    match &result {
        Ok(receipt) => {
            info!(tx_hash = %receipt.tx_hash, "Transaction succeeded");
            observer.on_phase(TransactionPhase::Succeeded);
        }
        Err(err) => {
            error!(%err, "Transaction failed");
            observer.on_phase(TransactionPhase::Failed);
        }
    }

    result
}
