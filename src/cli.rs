//! CLI commands for inspecting YO vaults and moving funds in and out.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, WalletProvider};
use clap::{Parser, Subcommand};
use std::io::Write;
use thiserror::Error;
use tracing::info;

use numu_evm::{Evm, PrivateKeyWallet, ProviderEvm, Wallet};

use crate::amount::format_amount;
use crate::balance::BalanceReconciler;
use crate::config::{ConfigError, Ctx, Env};
use crate::quote::{QuoteDirection, QuoteEngine};
use crate::registry::ContractRegistry;
use crate::session::VaultSession;
use crate::transaction::SlippageBps;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{action} failed: {reason}")]
    TransactionFailed { action: &'static str, reason: String },
}

#[derive(Debug, Parser)]
#[command(name = "numu")]
#[command(about = "Deposit into and withdraw from YO Protocol vaults on Base")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the configured vaults
    Vaults,
    /// Show share and asset balances held in a vault
    Balances {
        /// Vault key (e.g. yousd, yoeth, yobtc)
        #[arg(short = 'v', long = "vault")]
        vault: String,
        /// Holder to inspect (defaults to the configured signer)
        #[arg(long = "owner")]
        owner: Option<Address>,
    },
    /// Estimate the shares received for depositing assets
    QuoteDeposit {
        /// Vault key (e.g. yousd, yoeth, yobtc)
        #[arg(short = 'v', long = "vault")]
        vault: String,
        /// Asset amount as a decimal string
        #[arg(short = 'a', long = "amount")]
        amount: String,
    },
    /// Estimate the assets received for redeeming shares
    QuoteWithdraw {
        /// Vault key (e.g. yousd, yoeth, yobtc)
        #[arg(short = 'v', long = "vault")]
        vault: String,
        /// Share amount as a decimal string
        #[arg(short = 'a', long = "amount")]
        amount: String,
    },
    /// Deposit assets into a vault through the gateway
    ///
    /// Approves the gateway first when the current allowance is short.
    Deposit {
        /// Vault key (e.g. yousd, yoeth, yobtc)
        #[arg(short = 'v', long = "vault")]
        vault: String,
        /// Asset amount as a decimal string
        #[arg(short = 'a', long = "amount")]
        amount: String,
        /// Wrap native ETH before depositing (WETH vaults only)
        #[arg(long)]
        native: bool,
    },
    /// Redeem vault shares for assets through the gateway
    Withdraw {
        /// Vault key (e.g. yousd, yoeth, yobtc)
        #[arg(short = 'v', long = "vault")]
        vault: String,
        /// Share amount as a decimal string
        #[arg(short = 'a', long = "amount")]
        amount: String,
        /// Unwrap the redeemed WETH to native ETH (WETH vaults only)
        #[arg(long)]
        native: bool,
    },
}

impl CliEnv {
    /// Parse CLI arguments, load config from file, and return with subcommand.
    pub fn parse_and_convert() -> anyhow::Result<(Ctx, Commands)> {
        Self::parse().load()
    }

    /// Load config and secrets from the file paths parsed from CLI arguments.
    pub(crate) fn load(self) -> anyhow::Result<(Ctx, Commands)> {
        let ctx = Ctx::load_files(&self.env.config, self.env.secrets.as_deref())?;
        Ok((ctx, self.command))
    }
}

pub async fn run_command(ctx: Ctx, command: Commands) -> anyhow::Result<()> {
    run_command_with_writers(ctx, command, &mut std::io::stdout()).await
}

async fn run_command_with_writers<W: Write>(
    ctx: Ctx,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::Vaults => vaults_command(stdout, &ctx.registry),
        Commands::Balances { vault, owner } => {
            let owner = match owner {
                Some(owner) => owner,
                None => ctx.signer()?.address(),
            };
            let evm = ProviderEvm::new(ProviderBuilder::new().connect_http(ctx.rpc_url.clone()));
            balances_command(stdout, &evm, &ctx.registry, &vault, owner).await
        }
        Commands::QuoteDeposit { vault, amount } => {
            let evm = ProviderEvm::new(ProviderBuilder::new().connect_http(ctx.rpc_url.clone()));
            quote_command(
                stdout,
                &evm,
                &ctx.registry,
                &vault,
                QuoteDirection::Deposit,
                &amount,
            )
            .await
        }
        Commands::QuoteWithdraw { vault, amount } => {
            let evm = ProviderEvm::new(ProviderBuilder::new().connect_http(ctx.rpc_url.clone()));
            quote_command(
                stdout,
                &evm,
                &ctx.registry,
                &vault,
                QuoteDirection::Withdraw,
                &amount,
            )
            .await
        }
        Commands::Deposit {
            vault,
            amount,
            native,
        } => {
            let wallet = connect_wallet(&ctx)?;
            let action = if native {
                Action::DepositNative
            } else {
                Action::Deposit
            };
            transaction_command(stdout, wallet, ctx.registry, ctx.slippage, &vault, action, &amount)
                .await
        }
        Commands::Withdraw {
            vault,
            amount,
            native,
        } => {
            let wallet = connect_wallet(&ctx)?;
            let action = if native {
                Action::WithdrawNative
            } else {
                Action::Withdraw
            };
            transaction_command(stdout, wallet, ctx.registry, ctx.slippage, &vault, action, &amount)
                .await
        }
    }
}

fn connect_wallet(
    ctx: &Ctx,
) -> Result<PrivateKeyWallet<impl Provider + WalletProvider + Clone + 'static>, ConfigError> {
    let signer = ctx.signer()?.clone();
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(ctx.rpc_url.clone());

    Ok(PrivateKeyWallet::new(provider, ctx.required_confirmations))
}

fn vaults_command<W: Write>(stdout: &mut W, registry: &ContractRegistry) -> anyhow::Result<()> {
    writeln!(stdout, "Gateway: {}", registry.gateway())?;
    writeln!(stdout, "Partner ID: {}", registry.partner_id())?;

    for vault in registry.vaults() {
        writeln!(stdout, "{} ({})", vault.key, vault.symbol)?;
        writeln!(stdout, "   Vault: {}", vault.address)?;
        writeln!(
            stdout,
            "   Asset: {} {} ({} decimals)",
            vault.asset.symbol, vault.asset.address, vault.asset.decimals
        )?;
        if vault.asset.wraps_native {
            writeln!(stdout, "   Accepts native ETH via --native")?;
        }
    }

    Ok(())
}

async fn balances_command<W: Write, E: Evm>(
    stdout: &mut W,
    evm: &E,
    registry: &ContractRegistry,
    vault_key: &str,
    owner: Address,
) -> anyhow::Result<()> {
    let vault = registry.vault(vault_key)?;
    let reconciler = BalanceReconciler::new(evm);
    let balance = reconciler.fetch(owner, vault).await?;

    writeln!(stdout, "Balances for {owner} in {}", vault.symbol)?;
    writeln!(stdout, "   {}: {}", vault.symbol, balance.share_balance)?;
    writeln!(stdout, "   {}: {}", vault.asset.symbol, balance.asset_balance)?;

    if vault.asset.wraps_native {
        let native = reconciler.fetch_native(owner).await?;
        writeln!(
            stdout,
            "   ETH: {}",
            format_amount(native, vault.asset.decimals)
        )?;
    }

    Ok(())
}

async fn quote_command<W: Write, E: Evm>(
    stdout: &mut W,
    evm: &E,
    registry: &ContractRegistry,
    vault_key: &str,
    direction: QuoteDirection,
    amount: &str,
) -> anyhow::Result<()> {
    let vault = registry.vault(vault_key)?;
    let quote = QuoteEngine::new(evm, registry.gateway())
        .quote(vault, direction, amount)
        .await;

    let (input_symbol, output_symbol) = match direction {
        QuoteDirection::Deposit => (&vault.asset.symbol, &vault.symbol),
        QuoteDirection::Withdraw => (&vault.symbol, &vault.asset.symbol),
    };
    writeln!(stdout, "{amount} {input_symbol} -> {quote} {output_symbol}")?;

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Deposit,
    Withdraw,
    DepositNative,
    WithdrawNative,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdraw => "Withdrawal",
            Self::DepositNative => "Native deposit",
            Self::WithdrawNative => "Native withdrawal",
        }
    }
}

async fn transaction_command<W: Write, Wl: Wallet>(
    stdout: &mut W,
    wallet: Wl,
    registry: ContractRegistry,
    slippage: SlippageBps,
    vault_key: &str,
    action: Action,
    amount: &str,
) -> anyhow::Result<()> {
    let mut session = VaultSession::new(registry, vault_key, slippage)?;
    let symbol = session.vault().symbol.clone();

    writeln!(stdout, "{} in {symbol}: {amount}", action.label())?;
    writeln!(stdout, "   Wallet: {}", wallet.address())?;
    writeln!(stdout, "   Slippage tolerance: {slippage}")?;

    session.connect(wallet).await;

    let succeeded = match action {
        Action::Deposit => session.deposit(amount).await,
        Action::Withdraw => session.withdraw(amount).await,
        Action::DepositNative => session.deposit_native(amount).await,
        Action::WithdrawNative => session.withdraw_native(amount).await,
    };

    let snapshot = session.snapshot();
    if !succeeded {
        return Err(CliError::TransactionFailed {
            action: action.label(),
            reason: snapshot
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        }
        .into());
    }

    if let Some(tx_hash) = snapshot.tx_hash {
        info!(%tx_hash, vault = %vault_key, "CLI transaction confirmed");
        writeln!(stdout, "   Transaction: {tx_hash}")?;
    }
    writeln!(stdout, "   {symbol} balance: {}", snapshot.share_balance)?;
    writeln!(
        stdout,
        "   {} balance: {}",
        session.vault().asset.symbol,
        snapshot.asset_balance
    )?;
    if let Some(native) = snapshot.native_balance {
        writeln!(stdout, "   ETH balance: {native}")?;
    }
    writeln!(stdout, "{} completed successfully!", action.label())?;

    Ok(())
}
