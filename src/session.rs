//! UI-facing state for one vault and one (optional) connected wallet.
//!
//! A [`VaultSession`] owns the balance pair and the state of the latest
//! submission and publishes both as a single [`VaultSnapshot`] through a
//! `watch` channel. Each publish replaces the whole snapshot, so readers
//! never see balances from one refresh mixed with another, or a stale
//! `tx_hash` next to a new error. Balance read failures go to
//! `balance_error` and never touch the submission's `error`.

use alloy::primitives::{TxHash, U256};
use tokio::sync::watch;
use tracing::{info, warn};

use numu_evm::{EvmError, Wallet};

use crate::amount::format_amount;
use crate::balance::{Balance, BalanceReconciler};
use crate::quote::{QuoteDirection, QuoteEngine};
use crate::registry::{ContractRegistry, RegistryError, VaultConfig};
use crate::transaction::{
    PhaseObserver, SlippageBps, TransactionError, TransactionOrchestrator, TransactionPhase,
    TransactionReceipt,
};

pub const NOT_CONNECTED: &str = "Wallet not connected";

/// Everything a front-end renders for a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSnapshot {
    pub share_balance: String,
    pub asset_balance: String,
    /// Native coin balance, only for vaults whose asset wraps it.
    pub native_balance: Option<String>,
    pub is_loading: bool,
    /// Last balance refresh failed; the balances shown are the previous ones.
    pub balance_error: Option<String>,
    /// Why the latest submission failed. Never set together with `tx_hash`.
    pub error: Option<String>,
    pub tx_hash: Option<TxHash>,
    pub phase: TransactionPhase,
}

impl Default for VaultSnapshot {
    fn default() -> Self {
        Self {
            share_balance: "0".to_string(),
            asset_balance: "0".to_string(),
            native_balance: None,
            is_loading: false,
            balance_error: None,
            error: None,
            tx_hash: None,
            phase: TransactionPhase::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Flow {
    Deposit,
    Withdraw,
    DepositNative,
    WithdrawNative,
}

/// Forwards orchestrator phases into the published snapshot.
struct SnapshotPhases<'a>(&'a watch::Sender<VaultSnapshot>);

impl PhaseObserver for SnapshotPhases<'_> {
    fn on_phase(&self, phase: TransactionPhase) {
        self.0.send_modify(|snapshot| snapshot.phase = phase);
    }
}

/// Deposit/withdraw entry points and balance state for one vault.
pub struct VaultSession<W> {
    registry: ContractRegistry,
    vault: VaultConfig,
    slippage: SlippageBps,
    wallet: Option<W>,
    balance: Option<Balance>,
    native: Option<U256>,
    state: watch::Sender<VaultSnapshot>,
}

impl<W: Wallet> VaultSession<W> {
    pub fn new(
        registry: ContractRegistry,
        vault_key: &str,
        slippage: SlippageBps,
    ) -> Result<Self, RegistryError> {
        let vault = registry.vault(vault_key)?.clone();
        let (state, _) = watch::channel(VaultSnapshot::default());

        Ok(Self {
            registry,
            vault,
            slippage,
            wallet: None,
            balance: None,
            native: None,
            state,
        })
    }

    pub fn vault(&self) -> &VaultConfig {
        &self.vault
    }

    pub fn wallet(&self) -> Option<&W> {
        self.wallet.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn snapshot(&self) -> VaultSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<VaultSnapshot> {
        self.state.subscribe()
    }

    /// Attaches a wallet and loads its balances.
    pub async fn connect(&mut self, wallet: W) {
        info!(owner = %wallet.address(), vault = %self.vault.key, "Wallet connected");
        self.wallet = Some(wallet);
        self.refresh_balances().await;
    }

    /// Drops the wallet and resets balances to zero.
    pub fn disconnect(&mut self) {
        info!(vault = %self.vault.key, "Wallet disconnected");
        self.wallet = None;
        self.reset_balances();
    }

    /// Re-reads balances. Without a wallet the balances reset to zero; on
    /// a failed read the previous balances stay and `balance_error` is set.
    pub async fn refresh_balances(&mut self) {
        if self.wallet.is_none() {
            self.reset_balances();
            return;
        }

        self.state.send_modify(|snapshot| snapshot.is_loading = true);

        self.reload_and_record("Failed to fetch balances").await;
        self.state.send_modify(|snapshot| snapshot.is_loading = false);
    }

    /// Estimated shares for depositing `amount` assets; `"0"` when not
    /// connected or unavailable.
    pub async fn quote_deposit(&self, amount: &str) -> String {
        self.quote(QuoteDirection::Deposit, amount).await
    }

    /// Estimated assets for redeeming `amount` shares; `"0"` when not
    /// connected or unavailable.
    pub async fn quote_withdraw(&self, amount: &str) -> String {
        self.quote(QuoteDirection::Withdraw, amount).await
    }

    pub async fn deposit(&mut self, amount: &str) -> bool {
        self.submit(Flow::Deposit, amount).await
    }

    pub async fn withdraw(&mut self, amount: &str) -> bool {
        self.submit(Flow::Withdraw, amount).await
    }

    pub async fn deposit_native(&mut self, amount: &str) -> bool {
        self.submit(Flow::DepositNative, amount).await
    }

    pub async fn withdraw_native(&mut self, amount: &str) -> bool {
        self.submit(Flow::WithdrawNative, amount).await
    }

    async fn quote(&self, direction: QuoteDirection, amount: &str) -> String {
        let Some(wallet) = &self.wallet else {
            return "0".to_string();
        };

        QuoteEngine::new(wallet, self.registry.gateway())
            .quote(&self.vault, direction, amount)
            .await
    }

    async fn submit(&mut self, flow: Flow, amount: &str) -> bool {
        let Some(wallet) = &self.wallet else {
            self.state.send_modify(|snapshot| {
                snapshot.is_loading = false;
                snapshot.error = Some(NOT_CONNECTED.to_string());
                snapshot.tx_hash = None;
                snapshot.phase = TransactionPhase::Failed;
            });
            return false;
        };

        self.state.send_modify(|snapshot| {
            snapshot.is_loading = true;
            snapshot.error = None;
            snapshot.tx_hash = None;
            snapshot.phase = TransactionPhase::Idle;
        });

        let result = run_flow(
            &TransactionOrchestrator::new(wallet, &self.registry, self.slippage),
            &self.vault,
            flow,
            amount,
            self.available(flow),
            &SnapshotPhases(&self.state),
        )
        .await;

        match result {
            Ok(receipt) => {
                self.state.send_modify(|snapshot| {
                    snapshot.is_loading = false;
                    snapshot.tx_hash = Some(receipt.tx_hash);
                });

                self.reload_and_record("Balance refresh after transaction failed")
                    .await;

                true
            }
            Err(error) => {
                self.state.send_modify(|snapshot| {
                    snapshot.is_loading = false;
                    snapshot.error = Some(error.to_string());
                });

                // A wrap or redeem may have been mined before the failing step.
                if error.reached_chain() {
                    self.reload_and_record("Balance refresh after failed transaction")
                        .await;
                }

                false
            }
        }
    }

    /// Last known balance of the flow's input token, if loaded.
    fn available(&self, flow: Flow) -> Option<U256> {
        match flow {
            Flow::Deposit => self.balance.as_ref().map(|balance| balance.assets),
            Flow::Withdraw | Flow::WithdrawNative => {
                self.balance.as_ref().map(|balance| balance.shares)
            }
            Flow::DepositNative => self.native,
        }
    }

    /// Reloads balances and records the outcome in `balance_error`.
    async fn reload_and_record(&mut self, context: &str) {
        match self.reload().await {
            Ok(()) => self.state.send_modify(|snapshot| snapshot.balance_error = None),
            Err(error) => {
                warn!(vault = %self.vault.key, %error, "{context}");
                self.state.send_modify(|snapshot| {
                    snapshot.balance_error = Some(format!("Failed to fetch balances: {error}"));
                });
            }
        }
    }

    async fn reload(&mut self) -> Result<(), EvmError> {
        let Some(wallet) = &self.wallet else {
            self.reset_balances();
            return Ok(());
        };

        let owner = wallet.address();
        let reconciler = BalanceReconciler::new(wallet);
        let balance = reconciler.fetch(owner, &self.vault).await?;
        let native = if self.vault.asset.wraps_native {
            Some(reconciler.fetch_native(owner).await?)
        } else {
            None
        };

        let native_balance = native.map(|native| format_amount(native, self.vault.asset.decimals));
        self.state.send_modify(|snapshot| {
            snapshot.share_balance = balance.share_balance.clone();
            snapshot.asset_balance = balance.asset_balance.clone();
            snapshot.native_balance = native_balance;
        });
        self.balance = Some(balance);
        self.native = native;

        Ok(())
    }

    fn reset_balances(&mut self) {
        self.balance = None;
        self.native = None;
        self.state.send_modify(|snapshot| {
            let zero = Balance::zero();
            snapshot.share_balance = zero.share_balance;
            snapshot.asset_balance = zero.asset_balance;
            snapshot.native_balance = None;
            snapshot.balance_error = None;
            snapshot.is_loading = false;
        });
    }
}

async fn run_flow<W: Wallet>(
    orchestrator: &TransactionOrchestrator<'_, W>,
    vault: &VaultConfig,
    flow: Flow,
    amount: &str,
    available: Option<U256>,
    observer: &dyn PhaseObserver,
) -> Result<TransactionReceipt, TransactionError> {
    match flow {
        Flow::Deposit => orchestrator.deposit(vault, amount, available, observer).await,
        Flow::Withdraw => orchestrator.withdraw(vault, amount, available, observer).await,
        Flow::DepositNative => {
            orchestrator
                .deposit_native(vault, amount, available, observer)
                .await
        }
        Flow::WithdrawNative => {
            orchestrator
                .withdraw_native(vault, amount, available, observer)
                .await
        }
    }
}
