//! ERC20 allowance checks and approvals ahead of gateway calls.

use alloy::primitives::{Address, TxHash, U256};
use tracing::{debug, info};

use numu_evm::{EvmError, Wallet};

use crate::bindings::IERC20;
use crate::transaction::{PhaseObserver, TransactionPhase};

/// Result of [`ensure_allowance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// The existing allowance already covered the amount; nothing was sent.
    AlreadySufficient,
    /// An approval was mined.
    Approved { tx_hash: TxHash },
}

#[derive(Debug, thiserror::Error)]
pub enum AllowanceError {
    #[error("Failed to read allowance: {0}")]
    Read(#[source] EvmError),
    #[error("Approval failed: {0}")]
    Approve(#[source] EvmError),
    #[error("Approval confirmed but allowance is {allowance}, below required {required}")]
    StillInsufficient { allowance: U256, required: U256 },
}

async fn read_allowance<W: Wallet>(
    wallet: &W,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, AllowanceError> {
    wallet
        .view(token, IERC20::allowanceCall { owner, spender })
        .await
        .map_err(AllowanceError::Read)
}

/// Makes sure `spender` may move at least `required` of `token` on behalf
/// of the wallet's address.
///
/// When the current allowance falls short, approves exactly `required`
/// and waits for the approval to be mined before returning. Signing
/// rejections and reverts are returned as-is; nothing is retried.
pub async fn ensure_allowance<W: Wallet>(
    wallet: &W,
    token: Address,
    spender: Address,
    required: U256,
) -> Result<AllowanceOutcome, AllowanceError> {
    ensure_allowance_observed(wallet, token, spender, required, &()).await
}

/// [`ensure_allowance`], reporting [`TransactionPhase::Approving`] to
/// `observer` only when an approval is actually sent.
#[tracing::instrument(skip(wallet, observer), fields(owner = %wallet.address()), level = tracing::Level::DEBUG)]
pub(crate) async fn ensure_allowance_observed<W: Wallet>(
    wallet: &W,
    token: Address,
    spender: Address,
    required: U256,
    observer: &dyn PhaseObserver,
) -> Result<AllowanceOutcome, AllowanceError> {
    let owner = wallet.address();
    let current = read_allowance(wallet, token, owner, spender).await?;

    if current >= required {
        debug!(%current, %required, "Allowance already sufficient");
        return Ok(AllowanceOutcome::AlreadySufficient);
    }

    observer.on_phase(TransactionPhase::Approving);
    info!(%token, %spender, %current, %required, "Approving gateway to spend tokens");

    let tx_hash = wallet
        .submit(
            token,
            IERC20::approveCall {
                spender,
                amount: required,
            },
            "ERC20 approve for gateway",
        )
        .await
        .map_err(AllowanceError::Approve)?;

    let allowance = read_allowance(wallet, token, owner, spender).await?;
    if allowance < required {
        return Err(AllowanceError::StillInsufficient {
            allowance,
            required,
        });
    }

    info!(%tx_hash, %allowance, "Approval confirmed");

    Ok(AllowanceOutcome::Approved { tx_hash })
}
