//! Progress of a single deposit or withdrawal.

use std::fmt::Display;

use tokio::sync::watch;

/// Where a transaction flow currently is.
///
/// A flow moves `Idle -> Validating -> (Wrapping)? -> (Approving)? ->
/// Quoting -> Submitting -> Confirming -> (Unwrapping)?` and ends in
/// `Succeeded` or `Failed`. Optional phases are skipped when not needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionPhase {
    #[default]
    Idle,
    Validating,
    Wrapping,
    Approving,
    Quoting,
    Submitting,
    Confirming,
    Unwrapping,
    Succeeded,
    Failed,
}

impl TransactionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl Display for TransactionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Wrapping => "wrapping",
            Self::Approving => "approving",
            Self::Quoting => "quoting",
            Self::Submitting => "submitting",
            Self::Confirming => "confirming",
            Self::Unwrapping => "unwrapping",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };

        write!(f, "{name}")
    }
}

/// Receives phase transitions as the orchestrator moves through a flow.
pub trait PhaseObserver: Send + Sync {
    fn on_phase(&self, phase: TransactionPhase);
}

impl PhaseObserver for () {
    fn on_phase(&self, _phase: TransactionPhase) {}
}

impl PhaseObserver for watch::Sender<TransactionPhase> {
    fn on_phase(&self, phase: TransactionPhase) {
        self.send_replace(phase);
    }
}
