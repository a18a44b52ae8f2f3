//! Bounded polling of a submitted transaction until its receipt settles.
use std::fmt::{self, Display};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::PollConfig,
    gateway::{ChainGateway, ReceiptOutcome},
};

/// Status of the most recently submitted transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TxStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    /// A new submission started. Replaces whatever was tracked before.
    Submitted,
    Confirmed,
    Failed,
    Reset,
}

impl TxStatus {
    /// Transition table. `None` marks an event that is not valid in the
    /// current state, which callers treat as a no-op.
    pub fn next(self, event: TxEvent) -> Option<TxStatus> {
        use TxEvent::*;
        use TxStatus::*;

        match (self, event) {
            (_, Reset) => Some(Idle),
            (_, Submitted) => Some(Pending),
            (Pending, Confirmed) => Some(Success),
            (Idle | Pending, Failed) => Some(Error),
            (Idle | Success | Error, Confirmed) | (Success | Error, Failed) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Error)
    }
}

impl Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Idle => write!(f, "idle"),
            TxStatus::Pending => write!(f, "pending"),
            TxStatus::Success => write!(f, "success"),
            TxStatus::Error => write!(f, "error"),
        }
    }
}

/// Applies `event` to the status held by `tx`, ignoring invalid transitions.
pub fn transition(tx: &watch::Sender<TxStatus>, event: TxEvent) -> TxStatus {
    tx.send_modify(|status| match status.next(event) {
        Some(next) => *status = next,
        None => warn!(status = %status, ?event, "ignoring invalid status transition"),
    });
    *tx.borrow()
}

/// Queries the receipt of `txid` up to `max_attempts` times, `interval`
/// apart. Lookup errors and missing receipts count as pending. Running out
/// of attempts leaves the status pending.
#[instrument(skip_all, fields(tx.id = %txid))]
pub async fn poll_transaction(
    gateway: &dyn ChainGateway,
    txid: &str,
    config: &PollConfig,
) -> TxStatus {
    for attempt in 1..=config.max_attempts {
        match gateway.transaction_info(txid).await {
            Ok(Some(info)) => match info.outcome() {
                ReceiptOutcome::Success => {
                    info!(attempt, "transaction confirmed");
                    return TxStatus::Success;
                }
                ReceiptOutcome::Failed => {
                    warn!(attempt, res_message = ?info.res_message, "transaction failed on chain");
                    return TxStatus::Error;
                }
                ReceiptOutcome::Pending => debug!(attempt, "receipt not final yet"),
            },
            Ok(None) => debug!(attempt, "transaction not found yet"),
            Err(e) => debug!(attempt, error = %e, "receipt lookup failed, still pending"),
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval()).await;
        }
    }

    warn!(attempts = config.max_attempts, "gave up polling, status stays pending");
    TxStatus::Pending
}
