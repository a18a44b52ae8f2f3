use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = SwapError> = std::result::Result<T, E>;

/// Every failure the swap pipeline can surface.
///
/// Display strings keep the raw upstream message where there is one, so that
/// [`classify`] can still recognize wallet and node errors after they have
/// been wrapped.
#[derive(Debug, Clone, Error)]
pub enum SwapError {
    #[error("user rejected the request: {0}")]
    UserRejected(String),

    #[error("insufficient {resource} for this transaction: {message}")]
    ResourceInsufficient { resource: Resource, message: String },

    #[error("allowance too low: required {required}, current {current}")]
    AllowanceInsufficient { required: String, current: String },

    #[error("deadline expired: {0}")]
    DeadlineExpired(String),

    #[error("INSUFFICIENT_OUTPUT_AMOUNT: {0}")]
    SlippageExceeded(String),

    #[error("no liquidity or amount too small: {0}")]
    NoLiquidity(String),

    #[error("malformed data: {0}")]
    DataMalformed(String),

    #[error("timed out after {} building transaction", humanize(.0))]
    BuildTimeout(Duration),

    #[error("failed to build transaction: {0}")]
    BuildFailed(String),

    #[error("timed out after {} waiting for wallet signature", humanize(.0))]
    SignTimeout(Duration),

    #[error("wallet response did not contain a signature")]
    SignatureMissing,

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("no active relay session")]
    NoActiveSession,

    #[error("approval {txid} was not confirmed")]
    ApprovalNotConfirmed { txid: String },

    #[error("wallet is not ready")]
    WalletNotReady,

    #[error("invalid address `{0}`")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Energy,
    Bandwidth,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Energy => write!(f, "Energy"),
            Resource::Bandwidth => write!(f, "Bandwidth"),
        }
    }
}

impl From<reqwest::Error> for SwapError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SwapError::DataMalformed(err.to_string())
        } else {
            SwapError::NetworkUnreachable(err.to_string())
        }
    }
}

fn humanize(d: &Duration) -> String {
    format!("{}s", d.as_secs())
}

/// User-facing category of a failed approval or swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UserRejected,
    InsufficientEnergy,
    InsufficientBandwidth,
    InsufficientAllowance,
    DeadlineExpired,
    SlippageExceeded,
    Other,
}

/// Categorizes a raw failure message by its content. First match wins.
pub fn classify(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if lower.contains("rejected") || lower.contains("denied") {
        FailureKind::UserRejected
    } else if lower.contains("energy") {
        FailureKind::InsufficientEnergy
    } else if lower.contains("bandwidth") {
        FailureKind::InsufficientBandwidth
    } else if lower.contains("allowance") {
        FailureKind::InsufficientAllowance
    } else if lower.contains("expired") || lower.contains("deadline") {
        FailureKind::DeadlineExpired
    } else if lower.contains("insufficient_output") {
        FailureKind::SlippageExceeded
    } else {
        FailureKind::Other
    }
}

/// Message shown to the user for a raw failure; unmatched input is returned as is.
pub fn user_message(message: &str) -> String {
    match classify(message) {
        FailureKind::UserRejected => "User rejected the transaction.".to_string(),
        FailureKind::InsufficientEnergy => "Insufficient Energy for this transaction.".to_string(),
        FailureKind::InsufficientBandwidth => {
            "Insufficient Bandwidth for this transaction.".to_string()
        }
        FailureKind::InsufficientAllowance => {
            "Allowance too low. Approve token first.".to_string()
        }
        FailureKind::DeadlineExpired => "Deadline expired.".to_string(),
        FailureKind::SlippageExceeded => {
            "Slippage exceeded. Try higher slippage tolerance.".to_string()
        }
        FailureKind::Other => message.to_string(),
    }
}

impl SwapError {
    pub fn kind(&self) -> FailureKind {
        classify(&self.to_string())
    }

    pub fn user_message(&self) -> String {
        user_message(&self.to_string())
    }
}
