//! Quote types and the debounced scheduler that keeps only the latest
//! request alive.
use std::{
    fmt::{self, Display},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{Instrument as _, debug, debug_span, warn};

use crate::{address::TronAddress, engine::SwapEngine, router::Path, token::TokenInfo};

/// Which side of the swap the user fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExactMode {
    #[default]
    ExactIn,
    ExactOut,
}

impl Display for ExactMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExactMode::ExactIn => write!(f, "exact-in"),
            ExactMode::ExactOut => write!(f, "exact-out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub token_in: TokenInfo,
    pub token_out: TokenInfo,
    pub mode: ExactMode,
    /// Human readable amount of the fixed side
    pub amount: String,
    /// Connected account, if any; constant calls fall back to a placeholder
    pub caller: Option<TronAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub token_in: TokenInfo,
    pub token_out: TokenInfo,
    pub mode: ExactMode,
    pub path: Path,
    /// Router amounts, one per hop
    pub amounts: Vec<BigUint>,
    pub amount_in: BigUint,
    pub amount_out: BigUint,
}

impl Quote {
    /// The side the router computed, rendered for display.
    pub fn computed_amount(&self) -> String {
        match self.mode {
            ExactMode::ExactIn => self.token_out.format_amount(&self.amount_out),
            ExactMode::ExactOut => self.token_in.format_amount(&self.amount_in),
        }
    }
}

impl Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} {} via {}",
            self.token_in.format_amount(&self.amount_in),
            self.token_in.symbol,
            self.token_out.format_amount(&self.amount_out),
            self.token_out.symbol,
            self.path,
        )
    }
}

/// What the quote display should currently show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuoteUpdate {
    #[default]
    Idle,
    Quoting,
    Ready(Quote),
    /// Computed side stays empty
    Failed(String),
}

/// Runs quotes after a quiet period. Every call to [`schedule`] supersedes
/// the previous one: a stale request never reaches the network if it is
/// still waiting, and its result is dropped if it already left.
///
/// [`schedule`]: QuoteScheduler::schedule
pub struct QuoteScheduler {
    engine: Arc<SwapEngine>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    tx: watch::Sender<QuoteUpdate>,
}

impl QuoteScheduler {
    pub fn new(engine: Arc<SwapEngine>, debounce: Duration) -> Self {
        let (tx, _) = watch::channel(QuoteUpdate::Idle);
        Self {
            engine,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteUpdate> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> QuoteUpdate {
        self.tx.borrow().clone()
    }

    pub fn schedule(&self, request: QuoteRequest) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let is_current = {
            let latest = self.generation.clone();
            move || latest.load(Ordering::SeqCst) == generation
        };

        let engine = self.engine.clone();
        let tx = self.tx.clone();
        let debounce = self.debounce;
        let span = debug_span!("quote", generation, mode = %request.mode, amount = %request.amount);

        tokio::spawn(
            async move {
                tokio::time::sleep(debounce).await;
                if !is_current() {
                    debug!("superseded before sending");
                    return;
                }

                tx.send_replace(QuoteUpdate::Quoting);
                let update = match engine.quote(&request).await {
                    Ok(Some(quote)) => QuoteUpdate::Ready(quote),
                    Ok(None) => QuoteUpdate::Idle,
                    Err(e) => {
                        warn!(error = %e, "quote failed");
                        QuoteUpdate::Failed(e.user_message())
                    }
                };

                if !is_current() {
                    debug!("superseded in flight, dropping result");
                    return;
                }
                tx.send_replace(update);
            }
            .instrument(span),
        );
    }

    /// Drops whatever is scheduled or in flight and clears the display.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(QuoteUpdate::Idle);
    }
}
