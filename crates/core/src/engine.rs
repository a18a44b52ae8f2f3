//! Quoting, allowance gating and swap execution against the router.
use std::{sync::Arc, time::Duration};

use num_bigint::BigUint;
use num_traits::Zero as _;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    abi::{self, EncodedCall},
    address::TronAddress,
    config::{Config, PollConfig},
    error::{Result, SwapError},
    gateway::{ChainGateway, ContractCallRequest},
    poller::{TxEvent, TxStatus, poll_transaction, transition},
    quote::{ExactMode, Quote, QuoteRequest},
    router::{Path, build_path},
    signer::Signer,
    slippage::{apply_slippage_max, apply_slippage_min, deadline_from_now},
    token::TokenInfo,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSettings {
    pub router: TronAddress,
    pub intermediary: TronAddress,
    pub slippage_bps: u64,
    pub deadline: Duration,
    pub fee_limit: u64,
}

impl From<&Config> for SwapSettings {
    fn from(config: &Config) -> Self {
        Self {
            router: config.chain.router,
            intermediary: config.chain.intermediary,
            slippage_bps: config.swap.slippage_bps,
            deadline: config.swap.deadline(),
            fee_limit: config.chain.fee_limit,
        }
    }
}

/// Where the engine is in the approve and swap cycle. Quoting is tracked
/// separately, see [`SwapEngine::quotes_in_flight`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Idle,
    Approving,
    Swapping,
}

/// A swap ready for execution. Exactly one side is fixed by the user, the
/// other one comes from a quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: TokenInfo,
    pub token_out: TokenInfo,
    pub mode: ExactMode,
    pub amount_in: BigUint,
    pub amount_out: BigUint,
}

impl From<&Quote> for SwapRequest {
    fn from(quote: &Quote) -> Self {
        Self {
            token_in: quote.token_in.clone(),
            token_out: quote.token_out.clone(),
            mode: quote.mode,
            amount_in: quote.amount_in.clone(),
            amount_out: quote.amount_out.clone(),
        }
    }
}

/// Router call derived from a [`SwapRequest`] together with the amount the
/// router is allowed to pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub path: Path,
    /// Minimum output for exact-in, maximum input for exact-out
    pub limit: BigUint,
    pub required_spend: BigUint,
    pub call: EncodedCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub txid: String,
    pub status: TxStatus,
    /// Id of the approval sent first, if one was needed
    pub approval_txid: Option<String>,
}

/// Amount the router has to be allowed to spend: the input itself for
/// exact-in, the slippage-inflated quoted input for exact-out.
pub fn required_spend(mode: ExactMode, amount_in: &BigUint, slippage_bps: u64) -> BigUint {
    match mode {
        ExactMode::ExactIn => amount_in.clone(),
        ExactMode::ExactOut => apply_slippage_max(amount_in, slippage_bps),
    }
}

pub fn plan_swap(
    request: &SwapRequest,
    settings: &SwapSettings,
    recipient: &TronAddress,
    deadline: u64,
) -> Result<SwapPlan> {
    let path = build_path(
        &request.token_in.address,
        &request.token_out.address,
        &settings.intermediary,
    );
    let required_spend = required_spend(request.mode, &request.amount_in, settings.slippage_bps);

    let (limit, call) = match request.mode {
        ExactMode::ExactIn => {
            let amount_out_min = apply_slippage_min(&request.amount_out, settings.slippage_bps);
            let call = abi::swap_exact_tokens_for_tokens(
                &request.amount_in,
                &amount_out_min,
                path.hops(),
                recipient,
                deadline,
            )?;
            (amount_out_min, call)
        }
        ExactMode::ExactOut => {
            let amount_in_max = required_spend.clone();
            let call = abi::swap_tokens_for_exact_tokens(
                &request.amount_out,
                &amount_in_max,
                path.hops(),
                recipient,
                deadline,
            )?;
            (amount_in_max, call)
        }
    };

    Ok(SwapPlan {
        path,
        limit,
        required_spend,
        call,
    })
}

/// Puts the engine into a busy state and restores the previous one when
/// dropped, unless something else changed the state in between.
struct BusyGuard<'a> {
    state_tx: &'a watch::Sender<EngineState>,
    entered: EngineState,
    previous: EngineState,
}

impl<'a> BusyGuard<'a> {
    fn enter(state_tx: &'a watch::Sender<EngineState>, entered: EngineState) -> Self {
        let previous = state_tx.send_replace(entered);
        Self {
            state_tx,
            entered,
            previous,
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let (entered, previous) = (self.entered, self.previous);
        self.state_tx.send_if_modified(|state| {
            if *state != entered {
                return false;
            }
            *state = previous;
            true
        });
    }
}

/// Counts a quote as in flight for as long as it lives.
struct QuotingGuard<'a>(&'a watch::Sender<usize>);

impl<'a> QuotingGuard<'a> {
    fn enter(quotes_tx: &'a watch::Sender<usize>) -> Self {
        quotes_tx.send_modify(|n| *n += 1);
        Self(quotes_tx)
    }
}

impl Drop for QuotingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub struct SwapEngine {
    gateway: Arc<dyn ChainGateway>,
    settings: SwapSettings,
    poll: PollConfig,
    state_tx: watch::Sender<EngineState>,
    quotes_tx: watch::Sender<usize>,
    status_tx: watch::Sender<TxStatus>,
}

impl SwapEngine {
    pub fn new(gateway: Arc<dyn ChainGateway>, settings: SwapSettings, poll: PollConfig) -> Self {
        let (state_tx, _) = watch::channel(EngineState::Idle);
        let (quotes_tx, _) = watch::channel(0);
        let (status_tx, _) = watch::channel(TxStatus::Idle);
        Self {
            gateway,
            settings,
            poll,
            state_tx,
            quotes_tx,
            status_tx,
        }
    }

    pub fn settings(&self) -> &SwapSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &Arc<dyn ChainGateway> {
        &self.gateway
    }

    pub fn state(&self) -> watch::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    /// Number of quotes currently waiting on the router.
    pub fn quotes_in_flight(&self) -> watch::Receiver<usize> {
        self.quotes_tx.subscribe()
    }

    pub fn is_quoting(&self) -> bool {
        *self.quotes_tx.borrow() > 0
    }

    /// Status of the last submitted swap.
    pub fn tx_status(&self) -> watch::Receiver<TxStatus> {
        self.status_tx.subscribe()
    }

    pub fn path(&self, token_in: &TokenInfo, token_out: &TokenInfo) -> Path {
        build_path(&token_in.address, &token_out.address, &self.settings.intermediary)
    }

    /// Quotes the side the user did not fix. `Ok(None)` when the fixed side
    /// is zero or unparsable, so there is nothing to quote.
    #[instrument(skip_all, fields(mode = ?request.mode, amount = %request.amount))]
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Option<Quote>> {
        let fixed = match request.mode {
            ExactMode::ExactIn => request.token_in.parse_amount(&request.amount),
            ExactMode::ExactOut => request.token_out.parse_amount(&request.amount),
        };
        if fixed.is_zero() {
            return Ok(None);
        }

        let _quoting = QuotingGuard::enter(&self.quotes_tx);

        let path = self.path(&request.token_in, &request.token_out);
        let caller = request.caller.as_ref();
        let amounts = match request.mode {
            ExactMode::ExactIn => self.gateway.query_amounts_out(&fixed, &path, caller).await?,
            ExactMode::ExactOut => self.gateway.query_amounts_in(&fixed, &path, caller).await?,
        };

        let quoted = match request.mode {
            ExactMode::ExactIn => amounts.last(),
            ExactMode::ExactOut => amounts.first(),
        }
        .cloned()
        .ok_or_else(|| SwapError::NoLiquidity(format!("router returned no amounts for {path}")))?;
        let (amount_in, amount_out) = match request.mode {
            ExactMode::ExactIn => (fixed, quoted),
            ExactMode::ExactOut => (quoted, fixed),
        };

        debug!(%amount_in, %amount_out, "quoted");
        Ok(Some(Quote {
            token_in: request.token_in.clone(),
            token_out: request.token_out.clone(),
            mode: request.mode,
            path,
            amounts,
            amount_in,
            amount_out,
        }))
    }

    /// Whether `owner` has to approve the router before spending `required`.
    /// A failed allowance lookup reads as zero, so it answers yes.
    pub async fn needs_approval(
        &self,
        token: &TronAddress,
        owner: &TronAddress,
        required: &BigUint,
    ) -> bool {
        if required.is_zero() {
            return false;
        }
        let current = self
            .gateway
            .query_allowance(token, owner, &self.settings.router)
            .await;
        current < *required
    }

    /// Approves exactly `required` for the router when the current allowance
    /// is lower, and waits for the approval to confirm. Returns the approval
    /// id if one was sent.
    #[instrument(skip_all, fields(token = %token, owner = %signer.address(), required = %required))]
    pub async fn ensure_allowance(
        &self,
        signer: &Signer,
        token: &TronAddress,
        required: &BigUint,
    ) -> Result<Option<String>> {
        let owner = signer.address();
        let current = self
            .gateway
            .query_allowance(token, owner, &self.settings.router)
            .await;
        if current >= *required {
            debug!(%current, "allowance sufficient");
            return Ok(None);
        }

        let _busy = BusyGuard::enter(&self.state_tx, EngineState::Approving);
        info!(%current, "approving router");

        let call = abi::approve(&self.settings.router, required)?;
        let txid = self.submit(signer, *token, call).await?;

        match poll_transaction(self.gateway.as_ref(), &txid, &self.poll).await {
            TxStatus::Success => {
                info!(tx.id = %txid, "approval confirmed");
                Ok(Some(txid))
            }
            status => {
                warn!(tx.id = %txid, %status, "approval not confirmed");
                Err(SwapError::ApprovalNotConfirmed { txid })
            }
        }
    }

    /// Runs a swap end to end: allowance, submission, confirmation polling.
    /// Failures mark the transaction status as error and are returned once,
    /// never retried.
    #[instrument(skip_all, fields(
        signer = signer.kind(),
        mode = ?request.mode,
        token_in = %request.token_in.symbol,
        token_out = %request.token_out.symbol,
    ))]
    pub async fn swap(&self, signer: &Signer, request: &SwapRequest) -> Result<SwapOutcome> {
        let _busy = BusyGuard::enter(&self.state_tx, EngineState::Swapping);
        transition(&self.status_tx, TxEvent::Submitted);

        let submitted = self.submit_swap(signer, request).await;
        let (txid, approval_txid) = match submitted {
            Ok(ids) => ids,
            Err(e) => {
                transition(&self.status_tx, TxEvent::Failed);
                warn!(error = %e, message = %e.user_message(), "swap failed");
                return Err(e);
            }
        };

        let status = poll_transaction(self.gateway.as_ref(), &txid, &self.poll).await;
        match status {
            TxStatus::Success => {
                transition(&self.status_tx, TxEvent::Confirmed);
            }
            TxStatus::Error => {
                transition(&self.status_tx, TxEvent::Failed);
            }
            _ => {}
        }
        info!(tx.id = %txid, %status, "swap settled");

        Ok(SwapOutcome {
            txid,
            status,
            approval_txid,
        })
    }

    async fn submit_swap(
        &self,
        signer: &Signer,
        request: &SwapRequest,
    ) -> Result<(String, Option<String>)> {
        let deadline = deadline_from_now(self.settings.deadline);
        let plan = plan_swap(request, &self.settings, signer.address(), deadline)?;
        debug!(
            path = %plan.path,
            limit = %plan.limit,
            required_spend = %plan.required_spend,
            deadline,
            "planned swap"
        );

        let approval_txid = self
            .ensure_allowance(signer, &request.token_in.address, &plan.required_spend)
            .await?;
        let txid = self.submit(signer, self.settings.router, plan.call).await?;
        info!(tx.id = %txid, "swap submitted");
        Ok((txid, approval_txid))
    }

    async fn submit(
        &self,
        signer: &Signer,
        contract: TronAddress,
        call: EncodedCall,
    ) -> Result<String> {
        let request = ContractCallRequest {
            contract,
            call,
            owner: *signer.address(),
            fee_limit: self.settings.fee_limit,
            call_value: 0,
        };
        let tx = self.gateway.build_contract_call(&request).await?;
        signer.sign_and_broadcast(tx, self.gateway.as_ref()).await
    }
}
