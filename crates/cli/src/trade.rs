use std::time::{Duration, Instant};

use color_eyre::eyre::{self, eyre};
use num_bigint::BigUint;
use tokio_stream::{StreamExt as _, wrappers::WatchStream};
use tracing::info;
use trcswap_core::{
    engine::{SwapRequest, required_spend},
    poller::TxStatus,
    quote::{ExactMode, Quote, QuoteRequest},
    slippage::{apply_slippage_max, apply_slippage_min},
};

use crate::cli::App;

#[derive(clap::Args, Debug)]
pub(crate) struct TradeArgs {
    /// Token sold, by symbol or address
    #[arg(long)]
    pub from: String,

    /// Token bought, by symbol or address
    #[arg(long)]
    pub to: String,

    /// Amount of the sold token, or of the bought one with --exact-out
    #[arg(long)]
    pub amount: String,

    /// Fix the output amount instead of the input
    #[arg(long)]
    pub exact_out: bool,
}

impl TradeArgs {
    fn mode(&self) -> ExactMode {
        if self.exact_out {
            ExactMode::ExactOut
        } else {
            ExactMode::ExactIn
        }
    }

    fn request(&self, app: &App) -> eyre::Result<QuoteRequest> {
        let token_in = app.token(&self.from)?;
        let token_out = app.token(&self.to)?;
        if token_in.address == token_out.address {
            return Err(eyre!("cannot swap {} for itself", token_in.symbol));
        }
        Ok(QuoteRequest {
            token_in,
            token_out,
            mode: self.mode(),
            amount: self.amount.clone(),
            caller: None,
        })
    }
}

async fn fetch_quote(app: &App, request: &QuoteRequest) -> eyre::Result<Quote> {
    app.engine
        .quote(request)
        .await?
        .ok_or_else(|| eyre!("amount must be a positive number, got {:?}", request.amount))
}

/// Limit line shown with a quote: what slippage still allows.
fn limit_line(quote: &Quote, slippage_bps: u64) -> String {
    match quote.mode {
        ExactMode::ExactIn => format!(
            "minimum received: {} {}",
            quote
                .token_out
                .format_amount(&apply_slippage_min(&quote.amount_out, slippage_bps)),
            quote.token_out.symbol
        ),
        ExactMode::ExactOut => format!(
            "maximum sold: {} {}",
            quote
                .token_in
                .format_amount(&apply_slippage_max(&quote.amount_in, slippage_bps)),
            quote.token_in.symbol
        ),
    }
}

fn print_quote(app: &App, quote: &Quote) {
    println!("{quote}");
    println!("{}", limit_line(quote, app.config.swap.slippage_bps));
    println!(
        "slippage: {}.{:02}%",
        app.config.swap.slippage_bps / 100,
        app.config.swap.slippage_bps % 100
    );
}

pub(crate) async fn quote(app: &App, args: &TradeArgs) -> eyre::Result<()> {
    let request = args.request(app)?;
    let quote = fetch_quote(app, &request).await?;
    print_quote(app, &quote);
    Ok(())
}

pub(crate) async fn swap(app: &App, args: &TradeArgs) -> eyre::Result<()> {
    let (signer, mut presence) = app.signer().await?;
    let mut request = args.request(app)?;
    request.caller = Some(*signer.address());

    let quote = fetch_quote(app, &request).await?;
    print_quote(app, &quote);

    let required = required_spend(quote.mode, &quote.amount_in, app.config.swap.slippage_bps);
    if app
        .engine
        .needs_approval(&quote.token_in.address, signer.address(), &required)
        .await
    {
        println!(
            "approving {} {} for the router first",
            quote.token_in.format_amount(&required),
            quote.token_in.symbol
        );
    }

    let status_printer = tokio::spawn(print_status_changes(WatchStream::new(
        app.engine.tx_status(),
    )));

    let started = Instant::now();
    let result = app.engine.swap(&signer, &SwapRequest::from(&quote)).await;
    status_printer.abort();
    presence.shutdown().await;

    let outcome = result.map_err(|e| eyre!("{}", e.user_message()))?;
    let elapsed = humantime::format_duration(round_to_secs(started.elapsed()));
    info!(tx.id = %outcome.txid, status = %outcome.status, %elapsed, "swap finished");

    if let Some(approval) = &outcome.approval_txid {
        println!("approval: {}", app.network().explorer_tx_url(approval));
    }
    println!(
        "{} after {elapsed}: {}",
        outcome.status,
        app.network().explorer_tx_url(&outcome.txid)
    );
    if outcome.status == TxStatus::Pending {
        println!("still unconfirmed, check later with `trcswap tx-status {}`", outcome.txid);
    }
    Ok(())
}

async fn print_status_changes(mut statuses: WatchStream<TxStatus>) {
    while let Some(status) = statuses.next().await {
        if status != TxStatus::Idle {
            println!("status: {status}");
        }
    }
}

fn round_to_secs(elapsed: Duration) -> Duration {
    Duration::from_secs(elapsed.as_secs())
}

#[derive(clap::Args, Debug)]
pub(crate) struct Approve {
    /// Token symbol or address
    #[arg(long)]
    token: String,

    /// Human readable amount to allow the router to spend
    #[arg(long)]
    amount: String,
}

impl Approve {
    pub(crate) async fn run(&self, app: &App) -> eyre::Result<()> {
        let token = app.token(&self.token)?;
        let amount: BigUint = token.parse_amount(&self.amount);
        if amount == BigUint::ZERO {
            return Err(eyre!("amount must be a positive number, got {:?}", self.amount));
        }

        let (signer, mut presence) = app.signer().await?;
        let result = app
            .engine
            .ensure_allowance(&signer, &token.address, &amount)
            .await;
        presence.shutdown().await;

        match result.map_err(|e| eyre!("{}", e.user_message()))? {
            Some(txid) => println!("approved: {}", app.network().explorer_tx_url(&txid)),
            None => println!(
                "router may already spend {} {}",
                token.format_amount(&amount),
                token.symbol
            ),
        }
        Ok(())
    }
}
