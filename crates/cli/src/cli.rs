use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr as _, eyre};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trcswap_core::{
    SwapError,
    address::TronAddress,
    chain::Network,
    config::Config,
    engine::{SwapEngine, SwapSettings},
    gateway::{ChainGateway, ReceiptOutcome, TronGridGateway, decode_node_message},
    poller::poll_transaction,
    signer::{Signer, WalletPresence, select_signer},
    token::TokenInfo,
};

use crate::{tokens, trade, wallet::SignerService};

#[derive(Parser, Debug)]
#[command(name = "trcswap", about = "Swap TRC20 tokens through a SunSwap style router")]
pub(crate) struct Cli {
    /// Local signing service standing in for an injected wallet
    #[arg(long, global = true, env = "TRCSWAP_SIGNER_URL")]
    signer_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured tokens, or look one up on chain
    Tokens(tokens::Tokens),

    /// Quote a swap without sending anything
    Quote(trade::TradeArgs),

    /// Token balance of an account
    Balance(AccountArgs),

    /// Router allowance granted by an account
    Allowance(AccountArgs),

    /// Approve the router to spend a token
    Approve(trade::Approve),

    /// Quote and execute a swap
    Swap(trade::TradeArgs),

    /// Look up, or wait for, a transaction result
    TxStatus(TxStatus),
}

#[derive(clap::Args, Debug)]
pub(crate) struct AccountArgs {
    /// Token symbol or address
    #[arg(long)]
    token: String,

    /// Account to inspect, defaults to the signer's account
    #[arg(long)]
    owner: Option<TronAddress>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct TxStatus {
    txid: String,

    /// Keep polling until the transaction settles
    #[arg(long)]
    wait: bool,
}

/// Everything a command needs, built once per invocation.
pub(crate) struct App {
    pub config: Config,
    pub gateway: Arc<TronGridGateway>,
    pub engine: Arc<SwapEngine>,
    pub signer_url: Option<String>,
}

impl App {
    fn build(config: Config, signer_url: Option<String>) -> eyre::Result<Self> {
        let gateway = Arc::new(
            TronGridGateway::new(&config.chain, &config.timeouts)
                .wrap_err("failed to set up chain gateway")?,
        );
        let engine = Arc::new(SwapEngine::new(
            gateway.clone(),
            SwapSettings::from(&config),
            config.poll.clone(),
        ));
        Ok(Self {
            config,
            gateway,
            engine,
            signer_url,
        })
    }

    /// Network the chain API points at.
    pub fn network(&self) -> Network {
        Network::from_node_host(&self.config.chain.api_url)
    }

    /// Connects to the signing service and returns a signer for its account.
    pub async fn signer(&self) -> eyre::Result<(Signer, WalletPresence)> {
        let url = self
            .signer_url
            .as_deref()
            .ok_or_else(|| eyre!("this command needs --signer-url"))?;
        let service = SignerService::new(url, self.gateway.clone())?;

        let presence =
            WalletPresence::spawn(Arc::new(service), self.config.timeouts.presence_poll());
        let snapshot = presence.connect().await?;
        if let Some(network) = snapshot.network {
            if network != self.network() {
                warn!(?network, api = ?self.network(), "signer is on another network");
            }
        }

        let local = presence.signer(self.config.timeouts.local_sign());
        let signer = select_signer(local, None).ok_or(SwapError::WalletNotReady)?;
        info!(address = %signer.address(), kind = signer.kind(), "signer ready");
        Ok((signer, presence))
    }

    pub fn token(&self, needle: &str) -> eyre::Result<TokenInfo> {
        self.config
            .token(needle)
            .cloned()
            .ok_or_else(|| eyre!("unknown token {needle}, add it to the token list first"))
    }

    async fn owner(&self, owner: Option<TronAddress>) -> eyre::Result<TronAddress> {
        match owner {
            Some(owner) => Ok(owner),
            None => {
                let (signer, mut presence) = self.signer().await?;
                presence.shutdown().await;
                Ok(*signer.address())
            }
        }
    }
}

impl Cli {
    pub(crate) async fn run(
        self,
        config: Config,
        shutdown_token: CancellationToken,
    ) -> eyre::Result<()> {
        let app = App::build(config, self.signer_url)?;
        info!(
            api = %app.config.chain.api_url,
            router = %app.config.chain.router,
            network = ?app.network(),
            "chain gateway ready"
        );

        select! {
            () = shutdown_token.cancelled() => Err(eyre!("interrupted")),
            res = self.command.run(&app) => res,
        }
    }
}

impl Commands {
    async fn run(self, app: &App) -> eyre::Result<()> {
        match self {
            Commands::Tokens(cmd) => cmd.run(app).await,
            Commands::Quote(args) => trade::quote(app, &args).await,
            Commands::Balance(args) => {
                let token = app.token(&args.token)?;
                let owner = app.owner(args.owner).await?;
                let balance = app.gateway.query_balance(&token.address, &owner).await;
                println!("{} {}", token.format_amount(&balance), token.symbol);
                Ok(())
            }
            Commands::Allowance(args) => {
                let token = app.token(&args.token)?;
                let owner = app.owner(args.owner).await?;
                let allowance = app
                    .gateway
                    .query_allowance(&token.address, &owner, &app.config.chain.router)
                    .await;
                println!(
                    "{} {} approved for router {}",
                    token.format_amount(&allowance),
                    token.symbol,
                    app.config.chain.router
                );
                Ok(())
            }
            Commands::Approve(cmd) => cmd.run(app).await,
            Commands::Swap(args) => trade::swap(app, &args).await,
            Commands::TxStatus(cmd) => cmd.run(app).await,
        }
    }
}

impl TxStatus {
    async fn run(&self, app: &App) -> eyre::Result<()> {
        let url = app.network().explorer_tx_url(&self.txid);
        if self.wait {
            let status = poll_transaction(app.gateway.as_ref(), &self.txid, &app.config.poll).await;
            println!("{status}: {url}");
            return Ok(());
        }

        let info = app.gateway.transaction_info(&self.txid).await?;
        let outcome = info.as_ref().map(|info| info.outcome());
        match outcome {
            Some(ReceiptOutcome::Success) => println!("success: {url}"),
            Some(ReceiptOutcome::Failed) => {
                let reason = info
                    .and_then(|info| info.res_message)
                    .map(|message| decode_node_message(&message))
                    .unwrap_or_default();
                println!("error {reason}: {url}");
            }
            Some(ReceiptOutcome::Pending) | None => println!("pending: {url}"),
        }
        Ok(())
    }
}
