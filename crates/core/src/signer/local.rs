//! Signing through a wallet injected into the host environment.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{select, sync::watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{
    address::TronAddress,
    chain::Network,
    error::{Result, SwapError},
    gateway::{SignedTransaction, TransactionInfo, UnsignedTransaction, decode_node_message},
};

/// Result of handing a signed transaction to the injected wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletBroadcast {
    pub result: bool,
    pub txid: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// The wallet object a browser extension (or a local signing service)
/// exposes. It holds the keys; this crate never does.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InjectedWallet: Send + Sync {
    /// Whether the wallet is unlocked and has an account selected.
    async fn is_ready(&self) -> bool;

    async fn default_address(&self) -> Option<TronAddress>;

    /// Host of the full node the wallet is pointed at.
    async fn full_node_host(&self) -> Option<String>;

    /// `tron_requestAccounts`
    async fn request_accounts(&self) -> Result<()>;

    async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction>;

    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<WalletBroadcast>;

    async fn transaction_info(&self, txid: &str) -> Result<Option<TransactionInfo>>;
}

#[derive(Clone)]
pub struct LocalSigner {
    address: TronAddress,
    wallet: Arc<dyn InjectedWallet>,
    timeout: Duration,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    pub fn new(address: TronAddress, wallet: Arc<dyn InjectedWallet>, timeout: Duration) -> Self {
        Self {
            address,
            wallet,
            timeout,
        }
    }

    pub fn address(&self) -> &TronAddress {
        &self.address
    }

    /// Signs and broadcasts through the wallet itself, bounded by the sign
    /// timeout.
    #[instrument(skip_all, fields(signer = "local", tx.id = %tx.txid))]
    pub async fn sign_and_broadcast(&self, tx: UnsignedTransaction) -> Result<String> {
        let attempt = async {
            let signed = self.wallet.sign(&tx).await?;
            debug!(signatures = signed.signature.len(), "wallet signed transaction");
            let broadcast = self.wallet.send_raw_transaction(&signed).await?;
            accepted_txid(broadcast)
        };

        let txid = tokio::time::timeout(self.timeout, attempt)
            .await
            .map_err(|_| SwapError::SignTimeout(self.timeout))??;
        info!(tx.id = %txid, "transaction broadcast by injected wallet");
        Ok(txid)
    }
}

fn accepted_txid(broadcast: WalletBroadcast) -> Result<String> {
    match broadcast.txid {
        Some(txid) if broadcast.result && !txid.is_empty() => Ok(txid),
        _ => {
            let reason = broadcast
                .message
                .as_deref()
                .map(decode_node_message)
                .or(broadcast.code)
                .unwrap_or_else(|| "wallet returned no transaction id".to_string());
            Err(SwapError::BroadcastFailed(reason))
        }
    }
}

/// What the injected wallet currently exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub address: Option<TronAddress>,
    pub network: Option<Network>,
}

impl WalletSnapshot {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}

async fn snapshot(wallet: &dyn InjectedWallet) -> WalletSnapshot {
    if !wallet.is_ready().await {
        return WalletSnapshot::default();
    }
    WalletSnapshot {
        address: wallet.default_address().await,
        network: wallet
            .full_node_host()
            .await
            .map(|host| Network::from_node_host(&host)),
    }
}

/// Tracks the injected wallet's account and network by polling, as a
/// fallback for wallets that do not emit change events.
pub struct WalletPresence {
    wallet: Arc<dyn InjectedWallet>,
    shutdown_token: CancellationToken,
    worker_handle: Option<tokio::task::JoinHandle<()>>,
    snapshot_tx: watch::Sender<WalletSnapshot>,
    snapshot_rx: watch::Receiver<WalletSnapshot>,
}

impl WalletPresence {
    pub fn spawn(wallet: Arc<dyn InjectedWallet>, interval: Duration) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(WalletSnapshot::default());
        let shutdown_token = CancellationToken::new();

        let worker = Worker {
            wallet: wallet.clone(),
            interval,
            snapshot_tx: snapshot_tx.clone(),
            shutdown_token: shutdown_token.clone(),
        };
        let worker_handle = tokio::spawn(worker.run());

        Self {
            wallet,
            shutdown_token,
            worker_handle: Some(worker_handle),
            snapshot_tx,
            snapshot_rx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn current(&self) -> WalletSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Re-reads the wallet immediately, e.g. on an account change event.
    pub async fn refresh(&self) -> WalletSnapshot {
        let next = snapshot(self.wallet.as_ref()).await;
        self.snapshot_tx.send_if_modified(|current| replace(current, next.clone()));
        next
    }

    /// Asks the wallet to expose its accounts, then refreshes.
    pub async fn connect(&self) -> Result<WalletSnapshot> {
        self.wallet.request_accounts().await?;
        Ok(self.refresh().await)
    }

    /// Signer for the currently selected account, if any.
    pub fn signer(&self, timeout: Duration) -> Option<LocalSigner> {
        let address = self.snapshot_rx.borrow().address?;
        Some(LocalSigner::new(address, self.wallet.clone(), timeout))
    }

    pub async fn shutdown(&mut self) {
        self.shutdown_token.cancel();
        if let Some(handle) = self.worker_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(%e, "wallet presence worker panicked");
            }
        }
    }
}

fn replace(current: &mut WalletSnapshot, next: WalletSnapshot) -> bool {
    if *current == next {
        return false;
    }
    *current = next;
    true
}

struct Worker {
    wallet: Arc<dyn InjectedWallet>,
    interval: Duration,
    snapshot_tx: watch::Sender<WalletSnapshot>,
    shutdown_token: CancellationToken,
}

impl Worker {
    #[instrument(name = "wallet_presence", skip_all)]
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            select! {
                () = self.shutdown_token.cancelled() => {
                    debug!("wallet presence received shutdown signal");
                    return;
                }
                _ = ticker.tick() => {
                    let next = snapshot(self.wallet.as_ref()).await;
                    let changed = self
                        .snapshot_tx
                        .send_if_modified(|current| replace(current, next.clone()));
                    if changed {
                        info!(
                            address = ?next.address.map(|a| a.to_base58()),
                            network = ?next.network,
                            "injected wallet changed"
                        );
                    }
                }
            }
        }
    }
}
