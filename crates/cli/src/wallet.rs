//! Injected wallet backed by a local signing service reached over HTTP.
//!
//! The service keeps the keys and exposes `GET /status`, `POST /accounts`
//! and `POST /sign`. Broadcasting and receipts go through the chain gateway.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};
use trcswap_core::{
    SwapError,
    address::TronAddress,
    error::Result,
    gateway::{ChainGateway, SignedTransaction, TransactionInfo, UnsignedTransaction},
    signer::{InjectedWallet, WalletBroadcast},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default)]
    ready: bool,
    address: Option<String>,
    full_node_host: Option<String>,
}

pub(crate) struct SignerService {
    client: reqwest::Client,
    base_url: String,
    gateway: Arc<dyn ChainGateway>,
}

impl SignerService {
    pub(crate) fn new(base_url: &str, gateway: Arc<dyn ChainGateway>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            gateway,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn status(&self) -> Result<StatusResponse> {
        let response = self
            .client
            .get(self.url("status"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Status, or the empty one when the service is unreachable.
    async fn status_or_default(&self) -> StatusResponse {
        self.status().await.unwrap_or_else(|e| {
            debug!(error = %e, "signing service unavailable");
            StatusResponse::default()
        })
    }
}

/// Maps a gateway broadcast to what an injected wallet reports.
fn wallet_broadcast(result: Result<String>) -> Result<WalletBroadcast> {
    match result {
        Ok(txid) => Ok(WalletBroadcast {
            result: true,
            txid: Some(txid),
            ..Default::default()
        }),
        Err(SwapError::BroadcastFailed(message)) => Ok(WalletBroadcast {
            result: false,
            message: Some(message),
            ..Default::default()
        }),
        Err(e) => Err(e),
    }
}

/// The service answers 403 or 409 when the user declines. Anything else is a
/// fault of the service itself.
fn sign_failure(status: StatusCode, body: &str) -> SwapError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::CONFLICT => {
            SwapError::UserRejected(format!("{status}: {body}"))
        }
        _ => SwapError::NetworkUnreachable(format!("signing service replied {status}: {body}")),
    }
}

fn parse_address(status: &StatusResponse) -> Option<TronAddress> {
    status.address.as_deref()?.parse().ok()
}

#[async_trait]
impl InjectedWallet for SignerService {
    async fn is_ready(&self) -> bool {
        let status = self.status_or_default().await;
        status.ready && parse_address(&status).is_some()
    }

    async fn default_address(&self) -> Option<TronAddress> {
        parse_address(&self.status_or_default().await)
    }

    async fn full_node_host(&self) -> Option<String> {
        self.status_or_default().await.full_node_host
    }

    async fn request_accounts(&self) -> Result<()> {
        self.client
            .post(self.url("accounts"))
            .send()
            .await?
            .error_for_status()
            .map_err(|_| SwapError::WalletNotReady)?;
        Ok(())
    }

    #[instrument(skip_all, fields(tx.id = %tx.txid))]
    async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction> {
        let response = self.client.post(self.url("sign")).json(tx).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(sign_failure(status, &body));
        }

        let signed: SignedTransaction = response
            .json()
            .await
            .map_err(|e| SwapError::DataMalformed(format!("signing service reply: {e}")))?;
        if signed.signature.is_empty() {
            return Err(SwapError::SignatureMissing);
        }
        Ok(signed)
    }

    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<WalletBroadcast> {
        wallet_broadcast(self.gateway.broadcast(tx).await)
    }

    async fn transaction_info(&self, txid: &str) -> Result<Option<TransactionInfo>> {
        self.gateway.transaction_info(txid).await
    }
}
