//! Read-only access to the chain API: quotes, allowances, balances,
//! unsigned transaction assembly, broadcast and receipt lookups.
use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Zero as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    abi::EncodedCall,
    address::TronAddress,
    error::{Result, SwapError},
    router::Path,
};

mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use self::http::TronGridGateway;

/// An unsigned transaction as assembled by the node. Everything except the
/// id and raw data is treated as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    #[serde(rename = "txID")]
    pub txid: String,
    pub raw_data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Protobuf bytes of `raw_data`, kept so the hex form can be rebuilt.
    #[serde(skip)]
    pub raw_bytes: Option<Vec<u8>>,
}

impl UnsignedTransaction {
    /// Fills `raw_bytes` from `raw_data_hex` when the latter is well formed.
    pub fn with_raw_bytes(mut self) -> Self {
        if self.raw_bytes.is_none() {
            self.raw_bytes = self
                .raw_data_hex
                .as_deref()
                .and_then(|hex| hex::decode(hex).ok());
        }
        self
    }

    /// Rebuilds `raw_data_hex` from `raw_bytes` if it is missing. Returns
    /// whether the field is present afterwards.
    pub fn ensure_raw_data_hex(&mut self) -> bool {
        if self.raw_data_hex.is_none() {
            self.raw_data_hex = self.raw_bytes.as_ref().map(hex::encode);
        }
        self.raw_data_hex.is_some()
    }
}

/// An [`UnsignedTransaction`] with the signatures attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: UnsignedTransaction,
    pub signature: Vec<String>,
}

impl SignedTransaction {
    pub fn txid(&self) -> &str {
        &self.transaction.txid
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallRequest {
    pub contract: TronAddress,
    pub call: EncodedCall,
    pub owner: TronAddress,
    pub fee_limit: u64,
    pub call_value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub energy_usage_total: Option<u64>,
    #[serde(default)]
    pub net_usage: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "blockNumber")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub receipt: Option<Receipt>,
    #[serde(default, rename = "resMessage")]
    pub res_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    Success,
    Failed,
    Pending,
}

impl TransactionInfo {
    pub fn outcome(&self) -> ReceiptOutcome {
        match self.receipt.as_ref().and_then(|r| r.result.as_deref()) {
            Some("SUCCESS") => ReceiptOutcome::Success,
            Some("FAILED") => ReceiptOutcome::Failed,
            _ => ReceiptOutcome::Pending,
        }
    }
}

/// Every non-signing interaction with the chain.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Router `getAmountsOut`; `caller` falls back to a placeholder address.
    async fn query_amounts_out(
        &self,
        amount_in: &BigUint,
        path: &Path,
        caller: Option<&TronAddress>,
    ) -> Result<Vec<BigUint>>;

    /// Router `getAmountsIn`; `caller` falls back to a placeholder address.
    async fn query_amounts_in(
        &self,
        amount_out: &BigUint,
        path: &Path,
        caller: Option<&TronAddress>,
    ) -> Result<Vec<BigUint>>;

    /// Current allowance, zero on timeout or failure.
    async fn query_allowance(
        &self,
        token: &TronAddress,
        owner: &TronAddress,
        spender: &TronAddress,
    ) -> BigUint;

    /// Current balance, zero on timeout or failure.
    async fn query_balance(&self, token: &TronAddress, owner: &TronAddress) -> BigUint;

    async fn query_decimals(&self, token: &TronAddress) -> Result<u32>;

    async fn query_symbol(&self, token: &TronAddress) -> Result<String>;

    async fn build_contract_call(&self, request: &ContractCallRequest)
    -> Result<UnsignedTransaction>;

    /// Posts a signed transaction, returning its id.
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String>;

    /// `None` while the node has no record of the transaction yet.
    async fn transaction_info(&self, txid: &str) -> Result<Option<TransactionInfo>>;
}

/// Awaits a state query with a deadline, degrading to zero so that callers
/// gate on the safe side (approval required, nothing spendable).
pub async fn zero_on_failure<F>(what: &str, limit: Duration, query: F) -> BigUint
where
    F: Future<Output = Result<BigUint>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!(error = %e, query = what, "query failed, assuming zero");
            BigUint::zero()
        }
        Err(_) => {
            warn!(query = what, timeout_secs = limit.as_secs(), "query timed out, assuming zero");
            BigUint::zero()
        }
    }
}

/// Error messages come back hex encoded. Decodes to text when the bytes are
/// printable, otherwise returns the input unchanged.
pub fn decode_node_message(message: &str) -> String {
    let trimmed = message.trim().trim_start_matches("0x");
    let Ok(bytes) = hex::decode(trimmed) else {
        return message.to_string();
    };
    match String::from_utf8(bytes) {
        Ok(text)
            if !text.is_empty()
                && text.chars().all(|c| !c.is_control() || c.is_whitespace()) =>
        {
            text
        }
        _ => message.to_string(),
    }
}
