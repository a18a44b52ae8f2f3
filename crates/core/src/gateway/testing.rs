use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Zero as _;

use super::{
    ChainGateway, ContractCallRequest, Receipt, SignedTransaction, TransactionInfo,
    UnsignedTransaction,
};
use crate::{
    abi,
    address::TronAddress,
    error::{Result, SwapError},
    router::Path,
};

/// In-memory chain used by the engine, signer and poller tests.
///
/// Approvals built through it take effect when broadcast, and receipts report
/// success unless a script was queued.
#[derive(Default)]
pub(crate) struct FakeGateway {
    pub state: Mutex<FakeState>,
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub amounts_out: Option<Vec<BigUint>>,
    pub amounts_in: Option<Vec<BigUint>>,
    pub quote_error: Option<SwapError>,
    /// Simulated latency of quote calls
    pub quote_delay: Option<std::time::Duration>,
    pub quote_requests: Vec<BigUint>,
    pub quote_callers: Vec<Option<TronAddress>>,

    pub allowances: HashMap<TronAddress, BigUint>,
    pub allowance_queries: usize,

    pub build_error: Option<SwapError>,
    pub builds: Vec<ContractCallRequest>,
    pub broadcast_error: Option<SwapError>,
    pub broadcasts: Vec<SignedTransaction>,
    /// When set, broadcast approvals never change the allowance
    pub ignore_approvals: bool,

    pub receipts: VecDeque<Result<Option<TransactionInfo>>>,
    pub info_requests: usize,

    pending_approvals: HashMap<String, (TronAddress, BigUint)>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F: FnOnce(&mut FakeState)>(self, f: F) -> Self {
        f(&mut self.state.lock().expect("lock"));
        self
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("lock")
    }

    async fn record_quote(&self, amount: &BigUint, caller: Option<&TronAddress>) -> Result<()> {
        let delay = {
            let mut state = self.lock();
            state.quote_requests.push(amount.clone());
            state.quote_callers.push(caller.copied());
            state.quote_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.lock().quote_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub(crate) fn success_receipt(txid: &str) -> TransactionInfo {
    receipt(txid, "SUCCESS")
}

pub(crate) fn failed_receipt(txid: &str) -> TransactionInfo {
    receipt(txid, "FAILED")
}

fn receipt(txid: &str, result: &str) -> TransactionInfo {
    TransactionInfo {
        id: Some(txid.to_string()),
        block_number: Some(1),
        receipt: Some(Receipt {
            result: Some(result.to_string()),
            ..Default::default()
        }),
        res_message: None,
    }
}

#[async_trait]
impl ChainGateway for FakeGateway {
    async fn query_amounts_out(
        &self,
        amount_in: &BigUint,
        _path: &Path,
        caller: Option<&TronAddress>,
    ) -> Result<Vec<BigUint>> {
        self.record_quote(amount_in, caller).await?;
        self.lock()
            .amounts_out
            .clone()
            .ok_or_else(|| SwapError::NoLiquidity("no pair".to_string()))
    }

    async fn query_amounts_in(
        &self,
        amount_out: &BigUint,
        _path: &Path,
        caller: Option<&TronAddress>,
    ) -> Result<Vec<BigUint>> {
        self.record_quote(amount_out, caller).await?;
        self.lock()
            .amounts_in
            .clone()
            .ok_or_else(|| SwapError::NoLiquidity("no pair".to_string()))
    }

    async fn query_allowance(
        &self,
        token: &TronAddress,
        _owner: &TronAddress,
        _spender: &TronAddress,
    ) -> BigUint {
        let mut state = self.lock();
        state.allowance_queries += 1;
        state.allowances.get(token).cloned().unwrap_or_else(BigUint::zero)
    }

    async fn query_balance(&self, _token: &TronAddress, _owner: &TronAddress) -> BigUint {
        BigUint::zero()
    }

    async fn query_decimals(&self, _token: &TronAddress) -> Result<u32> {
        Ok(6)
    }

    async fn query_symbol(&self, _token: &TronAddress) -> Result<String> {
        Ok("FAKE".to_string())
    }

    async fn build_contract_call(
        &self,
        request: &ContractCallRequest,
    ) -> Result<UnsignedTransaction> {
        let mut state = self.lock();
        if let Some(err) = state.build_error.clone() {
            return Err(err);
        }
        state.builds.push(request.clone());
        let txid = format!("tx-{}", state.builds.len());

        if request.call.function_selector == "approve(address,uint256)" {
            // spender word, then amount word
            let amount_word = request.call.parameter.get(64..).unwrap_or_default();
            let amount = abi::decode_uint256(amount_word)?;
            state
                .pending_approvals
                .insert(txid.clone(), (request.contract, amount));
        }

        Ok(UnsignedTransaction {
            txid,
            raw_data: serde_json::json!({
                "contract": [{ "parameter": { "value": { "data": request.call.parameter } } }],
            }),
            raw_data_hex: Some("0a02beef".to_string()),
            visible: Some(true),
            raw_bytes: None,
        }
        .with_raw_bytes())
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String> {
        let mut state = self.lock();
        if let Some(err) = state.broadcast_error.clone() {
            return Err(err);
        }
        state.broadcasts.push(tx.clone());
        if let Some((token, amount)) = state.pending_approvals.remove(tx.txid()) {
            if !state.ignore_approvals {
                state.allowances.insert(token, amount);
            }
        }
        Ok(tx.txid().to_string())
    }

    async fn transaction_info(&self, txid: &str) -> Result<Option<TransactionInfo>> {
        let mut state = self.lock();
        state.info_requests += 1;
        state
            .receipts
            .pop_front()
            .unwrap_or_else(|| Ok(Some(success_receipt(txid))))
    }
}
