use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{
    ChainGateway, ContractCallRequest, SignedTransaction, TransactionInfo, UnsignedTransaction,
    decode_node_message, zero_on_failure,
};
use crate::{
    abi::{self, CallOutput, EncodedCall},
    address::TronAddress,
    config::{ChainConfig, TimeoutConfig},
    error::{Result, SwapError},
    router::Path,
};

const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";
/// `Error(string)` revert selector.
const REVERT_SELECTOR: &str = "08c379a0";

/// [`ChainGateway`] backed by the TronGrid HTTP API.
#[derive(Debug, Clone)]
pub struct TronGridGateway {
    client: reqwest::Client,
    base_url: String,
    router: TronAddress,
    quote_caller: TronAddress,
    query_timeout: Duration,
    build_timeout: Duration,
}

impl TronGridGateway {
    pub fn new(chain: &ChainConfig, timeouts: &TimeoutConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = chain.api_key.as_deref() {
            let value = HeaderValue::from_str(key)
                .map_err(|e| SwapError::NetworkUnreachable(format!("invalid api key: {e}")))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: chain.api_url.trim_end_matches('/').to_string(),
            router: chain.router,
            quote_caller: chain.quote_caller,
            query_timeout: timeouts.query(),
            build_timeout: timeouts.build(),
        })
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<R>().await?)
    }

    #[instrument(skip_all, fields(contract = %contract, function = %call.function_selector))]
    async fn constant_call(
        &self,
        contract: &TronAddress,
        call: &EncodedCall,
        caller: Option<&TronAddress>,
    ) -> Result<CallOutput> {
        let owner = caller.unwrap_or(&self.quote_caller);
        let body = TriggerRequest {
            owner_address: owner.to_base58(),
            contract_address: contract.to_base58(),
            function_selector: &call.function_selector,
            parameter: &call.parameter,
            fee_limit: None,
            call_value: None,
            visible: true,
        };
        let response: ConstantResponse = self.post("wallet/triggerconstantcontract", &body).await?;
        response.into_output()
    }

    async fn quote(
        &self,
        call: EncodedCall,
        path: &Path,
        caller: Option<&TronAddress>,
    ) -> Result<Vec<BigUint>> {
        let amounts = self
            .constant_call(&self.router, &call, caller)
            .await?
            .into_amounts()?;
        if amounts.len() != path.len() {
            return Err(SwapError::DataMalformed(format!(
                "router returned {} amounts for a path of {} tokens",
                amounts.len(),
                path.len()
            )));
        }
        Ok(amounts)
    }
}

#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
    owner_address: String,
    contract_address: String,
    function_selector: &'a str,
    parameter: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_value: Option<u64>,
    visible: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResult {
    #[serde(default)]
    result: bool,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiResult {
    fn describe(&self) -> String {
        let message = self.message.as_deref().map(decode_node_message);
        match (self.code.as_deref(), message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(code), None) => code.to_string(),
            (None, Some(message)) => message,
            (None, None) => "unknown node error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConstantResponse {
    #[serde(default)]
    result: ApiResult,
    #[serde(default)]
    constant_result: Vec<String>,
    #[serde(default)]
    transaction: Option<Value>,
}

impl ConstantResponse {
    fn reverted(&self) -> bool {
        self.transaction
            .as_ref()
            .and_then(|tx| tx.pointer("/ret/0/ret"))
            .and_then(Value::as_str)
            .is_some_and(|ret| ret == "REVERT" || ret == "FAILED")
    }

    fn into_output(self) -> Result<CallOutput> {
        if !self.result.result {
            return Err(SwapError::NoLiquidity(self.result.describe()));
        }
        let reverted = self.reverted();
        let payload = self.constant_result.into_iter().next().unwrap_or_default();
        if reverted || payload.starts_with(REVERT_SELECTOR) {
            return Err(SwapError::NoLiquidity(revert_reason(&payload)));
        }
        if payload.is_empty() {
            return Err(SwapError::NoLiquidity("empty constant result".to_string()));
        }
        Ok(CallOutput::Raw(payload))
    }
}

/// Extracts the reason string from `Error(string)` revert data.
fn revert_reason(payload: &str) -> String {
    payload
        .strip_prefix(REVERT_SELECTOR)
        .and_then(|data| abi::decode_string(data).ok())
        .unwrap_or_else(|| "execution reverted".to_string())
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    #[serde(default)]
    result: ApiResult,
    #[serde(default)]
    transaction: Option<UnsignedTransaction>,
}

impl BuildResponse {
    fn into_transaction(self) -> Result<UnsignedTransaction> {
        if !self.result.result {
            return Err(SwapError::BuildFailed(self.result.describe()));
        }
        let tx = self
            .transaction
            .ok_or_else(|| SwapError::BuildFailed("response carried no transaction".to_string()))?;
        Ok(tx.with_raw_bytes())
    }
}

/// Bounds a trigger request by `limit`. Unparsable replies count as a
/// failed build.
async fn within_build_timeout<F>(limit: Duration, request: F) -> Result<BuildResponse>
where
    F: Future<Output = Result<BuildResponse>>,
{
    tokio::time::timeout(limit, request)
        .await
        .map_err(|_| SwapError::BuildTimeout(limit))?
        .map_err(|e| match e {
            SwapError::DataMalformed(reason) => SwapError::BuildFailed(reason),
            other => other,
        })
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    #[serde(default)]
    result: bool,
    #[serde(default)]
    txid: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl BroadcastResponse {
    fn into_txid(self, fallback: &str) -> Result<String> {
        if self.result {
            return Ok(self.txid.unwrap_or_else(|| fallback.to_string()));
        }
        let reason = ApiResult {
            result: false,
            code: self.code,
            message: self.message,
        }
        .describe();
        Err(SwapError::BroadcastFailed(reason))
    }
}

#[derive(Debug, Serialize)]
struct ValueRequest<'a> {
    value: &'a str,
}

#[async_trait]
impl ChainGateway for TronGridGateway {
    #[instrument(skip_all, fields(amount_in = %amount_in, path = %path))]
    async fn query_amounts_out(
        &self,
        amount_in: &BigUint,
        path: &Path,
        caller: Option<&TronAddress>,
    ) -> Result<Vec<BigUint>> {
        self.quote(abi::get_amounts_out(amount_in, path.hops())?, path, caller)
            .await
    }

    #[instrument(skip_all, fields(amount_out = %amount_out, path = %path))]
    async fn query_amounts_in(
        &self,
        amount_out: &BigUint,
        path: &Path,
        caller: Option<&TronAddress>,
    ) -> Result<Vec<BigUint>> {
        self.quote(abi::get_amounts_in(amount_out, path.hops())?, path, caller)
            .await
    }

    async fn query_allowance(
        &self,
        token: &TronAddress,
        owner: &TronAddress,
        spender: &TronAddress,
    ) -> BigUint {
        let call = abi::allowance(owner, spender);
        zero_on_failure("allowance", self.query_timeout, async {
            let output = self.constant_call(token, &call, Some(owner)).await?;
            raw_uint256(output)
        })
        .await
    }

    async fn query_balance(&self, token: &TronAddress, owner: &TronAddress) -> BigUint {
        let call = abi::balance_of(owner);
        zero_on_failure("balance", self.query_timeout, async {
            let output = self.constant_call(token, &call, Some(owner)).await?;
            raw_uint256(output)
        })
        .await
    }

    async fn query_decimals(&self, token: &TronAddress) -> Result<u32> {
        let output = self.constant_call(token, &abi::decimals(), None).await?;
        let decimals = raw_uint256(output)?;
        u32::try_from(&decimals)
            .map_err(|_| SwapError::DataMalformed(format!("decimals out of range: {decimals}")))
    }

    async fn query_symbol(&self, token: &TronAddress) -> Result<String> {
        match self.constant_call(token, &abi::symbol(), None).await? {
            CallOutput::Raw(hex) => abi::decode_string(&hex),
            CallOutput::Decoded(values) => values
                .into_iter()
                .next()
                .ok_or_else(|| SwapError::DataMalformed("empty symbol".to_string())),
        }
    }

    #[instrument(skip_all, fields(
        contract = %request.contract,
        owner = %request.owner,
        function = %request.call.function_selector,
    ))]
    async fn build_contract_call(
        &self,
        request: &ContractCallRequest,
    ) -> Result<UnsignedTransaction> {
        let body = TriggerRequest {
            owner_address: request.owner.to_base58(),
            contract_address: request.contract.to_base58(),
            function_selector: &request.call.function_selector,
            parameter: &request.call.parameter,
            fee_limit: Some(request.fee_limit),
            call_value: Some(request.call_value),
            visible: true,
        };

        let tx = within_build_timeout(
            self.build_timeout,
            self.post("wallet/triggersmartcontract", &body),
        )
        .await?
        .into_transaction()?;
        debug!(txid = %tx.txid, "built unsigned transaction");
        Ok(tx)
    }

    #[instrument(skip_all, fields(txid = %tx.txid()))]
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String> {
        let response: BroadcastResponse = self
            .post("wallet/broadcasttransaction", tx)
            .await
            .map_err(|e| match e {
                SwapError::NetworkUnreachable(reason) => SwapError::BroadcastFailed(reason),
                other => other,
            })?;
        let txid = response.into_txid(tx.txid()).inspect_err(|e| {
            warn!(error = %e, "broadcast rejected");
        })?;
        debug!("broadcast accepted");
        Ok(txid)
    }

    async fn transaction_info(&self, txid: &str) -> Result<Option<TransactionInfo>> {
        let info: TransactionInfo = self
            .post("wallet/gettransactioninfobyid", &ValueRequest { value: txid })
            .await?;
        // unknown transactions come back as `{}`
        if info.id.is_none() && info.receipt.is_none() {
            return Ok(None);
        }
        Ok(Some(info))
    }
}

fn raw_uint256(output: CallOutput) -> Result<BigUint> {
    match output {
        CallOutput::Raw(hex) => abi::decode_uint256(&hex),
        CallOutput::Decoded(values) => values
            .first()
            .and_then(|v| BigUint::parse_bytes(v.as_bytes(), 10))
            .ok_or_else(|| SwapError::DataMalformed("expected a single integer".to_string())),
    }
}
