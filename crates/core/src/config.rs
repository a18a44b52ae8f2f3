use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{
    address::TronAddress,
    token::{TokenInfo, USDT_ADDRESS, default_token_list},
};

pub const DEFAULT_API_URL: &str = "https://api.trongrid.io";
pub const ROUTER_ADDRESS: &str = "TNJVzGqKBWkJxJB5XYSqGAwUTV15U24pPq";
/// Base58 of the all-zero address, used as caller for quotes without a wallet.
pub const PLACEHOLDER_CALLER: &str = "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub chain: ChainConfig,

    pub swap: SwapConfig,

    pub timeouts: TimeoutConfig,

    pub poll: PollConfig,

    /// Tokens offered for selection
    pub tokens: Vec<TokenInfo>,

    /// Relay session settings, only needed for the remote signer
    #[serde(default)]
    pub relay: Option<RelayConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain API base URL
    pub api_url: String,

    /// Sent as `TRON-PRO-API-KEY` when present
    #[serde(default)]
    pub api_key: Option<String>,

    /// Swap router contract
    pub router: TronAddress,

    /// Hop token for pairs that do not contain it
    pub intermediary: TronAddress,

    /// Caller address for constant calls when no wallet is connected
    pub quote_caller: TronAddress,

    /// Maximum fee burned per contract call, in sun
    pub fee_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapConfig {
    pub slippage_bps: u64,

    pub deadline_secs: u64,

    /// Quiet period before a quote is fetched
    pub quote_debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Allowance and balance queries
    pub query_secs: u64,

    pub build_secs: u64,

    pub local_sign_secs: u64,

    pub remote_sign_secs: u64,

    /// Interval for checking whether an injected wallet is available
    pub presence_poll_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_ms: u64,

    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub project_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            swap: SwapConfig::default(),
            timeouts: TimeoutConfig::default(),
            poll: PollConfig::default(),
            tokens: default_token_list(),
            relay: None,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            router: known(ROUTER_ADDRESS),
            intermediary: known(USDT_ADDRESS),
            quote_caller: known(PLACEHOLDER_CALLER),
            fee_limit: 150_000_000,
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 50,
            deadline_secs: 1200,
            quote_debounce_ms: 600,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            query_secs: 10,
            build_secs: 15,
            local_sign_secs: 60,
            remote_sign_secs: 120,
            presence_poll_ms: 1500,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_attempts: 30,
        }
    }
}

impl SwapConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn quote_debounce(&self) -> Duration {
        Duration::from_millis(self.quote_debounce_ms)
    }
}

impl TimeoutConfig {
    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_secs)
    }

    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_secs)
    }

    pub fn local_sign(&self) -> Duration {
        Duration::from_secs(self.local_sign_secs)
    }

    pub fn remote_sign(&self) -> Duration {
        Duration::from_secs(self.remote_sign_secs)
    }

    pub fn presence_poll(&self) -> Duration {
        Duration::from_millis(self.presence_poll_ms)
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// only called with the constants above
fn known(address: &str) -> TronAddress {
    address
        .parse()
        .unwrap_or_else(|_| TronAddress::from_evm(Default::default()))
}

impl Config {
    /// Load configuration from defaults, `trcswap.yaml` and `TRCSWAP_`
    /// prefixed environment variables, later sources winning.
    pub fn load() -> Result<Self, figment::Error> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file("trcswap.yaml"))
            .merge(Env::prefixed("TRCSWAP_").split("__"))
            .extract()?;

        Ok(config)
    }

    pub fn token(&self, needle: &str) -> Option<&TokenInfo> {
        crate::token::find_token(&self.tokens, needle)
    }
}
