use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Relay chain id for TRON mainnet.
pub const MAINNET_RELAY_CHAIN: &str = "tron:0x2b6653dc";
pub const SHASTA_RELAY_CHAIN: &str = "tron:0x94a9059e";
pub const NILE_RELAY_CHAIN: &str = "tron:0xcd8690dc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Mainnet,
    Shasta,
    Nile,
    Custom,
}

impl Network {
    /// Identifies the network an injected wallet is pointed at from its full
    /// node host.
    pub fn from_node_host(host: &str) -> Self {
        if host.contains("trongrid.io") && !host.contains("shasta") && !host.contains("nile") {
            Network::Mainnet
        } else if host.contains("shasta") {
            Network::Shasta
        } else if host.contains("nile") {
            Network::Nile
        } else {
            Network::Custom
        }
    }

    /// Identifies the network of a relay account (`tron:<chain>:<address>`).
    /// Unknown chains are assumed to be mainnet.
    pub fn from_relay_account(account: &str) -> Self {
        if account.contains("0x2b6653dc") {
            Network::Mainnet
        } else if account.contains("shasta") || account.contains("0x94a9059e") {
            Network::Shasta
        } else if account.contains("nile") || account.contains("0xcd8690dc") {
            Network::Nile
        } else {
            Network::Mainnet
        }
    }

    pub fn relay_chain_id(&self) -> &'static str {
        match self {
            Network::Shasta => SHASTA_RELAY_CHAIN,
            Network::Nile => NILE_RELAY_CHAIN,
            Network::Mainnet | Network::Custom => MAINNET_RELAY_CHAIN,
        }
    }

    pub fn explorer_tx_url(&self, txid: &str) -> String {
        match self {
            Network::Shasta => format!("https://shasta.tronscan.org/#/transaction/{txid}"),
            Network::Nile => format!("https://nile.tronscan.org/#/transaction/{txid}"),
            Network::Mainnet | Network::Custom => {
                format!("https://tronscan.org/#/transaction/{txid}")
            }
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "tron-mainnet"),
            Network::Shasta => write!(f, "tron-shasta"),
            Network::Nile => write!(f, "tron-nile"),
            Network::Custom => write!(f, "tron-custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_host() {
        assert_eq!(Network::from_node_host("https://api.trongrid.io"), Network::Mainnet);
        assert_eq!(Network::from_node_host("https://api.shasta.trongrid.io"), Network::Shasta);
        assert_eq!(Network::from_node_host("https://nile.trongrid.io"), Network::Nile);
        assert_eq!(Network::from_node_host("http://127.0.0.1:9090"), Network::Custom);
    }

    #[test]
    fn test_network_from_relay_account() {
        let account = "tron:0x2b6653dc:TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
        assert_eq!(Network::from_relay_account(account), Network::Mainnet);
        assert_eq!(Network::from_relay_account("tron:0xcd8690dc:T..."), Network::Nile);
        assert_eq!(Network::from_relay_account("tron:unknown:T..."), Network::Mainnet);
        assert_eq!(Network::Mainnet.relay_chain_id(), MAINNET_RELAY_CHAIN);
    }

    #[test]
    fn test_display() {
        assert_eq!(Network::Mainnet.to_string(), "tron-mainnet");
        assert_eq!(
            Network::Mainnet.explorer_tx_url("abc"),
            "https://tronscan.org/#/transaction/abc"
        );
    }
}
