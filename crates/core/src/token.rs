use std::fmt::{self, Display};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
    address::TronAddress,
    units::{from_base_units, to_base_units},
};

pub const USDT_ADDRESS: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
pub const WTRX_ADDRESS: &str = "TNUC9Qb1rRpS5CbWLmNMxXBjyFoydXjWFR";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: TronAddress,
    pub symbol: String,
    pub decimals: u32,
}

impl TokenInfo {
    pub fn parse_amount(&self, value: &str) -> BigUint {
        to_base_units(value, self.decimals)
    }

    pub fn format_amount(&self, amount: &BigUint) -> String {
        from_base_units(amount, self.decimals)
    }
}

impl Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Looks a token up by symbol (case insensitive) or by address.
pub fn find_token<'a>(tokens: &'a [TokenInfo], needle: &str) -> Option<&'a TokenInfo> {
    let symbol = needle.to_ascii_uppercase();
    tokens
        .iter()
        .find(|token| token.symbol.to_ascii_uppercase() == symbol)
        .or_else(|| {
            let addr: TronAddress = needle.parse().ok()?;
            tokens.iter().find(|token| token.address == addr)
        })
}

pub fn default_token_list() -> Vec<TokenInfo> {
    [(USDT_ADDRESS, "USDT"), (WTRX_ADDRESS, "WTRX")]
        .into_iter()
        .filter_map(|(address, symbol)| {
            Some(TokenInfo {
                address: address.parse().ok()?,
                symbol: symbol.to_string(),
                decimals: 6,
            })
        })
        .collect()
}
