use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::{address::TronAddress, error::SwapError};

/// Ordered token hops of a swap. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TronAddress>")]
pub struct Path(Vec<TronAddress>);

impl TryFrom<Vec<TronAddress>> for Path {
    type Error = SwapError;

    fn try_from(hops: Vec<TronAddress>) -> Result<Self, Self::Error> {
        if hops.is_empty() {
            return Err(SwapError::DataMalformed("swap path has no hops".to_string()));
        }
        Ok(Path(hops))
    }
}

impl Path {
    pub fn hops(&self) -> &[TronAddress] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn token_in(&self) -> &TronAddress {
        &self.0[0]
    }

    pub fn token_out(&self) -> &TronAddress {
        &self.0[self.0.len() - 1]
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops: Vec<String> = self.0.iter().map(TronAddress::to_base58).collect();
        write!(f, "{}", hops.join(" -> "))
    }
}

/// Routes `token_in -> token_out`, going through `intermediary` unless either
/// side already is the intermediary.
pub fn build_path(
    token_in: &TronAddress,
    token_out: &TronAddress,
    intermediary: &TronAddress,
) -> Path {
    if token_in == token_out {
        return Path(vec![*token_in]);
    }
    if token_in == intermediary || token_out == intermediary {
        return Path(vec![*token_in, *token_out]);
    }
    Path(vec![*token_in, *intermediary, *token_out])
}
