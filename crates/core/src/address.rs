use std::{
    fmt::{self, Display},
    str::FromStr,
};

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SwapError;

/// Mainnet address prefix byte.
pub const ADDRESS_PREFIX: u8 = 0x41;

/// A TRON account identifier: the `0x41` prefix followed by the 20 byte
/// account hash. Rendered as base58check (`T...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    pub fn from_evm(addr: Address) -> Self {
        let mut bytes = [0u8; 21];
        bytes[0] = ADDRESS_PREFIX;
        bytes[1..].copy_from_slice(addr.as_slice());
        Self(bytes)
    }

    /// The 20 byte form used inside ABI encoded parameters.
    pub fn to_evm(&self) -> Address {
        Address::from_slice(&self.0[1..])
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// `41`-prefixed hex form, as returned by the node when `visible` is false.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn from_bytes(bytes: &[u8], raw: &str) -> Result<Self, SwapError> {
        let bytes: [u8; 21] = bytes
            .try_into()
            .map_err(|_| SwapError::InvalidAddress(raw.to_string()))?;
        if bytes[0] != ADDRESS_PREFIX {
            return Err(SwapError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl FromStr for TronAddress {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('T') {
            let bytes = bs58::decode(s)
                .with_check(None)
                .into_vec()
                .map_err(|_| SwapError::InvalidAddress(s.to_string()))?;
            return Self::from_bytes(&bytes, s);
        }

        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|_| SwapError::InvalidAddress(s.to_string()))?;
        Self::from_bytes(&bytes, s)
    }
}

impl Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl Serialize for TronAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for TronAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
    const USDT_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

    #[test]
    fn test_base58_round_trip() {
        let addr: TronAddress = USDT.parse().expect("valid address");
        assert_eq!(addr.to_base58(), USDT);
        assert_eq!(addr.to_hex(), USDT_HEX);
    }

    #[test]
    fn test_parses_hex_form() {
        let from_hex: TronAddress = USDT_HEX.parse().expect("valid hex address");
        let from_b58: TronAddress = USDT.parse().expect("valid address");
        assert_eq!(from_hex, from_b58);
    }

    #[test]
    fn test_evm_conversion_drops_prefix() {
        let addr: TronAddress = USDT.parse().expect("valid address");
        let evm = addr.to_evm();
        assert_eq!(hex::encode(evm.as_slice()), &USDT_HEX[2..]);
        assert_eq!(TronAddress::from_evm(evm), addr);
    }

    #[test]
    fn test_rejects_bad_checksum_and_prefix() {
        assert!("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u".parse::<TronAddress>().is_err());
        assert!("a614f803b6fd780986a42c78ec9c7f77e6ded13c".parse::<TronAddress>().is_err());
        assert!("".parse::<TronAddress>().is_err());
    }

    #[test]
    fn test_serde_uses_base58() {
        let addr: TronAddress = USDT.parse().expect("valid address");
        let json = serde_json::to_string(&addr).expect("serializes");
        assert_eq!(json, format!("\"{USDT}\""));
        let back: TronAddress = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, addr);
    }
}
