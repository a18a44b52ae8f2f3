//! Call encoding for the router and token contracts, and decoding of the raw
//! hex payloads returned by constant calls.
use alloy::{
    primitives::{Address, U256},
    sol,
    sol_types::SolCall,
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
    address::TronAddress,
    error::{Result, SwapError},
};

// SunSwap V2 router, a Uniswap V2 fork
sol! {
    interface ISunswapRouter {
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
        function getAmountsIn(uint256 amountOut, address[] path) external view returns (uint256[] amounts);
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external returns (uint256[] amounts);
        function swapTokensForExactTokens(uint256 amountOut, uint256 amountInMax, address[] path, address to, uint256 deadline) external returns (uint256[] amounts);
    }
}

sol! {
    interface ITRC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

const WORD: usize = 32;

/// A contract call as the chain API expects it: the canonical function
/// signature plus the hex encoded arguments, without the 4 byte selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedCall {
    pub function_selector: String,
    pub parameter: String,
}

impl EncodedCall {
    pub fn new<C: SolCall>(call: &C) -> Self {
        let encoded = call.abi_encode();
        Self {
            function_selector: C::SIGNATURE.to_string(),
            parameter: hex::encode(&encoded[4..]),
        }
    }
}

pub fn get_amounts_out(amount_in: &BigUint, path: &[TronAddress]) -> Result<EncodedCall> {
    Ok(EncodedCall::new(&ISunswapRouter::getAmountsOutCall {
        amountIn: to_u256(amount_in)?,
        path: evm_path(path),
    }))
}

pub fn get_amounts_in(amount_out: &BigUint, path: &[TronAddress]) -> Result<EncodedCall> {
    Ok(EncodedCall::new(&ISunswapRouter::getAmountsInCall {
        amountOut: to_u256(amount_out)?,
        path: evm_path(path),
    }))
}

pub fn swap_exact_tokens_for_tokens(
    amount_in: &BigUint,
    amount_out_min: &BigUint,
    path: &[TronAddress],
    to: &TronAddress,
    deadline: u64,
) -> Result<EncodedCall> {
    Ok(EncodedCall::new(&ISunswapRouter::swapExactTokensForTokensCall {
        amountIn: to_u256(amount_in)?,
        amountOutMin: to_u256(amount_out_min)?,
        path: evm_path(path),
        to: to.to_evm(),
        deadline: U256::from(deadline),
    }))
}

pub fn swap_tokens_for_exact_tokens(
    amount_out: &BigUint,
    amount_in_max: &BigUint,
    path: &[TronAddress],
    to: &TronAddress,
    deadline: u64,
) -> Result<EncodedCall> {
    Ok(EncodedCall::new(&ISunswapRouter::swapTokensForExactTokensCall {
        amountOut: to_u256(amount_out)?,
        amountInMax: to_u256(amount_in_max)?,
        path: evm_path(path),
        to: to.to_evm(),
        deadline: U256::from(deadline),
    }))
}

pub fn allowance(owner: &TronAddress, spender: &TronAddress) -> EncodedCall {
    EncodedCall::new(&ITRC20::allowanceCall {
        owner: owner.to_evm(),
        spender: spender.to_evm(),
    })
}

pub fn approve(spender: &TronAddress, amount: &BigUint) -> Result<EncodedCall> {
    Ok(EncodedCall::new(&ITRC20::approveCall {
        spender: spender.to_evm(),
        value: to_u256(amount)?,
    }))
}

pub fn balance_of(owner: &TronAddress) -> EncodedCall {
    EncodedCall::new(&ITRC20::balanceOfCall {
        account: owner.to_evm(),
    })
}

pub fn decimals() -> EncodedCall {
    EncodedCall::new(&ITRC20::decimalsCall {})
}

pub fn symbol() -> EncodedCall {
    EncodedCall::new(&ITRC20::symbolCall {})
}

fn evm_path(path: &[TronAddress]) -> Vec<Address> {
    path.iter().map(TronAddress::to_evm).collect()
}

pub fn to_u256(amount: &BigUint) -> Result<U256> {
    U256::try_from_be_slice(&amount.to_bytes_be())
        .ok_or_else(|| SwapError::DataMalformed(format!("{amount} does not fit in uint256")))
}

pub fn from_u256(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32usize>())
}

/// Output of a constant call. Higher level contract libraries hand back
/// already decoded values; the raw endpoint hands back hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    Raw(String),
    Decoded(Vec<String>),
}

impl CallOutput {
    /// Decodes a `uint256[]` return into amounts.
    pub fn into_amounts(self) -> Result<Vec<BigUint>> {
        match self {
            CallOutput::Raw(hex) => decode_uint256_array(&hex),
            CallOutput::Decoded(values) => values
                .iter()
                .map(|v| {
                    BigUint::parse_bytes(v.trim().as_bytes(), 10)
                        .ok_or_else(|| SwapError::DataMalformed(format!("not an integer: {v}")))
                })
                .collect(),
        }
    }
}

fn payload_bytes(payload: &str) -> Result<Vec<u8>> {
    let payload = payload.trim().trim_start_matches("0x");
    hex::decode(payload).map_err(|e| SwapError::DataMalformed(format!("invalid hex payload: {e}")))
}

fn read_word(bytes: &[u8], index: usize) -> Result<&[u8]> {
    let start = index
        .checked_mul(WORD)
        .ok_or_else(|| SwapError::DataMalformed("word index overflow".to_string()))?;
    let end = start
        .checked_add(WORD)
        .ok_or_else(|| SwapError::DataMalformed("word index overflow".to_string()))?;
    bytes.get(start..end).ok_or_else(|| {
        SwapError::DataMalformed(format!(
            "payload of {} bytes has no word at index {index}",
            bytes.len()
        ))
    })
}

fn word_to_usize(word: &[u8]) -> Result<usize> {
    // anything above 8 bytes cannot be a sane offset or length
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(SwapError::DataMalformed("offset or length out of range".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(buf))
        .map_err(|_| SwapError::DataMalformed("offset or length out of range".to_string()))
}

/// Decodes a dynamic `uint256[]` return: an offset word, a length word at that
/// offset, then `length` big-endian words.
pub fn decode_uint256_array(payload: &str) -> Result<Vec<BigUint>> {
    let bytes = payload_bytes(payload)?;
    if bytes.len() < 2 * WORD {
        return Err(SwapError::DataMalformed(format!(
            "uint256[] payload needs at least {} bytes, got {}",
            2 * WORD,
            bytes.len()
        )));
    }

    let offset = word_to_usize(read_word(&bytes, 0)?)?;
    if offset % WORD != 0 {
        return Err(SwapError::DataMalformed(format!("misaligned array offset {offset}")));
    }
    let head = offset / WORD;
    let count = word_to_usize(read_word(&bytes, head)?)?;

    let needed = (head + 1)
        .checked_add(count)
        .and_then(|words| words.checked_mul(WORD))
        .ok_or_else(|| SwapError::DataMalformed("array length overflow".to_string()))?;
    if bytes.len() < needed {
        return Err(SwapError::DataMalformed(format!(
            "array declares {count} elements but payload has only {} bytes",
            bytes.len()
        )));
    }

    (0..count)
        .map(|i| read_word(&bytes, head + 1 + i).map(BigUint::from_bytes_be))
        .collect()
}

/// Decodes a fixed `uint256` return from the last word of the payload, which
/// tolerates leading padding.
pub fn decode_uint256(payload: &str) -> Result<BigUint> {
    let bytes = payload_bytes(payload)?;
    if bytes.len() < WORD {
        return Err(SwapError::DataMalformed(format!(
            "uint256 payload needs {WORD} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(BigUint::from_bytes_be(&bytes[bytes.len() - WORD..]))
}

/// Decodes a dynamic `string` return.
pub fn decode_string(payload: &str) -> Result<String> {
    let bytes = payload_bytes(payload)?;
    let offset = word_to_usize(read_word(&bytes, 0)?)?;
    let truncated = || SwapError::DataMalformed("string payload truncated".to_string());

    let start = offset.checked_add(WORD).ok_or_else(truncated)?;
    let len = word_to_usize(bytes.get(offset..start).ok_or_else(truncated)?)?;
    let end = start.checked_add(len).ok_or_else(truncated)?;
    let raw = bytes.get(start..end).ok_or_else(truncated)?;
    String::from_utf8(raw.to_vec()).map_err(|e| SwapError::DataMalformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
    const WTRX: &str = "TNUC9Qb1rRpS5CbWLmNMxXBjyFoydXjWFR";

    fn word(n: u64) -> String {
        format!("{n:064x}")
    }

    fn addr(s: &str) -> TronAddress {
        s.parse().expect("valid address")
    }

    #[test]
    fn test_decodes_three_element_array() {
        let payload = [word(32), word(3), word(100_500_000), word(1_000), word(7)].concat();
        let amounts = decode_uint256_array(&payload).expect("well formed");
        assert_eq!(
            amounts,
            vec![
                BigUint::from(100_500_000u64),
                BigUint::from(1_000u64),
                BigUint::from(7u64)
            ]
        );
    }

    #[test]
    fn test_accepts_0x_prefix() {
        let payload = format!("0x{}", [word(32), word(1), word(5)].concat());
        assert_eq!(decode_uint256_array(&payload).unwrap(), vec![BigUint::from(5u32)]);
    }

    #[test]
    fn test_short_header_is_malformed() {
        let err = decode_uint256_array(&word(32)).unwrap_err();
        assert!(matches!(err, SwapError::DataMalformed(_)));
    }

    #[test]
    fn test_truncated_elements_are_malformed() {
        let payload = [word(32), word(3), word(1), word(2)].concat();
        let err = decode_uint256_array(&payload).unwrap_err();
        assert!(matches!(err, SwapError::DataMalformed(_)));
    }

    #[test]
    fn test_huge_declared_length_is_malformed() {
        let payload = [word(32), "ff".repeat(32), word(1)].concat();
        assert!(matches!(
            decode_uint256_array(&payload).unwrap_err(),
            SwapError::DataMalformed(_)
        ));
    }

    #[test]
    fn test_uint256_reads_last_word() {
        assert_eq!(decode_uint256(&word(42)).unwrap(), BigUint::from(42u32));
        let padded = [word(0), word(99)].concat();
        assert_eq!(decode_uint256(&padded).unwrap(), BigUint::from(99u32));
        assert!(decode_uint256("abcd").is_err());
    }

    #[test]
    fn test_structured_and_raw_outputs_agree() {
        let raw = CallOutput::Raw([word(32), word(2), word(1_000_000), word(994)].concat());
        let decoded = CallOutput::Decoded(vec!["1000000".into(), "994".into()]);
        assert_eq!(raw.into_amounts().unwrap(), decoded.into_amounts().unwrap());
    }

    #[test]
    fn test_decode_string() {
        let symbol = hex::encode("USDT");
        let payload = format!("{}{}{:0<64}", word(32), word(4), symbol);
        assert_eq!(decode_string(&payload).unwrap(), "USDT");
    }

    #[test]
    fn test_encodes_quote_call_without_selector() {
        let amount = BigUint::from(100_500_000u64);
        let call = get_amounts_out(&amount, &[addr(USDT), addr(WTRX)]).unwrap();
        assert_eq!(call.function_selector, "getAmountsOut(uint256,address[])");

        let expected = [
            word(100_500_000),
            word(64),
            word(2),
            format!("{:0>64}", &addr(USDT).to_hex()[2..]),
            format!("{:0>64}", &addr(WTRX).to_hex()[2..]),
        ]
        .concat();
        assert_eq!(call.parameter, expected);
    }

    #[test]
    fn test_encodes_token_calls() {
        let owner = addr(USDT);
        let spender = addr(WTRX);
        assert_eq!(allowance(&owner, &spender).function_selector, "allowance(address,address)");
        assert_eq!(balance_of(&owner).parameter, format!("{:0>64}", &owner.to_hex()[2..]));
        let approval = approve(&spender, &BigUint::from(100_500_000u64)).unwrap();
        assert_eq!(approval.function_selector, "approve(address,uint256)");
        assert!(approval.parameter.ends_with(&word(100_500_000)));
        assert_eq!(decimals().parameter, "");
    }

    #[test]
    fn test_swap_signatures() {
        let path = [addr(USDT), addr(WTRX)];
        let one = BigUint::from(1u32);
        let exact_in = swap_exact_tokens_for_tokens(&one, &one, &path, &path[0], 1).unwrap();
        assert_eq!(
            exact_in.function_selector,
            "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)"
        );
        let exact_out = swap_tokens_for_exact_tokens(&one, &one, &path, &path[0], 1).unwrap();
        assert_eq!(
            exact_out.function_selector,
            "swapTokensForExactTokens(uint256,uint256,address[],address,uint256)"
        );
    }

    #[test]
    fn test_u256_overflow_is_rejected() {
        let too_big = BigUint::from(1u32) << 256;
        assert!(to_u256(&too_big).is_err());
        let max = (BigUint::from(1u32) << 256) - 1u32;
        assert_eq!(from_u256(to_u256(&max).unwrap()), max);
    }
}
