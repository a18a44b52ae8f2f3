//! Core of a TRC20 swap client for SunSwap style routers on TRON: amount
//! codecs, call encoding, the chain gateway, signers, quoting and swap
//! execution.
pub mod abi;
pub mod address;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod poller;
pub mod quote;
pub mod router;
pub mod signer;
pub mod slippage;
pub mod telemetry;
pub mod token;
pub mod units;

pub use error::{Result, SwapError};
