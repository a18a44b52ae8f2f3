use std::time::{Duration, SystemTime, UNIX_EPOCH};

use num_bigint::BigUint;

const BPS_DENOMINATOR: u64 = 10_000;

/// Worst acceptable output for a quoted output: `amount * (10000 - bps) / 10000`.
/// `slippage_bps` above 10000 saturates to a zero minimum.
pub fn apply_slippage_min(amount: &BigUint, slippage_bps: u64) -> BigUint {
    let multiplier = BigUint::from(BPS_DENOMINATOR.saturating_sub(slippage_bps));
    (amount * multiplier) / BigUint::from(BPS_DENOMINATOR)
}

/// Worst acceptable input for a quoted input: `amount * (10000 + bps) / 10000`.
pub fn apply_slippage_max(amount: &BigUint, slippage_bps: u64) -> BigUint {
    let multiplier = BigUint::from(BPS_DENOMINATOR) + BigUint::from(slippage_bps);
    (amount * multiplier) / BigUint::from(BPS_DENOMINATOR)
}

/// Absolute unix timestamp `window` from now.
pub fn deadline_from_now(window: Duration) -> u64 {
    deadline_from(SystemTime::now(), window)
}

pub fn deadline_from(now: SystemTime, window: Duration) -> u64 {
    now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() + window.as_secs()
}
