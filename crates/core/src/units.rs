//! Conversion between human readable decimal strings and integer base units.
use num_bigint::BigUint;
use num_traits::Zero as _;

/// Parses a decimal string into base units for a token with `decimals`.
///
/// Anything that does not look like `\d*\.?\d*` parses as zero. Extra
/// fractional digits are truncated, never rounded.
pub fn to_base_units(value: &str, decimals: u32) -> BigUint {
    if !is_decimal(value) {
        return BigUint::zero();
    }

    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let fraction: String = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(decimals as usize)
        .collect();

    let whole = parse_digits(whole);
    let fraction = parse_digits(&fraction);

    whole * scale(decimals) + fraction
}

/// Renders base units as a canonical decimal string: no trailing zeros and no
/// decimal point when the fractional part is zero.
pub fn from_base_units(amount: &BigUint, decimals: u32) -> String {
    let base = scale(decimals);
    let whole = amount / &base;
    let fraction = amount % &base;
    if fraction.is_zero() {
        return whole.to_string();
    }

    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{whole}.{}", padded.trim_end_matches('0'))
}

fn is_decimal(value: &str) -> bool {
    !value.is_empty()
        && value.chars().filter(|c| *c == '.').count() <= 1
        && value.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn parse_digits(digits: &str) -> BigUint {
    if digits.is_empty() {
        return BigUint::zero();
    }
    BigUint::parse_bytes(digits.as_bytes(), 10).unwrap_or_default()
}

fn scale(decimals: u32) -> BigUint {
    BigUint::from(10u32).pow(decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parses_whole_and_fraction() {
        assert_eq!(to_base_units("100.5", 6), BigUint::from(100_500_000u64));
        assert_eq!(to_base_units("1", 6), BigUint::from(1_000_000u64));
        assert_eq!(to_base_units(".25", 2), BigUint::from(25u32));
        assert_eq!(to_base_units("7.", 3), BigUint::from(7_000u32));
        assert_eq!(to_base_units("42", 0), BigUint::from(42u32));
    }

    #[test]
    fn test_truncates_extra_fraction_digits() {
        assert_eq!(to_base_units("0.1239", 3), BigUint::from(123u32));
        assert_eq!(to_base_units("1.999999", 0), BigUint::from(1u32));
    }

    #[test]
    fn test_malformed_input_is_zero() {
        for input in ["", "abc", "1.2.3", "-1", "1e6", " 1", "1,5"] {
            assert_eq!(to_base_units(input, 6), BigUint::zero(), "input {input:?}");
        }
        assert_eq!(to_base_units(".", 6), BigUint::zero());
    }

    #[test]
    fn test_formats_canonical_form() {
        assert_eq!(from_base_units(&BigUint::from(100_500_000u64), 6), "100.5");
        assert_eq!(from_base_units(&BigUint::from(1_000_000u64), 6), "1");
        assert_eq!(from_base_units(&BigUint::from(1u32), 6), "0.000001");
        assert_eq!(from_base_units(&BigUint::zero(), 18), "0");
        assert_eq!(from_base_units(&BigUint::from(995u32), 0), "995");
    }

    #[test]
    fn test_large_amounts_keep_precision() {
        let value = "123456789012345678901234567890.123456789012345678";
        let units = to_base_units(value, 18);
        assert_eq!(from_base_units(&units, 18), value);
    }

    proptest! {
        #[test]
        fn test_base_units_round_trip(raw in any::<u128>(), decimals in 0u32..=30) {
            let amount = BigUint::from(raw);
            let rendered = from_base_units(&amount, decimals);
            prop_assert_eq!(to_base_units(&rendered, decimals), amount);
        }

        #[test]
        fn test_decimal_string_normalizes(
            whole in "[0-9]{1,20}",
            fraction in "[0-9]{0,12}",
            decimals in 12u32..=24,
        ) {
            let input = if fraction.is_empty() { whole.clone() } else { format!("{whole}.{fraction}") };
            let rendered = from_base_units(&to_base_units(&input, decimals), decimals);

            let expected_whole = whole.trim_start_matches('0');
            let expected_whole = if expected_whole.is_empty() { "0" } else { expected_whole };
            let expected_fraction = fraction.trim_end_matches('0');
            let expected = if expected_fraction.is_empty() {
                expected_whole.to_string()
            } else {
                format!("{expected_whole}.{expected_fraction}")
            };
            prop_assert_eq!(rendered, expected);
        }
    }
}
