//! Decimal string ↔ base-unit conversion.
//!
//! Fraction digits beyond the token's precision are truncated, never rounded.

use std::sync::LazyLock;

use alloy_primitives::U256;
use regex::Regex;

use crate::errors::InvestError;

static DECIMAL_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]*)(?:\.([0-9]*))?$").expect("valid decimal pattern"));

/// A validated, unsigned base-10 literal split at the decimal point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecimalLiteral<'a> {
    pub integer: &'a str,
    pub fraction: &'a str,
}

impl DecimalLiteral<'_> {
    pub fn is_zero(&self) -> bool {
        self.integer.bytes().chain(self.fraction.bytes()).all(|b| b == b'0')
    }
}

/// Parse `value` as `D+`, `D+.D*` or `.D+`.
pub fn parse_decimal(value: &str) -> Result<DecimalLiteral<'_>, InvestError> {
    if value.is_empty() {
        return Err(InvestError::invalid_amount(value, "empty amount"));
    }
    if value.starts_with('-') {
        return Err(InvestError::invalid_amount(value, "negative amounts are not allowed"));
    }

    let caps = DECIMAL_LITERAL
        .captures(value)
        .ok_or_else(|| InvestError::invalid_amount(value, "not a base-10 decimal number"))?;
    let integer = caps.get(1).map_or("", |m| m.as_str());
    let fraction = caps.get(2).map_or("", |m| m.as_str());
    if integer.is_empty() && fraction.is_empty() {
        return Err(InvestError::invalid_amount(value, "no digits"));
    }

    Ok(DecimalLiteral { integer, fraction })
}

/// Convert a human decimal string into base units for a token with `decimals`.
pub fn normalize(value: &str, decimals: u8) -> Result<U256, InvestError> {
    let literal = parse_decimal(value)?;
    if literal.is_zero() {
        return Ok(U256::ZERO);
    }

    let scale = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| InvestError::invalid_amount(value, "token precision exceeds 256 bits"))?;

    let integer = if literal.integer.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(literal.integer, 10)
            .map_err(|_| InvestError::invalid_amount(value, "amount exceeds 256 bits"))?
    };

    let precision = decimals as usize;
    if literal.fraction.len() > precision {
        tracing::debug!(
            value,
            decimals,
            dropped = &literal.fraction[precision..],
            "truncating fraction digits beyond token precision"
        );
    }
    let kept = &literal.fraction[..literal.fraction.len().min(precision)];
    let fraction = if kept.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{kept:0<precision$}");
        U256::from_str_radix(&padded, 10)
            .map_err(|_| InvestError::invalid_amount(value, "amount exceeds 256 bits"))?
    };

    integer
        .checked_mul(scale)
        .and_then(|whole| whole.checked_add(fraction))
        .ok_or_else(|| InvestError::invalid_amount(value, "amount exceeds 256 bits"))
}

/// Render base units as a decimal string, trimming trailing fraction zeros.
pub fn format_units(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let width = decimals as usize;
    let digits = format!("{:0>pad$}", amount.to_string(), pad = width + 1);
    let (integer, fraction) = digits.split_at(digits.len() - width);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_exact_fractions() {
        assert_eq!(normalize("15.2", 6).unwrap(), U256::from(15_200_000u64));
        assert_eq!(normalize("0.5", 6).unwrap(), U256::from(500_000u64));
        assert_eq!(normalize("100", 6).unwrap(), U256::from(100_000_000u64));
        assert_eq!(normalize(".25", 2).unwrap(), U256::from(25u64));
        assert_eq!(normalize("7.", 3).unwrap(), U256::from(7_000u64));
        assert_eq!(normalize("0", 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn truncates_digits_beyond_precision() {
        assert_eq!(normalize("1.23456789", 6).unwrap(), U256::from(1_234_567u64));
        assert_eq!(normalize("0.0000009", 6).unwrap(), U256::ZERO);
        assert_eq!(normalize("3.99", 0).unwrap(), U256::from(3u64));
    }

    #[test]
    fn eighteen_decimals() {
        assert_eq!(
            normalize("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "-1", "+1", "1,5", "1.2.3", ".", "abc", " 1", "1e6", "0x10"] {
            let err = normalize(bad, 6).unwrap_err();
            match err {
                InvestError::InvalidAmount { value, .. } => assert_eq!(value, bad),
                other => panic!("unexpected error for {bad:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_overflow() {
        let huge = "1".repeat(80);
        assert!(matches!(
            normalize(&huge, 0),
            Err(InvestError::InvalidAmount { reason: "amount exceeds 256 bits", .. })
        ));
        // Fits as an integer, overflows once scaled.
        let max = U256::MAX.to_string();
        assert!(normalize(&max, 0).is_ok());
        assert!(normalize(&max, 1).is_err());
        assert!(normalize("1", 78).is_err());
    }

    #[test]
    fn zero_needs_no_scale() {
        assert_eq!(normalize("0", 255).unwrap(), U256::ZERO);
        assert_eq!(normalize("0.000", 200).unwrap(), U256::ZERO);
        assert!(normalize("1", 255).is_err());
    }

    #[test]
    fn zero_literals() {
        assert!(parse_decimal("0.000").unwrap().is_zero());
        assert!(!parse_decimal("0.001").unwrap().is_zero());
    }

    #[test]
    fn formats_base_units() {
        assert_eq!(format_units(U256::from(15_200_000u64), 6), "15.2");
        assert_eq!(format_units(U256::from(500_000u64), 6), "0.5");
        assert_eq!(format_units(U256::from(3u64), 6), "0.000003");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
        assert_eq!(format_units(U256::ZERO, 6), "0");
    }
}
