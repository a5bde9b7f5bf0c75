use std::str::FromStr;

use rust_decimal::Decimal;

use super::ChainError;

/// Decimals of the chain's native currency.
pub const WEI_DECIMALS: u32 = 18;

/// Converts a decimal amount such as `"0.015"` into the chain's base unit.
pub fn to_wei(amount: &str) -> Result<u128, ChainError> {
    to_base_units(amount, WEI_DECIMALS)
}

/// Converts a decimal amount into integer base units for a token with `decimals` places.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<u128, ChainError> {
    let invalid = |reason: &str| ChainError::InvalidAmount {
        amount: amount.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is empty"));
    }
    // Decimal::from_str also accepts `_` separators; prices are plain digits.
    if !trimmed.bytes().any(|b| b.is_ascii_digit())
        || trimmed.contains(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
    {
        return Err(invalid("amount is not a decimal number"));
    }

    let value = Decimal::from_str(trimmed)
        .map_err(|err| invalid(&err.to_string()))?
        .normalize();
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("amount is negative"));
    }
    if value.scale() > decimals {
        return Err(invalid("too many decimal places"));
    }

    let mantissa = u128::try_from(value.mantissa().abs())
        .map_err(|_| invalid("amount is too large"))?;
    10u128
        .checked_pow(decimals - value.scale())
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| invalid("amount is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_catalog_prices() {
        assert_eq!(to_wei("0.01").unwrap(), 10_000_000_000_000_000);
        assert_eq!(to_wei("0.015").unwrap(), 15_000_000_000_000_000);
        assert_eq!(to_wei("1").unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(to_wei("2.5").unwrap(), 2_500_000_000_000_000_000);
        assert_eq!(to_wei(".5").unwrap(), 500_000_000_000_000_000);
        assert_eq!(to_wei("0.100000000000000000000").unwrap(), 100_000_000_000_000_000);
    }

    #[test]
    fn respects_custom_decimals() {
        assert_eq!(to_base_units("1.25", 6).unwrap(), 1_250_000);
        assert_eq!(to_base_units("7", 0).unwrap(), 7);
    }

    #[test]
    fn rejects_malformed_amounts() {
        for amount in ["", "  ", "-1", "abc", "1.2.3", ".", "1e18", "0.0000000000000000001"] {
            assert!(
                matches!(to_wei(amount), Err(ChainError::InvalidAmount { .. })),
                "{amount:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overflowing_amounts() {
        assert!(to_wei("999999999999999999999999999999999999999").is_err());
        assert!(to_base_units("340282366920938463463.374607431768211456", 28).is_err());
    }

    #[test]
    fn rejects_digit_separators_and_exponents() {
        for amount in ["1_000", "1e3", "0x10", "1,5"] {
            assert!(to_wei(amount).is_err(), "{amount:?} should be rejected");
        }
    }

    #[test]
    fn large_base_unit_values_stay_exact() {
        assert_eq!(
            to_wei("123456789.123456789123456789").unwrap(),
            123_456_789_123_456_789_123_456_789
        );
        assert_eq!(to_wei("-0").unwrap(), 0);
    }
}
