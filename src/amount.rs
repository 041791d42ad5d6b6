//! Conversion between user-entered decimal strings and integer token
//! base units.
//!
//! Parsing is strict: an amount with more fractional digits than the
//! token supports is rejected rather than silently truncated, so the
//! value submitted on-chain is always exactly what the user typed.

use std::str::FromStr;

use alloy::primitives::U256;
use alloy::primitives::utils::format_units;
use rust_decimal::Decimal;

/// Largest token precision the parser accepts.
pub const MAX_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount is required")]
    Empty,
    #[error("Invalid number format")]
    InvalidFormat,
    #[error("Amount must be greater than zero")]
    NotPositive,
    #[error("Maximum {decimals} decimal places allowed")]
    TooManyDecimals { decimals: u8 },
    #[error("Amount is too large")]
    Overflow,
    #[error("Unsupported token precision: {decimals} decimals")]
    UnsupportedDecimals { decimals: u8 },
}

/// Parses a positive decimal string into base units of a token with
/// `decimals` precision.
///
/// Accepts digits with at most one `.` (`"50"`, `"0.5"`, `".5"`, `"5."`).
/// Trailing fractional zeros beyond the token precision are ignored since
/// dropping them loses nothing.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals { decimals });
    }

    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }
    if amount.starts_with('-') {
        return Err(AmountError::NotPositive);
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let is_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(AmountError::InvalidFormat);
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > usize::from(decimals) {
        return Err(AmountError::TooManyDecimals { decimals });
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    };
    let value = Decimal::from_str_exact(&normalized).map_err(|_| AmountError::Overflow)?;

    let units = decimal_to_units(value, decimals)?;
    if units.is_zero() {
        return Err(AmountError::NotPositive);
    }

    Ok(units)
}

/// Scales a decimal by `10^decimals`, rejecting values that would need
/// truncation.
pub fn decimal_to_units(amount: Decimal, decimals: u8) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals { decimals });
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::NotPositive);
    }

    let scale = Decimal::from(10u64.pow(u32::from(decimals)));
    let scaled = amount.checked_mul(scale).ok_or(AmountError::Overflow)?;

    if !scaled.fract().is_zero() {
        return Err(AmountError::TooManyDecimals { decimals });
    }

    U256::from_str(&scaled.trunc().normalize().to_string()).map_err(|_| AmountError::Overflow)
}

/// Formats base units as a decimal string without trailing zeros
/// (`50_000_000` at 6 decimals is `"50"`, `1_500_000` is `"1.5"`).
pub fn format_amount(units: U256, decimals: u8) -> String {
    let Ok(formatted) = format_units(units, decimals) else {
        return units.to_string();
    };

    if !formatted.contains('.') {
        return formatted;
    }

    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
