use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{RawAmount, Result, WalletError};

/// Highest decimal count a token may declare at genesis
pub const MAX_TOKEN_DECIMALS: u8 = 9;

/// Human-scaled quantity rendered as an exact decimal string
/// (trailing zeros stripped, at least one digit before the point)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaledQuantity(String);

impl ScaledQuantity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fixed-point view for consumers doing further arithmetic.
    /// Fails only when the value exceeds the 96-bit mantissa of `Decimal`.
    pub fn to_decimal(&self) -> Result<Decimal> {
        Decimal::from_str_exact(&self.0).map_err(|e| {
            WalletError::InvalidQuantity(format!("{} does not fit a Decimal: {}", self.0, e))
        })
    }
}

impl fmt::Display for ScaledQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for ScaledQuantity {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Divide `raw` by `10^decimals` without any binary floating point
pub fn scale_quantity(raw: &RawAmount, decimals: u8) -> Result<ScaledQuantity> {
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(WalletError::InvalidQuantity(format!(
            "cannot scale by {} decimals (max {})",
            decimals, MAX_TOKEN_DECIMALS
        )));
    }

    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return Ok(ScaledQuantity(digits));
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (integer_part, fraction_part) = padded.split_at(padded.len() - decimals);
    let fraction_part = fraction_part.trim_end_matches('0');

    if fraction_part.is_empty() {
        Ok(ScaledQuantity(integer_part.to_string()))
    } else {
        Ok(ScaledQuantity(format!("{}.{}", integer_part, fraction_part)))
    }
}

/// Inverse of [`scale_quantity`]: multiply a decimal string back by `10^decimals`
pub fn unscale_quantity(quantity: &str, decimals: u8) -> Result<RawAmount> {
    let (integer_part, fraction_part) = match quantity.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (quantity, ""),
    };
    if fraction_part.len() > decimals as usize {
        return Err(WalletError::InvalidQuantity(format!(
            "{} has more than {} decimal places",
            quantity, decimals
        )));
    }

    let padding = "0".repeat(decimals as usize - fraction_part.len());
    format!("{}{}{}", integer_part, fraction_part, padding).parse()
}
