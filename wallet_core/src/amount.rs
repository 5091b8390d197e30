use num_bigint::BigUint;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use crate::WalletError;

/// Non-negative integer quantity in base units (satoshis or raw token units).
///
/// The indexer sends these as decimal strings. They are kept as arbitrary
/// precision integers so that summing many outputs can never overflow or
/// lose precision.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawAmount(BigUint);

impl RawAmount {
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// `self - other`, or `None` when the result would be negative
    pub fn checked_sub(&self, other: &RawAmount) -> Option<RawAmount> {
        if self.0 < other.0 {
            None
        } else {
            Some(RawAmount(&self.0 - &other.0))
        }
    }
}

impl From<u64> for RawAmount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for RawAmount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for RawAmount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WalletError::InvalidQuantity(format!(
                "'{}' is not a non-negative integer",
                s
            )));
        }
        BigUint::parse_bytes(trimmed.as_bytes(), 10)
            .map(RawAmount)
            .ok_or_else(|| WalletError::InvalidQuantity(s.to_string()))
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for RawAmount {
    type Output = RawAmount;

    fn add(self, rhs: RawAmount) -> RawAmount {
        RawAmount(self.0 + rhs.0)
    }
}

impl<'a> AddAssign<&'a RawAmount> for RawAmount {
    fn add_assign(&mut self, rhs: &'a RawAmount) {
        self.0 += &rhs.0;
    }
}

impl<'a> Sum<&'a RawAmount> for RawAmount {
    fn sum<I: Iterator<Item = &'a RawAmount>>(iter: I) -> Self {
        iter.fold(RawAmount::zero(), |mut acc, amount| {
            acc += amount;
            acc
        })
    }
}

impl Serialize for RawAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawAmountVisitor;

        impl<'de> Visitor<'de> for RawAmountVisitor {
            type Value = RawAmount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or integer string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawAmount, E> {
                Ok(RawAmount::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawAmount, E> {
                u64::try_from(v)
                    .map(RawAmount::from)
                    .map_err(|_| E::custom(format!("negative amount: {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RawAmount, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(RawAmountVisitor)
    }
}

/// Accepts a timestamp or height sent either as a JSON number or a numeric string
pub(crate) fn de_i64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    struct I64Visitor;

    impl<'de> Visitor<'de> for I64Visitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer or integer string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim().parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(I64Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_signs_and_fractions() {
        assert!("-5".parse::<RawAmount>().is_err());
        assert!("1.5".parse::<RawAmount>().is_err());
        assert!("".parse::<RawAmount>().is_err());
        assert_eq!("0042".parse::<RawAmount>().unwrap().to_string(), "42");
    }

    #[test]
    fn test_sum_beyond_u64() {
        let big: RawAmount = "18446744073709551615".parse().unwrap();
        let total: RawAmount = [big.clone(), big].iter().sum();
        assert_eq!(total.to_string(), "36893488147419103230");
    }

    #[test]
    fn test_deserialize_string_or_number() {
        let from_str: RawAmount = serde_json::from_str("\"546\"").unwrap();
        let from_num: RawAmount = serde_json::from_str("546").unwrap();
        assert_eq!(from_str, from_num);
        assert!(serde_json::from_str::<RawAmount>("-1").is_err());
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "\"546\"");
    }

    #[test]
    fn test_checked_sub() {
        let a = RawAmount::from(10);
        let b = RawAmount::from(3);
        assert_eq!(a.checked_sub(&b), Some(RawAmount::from(7)));
        assert_eq!(b.checked_sub(&a), None);
    }
}
