//! Monetary amounts in the smallest currency unit.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Decimal places between the display unit ("ether") and the smallest unit ("wei").
pub const DECIMALS: u32 = 18;

/// Non-negative amount in the smallest currency unit.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Parse a decimal display value (`"0.1"`) scaled by `decimals` places.
    pub fn parse_decimal(raw: &str, decimals: u32) -> DomainResult<Self> {
        let s = raw.trim();
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DomainError::invalid_amount(format!("{raw:?} is empty")));
        }
        let is_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if !is_digits(int_part) || !is_digits(frac_part) {
            return Err(DomainError::invalid_amount(format!("{raw:?} is not a decimal number")));
        }
        if frac_part.len() > decimals as usize {
            return Err(DomainError::invalid_amount(format!(
                "{raw:?} has more than {decimals} decimal places"
            )));
        }

        let overflow = || DomainError::invalid_amount(format!("{raw:?} is too large"));
        let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;
        let int: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let digits: u128 = frac_part.parse().map_err(|_| overflow())?;
            digits * 10u128.pow(decimals - frac_part.len() as u32)
        };

        int.checked_mul(scale)
            .and_then(|v| v.checked_add(frac))
            .map(Amount)
            .ok_or_else(overflow)
    }

    /// Parse a display value in ether (`"0.1"` → 10^17).
    pub fn from_ether(raw: &str) -> DomainResult<Self> {
        Self::parse_decimal(raw, DECIMALS)
    }

    /// Render as a decimal display value with trailing zeros trimmed.
    pub fn to_decimal_string(self, decimals: u32) -> String {
        let scale = 10u128.pow(decimals);
        let int = self.0 / scale;
        let frac = self.0 % scale;
        if frac == 0 {
            return int.to_string();
        }
        let frac = format!("{frac:0width$}", width = decimals as usize);
        format!("{int}.{}", frac.trim_end_matches('0'))
    }

    pub fn to_ether_string(self) -> String {
        self.to_decimal_string(DECIMALS)
    }
}

impl ValueObject for Amount {}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

/// Accepts a raw integer in the smallest unit (`"100000"`) or an ether value with an
/// `eth`/`ether` suffix (`"0.1 eth"`).
impl FromStr for Amount {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if let Some(value) = lower
            .strip_suffix("ether")
            .or_else(|| lower.strip_suffix("eth"))
        {
            return Self::from_ether(value);
        }
        trimmed
            .parse::<u128>()
            .map(Amount)
            .map_err(|e| DomainError::invalid_amount(format!("{s:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn parses_fractional_ether() {
        assert_eq!(Amount::from_ether("0.1").unwrap(), Amount::new(ONE_ETHER / 10));
        assert_eq!(Amount::from_ether("2").unwrap(), Amount::new(2 * ONE_ETHER));
        assert_eq!(Amount::from_ether(".5").unwrap(), Amount::new(ONE_ETHER / 2));
    }

    #[test]
    fn rejects_malformed_decimals() {
        assert!(Amount::from_ether("").is_err());
        assert!(Amount::from_ether(".").is_err());
        assert!(Amount::from_ether("-1").is_err());
        assert!(Amount::from_ether("1.2.3").is_err());
        assert!(Amount::from_ether("0.0000000000000000001").is_err());
    }

    #[test]
    fn from_str_accepts_raw_and_suffixed_values() {
        assert_eq!("1500".parse::<Amount>().unwrap(), Amount::new(1500));
        assert_eq!("0.2 eth".parse::<Amount>().unwrap(), Amount::new(ONE_ETHER / 5));
        assert_eq!("1ether".parse::<Amount>().unwrap(), Amount::new(ONE_ETHER));
        assert!("ten".parse::<Amount>().is_err());
    }

    #[test]
    fn renders_display_value() {
        assert_eq!(Amount::new(ONE_ETHER / 10).to_ether_string(), "0.1");
        assert_eq!(Amount::new(3 * ONE_ETHER).to_ether_string(), "3");
        assert_eq!(Amount::new(1).to_ether_string(), "0.000000000000000001");
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(Amount::new(5).checked_sub(Amount::new(6)), None);
        assert_eq!(Amount::new(u128::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(Amount::new(5).checked_add(Amount::new(6)), Some(Amount::new(11)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: rendering and re-parsing a display value is lossless.
            #[test]
            fn ether_display_is_lossless(raw in 0u128..=u128::MAX / 2) {
                let amount = Amount::new(raw);
                let parsed = Amount::from_ether(&amount.to_ether_string()).unwrap();
                prop_assert_eq!(parsed, amount);
            }
        }
    }
}
