//! Lossless decimal numeric type backed by rust_decimal.
//!
//! All quantities, prices, and PnL values flow through this wrapper so the
//! accounting never touches binary floating point.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal for share quantities and [0,1]-scaled prices.
///
/// Serializes to a JSON number (not a string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Wrap a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1). Terminal payout of a winning outcome.
    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    /// Convert a small integer count (outcome counts, leg counts).
    pub fn from_u32(n: u32) -> Self {
        Decimal(RustDecimal::from(n))
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// The smaller of the two values. Used by the inventory guard.
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_parse_roundtrip() {
        for s in ["0.4", "0.0001", "100", "-12.5", "0", "0.999999"] {
            let parsed = d(s);
            let reparsed = d(&parsed.to_canonical_string());
            assert_eq!(parsed, reparsed, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn test_canonical_no_exponent() {
        let formatted = d("123").to_canonical_string();
        assert!(!formatted.contains('e'));
        assert_eq!(formatted, "123");
    }

    #[test]
    fn test_arithmetic_is_exact() {
        // 0.1 + 0.2 is the classic float trap; must be exactly 0.3 here.
        assert_eq!(d("0.1") + d("0.2"), d("0.3"));
        assert_eq!(d("100") * d("0.4"), d("40"));
        assert_eq!(d("1") / d("4"), d("0.25"));
    }

    #[test]
    fn test_min() {
        assert_eq!(d("150").min(d("100")), d("100"));
        assert_eq!(d("50").min(d("100")), d("50"));
        assert_eq!(d("-1").min(d("0")), d("-1"));
    }

    #[test]
    fn test_sign_predicates() {
        assert!(d("0.5").is_positive());
        assert!(d("-0.5").is_negative());
        assert!(d("0").is_zero());
        assert!(!d("0").is_positive());
        assert!(!d("0").is_negative());
    }

    #[test]
    fn test_from_u32() {
        assert_eq!(Decimal::from_u32(2), d("2"));
        assert_eq!(Decimal::one() / Decimal::from_u32(2), d("0.5"));
    }

    #[test]
    fn test_json_serializes_as_number() {
        let json = serde_json::to_value(d("0.45")).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "0.45");
    }

    #[test]
    fn test_assign_ops() {
        let mut acc = d("1.5");
        acc += d("0.5");
        assert_eq!(acc, d("2"));
        acc -= d("3");
        assert_eq!(acc, d("-1"));
    }
}
