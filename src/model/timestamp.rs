//! Decimal timestamps.
//!
//! Recording timestamps carry nanosecond precision on top of a ten digit
//! seconds value, which does not fit a binary `f64`. They are parsed from
//! their literal text into a [`Decimal`] and rendered back with the same
//! number of fractional digits.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// A point in time in seconds, stored as an exact decimal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Decimal);

impl Timestamp {
    /// Wraps an existing decimal value.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Parses a decimal literal such as `"1631337747.123123123"` or
    /// `"1.6e9"`.
    ///
    /// # Errors
    /// Fails for malformed literals and for literals with more significant
    /// digits than a [`Decimal`] holds, which would otherwise be rounded.
    pub fn parse(literal: &str) -> Result<Self, rust_decimal::Error> {
        let literal = literal.trim();
        let (value, scale) = match literal.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => {
                let exponent: i64 = exponent.parse().map_err(|_| {
                    rust_decimal::Error::from(format!("invalid exponent in '{literal}'"))
                })?;
                let scale = i64::from(fractional_digits(mantissa)) - exponent;
                (Decimal::from_scientific(literal)?, scale.max(0))
            }
            None => (Decimal::from_str(literal)?, i64::from(fractional_digits(literal))),
        };
        if i64::from(value.scale()) < scale {
            return Err(rust_decimal::Error::Underflow);
        }
        Ok(Self(value))
    }
}

/// Number of digits after the decimal point of a plain literal.
fn fractional_digits(literal: &str) -> u32 {
    literal
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.bytes().filter(u8::is_ascii_digit).count() as u32)
}

impl FromStr for Timestamp {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Timestamp {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_nanosecond_literal() {
        let ts = Timestamp::parse("1631337747.123123123").unwrap();
        assert_eq!(ts.to_string(), "1631337747.123123123");
    }

    #[test]
    fn test_ordering_is_exact() {
        let a = Timestamp::parse("1631337747.000000001").unwrap();
        let b = Timestamp::parse("1631337747.000000002").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_scientific_notation() {
        let ts = Timestamp::parse("1.5e3").unwrap();
        assert_eq!(ts, Timestamp::parse("1500").unwrap());
    }

    #[test]
    fn test_rejects_digits_beyond_decimal_precision() {
        assert!(Timestamp::parse("1631337747.1231231231231231231234").is_err());
        assert!(Timestamp::parse("1631337747.1231231231231231231234e0").is_err());
        let widest = Timestamp::parse("1631337747.123123123123123123").unwrap();
        assert_eq!(widest.to_string(), "1631337747.123123123123123123");
    }

    #[test]
    fn test_trailing_zeros_are_kept() {
        assert_eq!(Timestamp::parse("1631337747.100").unwrap().to_string(), "1631337747.100");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
    }
}
