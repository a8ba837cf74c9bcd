use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "USD";

const CENTS_PER_UNIT: i64 = 100;

//--------------------------------------        Cents         ---------------------------------------------------------
/// A signed amount of money in minor currency units.
///
/// All ledger arithmetic happens on this integer representation. Decimal values only appear at the edges (parsing
/// prices and percentages) and are converted with half-up rounding.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(unary Cents, Neg, neg);

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("Value cannot be represented in whole cents: {0}")]
    PrecisionError(String),
    #[error("Percentage must be between 0 and 100. Got {0}")]
    InvalidPercentage(Decimal),
}

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn from_const(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// `None` if the sum does not fit in 64 bits.
    pub fn checked_add(&self, rhs: Cents) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(&self, rhs: Cents) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Converts a decimal currency amount (e.g. `12.345`) into cents, rounding half-up (midpoint away from zero).
    ///
    /// Fails if the rounded value is not an exact integer or does not fit into 64 bits.
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        let scaled = amount
            .checked_mul(Decimal::from(CENTS_PER_UNIT))
            .ok_or_else(|| MoneyError::PrecisionError(format!("{amount} overflows when scaled to cents")))?;
        let rounded = round_half_up(scaled);
        if !rounded.fract().is_zero() {
            return Err(MoneyError::PrecisionError(format!("{amount} leaves fractional cents ({rounded})")));
        }
        rounded
            .to_i64()
            .map(Self)
            .ok_or_else(|| MoneyError::PrecisionError(format!("{amount} does not fit in a 64-bit cents value")))
    }

    /// The decimal representation of this amount, fixed at 2 decimal places.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Applies `percent` (e.g. `10` for 10%) to this amount, rounding half-up to the nearest cent.
    pub fn percent_of(&self, percent: Decimal) -> Result<Self, MoneyError> {
        let product = Decimal::from(self.0)
            .checked_mul(percent)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| MoneyError::PrecisionError(format!("{percent}% of {self} overflows")))?;
        round_half_up(product)
            .to_i64()
            .map(Self)
            .ok_or_else(|| MoneyError::PrecisionError(format!("{percent}% of {self} does not fit in 64 bits")))
    }
}

fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn decimal_to_cents() {
        assert_eq!(Cents::from_decimal(dec("12.34")).unwrap(), Cents::from(1234));
        assert_eq!(Cents::from_decimal(dec("0.005")).unwrap(), Cents::from(1));
        assert_eq!(Cents::from_decimal(dec("0.004")).unwrap(), Cents::from(0));
        assert_eq!(Cents::from_decimal(dec("12.345")).unwrap(), Cents::from(1235));
        assert_eq!(Cents::from_decimal(dec("-12.345")).unwrap(), Cents::from(-1235));
        assert_eq!(Cents::from_decimal(dec("7")).unwrap(), Cents::from(700));
    }

    #[test]
    fn decimal_too_large_for_cents() {
        let huge = Decimal::from(i64::MAX);
        let err = Cents::from_decimal(huge).unwrap_err();
        assert!(matches!(err, MoneyError::PrecisionError(_)));
    }

    #[test]
    fn cents_to_decimal_has_two_places() {
        assert_eq!(Cents::from(1234).to_decimal().to_string(), "12.34");
        assert_eq!(Cents::from(5).to_decimal().to_string(), "0.05");
        assert_eq!(Cents::from(-500).to_decimal().to_string(), "-5.00");
        assert_eq!(Cents::from(1999).to_string(), "19.99");
    }

    #[test]
    fn percentages_round_half_up() {
        assert_eq!(Cents::from(1000).percent_of(Decimal::from(10)).unwrap(), Cents::from(100));
        // 2.5% of 1010 = 25.25
        assert_eq!(Cents::from(1010).percent_of(dec("2.5")).unwrap(), Cents::from(25));
        // 2.5% of 1020 = 25.5
        assert_eq!(Cents::from(1020).percent_of(dec("2.5")).unwrap(), Cents::from(26));
        assert_eq!(Cents::from(0).percent_of(Decimal::from(15)).unwrap(), Cents::ZERO);
    }

    #[test]
    fn arithmetic() {
        let mut a = Cents::from(250);
        a += Cents::from(50);
        a -= Cents::from(100);
        assert_eq!(a, Cents::from(200));
        assert_eq!(-a, Cents::from(-200));
        assert_eq!((-a).abs(), a);
        let total: Cents = [Cents::from(1), Cents::from(2), Cents::from(3)].iter().sum();
        assert_eq!(total, Cents::from(6));
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(Cents::from(250).checked_add(Cents::from(50)), Some(Cents::from(300)));
        assert_eq!(Cents::from(i64::MAX).checked_add(Cents::from(1)), None);
        assert_eq!(Cents::from(250).checked_sub(Cents::from(300)), Some(Cents::from(-50)));
        assert_eq!(Cents::from(i64::MIN).checked_sub(Cents::from(1)), None);
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Cents::from(1234)).unwrap();
        assert_eq!(json, "1234");
        let c: Cents = serde_json::from_str("-77").unwrap();
        assert_eq!(c, Cents::from(-77));
    }
}
