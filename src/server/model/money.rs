//! Currency and rate primitives.
//!
//! Amounts are carried as integer minor units ([`Cents`]) and rates as basis
//! points ([`Percent`]). Both cross the JSON boundary as decimal numbers
//! (`27.75` dollars, `8.75` percent) and are rounded half-up exactly once,
//! when a rate or a ratio is applied.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::num::NonZeroU32;
use std::ops::{Add, AddAssign, Mul, Sub};

/// Largest amount accepted at the boundary, 10 million major units.
const MAX_MAJOR_UNITS: f64 = 10_000_000.0;
/// Largest rate accepted at the boundary, 1000 %.
const MAX_BASIS_POINTS: u32 = 100_000;
const BASIS_POINTS_PER_WHOLE: i128 = 10_000;

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub(crate) enum MoneyError {
    #[display("amount must be a finite number within +/-10000000")]
    AmountOutOfRange,
    #[display("percentage must be a finite number between 0 and 1000")]
    PercentOutOfRange,
}

/// Integer amount of currency minor units (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub(crate) struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Decimal major units, e.g. `2775` -> `27.75`.
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Converts a decimal major-unit amount, rounding half away from zero to the cent.
    pub fn from_major(major: f64) -> Result<Self, MoneyError> {
        if !major.is_finite() || major.abs() > MAX_MAJOR_UNITS {
            return Err(MoneyError::AmountOutOfRange);
        }
        Ok(Self((major * 100.0).round() as i64))
    }

    /// `self * part / whole`, rounded half-up. Zero when `whole` is not positive.
    pub fn apportion(self, part: Cents, whole: Cents) -> Cents {
        if whole.0 <= 0 {
            return Cents::ZERO;
        }
        Cents(round_div(i128::from(self.0) * i128::from(part.0), i128::from(whole.0)))
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    pub fn checked_mul(self, quantity: i32) -> Option<Cents> {
        self.0.checked_mul(i64::from(quantity)).map(Cents)
    }

    /// Equal share for `parties` payers, rounded half-up.
    pub fn split_even(self, parties: NonZeroU32) -> Cents {
        Cents(round_div(i128::from(self.0), i128::from(parties.get())))
    }
}

/// Division rounding half away from zero; `den` must be positive.
fn round_div(num: i128, den: i128) -> i64 {
    let magnitude = (2 * num.abs() + den) / (2 * den);
    let rounded = if num < 0 { -magnitude } else { magnitude };
    rounded.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<Cents> for f64 {
    fn from(cents: Cents) -> Self {
        cents.to_major()
    }
}

impl TryFrom<f64> for Cents {
    type Error = MoneyError;

    fn try_from(major: f64) -> Result<Self, Self::Error> {
        Cents::from_major(major)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl Mul<i32> for Cents {
    type Output = Cents;

    fn mul(self, quantity: i32) -> Cents {
        Cents(self.0 * i64::from(quantity))
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, Add::add)
    }
}

/// Non-negative percentage held in basis points (`8.75 %` is `875`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub(crate) struct Percent(u32);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(10_000);

    pub fn from_basis_points(basis_points: u32) -> Result<Self, MoneyError> {
        if basis_points > MAX_BASIS_POINTS {
            return Err(MoneyError::PercentOutOfRange);
        }
        Ok(Self(basis_points))
    }

    /// Whole percent, e.g. `Percent::whole(15)` is 15 %.
    pub fn whole(percent: u32) -> Result<Self, MoneyError> {
        Self::from_basis_points(percent.saturating_mul(100))
    }

    pub const fn basis_points(self) -> u32 {
        self.0
    }

    /// `amount * self / 100`, rounded half-up to the cent.
    pub fn of(self, amount: Cents) -> Cents {
        Cents(round_div(
            i128::from(amount.0) * i128::from(self.0),
            BASIS_POINTS_PER_WHOLE,
        ))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", f64::from(*self))
    }
}

impl From<Percent> for f64 {
    fn from(percent: Percent) -> Self {
        f64::from(percent.0) / 100.0
    }
}

impl TryFrom<f64> for Percent {
    type Error = MoneyError;

    fn try_from(percent: f64) -> Result<Self, Self::Error> {
        if !percent.is_finite() || percent < 0.0 {
            return Err(MoneyError::PercentOutOfRange);
        }
        let basis_points = (percent * 100.0).round();
        if basis_points > f64::from(MAX_BASIS_POINTS) {
            return Err(MoneyError::PercentOutOfRange);
        }
        Ok(Self(basis_points as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_unit_conversion_rounds_to_the_cent() {
        assert_eq!(Cents::from_major(27.75), Ok(Cents::new(2775)));
        assert_eq!(Cents::from_major(0.1 + 0.2), Ok(Cents::new(30)));
        assert_eq!(Cents::from_major(-4.5), Ok(Cents::new(-450)));
        assert_eq!(Cents::from_major(f64::NAN), Err(MoneyError::AmountOutOfRange));
        assert_eq!(Cents::new(2775).to_major(), 27.75);
    }

    #[test]
    fn display_pads_minor_units() {
        assert_eq!(Cents::new(2775).to_string(), "27.75");
        assert_eq!(Cents::new(5).to_string(), "0.05");
        assert_eq!(Cents::new(-120).to_string(), "-1.20");
    }

    #[test]
    fn percent_of_rounds_half_up() {
        let fifteen = Percent::whole(15).unwrap();
        // 27.75 * 15 % = 4.1625
        assert_eq!(fifteen.of(Cents::new(2775)), Cents::new(416));
        // 0.50 * 5 % = 0.025
        assert_eq!(Percent::whole(5).unwrap().of(Cents::new(50)), Cents::new(3));
        assert_eq!(Percent::ZERO.of(Cents::new(12_345)), Cents::ZERO);
    }

    #[test]
    fn percent_boundary_parsing() {
        assert_eq!(Percent::try_from(8.75).unwrap().basis_points(), 875);
        assert_eq!(f64::from(Percent::try_from(8.75).unwrap()), 8.75);
        assert!(Percent::try_from(-1.0).is_err());
        assert!(Percent::try_from(f64::INFINITY).is_err());
        assert!(Percent::try_from(1000.5).is_err());
    }

    #[test]
    fn apportion_and_even_split() {
        // 2.00 tax, 10.00 of 25.00 -> 0.80
        assert_eq!(Cents::new(200).apportion(Cents::new(1000), Cents::new(2500)), Cents::new(80));
        assert_eq!(Cents::new(200).apportion(Cents::new(1000), Cents::ZERO), Cents::ZERO);
        let two = NonZeroU32::new(2).unwrap();
        assert_eq!(Cents::new(2775).split_even(two), Cents::new(1388));
        let three = NonZeroU32::new(3).unwrap();
        assert_eq!(Cents::new(1000).split_even(three), Cents::new(333));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Cents::new(1_000).checked_mul(999), Some(Cents::new(999_000)));
        assert_eq!(Cents::new(i64::MAX / 2).checked_mul(3), None);
        assert_eq!(Cents::new(i64::MAX).checked_add(Cents::new(1)), None);
        assert_eq!(Cents::new(5).checked_add(Cents::new(-7)), Some(Cents::new(-2)));
    }

    #[test]
    fn serde_uses_decimal_major_units() {
        let json = serde_json::to_string(&Cents::new(2775)).unwrap();
        assert_eq!(json, "27.75");
        let back: Cents = serde_json::from_str("4.16").unwrap();
        assert_eq!(back, Cents::new(416));
        let rate: Percent = serde_json::from_str("8").unwrap();
        assert_eq!(rate.basis_points(), 800);
        assert!(serde_json::from_str::<Percent>("-3").is_err());
    }
}
