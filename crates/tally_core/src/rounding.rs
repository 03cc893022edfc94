//! Exact rational numerics and rounding helpers.
//!
//! Every quotient the apportionment code compares (votes ÷ divisor, voter
//! numbers, divisor scaling factors) is a `Ratio`. Comparisons are exact; no
//! float ever decides which seat goes where.

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, Div, Mul, Sub};
use core::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::CoreError;

/// Exact ratio with normalized sign and positive denominator.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ratio(BigRational);

/// Outcome of standard rounding (round half to either neighbour).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StandardRounding {
    /// Fraction differs from one half; the nearest integer is unambiguous.
    Exact(u64),
    /// Value is exactly `lower + 1/2`; both `lower` and `lower + 1` are valid.
    Tie { lower: u64 },
}

impl Ratio {
    /// Construct `num / den`, rejecting a zero denominator.
    pub fn new(num: i128, den: i128) -> Result<Ratio, CoreError> {
        if den == 0 {
            return Err(CoreError::InvalidRatio);
        }
        Ok(Ratio(BigRational::new(BigInt::from(num), BigInt::from(den))))
    }

    pub fn from_integer(n: u64) -> Ratio {
        Ratio(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn zero() -> Ratio {
        Ratio(BigRational::zero())
    }

    pub fn one() -> Ratio {
        Ratio(BigRational::one())
    }

    pub fn half() -> Ratio {
        Ratio(BigRational::new(BigInt::one(), BigInt::from(2)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: &Ratio) -> Option<Ratio> {
        if rhs.is_zero() {
            None
        } else {
            Some(Ratio(&self.0 / &rhs.0))
        }
    }

    /// Largest integer `<= self`, if it fits `u64` (negative values yield `None`).
    pub fn floor_u64(&self) -> Option<u64> {
        self.0.floor().to_integer().to_u64()
    }

    /// Remainder `self - floor(self)`, in `[0, 1)`.
    pub fn fract(&self) -> Ratio {
        Ratio(&self.0 - self.0.floor())
    }

    /// Round to the nearest integer, reporting exact half-way values as ties.
    pub fn standard_rounding(&self) -> Option<StandardRounding> {
        let lower = self.floor_u64()?;
        let frac = self.fract();
        Some(match frac.cmp(&Ratio::half()) {
            Ordering::Less => StandardRounding::Exact(lower),
            Ordering::Greater => StandardRounding::Exact(lower + 1),
            Ordering::Equal => StandardRounding::Tie { lower },
        })
    }

    /// Arithmetic mean of two ratios.
    pub fn midpoint(a: &Ratio, b: &Ratio) -> Ratio {
        Ratio((&a.0 + &b.0) / BigRational::from_integer(BigInt::from(2)))
    }
}

macro_rules! impl_ratio_op {
    ($tr:ident, $method:ident, $op:tt) => {
        impl $tr<&Ratio> for &Ratio {
            type Output = Ratio;
            fn $method(self, rhs: &Ratio) -> Ratio { Ratio(&self.0 $op &rhs.0) }
        }

        impl $tr<Ratio> for Ratio {
            type Output = Ratio;
            fn $method(self, rhs: Ratio) -> Ratio { Ratio(self.0 $op rhs.0) }
        }
    };
}

impl_ratio_op!(Add, add, +);
impl_ratio_op!(Sub, sub, -);
impl_ratio_op!(Mul, mul, *);

// Panics on a zero divisor, like integer division; use `checked_div` for data-driven divisors.
impl Div<&Ratio> for &Ratio {
    type Output = Ratio;
    fn div(self, rhs: &Ratio) -> Ratio {
        Ratio(&self.0 / &rhs.0)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_integer() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

impl FromStr for Ratio {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n, d),
            None => (s, "1"),
        };
        let num: BigInt = num.trim().parse().map_err(|_| CoreError::InvalidRatio)?;
        let den: BigInt = den.trim().parse().map_err(|_| CoreError::InvalidRatio)?;
        if den.is_zero() {
            return Err(CoreError::InvalidRatio);
        }
        Ok(Ratio(BigRational::new(num, den)))
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Percentage check `num / den >= pct %` in integers (den == 0 never passes).
pub fn ge_percent(num: u64, den: u64, pct: u8) -> bool {
    if den == 0 {
        return false;
    }
    (num as u128) * 100 >= (pct as u128) * (den as u128)
}
