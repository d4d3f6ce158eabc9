//! Arbitrary-precision decimal for values that outgrow `f64`.
//!
//! Gold, fragments and XP grow without bound over long sessions. `BigNum`
//! stores them as a big integer scaled by 10^6, so addition and subtraction are
//! exact and persisted values survive a string round-trip unchanged.
//!
//! Rewards are always floored before they are added to the player.

use num_bigint::{BigInt, Sign};
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal digits kept after the point.
const SCALE_DIGITS: u32 = 6;

/// 10^SCALE_DIGITS as a float, for conversions.
const SCALE_F64: f64 = 1_000_000.0;

/// Largest decimal exponent accepted when parsing.
const MAX_PARSE_EXPONENT: i64 = 100_000;

/// Suffixes used by [`BigNum::format`] for 10^3, 10^6, 10^9 and 10^12.
const SUFFIXES: [&str; 4] = ["K", "M", "B", "T"];

/// Error returned when a string is not a valid decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseBigNumError {
    #[error("empty numeric string")]
    Empty,
    #[error("invalid numeric string: {0:?}")]
    Invalid(String),
    #[error("exponent out of range: {0}")]
    ExponentOutOfRange(i64),
}

/// Signed arbitrary-precision decimal with six fractional digits.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BigNum(BigInt);

fn scale() -> BigInt {
    pow10(SCALE_DIGITS as usize)
}

fn pow10(exp: usize) -> BigInt {
    num_traits::pow(BigInt::from(10u32), exp)
}

impl BigNum {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn one() -> Self {
        Self(scale())
    }

    /// Converts a float, truncating past the sixth decimal.
    /// Non-finite input becomes zero.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::zero();
        }
        let scaled = value * SCALE_F64;
        if scaled.is_finite() {
            Self(BigInt::from_f64(scaled.trunc()).unwrap_or_default())
        } else {
            let whole = BigInt::from_f64(value.trunc()).unwrap_or_default();
            Self(whole * scale())
        }
    }

    /// Lossy conversion for rate math and display. Saturates to infinity.
    pub fn to_f64(&self) -> f64 {
        match self.0.to_f64() {
            Some(v) if v.is_finite() => v / SCALE_F64,
            _ => (&self.0 / scale()).to_f64().unwrap_or(0.0),
        }
    }

    /// Integer part as `u64`, saturating. Negative values become zero.
    pub fn to_u64_saturating(&self) -> u64 {
        if self.is_negative() {
            return 0;
        }
        (&self.0 / scale()).to_u64().unwrap_or(u64::MAX)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Rounds toward negative infinity.
    pub fn floor(&self) -> Self {
        let s = scale();
        let mut whole = &self.0 / &s;
        if self.is_negative() && &whole * &s != self.0 {
            whole -= BigInt::from(1u32);
        }
        Self(whole * s)
    }

    /// Multiplies by a float factor (multipliers, drop rates).
    pub fn mul_f64(&self, factor: f64) -> Self {
        self * &Self::from_f64(factor)
    }

    /// Raises to a non-negative integer power by repeated squaring.
    pub fn powi(&self, exp: u32) -> Self {
        let mut result = Self::one();
        let mut base = self.clone();
        let mut e = exp;
        while e > 0 {
            if e & 1 == 1 {
                result = &result * &base;
            }
            e >>= 1;
            if e > 0 {
                base = &base * &base;
            }
        }
        result
    }

    /// Clamps negative values to zero.
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Self::zero()
        } else {
            self
        }
    }

    /// Renders a magnitude-appropriate string.
    ///
    /// - below 1,000: the exact integer part (`"999"`)
    /// - below 1e15: two truncated decimals and a suffix (`"1.50K"`, `"12.34T"`)
    /// - otherwise: scientific notation (`"1.23e15"`)
    pub fn format(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let whole = self.0.abs() / scale();
        let digits = whole.to_string();
        let len = digits.len();

        if len <= 3 {
            return format!("{}{}", sign, digits);
        }

        if len <= 15 {
            let tier = (len - 1) / 3;
            let int_len = len - tier * 3;
            let frac = &digits[int_len..int_len + 2];
            return format!("{}{}.{}{}", sign, &digits[..int_len], frac, SUFFIXES[tier - 1]);
        }

        format!("{}{}.{}e{}", sign, &digits[..1], &digits[1..3], len - 1)
    }
}

impl fmt::Display for BigNum {
    /// Plain decimal form, used for persistence. Trailing fractional zeros are
    /// dropped so integers print without a point.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = scale();
        let abs = self.0.abs();
        let whole = &abs / &s;
        let frac = &abs % &s;
        if self.is_negative() {
            write!(f, "-")?;
        }
        if frac.is_zero() {
            write!(f, "{}", whole)
        } else {
            let frac = format!("{:0>width$}", frac.to_string(), width = SCALE_DIGITS as usize);
            write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
        }
    }
}

impl fmt::Debug for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigNum({})", self)
    }
}

impl FromStr for BigNum {
    type Err = ParseBigNumError;

    /// Accepts `"123"`, `"-4.5"`, `"1.5e30"` and `"2E-3"`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseBigNumError::Empty);
        }
        let invalid = || ParseBigNumError::Invalid(input.to_string());

        let (negative, body) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = body[pos + 1..].parse().map_err(|_| invalid())?;
                (&body[..pos], exp)
            }
            None => (body, 0),
        };
        if exponent.abs() > MAX_PARSE_EXPONENT {
            return Err(ParseBigNumError::ExponentOutOfRange(exponent));
        }

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = int_part
            .chars()
            .chain(frac_part.chars())
            .all(|c| c.is_ascii_digit());
        if !all_digits {
            return Err(invalid());
        }

        let digits = format!("{}{}", int_part, frac_part);
        let mut value: BigInt = digits.parse().map_err(|_| invalid())?;
        let shift = exponent - frac_part.len() as i64 + SCALE_DIGITS as i64;
        if shift >= 0 {
            value *= pow10(shift as usize);
        } else {
            value /= pow10((-shift) as usize);
        }
        if negative {
            value = -value;
        }
        Ok(Self(value))
    }
}

impl From<u64> for BigNum {
    fn from(v: u64) -> Self {
        Self(BigInt::from(v) * scale())
    }
}

impl From<u32> for BigNum {
    fn from(v: u32) -> Self {
        Self::from(v as u64)
    }
}

impl From<i64> for BigNum {
    fn from(v: i64) -> Self {
        Self(BigInt::from(v) * scale())
    }
}

impl From<f64> for BigNum {
    fn from(v: f64) -> Self {
        Self::from_f64(v)
    }
}

impl From<&BigNum> for BigNum {
    fn from(v: &BigNum) -> Self {
        v.clone()
    }
}

impl Add<&BigNum> for &BigNum {
    type Output = BigNum;
    fn add(self, other: &BigNum) -> BigNum {
        BigNum(&self.0 + &other.0)
    }
}

impl Add for BigNum {
    type Output = BigNum;
    fn add(self, other: BigNum) -> BigNum {
        BigNum(self.0 + other.0)
    }
}

impl AddAssign<&BigNum> for BigNum {
    fn add_assign(&mut self, other: &BigNum) {
        self.0 += &other.0;
    }
}

impl AddAssign for BigNum {
    fn add_assign(&mut self, other: BigNum) {
        self.0 += other.0;
    }
}

impl Sub<&BigNum> for &BigNum {
    type Output = BigNum;
    fn sub(self, other: &BigNum) -> BigNum {
        BigNum(&self.0 - &other.0)
    }
}

impl Sub for BigNum {
    type Output = BigNum;
    fn sub(self, other: BigNum) -> BigNum {
        BigNum(self.0 - other.0)
    }
}

impl SubAssign<&BigNum> for BigNum {
    fn sub_assign(&mut self, other: &BigNum) {
        self.0 -= &other.0;
    }
}

impl SubAssign for BigNum {
    fn sub_assign(&mut self, other: BigNum) {
        self.0 -= other.0;
    }
}

impl Mul<&BigNum> for &BigNum {
    type Output = BigNum;
    fn mul(self, other: &BigNum) -> BigNum {
        BigNum(&self.0 * &other.0 / scale())
    }
}

impl Mul for BigNum {
    type Output = BigNum;
    fn mul(self, other: BigNum) -> BigNum {
        &self * &other
    }
}

impl Div<&BigNum> for &BigNum {
    type Output = BigNum;
    /// Division by zero yields zero.
    fn div(self, other: &BigNum) -> BigNum {
        if other.is_zero() {
            return BigNum::zero();
        }
        BigNum(&self.0 * scale() / &other.0)
    }
}

impl Div for BigNum {
    type Output = BigNum;
    fn div(self, other: BigNum) -> BigNum {
        &self / &other
    }
}

impl Serialize for BigNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct BigNumVisitor;

impl<'de> Visitor<'de> for BigNumVisitor {
    type Value = BigNum;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<BigNum, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigNum, E> {
        Ok(BigNum::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigNum, E> {
        Ok(BigNum::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<BigNum, E> {
        Ok(BigNum::from_f64(v))
    }
}

impl<'de> Deserialize<'de> for BigNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BigNumVisitor)
    }
}
