//! Exact fixed-point wallet balance.
//!
//! # Invariants
//! - Value is an integer count of 10^-8 units; no floating point.
//! - At most 20 significant digits, 8 of them fractional (`DECIMAL(20,8)`).
//! - Text form is canonical: always exactly 8 fractional digits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Number of fractional decimal digits.
pub const BALANCE_SCALE: usize = 8;
const MAX_INTEGER_DIGITS: usize = 12;
const UNITS_PER_WHOLE: i128 = 100_000_000;
const MAX_UNITS: i128 = 10i128.pow(20) - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    Empty,
    InvalidFormat(String),
    TooManyFractionDigits(usize),
    OutOfRange,
}

impl Display for BalanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "balance cannot be empty"),
            Self::InvalidFormat(value) => write!(f, "invalid decimal balance `{value}`"),
            Self::TooManyFractionDigits(count) => write!(
                f,
                "balance has {count} fractional digits; at most {BALANCE_SCALE} allowed"
            ),
            Self::OutOfRange => write!(f, "balance exceeds DECIMAL(20,8) range"),
        }
    }
}

impl Error for BalanceError {}

/// Monetary amount with 8 fixed decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Balance(i128);

impl Balance {
    pub const ZERO: Self = Self(0);

    /// Builds a balance from raw 10^-8 units.
    pub fn from_units(units: i128) -> Result<Self, BalanceError> {
        if units.abs() > MAX_UNITS {
            return Err(BalanceError::OutOfRange);
        }
        Ok(Self(units))
    }

    pub fn units(self) -> i128 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parses `[+-]digits[.digits]` without any rounding.
    pub fn parse(text: &str) -> Result<Self, BalanceError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(BalanceError::Empty);
        }

        let invalid = || BalanceError::InvalidFormat(trimmed.to_string());
        let (negative, unsigned) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (unsigned, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let significant = whole.trim_start_matches('0');
        if significant.len() > MAX_INTEGER_DIGITS {
            return Err(BalanceError::OutOfRange);
        }

        let mut units = parse_digits(significant) * UNITS_PER_WHOLE;
        if let Some(fraction) = fraction {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            if fraction.len() > BALANCE_SCALE {
                return Err(BalanceError::TooManyFractionDigits(fraction.len()));
            }
            let padding = 10i128.pow((BALANCE_SCALE - fraction.len()) as u32);
            units += parse_digits(fraction) * padding;
        }

        Self::from_units(if negative { -units } else { units })
    }
}

fn parse_digits(digits: &str) -> i128 {
    digits
        .bytes()
        .fold(0i128, |acc, digit| acc * 10 + i128::from(digit - b'0'))
}

impl Display for Balance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_whole = UNITS_PER_WHOLE.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            magnitude / per_whole,
            magnitude % per_whole,
            width = BALANCE_SCALE
        )
    }
}

impl FromStr for Balance {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
