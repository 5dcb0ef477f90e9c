//! Exact decimal amounts.
//!
//! Amounts are stored as an integer number of base units with eight
//! fractional digits (1 coin = 100_000_000 units), so arithmetic and
//! comparisons are exact. The textual form is canonical: trailing fractional
//! zeros are dropped, which keeps signatures over serialized transactions
//! independent of how a caller happened to spell a value.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Number of fractional decimal digits carried by an [`Amount`].
pub const DECIMALS: usize = 8;

/// Base units in one whole coin.
pub const UNITS_PER_COIN: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("'{0}' is not a plain decimal number")]
    InvalidFormat(String),
    #[error("'{0}' has more than 8 fractional digits")]
    TooPrecise(String),
    #[error("'{0}' is out of range")]
    Overflow(String),
    #[error("amounts cannot be negative")]
    Negative,
}

/// A decimal value counted in base units.
///
/// Transaction fields are always non-negative; balances derived by replay are
/// signed so that an inconsistent history shows up as a negative figure
/// rather than being clamped away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(units: i64) -> Self {
        Amount(units)
    }

    /// Whole coins, e.g. `Amount::from_coins(25)` is `25`.
    pub const fn from_coins(coins: i64) -> Self {
        Amount(coins.saturating_mul(UNITS_PER_COIN))
    }

    pub const fn units(&self) -> i64 {
        self.0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if s.starts_with('-') {
            return Err(AmountError::Negative);
        }

        let (whole_part, frac_part) = match s.split_once('.') {
            Some((whole, frac)) => {
                if frac.is_empty() {
                    return Err(AmountError::InvalidFormat(s.to_string()));
                }
                (whole, frac)
            }
            None => (s, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole_part.is_empty() || !all_digits(whole_part) || !all_digits(frac_part) {
            return Err(AmountError::InvalidFormat(s.to_string()));
        }
        if frac_part.len() > DECIMALS {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let whole: i64 = whole_part
            .parse()
            .map_err(|_| AmountError::Overflow(s.to_string()))?;
        let frac: i64 = if frac_part.is_empty() {
            0
        } else {
            format!("{:0<width$}", frac_part, width = DECIMALS)
                .parse()
                .map_err(|_| AmountError::InvalidFormat(s.to_string()))?
        };

        whole
            .checked_mul(UNITS_PER_COIN)
            .and_then(|units| units.checked_add(frac))
            .map(Amount)
            .ok_or_else(|| AmountError::Overflow(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_coin = UNITS_PER_COIN as u64;
        let whole = magnitude / per_coin;
        let frac = magnitude % per_coin;

        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:0width$}", frac, width = DECIMALS);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = *self - rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        if v < 0 {
            return Err(E::custom(AmountError::Negative));
        }
        self.visit_u64(v as u64)
    }

    // f64 Display yields the shortest text that round-trips, so 30.5 arrives
    // as "30.5" and not as its binary expansion.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom(AmountError::InvalidFormat(v.to_string())));
        }
        if v < 0.0 {
            return Err(E::custom(AmountError::Negative));
        }
        v.to_string().parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
