//! Fixed-point timeline timestamps.
//!
//! Timeline offsets carry 4 fractional digits and must survive repeated
//! re-base operations without drift, so they are exact decimals stored as
//! scaled integers, never floats.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fractional digits carried by timeline timestamps.
pub const TIME_PRECISION: u32 = 4;

const SCALE: i64 = 10_000;

/// An exact timeline timestamp with 4 fractional digits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FixedTime(i64);

impl FixedTime {
    /// Zero timestamp.
    pub const ZERO: FixedTime = FixedTime(0);

    /// Construct from raw 1e-4 units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        FixedTime(units)
    }

    /// Raw 1e-4 units.
    #[must_use]
    pub fn units(self) -> i64 {
        self.0
    }

    /// Parse a decimal timestamp string.
    ///
    /// Accepts a decimal comma in place of the point (some locales write
    /// timeline files that way). Fractional digits beyond the fourth are
    /// accepted only when zero.
    ///
    /// # Errors
    /// [`Error::InvalidTimeValue`] on malformed input.
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = value.trim().replacen(',', ".", 1);
        let bad = || Error::InvalidTimeValue(value.to_string());

        let (negative, digits) = match normalized.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, normalized.as_str()),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(bad());
        }
        let whole: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| bad())?
        };
        // pad or validate the fractional part to exactly 4 digits
        let mut frac: i64 = 0;
        for (i, c) in frac_part.chars().enumerate() {
            let d = i64::from(c.to_digit(10).unwrap_or(0));
            if i < TIME_PRECISION as usize {
                frac = frac * 10 + d;
            } else if d != 0 {
                return Err(bad());
            }
        }
        for _ in frac_part.len()..TIME_PRECISION as usize {
            frac *= 10;
        }
        let units = whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(bad)?;
        Ok(FixedTime(if negative { -units } else { units }))
    }
}

impl fmt::Display for FixedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "0");
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:04}", abs / SCALE as u64, abs % SCALE as u64)
    }
}

impl Add for FixedTime {
    type Output = FixedTime;

    fn add(self, rhs: FixedTime) -> FixedTime {
        FixedTime(self.0 + rhs.0)
    }
}

impl Sub for FixedTime {
    type Output = FixedTime;

    fn sub(self, rhs: FixedTime) -> FixedTime {
        FixedTime(self.0 - rhs.0)
    }
}

impl Neg for FixedTime {
    type Output = FixedTime;

    fn neg(self) -> FixedTime {
        FixedTime(-self.0)
    }
}
