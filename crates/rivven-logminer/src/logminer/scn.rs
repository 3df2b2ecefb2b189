//! System change number (SCN)
//!
//! The position type of the redo stream. Oracle exposes SCNs as `NUMBER`
//! columns, so they are carried here as unsigned integers parsed from decimal
//! text rather than as fixed-width binary like a SQL Server LSN.

use crate::common::CdcError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// System change number: a totally ordered point in the committed change
/// stream.
///
/// `Scn::UNKNOWN` (zero) is the sentinel for "not yet observed". It is also
/// what the catalog reports as the upper bound of a redo log that is still
/// being written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scn(u128);

impl Scn {
    /// Unknown / not yet observed.
    pub const UNKNOWN: Scn = Scn(0);

    /// `NEXT_CHANGE#` reported by `V$LOG` for the CURRENT group.
    pub const ORACLE_OPEN_MARKER: Scn = Scn(0xFFFF_FFFF_FFFF);

    /// Open marker of releases with 64-bit SCNs.
    pub const ORACLE_OPEN_MARKER_WIDE: Scn = Scn(u64::MAX as u128);

    /// Create an SCN from a raw value.
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Raw value.
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// Check for the unknown sentinel.
    pub const fn is_unknown(&self) -> bool {
        self.0 == 0
    }

    /// The position immediately after this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Strictly-greater-than, spelled out for call sites that read better
    /// with a verb.
    pub fn is_after(&self, other: &Scn) -> bool {
        self > other
    }

    /// Subtract a horizon, stopping at the unknown sentinel.
    pub fn saturating_sub(&self, amount: u128) -> Self {
        Self(self.0.saturating_sub(amount))
    }

    /// Exactly one of the values Oracle reports as the upper bound of a log
    /// still being written. Extended SCNs above the 48-bit marker are
    /// ordinary positions.
    pub fn is_open_marker(&self) -> bool {
        *self == Self::ORACLE_OPEN_MARKER || *self == Self::ORACLE_OPEN_MARKER_WIDE
    }

    /// Normalize the upper bound of the CURRENT log: NULL and the open
    /// markers both mean "still being written".
    pub fn normalize_upper_bound(raw: Option<Scn>) -> Scn {
        match raw {
            Some(scn) if scn.is_open_marker() => Self::UNKNOWN,
            Some(scn) => scn,
            None => Self::UNKNOWN,
        }
    }
}

impl From<u64> for Scn {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl From<u128> for Scn {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl FromStr for Scn {
    type Err = CdcError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CdcError::invalid_scn("empty SCN"));
        }
        let invalid = |reason: &str| CdcError::invalid_scn(format!("'{}': {}", s, reason));

        // NUMBER columns come back as "1234", "1234.00" or "1.234E3"
        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
        let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((m, e)) => {
                let e = e
                    .strip_prefix('+')
                    .unwrap_or(e)
                    .parse::<u32>()
                    .map_err(|_| invalid("exponent must be a non-negative integer"))?;
                (m, e)
            }
            None => (unsigned, 0),
        };
        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let fraction = fraction.trim_end_matches('0');

        let shift = exponent
            .checked_sub(fraction.len() as u32)
            .ok_or_else(|| invalid("not an integer"))?;
        let digits = format!("{}{}", whole, fraction);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("not a decimal number"));
        }

        digits
            .parse::<u128>()
            .ok()
            .and_then(|v| 10u128.checked_pow(shift).and_then(|p| v.checked_mul(p)))
            .map(Scn)
            .ok_or_else(|| invalid("out of range"))
    }
}

impl fmt::Display for Scn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Serialized as a decimal string: JSON numbers lose precision past 2^53.
impl Serialize for Scn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Scn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
