//! Converts "amount per period" bandwidth budgets into the bytes-per-second
//! rate tor expects, and renders rates for humans.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

const KIB: i64 = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BandwidthError {
    #[error("invalid unit: {0:?}")]
    InvalidUnit(String),

    #[error("invalid interval: {0:?}")]
    InvalidInterval(String),

    /// `amount * multiplier` does not fit in an `i64`.
    #[error("bandwidth amount is too large")]
    Overflow,
}

/// Binary (1024-based) size unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    Kb,
    Mb,
    Gb,
    Tb,
}

impl Unit {
    pub const ALL: [Self; 4] = [Self::Kb, Self::Mb, Self::Gb, Self::Tb];

    #[must_use]
    pub const fn multiplier(self) -> i64 {
        match self {
            Self::Kb => KIB,
            Self::Mb => KIB * KIB,
            Self::Gb => KIB * KIB * KIB,
            Self::Tb => KIB * KIB * KIB * KIB,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kb => "KB",
            Self::Mb => "MB",
            Self::Gb => "GB",
            Self::Tb => "TB",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = BandwidthError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str() == normalized)
            .ok_or_else(|| BandwidthError::InvalidUnit(input.to_owned()))
    }
}

/// Accounting period. A month is a fixed 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Daily => 86_400,
            Self::Weekly => 604_800,
            Self::Monthly => 2_592_000,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = BandwidthError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(BandwidthError::InvalidInterval(input.to_owned())),
        }
    }
}

/// `amount * unit / interval`, truncating toward zero.
///
/// Negative and zero amounts pass through unchanged in sign.
///
/// # Errors
/// Returns [`BandwidthError::Overflow`] when the byte total exceeds `i64`.
pub fn to_bytes_per_second(amount: i64, unit: Unit, interval: Interval) -> Result<i64, BandwidthError> {
    let total = amount
        .checked_mul(unit.multiplier())
        .ok_or(BandwidthError::Overflow)?;
    Ok(total / interval.seconds())
}

/// Parses free-text unit and interval, then converts.
///
/// # Errors
/// Returns [`BandwidthError::InvalidUnit`] or [`BandwidthError::InvalidInterval`]
/// for unrecognized text, or [`BandwidthError::Overflow`].
pub fn convert(amount: i64, unit: &str, interval: &str) -> Result<i64, BandwidthError> {
    to_bytes_per_second(amount, unit.parse()?, interval.parse()?)
}

/// Renders a rate in the largest unit it reaches, e.g. `1.94 KB/s`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pretty_print(bytes_per_sec: i64) -> String {
    for unit in [Unit::Gb, Unit::Mb, Unit::Kb] {
        if bytes_per_sec >= unit.multiplier() {
            return format!("{:.2} {unit}/s", bytes_per_sec as f64 / unit.multiplier() as f64);
        }
    }
    format!("{bytes_per_sec} B/s")
}
