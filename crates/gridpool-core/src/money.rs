//! Money primitives: integer minor units and basis points.
//!
//! All money arithmetic in this crate goes through these helpers:
//! - amounts are `Cents` (u64 minor units); fractional cents never exist
//! - percentages are `Bps` in `[0, 10_000]` (correct-by-construction)
//! - products use u128 intermediates and floor division
//! - every rounding remainder is returned to the caller, never dropped

use crate::{GridpoolError, Result};
use serde::{Deserialize, Serialize};

pub const BPS_U16: u16 = 10_000;
pub const BPS_U64: u64 = 10_000;

/// Basis points in `[0, 10_000]`. Defaults to zero.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct Bps(u16);

impl Bps {
    pub const ZERO: Bps = Bps(0);
    pub const MAX: Bps = Bps(BPS_U16);

    /// Constructs a bounded bps value.
    ///
    /// Preconditions:
    /// - `v <= 10_000` (else returns an error; fail-closed).
    pub fn new(v: u16) -> Result<Bps> {
        if v <= BPS_U16 {
            Ok(Bps(v))
        } else {
            Err(GridpoolError::Configuration(format!(
                "bps out of range: {v} > {BPS_U16}"
            )))
        }
    }

    /// Whole percent (`5` -> 500 bps). Only for compile-time constants in `[0, 100]`.
    pub(crate) const fn from_percent(pct: u16) -> Bps {
        Bps(pct * 100)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Fraction in `[0.0, 1.0]`, for display and ranking only (never for money).
    pub fn as_fraction(self) -> f64 {
        self.0 as f64 / BPS_U64 as f64
    }

    pub fn checked_add(self, other: Bps) -> Result<Bps> {
        Bps::new(self.0.saturating_add(other.0))
    }

    pub fn checked_sub(self, other: Bps) -> Result<Bps> {
        self.0
            .checked_sub(other.0)
            .map(Bps)
            .ok_or_else(|| GridpoolError::Configuration("bps underflow".into()))
    }
}

impl TryFrom<u16> for Bps {
    type Error = GridpoolError;
    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        Bps::new(value)
    }
}

impl From<Bps> for u16 {
    fn from(value: Bps) -> Self {
        value.0
    }
}

impl std::fmt::Display for Bps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Amount of money in minor currency units (cents).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(v: u64) -> Cents {
        Cents(v)
    }

    /// Whole dollars. Intended for literals and tests.
    pub const fn dollars(d: u64) -> Cents {
        Cents(d * 100)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Cents) -> Result<Cents> {
        add_u64(self.0, other.0).map(Cents)
    }

    pub fn checked_sub(self, other: Cents) -> Result<Cents> {
        sub_u64(self.0, other.0).map(Cents)
    }

    pub fn checked_mul(self, n: u64) -> Result<Cents> {
        self.0
            .checked_mul(n)
            .map(Cents)
            .ok_or_else(|| GridpoolError::Overflow("u64 overflow in mul".into()))
    }

    /// `floor(self * bps / 10_000)`.
    pub fn floor_bps(self, bps: Bps) -> Result<Cents> {
        floor_bps(self.0, bps).map(Cents)
    }

    /// Even split into `n` parts: returns `(per_part, remainder)` with
    /// `per_part * n + remainder == self` and `remainder < n`.
    pub fn split_even(self, n: u64) -> Result<(Cents, Cents)> {
        if n == 0 {
            return Err(GridpoolError::Configuration(
                "cannot split among zero recipients".into(),
            ));
        }
        let per = self.0 / n;
        let rem = self.0 - per * n;
        Ok((Cents(per), Cents(rem)))
    }

    pub fn min(self, other: Cents) -> Cents {
        Cents(self.0.min(other.0))
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

pub fn mul_div_floor_u64(a: u64, b: u64, denom: u64) -> Result<u64> {
    if denom == 0 {
        return Err(GridpoolError::Configuration("division by zero".into()));
    }
    let num = (a as u128)
        .checked_mul(b as u128)
        .ok_or_else(|| GridpoolError::Overflow("u128 overflow in mul".into()))?;
    let out = num / (denom as u128);
    u64::try_from(out).map_err(|_| GridpoolError::Overflow("u64 overflow in div".into()))
}

pub fn add_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b)
        .ok_or_else(|| GridpoolError::Overflow("u64 overflow in add".into()))
}

pub fn sub_u64(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b)
        .ok_or_else(|| GridpoolError::Overflow("u64 underflow in sub".into()))
}

pub fn floor_bps(amount: u64, bps: Bps) -> Result<u64> {
    mul_div_floor_u64(amount, bps.as_u64(), BPS_U64)
}

/// Splits `amount` by `weights` (which must sum to 10_000 bps), flooring each part and
/// routing the rounding remainder into the LAST part. The parts always sum to `amount`.
pub fn split_by_weights<const N: usize>(amount: Cents, weights: &[Bps; N]) -> Result<[Cents; N]> {
    let total: u64 = weights.iter().map(|w| w.as_u64()).sum();
    if total != BPS_U64 {
        return Err(GridpoolError::Configuration(format!(
            "split weights must sum to 10_000 bps, got {total}"
        )));
    }
    let mut parts = [Cents::ZERO; N];
    if N == 0 {
        return Ok(parts);
    }
    let mut allocated = 0u64;
    for (idx, w) in weights.iter().enumerate().take(N - 1) {
        let part = floor_bps(amount.get(), *w)?;
        parts[idx] = Cents(part);
        allocated = add_u64(allocated, part)?;
    }
    parts[N - 1] = Cents(sub_u64(amount.get(), allocated)?);
    Ok(parts)
}
