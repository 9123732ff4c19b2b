//! Amount types with micro-unit precision
//!
//! VaultFlow uses fixed-point arithmetic with i64 micros (1 unit of currency
//! = 1,000,000 micros) to ensure overflow-safe operations. Ledger entries are
//! signed: debits are positive, credits are negative, and every balanced
//! transaction sums to exactly zero.
//!
//! Floating point never enters a monetary computation path; `to_human` exists
//! for display and logging only.

use crate::Currency;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Micros per whole unit of currency
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Errors from monetary arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Overflow during arithmetic
    #[error("Amount overflow during arithmetic operation")]
    Overflow,

    /// Currency mismatch
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },
}

/// A signed monetary amount in micros, bound to a currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// Raw value in micros (1,000,000 micros = 1 unit)
    pub micros: i64,
    /// The currency
    pub currency: Currency,
}

impl Amount {
    /// Create a new amount from raw micros
    pub fn from_micros(micros: i64, currency: Currency) -> Self {
        Self { micros, currency }
    }

    /// Create an amount from whole units (e.g. `Amount::from_units(500, USD)` is $500.00)
    ///
    /// Fails with [`AmountError::Overflow`] when the unit count does not fit
    /// in i64 micros.
    pub fn from_units(units: i64, currency: Currency) -> Result<Self, AmountError> {
        let micros = units
            .checked_mul(MICROS_PER_UNIT)
            .ok_or(AmountError::Overflow)?;
        Ok(Self { micros, currency })
    }

    /// Create a zero amount
    pub fn zero(currency: Currency) -> Self {
        Self { micros: 0, currency }
    }

    /// Check if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.micros == 0
    }

    /// Check if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.micros > 0
    }

    /// Check if the amount is strictly negative
    pub fn is_negative(&self) -> bool {
        self.micros < 0
    }

    /// Get the absolute value
    pub fn abs(&self) -> Self {
        Self {
            micros: self.micros.abs(),
            ..*self
        }
    }

    /// Negate the amount
    pub fn negate(&self) -> Self {
        Self {
            micros: -self.micros,
            ..*self
        }
    }

    /// Checked addition (currencies must match)
    pub fn checked_add(self, other: Self) -> Result<Self, AmountError> {
        self.require_same_currency(other)?;
        let micros = self
            .micros
            .checked_add(other.micros)
            .ok_or(AmountError::Overflow)?;
        Ok(Self {
            micros,
            currency: self.currency,
        })
    }

    /// Checked subtraction (currencies must match)
    pub fn checked_sub(self, other: Self) -> Result<Self, AmountError> {
        self.require_same_currency(other)?;
        let micros = self
            .micros
            .checked_sub(other.micros)
            .ok_or(AmountError::Overflow)?;
        Ok(Self {
            micros,
            currency: self.currency,
        })
    }

    fn require_same_currency(&self, other: Self) -> Result<(), AmountError> {
        if self.currency != other.currency {
            return Err(AmountError::CurrencyMismatch {
                expected: self.currency,
                actual: other.currency,
            });
        }
        Ok(())
    }

    /// Compare against another amount of the same currency
    pub fn checked_cmp(&self, other: &Self) -> Result<Ordering, AmountError> {
        self.require_same_currency(*other)?;
        Ok(self.micros.cmp(&other.micros))
    }

    /// Display value in whole units, for logs and reports only
    pub fn to_human(&self) -> f64 {
        self.micros as f64 / MICROS_PER_UNIT as f64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.micros / MICROS_PER_UNIT;
        let frac = (self.micros % MICROS_PER_UNIT).abs();
        write!(f, "{}.{:06} {}", whole, frac, self.currency)
    }
}
