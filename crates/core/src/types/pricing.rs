//! Unit-price disambiguation.
//!
//! The basket gateway reports one price per line without saying whether it
//! is the unit price or the line total. [`resolve_unit_price`] decides with a
//! plausibility heuristic: for a line of `N > 1` units priced at `V`, if
//! `V / N` falls inside the configured [`PlausibilityBand`] then `V` is taken
//! to be a line total, otherwise it is taken to already be a unit price.
//!
//! The heuristic is wrong whenever a genuine unit price divided by the
//! quantity also lands in the band (e.g. a `₺600,00` card bought twice reads
//! as `₺300,00` each). The durable fix is a gateway field stating the basis;
//! until then the band is configuration and the tests pin current behavior.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Errors that can occur when building a [`PlausibilityBand`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BandError {
    /// The lower bound is not positive.
    #[error("band minimum must be positive (got {0})")]
    NonPositiveMin(Decimal),
    /// The lower bound exceeds the upper bound.
    #[error("band minimum {min} exceeds maximum {max}")]
    Inverted {
        /// Lower bound.
        min: Decimal,
        /// Upper bound.
        max: Decimal,
    },
}

/// Inclusive range of unit prices considered plausible for a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlausibilityBand {
    min: Decimal,
    max: Decimal,
}

impl PlausibilityBand {
    /// Default lower bound in lira.
    pub const DEFAULT_MIN: i64 = 50;
    /// Default upper bound in lira.
    pub const DEFAULT_MAX: i64 = 5000;

    /// Create a band with inclusive bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if `min` is not positive or `min > max`.
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, BandError> {
        if min <= Decimal::ZERO {
            return Err(BandError::NonPositiveMin(min));
        }
        if min > max {
            return Err(BandError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub const fn min(&self) -> Decimal {
        self.min
    }

    /// Upper bound (inclusive).
    #[must_use]
    pub const fn max(&self) -> Decimal {
        self.max
    }

    /// Returns `true` if the amount lies within the band.
    #[must_use]
    pub fn contains(&self, amount: Money) -> bool {
        let value = amount.amount();
        value >= self.min && value <= self.max
    }
}

impl Default for PlausibilityBand {
    fn default() -> Self {
        Self {
            min: Decimal::from(Self::DEFAULT_MIN),
            max: Decimal::from(Self::DEFAULT_MAX),
        }
    }
}

/// How the gateway's raw price was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    /// The raw price was used as the unit price.
    Unit,
    /// The raw price was treated as a line total and divided by the quantity.
    LineTotal,
}

/// A resolved unit price together with the interpretation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrice {
    /// Price of a single unit.
    pub amount: Money,
    /// Interpretation applied to the raw price.
    pub basis: PriceBasis,
}

/// Resolve the unit price for a line.
///
/// A quantity of zero or one always uses the raw price as-is.
///
/// ```
/// use pinbazaar_core::{Money, PlausibilityBand, PriceBasis, resolve_unit_price};
///
/// let band = PlausibilityBand::default();
/// let raw = Money::parse("₺360,00").unwrap();
///
/// let unit = resolve_unit_price(raw, 3, &band);
/// assert_eq!(unit.amount.display(), "₺120,00");
/// assert_eq!(unit.basis, PriceBasis::LineTotal);
/// ```
#[must_use]
pub fn resolve_unit_price(raw: Money, quantity: u32, band: &PlausibilityBand) -> UnitPrice {
    if quantity <= 1 {
        return UnitPrice {
            amount: raw,
            basis: PriceBasis::Unit,
        };
    }

    let candidate = raw.split(quantity);
    if band.contains(candidate) {
        UnitPrice {
            amount: candidate,
            basis: PriceBasis::LineTotal,
        }
    } else {
        UnitPrice {
            amount: raw,
            basis: PriceBasis::Unit,
        }
    }
}
