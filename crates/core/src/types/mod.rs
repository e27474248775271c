//! Core types for Pinbazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod checkout;
pub mod id;
pub mod money;
pub mod pricing;

pub use cart::{CartLine, Quantity};
pub use checkout::CheckoutInstructions;
pub use id::*;
pub use money::{CURRENCY_GLYPH, Money, MoneyError, NormalizedPrice, normalize_price};
pub use pricing::{BandError, PlausibilityBand, PriceBasis, UnitPrice, resolve_unit_price};
