//! Cart line types.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::id::{LineId, ProductId};
use super::money::Money;
use super::pricing::{PlausibilityBand, UnitPrice, resolve_unit_price};

/// Number of units on a cart line. Always at least one.
///
/// A line whose quantity would drop below one is removed, never zeroed, so
/// the type cannot represent zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Create a quantity from a signed gateway value, returning `None` below one.
    #[must_use]
    pub fn from_signed(value: i64) -> Option<Self> {
        u32::try_from(value).ok().and_then(Self::new)
    }

    /// Returns the quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("quantity must be at least 1")
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Gateway-assigned line identifier.
    pub line_id: LineId,
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Product display name.
    pub name: String,
    /// Product image reference (URL or asset key).
    pub image_ref: Option<String>,
    /// Price exactly as reported by the gateway, normalized. May be a unit
    /// price or a line total; see [`CartLine::unit_price`].
    pub price: Money,
    /// Number of units.
    pub quantity: Quantity,
}

impl CartLine {
    /// Canonical display string of the raw gateway price.
    #[must_use]
    pub fn display_price(&self) -> String {
        self.price.display()
    }

    /// Disambiguated unit price for this line.
    #[must_use]
    pub fn unit_price(&self, band: &PlausibilityBand) -> UnitPrice {
        resolve_unit_price(self.price, self.quantity.get(), band)
    }

    /// Line subtotal: disambiguated unit price times quantity.
    #[must_use]
    pub fn line_total(&self, band: &PlausibilityBand) -> Money {
        self.unit_price(band).amount.times(self.quantity.get())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(price: &str, quantity: u32) -> CartLine {
        CartLine {
            line_id: LineId::new("l1"),
            product_id: ProductId::new("p1"),
            name: "Valorant 1000 VP".to_string(),
            image_ref: None,
            price: Money::parse(price).unwrap(),
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    #[test]
    fn test_quantity_rejects_zero() {
        assert!(Quantity::new(0).is_none());
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
        assert!(Quantity::from_signed(-1).is_none());
        assert!(Quantity::from_signed(0).is_none());
        assert_eq!(Quantity::from_signed(2).unwrap().get(), 2);
    }

    #[test]
    fn test_quantity_serde_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
        assert_eq!(serde_json::to_string(&Quantity::ONE).unwrap(), "1");
    }

    #[test]
    fn test_line_total_from_total_price() {
        let band = PlausibilityBand::default();
        let line = line("₺1.000,00", 2);
        assert_eq!(line.unit_price(&band).amount.display(), "₺500,00");
        assert_eq!(line.line_total(&band).display(), "₺1.000,00");
    }

    #[test]
    fn test_line_total_from_unit_price() {
        let band = PlausibilityBand::default();
        let line = line("₺30,00", 3);
        assert_eq!(line.line_total(&band).display(), "₺90,00");
        assert_eq!(line.display_price(), "₺30,00");
    }

    #[test]
    fn test_oversized_price_does_not_break_totals() {
        let band = PlausibilityBand::default();
        let mut line = line("₺30,00", 2);
        line.price = crate::normalize_price(Some("₺79.228.162.514.264.337.593.543.950.335")).amount;
        assert_eq!(line.line_total(&band), Money::ZERO);

        line.price = Money::new(Money::LIMIT);
        line.quantity = Quantity::new(u32::MAX).unwrap();
        assert!(line.line_total(&band) > Money::new(Money::LIMIT));
    }
}
