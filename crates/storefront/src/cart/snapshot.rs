//! Cart snapshot and derived views.

use chrono::{DateTime, Utc};
use pinbazaar_core::{CartLine, LineId, Money, PlausibilityBand, UnitPrice};
use serde::Serialize;

/// The store's view of the cart at one point in time.
///
/// Replaced wholesale on every successful load; never patched line by line
/// except by the optimistic clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    /// Lines in gateway order.
    pub lines: Vec<CartLine>,
    /// `true` while at least one load is in flight.
    pub loading: bool,
    /// User-facing message of the most recent failure, cleared by a
    /// successful load.
    pub last_error: Option<String>,
    /// When the lines were last replaced from the gateway.
    pub loaded_at: Option<DateTime<Utc>>,
}

impl CartSnapshot {
    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, line_id: &LineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.line_id == line_id)
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity.get()))
    }

    /// Grand total: disambiguated unit price times quantity, summed.
    #[must_use]
    pub fn total(&self, band: &PlausibilityBand) -> Money {
        self.lines.iter().map(|l| l.line_total(band)).sum()
    }

    /// Per-line display data.
    #[must_use]
    pub fn line_views(&self, band: &PlausibilityBand) -> Vec<LineView> {
        self.lines
            .iter()
            .map(|line| LineView {
                unit_price: line.unit_price(band),
                line_total: line.line_total(band),
                line: line.clone(),
            })
            .collect()
    }
}

/// A cart line with its disambiguated prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineView {
    /// The line as the gateway returned it.
    pub line: CartLine,
    /// Resolved unit price and how it was derived.
    pub unit_price: UnitPrice,
    /// Unit price times quantity.
    pub line_total: Money,
}

impl LineView {
    /// Unit price in canonical display form.
    #[must_use]
    pub fn unit_price_display(&self) -> String {
        self.unit_price.amount.display()
    }

    #[must_use]
    pub fn line_total_display(&self) -> String {
        self.line_total.display()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pinbazaar_core::{PriceBasis, ProductId, Quantity};

    use super::*;

    fn line(id: &str, price: &str, quantity: u32) -> CartLine {
        CartLine {
            line_id: LineId::new(id),
            product_id: ProductId::new(format!("product-{id}")),
            name: format!("Product {id}"),
            image_ref: None,
            price: Money::parse(price).unwrap(),
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = CartSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.item_count(), 0);
        assert_eq!(
            snapshot.total(&PlausibilityBand::default()).display(),
            "₺0,00"
        );
    }

    #[test]
    fn test_totals_mix_unit_and_total_prices() {
        let band = PlausibilityBand::default();
        let snapshot = CartSnapshot {
            lines: vec![
                // 360 / 3 = 120 is plausible, so 360 is the line total
                line("a", "₺360,00", 3),
                // 30 / 3 = 10 is not, so 30 is the unit price
                line("b", "₺30,00", 3),
                line("c", "₺75,50", 1),
            ],
            ..CartSnapshot::default()
        };

        assert_eq!(snapshot.item_count(), 7);
        // 360 + 90 + 75,50
        assert_eq!(snapshot.total(&band).display(), "₺525,50");

        let views = snapshot.line_views(&band);
        assert_eq!(views[0].unit_price_display(), "₺120,00");
        assert_eq!(views[0].unit_price.basis, PriceBasis::LineTotal);
        assert_eq!(views[1].line_total_display(), "₺90,00");
        assert_eq!(views[2].line_total_display(), "₺75,50");
    }

    #[test]
    fn test_total_is_idempotent() {
        let band = PlausibilityBand::default();
        let snapshot = CartSnapshot {
            lines: vec![line("a", "₺1.000,00", 2)],
            ..CartSnapshot::default()
        };
        let first = snapshot.total(&band);
        let second = snapshot.total(&band);
        assert_eq!(first, second);
        assert_eq!(first.display(), "₺1.000,00");
    }

    #[test]
    fn test_line_lookup() {
        let snapshot = CartSnapshot {
            lines: vec![line("a", "₺10,00", 1)],
            ..CartSnapshot::default()
        };
        assert!(snapshot.line(&LineId::new("a")).is_some());
        assert!(snapshot.line(&LineId::new("z")).is_none());
    }
}
