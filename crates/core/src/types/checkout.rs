//! Bank-transfer checkout instructions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::OrderId;
use super::money::Money;

/// One-time payment instructions issued by the gateway for a checkout.
///
/// Instructions are ephemeral: they belong to a single checkout session and
/// are discarded when it closes. Amount and IBAN may change between sessions,
/// so they are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutInstructions {
    /// Beneficiary bank name.
    pub bank_name: String,
    /// Beneficiary IBAN.
    pub iban: String,
    /// Amount to transfer.
    pub amount: Money,
    /// Transfer description the customer must quote.
    pub description: String,
    /// Order created for this checkout.
    pub order_id: OrderId,
    /// When the instructions were received.
    pub issued_at: DateTime<Utc>,
}

impl CheckoutInstructions {
    /// IBAN grouped in blocks of four for display, e.g. `TR12 0006 ...`.
    #[must_use]
    pub fn formatted_iban(&self) -> String {
        let compact: String = self.iban.chars().filter(|c| !c.is_whitespace()).collect();
        compact
            .chars()
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|chunk| chunk.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_iban() {
        let instructions = CheckoutInstructions {
            bank_name: "Ziraat Bankası".to_string(),
            iban: "TR330006100519786457841326".to_string(),
            amount: Money::ZERO,
            description: "ORD-1".to_string(),
            order_id: OrderId::new("ORD-1"),
            issued_at: Utc::now(),
        };
        assert_eq!(
            instructions.formatted_iban(),
            "TR33 0006 1005 1978 6457 8413 26"
        );
    }
}
