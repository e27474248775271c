//! Gateway payload to domain type conversions.

use std::str::FromStr;

use chrono::Utc;
use pinbazaar_core::{
    CartLine, CheckoutInstructions, LineId, Money, OrderId, ProductId, Quantity, normalize_price,
};
use rust_decimal::Decimal;
use tracing::warn;

use super::types::{BasketLine, CheckoutResponse, RawPrice};
use super::{CheckoutOutcome, GatewayError};

/// Convert gateway lines into cart lines, preserving gateway order.
///
/// Lines with a quantity below one are dropped: a line that falls below one
/// unit is gone, not zeroed.
#[must_use]
pub fn convert_basket(lines: Vec<BasketLine>) -> Vec<CartLine> {
    lines.into_iter().filter_map(convert_line).collect()
}

fn convert_line(line: BasketLine) -> Option<CartLine> {
    let Some(quantity) = Quantity::from_signed(line.quantity) else {
        warn!(
            line_id = %line.id,
            quantity = line.quantity,
            "Dropping basket line with quantity below one"
        );
        return None;
    };

    let price = convert_price(line.price.as_ref(), &line.id);

    Some(CartLine {
        line_id: LineId::new(line.id),
        product_id: ProductId::new(line.product_id),
        name: line.name,
        image_ref: line.image.filter(|s| !s.is_empty()),
        price,
        quantity,
    })
}

/// Normalize a raw gateway price. Malformed prices become zero so that one
/// bad line never blocks the rest of the cart.
fn convert_price(raw: Option<&RawPrice>, context: &str) -> Money {
    match raw {
        None => Money::ZERO,
        Some(RawPrice::Text(text)) => {
            let normalized = normalize_price(Some(text.as_str()));
            if normalized.malformed {
                warn!(context, raw = %text, "Malformed price, substituting zero");
            }
            normalized.amount
        }
        Some(RawPrice::Number(number)) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .and_then(Money::bounded)
                .unwrap_or_else(|| {
                    warn!(context, raw = %text, "Malformed numeric price, substituting zero");
                    Money::ZERO
                })
        }
    }
}

/// Convert a checkout response into either instructions or a special notice.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidResponse`] when neither a special notice
/// nor a complete set of bank-transfer fields is present.
pub fn convert_checkout(response: CheckoutResponse) -> Result<CheckoutOutcome, GatewayError> {
    if let Some(text) = response
        .special_text
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
    {
        return Ok(CheckoutOutcome::SpecialNotice(text));
    }

    let missing = |field: &str| GatewayError::InvalidResponse(format!("checkout missing {field}"));

    let bank_name = response.bank_name.ok_or_else(|| missing("bankName"))?;
    let iban = response.iban.ok_or_else(|| missing("iban"))?;
    let order_id = response.order_id.ok_or_else(|| missing("orderId"))?;
    let amount = convert_price(response.amount.as_ref(), &order_id);

    Ok(CheckoutOutcome::Instructions(CheckoutInstructions {
        bank_name,
        iban,
        amount,
        description: response.description.unwrap_or_else(|| order_id.clone()),
        order_id: OrderId::new(order_id),
        issued_at: Utc::now(),
    }))
}
