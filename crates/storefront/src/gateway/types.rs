//! Wire types for the basket gateway's JSON API.
//!
//! These mirror the gateway's payloads loosely - every field the gateway has
//! been seen to omit is optional. Conversion into domain types happens in
//! the `conversions` module.

use serde::{Deserialize, Serialize};

// =============================================================================
// Basket
// =============================================================================

/// Response body of `GET /basket`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasketResponse {
    /// Lines in gateway order.
    #[serde(default)]
    pub items: Vec<BasketLine>,
}

/// A basket line as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketLine {
    /// Line identifier.
    pub id: String,
    /// Product identifier.
    pub product_id: String,
    /// Product name.
    #[serde(default)]
    pub name: String,
    /// Image URL or asset key.
    #[serde(default)]
    pub image: Option<String>,
    /// Price - unit or line total, the gateway does not say which.
    #[serde(default)]
    pub price: Option<RawPrice>,
    /// Quantity. Signed because the gateway has been seen to send zero.
    #[serde(default)]
    pub quantity: i64,
}

/// A price as sent by the gateway: usually a lira string such as
/// `"₺1.250,00"`, occasionally a bare JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    /// Loosely formatted lira string.
    Text(String),
    /// Plain number with a decimal point.
    Number(serde_json::Number),
}

/// Request body of `POST /basket/items`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest<'a> {
    /// Product to add.
    pub product_id: &'a str,
    /// Units to add.
    pub quantity: u32,
}

// =============================================================================
// Checkout
// =============================================================================

/// Response body of `POST /checkout`.
///
/// Either the bank-transfer fields are present, or `special_text` is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Beneficiary bank name.
    pub bank_name: Option<String>,
    /// Beneficiary IBAN.
    pub iban: Option<String>,
    /// Amount to transfer.
    pub amount: Option<RawPrice>,
    /// Transfer description.
    pub description: Option<String>,
    /// Created order identifier.
    pub order_id: Option<String>,
    /// Informational notice replacing the instructions.
    pub special_text: Option<String>,
}
