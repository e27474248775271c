//! Remote basket gateway.
//!
//! # Architecture
//!
//! - The gateway is the source of truth for basket contents - the store never
//!   trusts a local edit over what the gateway reports
//! - Only coarse primitives exist: add a line, remove a line, clear, fetch.
//!   There is no "set quantity" and no flag saying whether a returned price is
//!   a unit price or a line total
//! - Every call carries the bearer credential of the signed-in user
//!
//! [`BasketGateway`] is the seam between the store and the wire. The HTTP
//! implementation is [`HttpBasketGateway`]; tests substitute an in-memory
//! gateway.
//!
//! # Example
//!
//! ```rust,ignore
//! use pinbazaar_storefront::gateway::{BasketGateway, HttpBasketGateway};
//!
//! let gateway = HttpBasketGateway::new(&config.gateway)?;
//! let lines = gateway.fetch_basket(&token).await?;
//! gateway.add_line(&token, &ProductId::new("pubg-660uc"), Quantity::ONE).await?;
//! ```

mod client;
mod conversions;
pub mod types;

pub use client::HttpBasketGateway;
pub use conversions::{convert_basket, convert_checkout};
pub use types::{BasketLine, BasketResponse, CheckoutResponse, RawPrice};

use async_trait::async_trait;
use pinbazaar_core::{CheckoutInstructions, LineId, ProductId, Quantity};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur when talking to the basket gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Gateway returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Credential rejected by the gateway.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the gateway.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response parsed but is missing required data.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Gateway is unreachable or refused the operation.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Result of initiating a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Bank-transfer instructions for this order.
    Instructions(CheckoutInstructions),
    /// The order needs manual or alternate handling. The text is shown to
    /// the user as-is; it is not an error.
    SpecialNotice(String),
}

/// Operations offered by the remote basket service.
#[async_trait]
pub trait BasketGateway: Send + Sync {
    /// Fetch the full basket, in gateway order.
    async fn fetch_basket(&self, token: &SecretString) -> Result<Vec<BasketLine>, GatewayError>;

    /// Add `quantity` units of a product. The gateway may merge the units
    /// into an existing line for the same product.
    async fn add_line(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), GatewayError>;

    /// Remove a line entirely.
    async fn remove_line(&self, token: &SecretString, line_id: &LineId)
    -> Result<(), GatewayError>;

    /// Remove every line.
    async fn clear_basket(&self, token: &SecretString) -> Result<(), GatewayError>;

    /// Turn the basket into an order and obtain payment instructions.
    async fn initiate_checkout(&self, token: &SecretString)
    -> Result<CheckoutOutcome, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::NotFound("line-123".to_string());
        assert_eq!(err.to_string(), "Not found: line-123");

        let err = GatewayError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 502 - bad gateway");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = GatewayError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
