//! Unified error handling with Sentry integration.
//!
//! Cart and checkout failures are recoverable: they are handled where they
//! happen and turned into a short user-facing message. The error types here
//! carry enough context to pick that message, and server-side failures are
//! captured to Sentry before being shown.

use thiserror::Error;

use pinbazaar_core::LineId;

use crate::cart::CartOperation;
use crate::gateway::GatewayError;

/// Shown when nothing more specific applies.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors surfaced by the cart store.
#[derive(Debug, Error)]
pub enum CartError {
    /// No credential present; the action was blocked before any network call.
    #[error("Not signed in")]
    Unauthenticated,

    /// The line is not in the current snapshot.
    #[error("Unknown cart line: {0}")]
    UnknownLine(LineId),

    /// Removing a line failed. The snapshot was left as it was.
    #[error("Removal failed: {0}")]
    RemovalFailed(#[source] GatewayError),

    /// Any other gateway rejection.
    #[error("{operation} failed: {source}")]
    Network {
        operation: CartOperation,
        #[source]
        source: GatewayError,
    },
}

impl CartError {
    /// The gateway error behind this failure, if any.
    #[must_use]
    pub const fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Unauthenticated | Self::UnknownLine(_) => None,
            Self::RemovalFailed(source) | Self::Network { source, .. } => Some(source),
        }
    }

    /// Short message suitable for a toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please sign in to use your cart.",
            Self::UnknownLine(_) => "That item is no longer in your cart.",
            Self::RemovalFailed(source) => failure_message(CartOperation::RemoveLine, source),
            Self::Network { operation, source } => failure_message(*operation, source),
        }
        .to_string()
    }
}

/// Message for a gateway failure during a cart operation.
#[must_use]
pub const fn failure_message(operation: CartOperation, err: &GatewayError) -> &'static str {
    if let Some(message) = gateway_user_message(err) {
        return message;
    }
    match operation {
        CartOperation::Load => "Could not load your cart.",
        CartOperation::AddLine => "Could not add the item to your cart.",
        CartOperation::RemoveLine => "Could not remove the item from your cart.",
        CartOperation::UpdateQuantity => "Could not update the quantity.",
        CartOperation::Clear => "Could not empty your cart.",
    }
}

/// Errors surfaced by the checkout session controller.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No credential present.
    #[error("Not signed in")]
    Unauthenticated,

    /// Confirm was requested without payment instructions.
    #[error("No payment instructions available")]
    NotReady,

    /// Confirm was requested while a confirm is already running.
    #[error("Confirmation already in progress")]
    ConfirmInFlight,

    /// Checkout initiation failed.
    #[error("Checkout failed: {0}")]
    Network(#[from] GatewayError),

    /// Clearing the cart during confirmation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
}

impl CheckoutError {
    /// Short message suitable for a toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please sign in to complete your purchase.".to_string(),
            Self::NotReady => "Payment details are not ready yet.".to_string(),
            Self::ConfirmInFlight => "Your order is already being confirmed.".to_string(),
            Self::Network(err) => gateway_user_message(err)
                .unwrap_or("Could not start checkout. Please try again.")
                .to_string(),
            Self::Cart(err) => err.user_message(),
        }
    }
}

/// Messages that depend only on the gateway failure, not the operation.
const fn gateway_user_message(err: &GatewayError) -> Option<&'static str> {
    match err {
        GatewayError::Unauthorized => Some("Your session has expired. Please sign in again."),
        GatewayError::RateLimited(_) => Some("Too many requests. Please wait a moment."),
        _ => None,
    }
}

/// Whether a gateway failure is worth reporting to Sentry.
///
/// Expired sessions and rate limits are expected and only logged.
#[must_use]
pub const fn is_reportable(err: &GatewayError) -> bool {
    !matches!(
        err,
        GatewayError::Unauthorized | GatewayError::RateLimited(_)
    )
}

/// Capture a gateway failure to Sentry (if reportable) and log it.
pub fn report_gateway_error(context: &str, err: &GatewayError) {
    if is_reportable(err) {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            context,
            "Basket gateway error"
        );
    } else {
        tracing::warn!(error = %err, context, "Basket gateway rejected request");
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added line", Some(&[("product_id", "pubg-660uc")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable() -> GatewayError {
        GatewayError::Unavailable("connection refused".to_string())
    }

    #[test]
    fn test_cart_error_display() {
        let err = CartError::Network {
            operation: CartOperation::AddLine,
            source: unavailable(),
        };
        assert_eq!(
            err.to_string(),
            "add line failed: Gateway unavailable: connection refused"
        );
        assert_eq!(CartError::Unauthenticated.to_string(), "Not signed in");
    }

    #[test]
    fn test_cart_error_user_messages() {
        assert_eq!(
            CartError::Unauthenticated.user_message(),
            "Please sign in to use your cart."
        );
        assert_eq!(
            CartError::RemovalFailed(unavailable()).user_message(),
            "Could not remove the item from your cart."
        );
        assert_eq!(
            CartError::Network {
                operation: CartOperation::Clear,
                source: unavailable(),
            }
            .user_message(),
            "Could not empty your cart."
        );
    }

    #[test]
    fn test_gateway_specific_messages_take_precedence() {
        let err = CartError::Network {
            operation: CartOperation::Load,
            source: GatewayError::Unauthorized,
        };
        assert_eq!(
            err.user_message(),
            "Your session has expired. Please sign in again."
        );

        let err = CheckoutError::Network(GatewayError::RateLimited(3));
        assert_eq!(err.user_message(), "Too many requests. Please wait a moment.");
    }

    #[test]
    fn test_checkout_error_user_messages() {
        assert_eq!(
            CheckoutError::NotReady.user_message(),
            "Payment details are not ready yet."
        );
        assert_eq!(
            CheckoutError::Network(unavailable()).user_message(),
            "Could not start checkout. Please try again."
        );
        assert_eq!(
            CheckoutError::Cart(CartError::Unauthenticated).user_message(),
            "Please sign in to use your cart."
        );
    }

    #[test]
    fn test_reportable() {
        assert!(is_reportable(&unavailable()));
        assert!(!is_reportable(&GatewayError::Unauthorized));
        assert!(!is_reportable(&GatewayError::RateLimited(1)));
    }
}
