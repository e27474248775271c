//! HTTP implementation of the basket gateway.
//!
//! Uses `reqwest` with JSON bodies. Nothing is cached: the basket is mutable
//! server-side state and checkout instructions are one-time.

use std::sync::Arc;

use async_trait::async_trait;
use pinbazaar_core::{LineId, ProductId, Quantity};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::GatewayConfig;

use super::conversions::convert_checkout;
use super::types::{AddLineRequest, BasketLine, BasketResponse, CheckoutResponse};
use super::{BasketGateway, CheckoutOutcome, GatewayError};

/// Header carrying a per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum number of response body characters included in logs.
const LOG_BODY_LIMIT: usize = 500;

/// Maximum number of response body characters included in error messages.
const ERROR_BODY_LIMIT: usize = 200;

// =============================================================================
// HttpBasketGateway
// =============================================================================

/// Client for the remote basket service.
#[derive(Clone)]
pub struct HttpBasketGateway {
    inner: Arc<HttpBasketGatewayInner>,
}

struct HttpBasketGatewayInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBasketGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpBasketGatewayInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Build an absolute URL for a gateway path.
    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid gateway path {path}: {e}")))
    }

    /// Start an authenticated request.
    fn request(
        &self,
        method: Method,
        path: &str,
        token: &SecretString,
    ) -> Result<RequestBuilder, GatewayError> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        Ok(self
            .inner
            .client
            .request(method, self.url(path)?)
            .bearer_auth(token.expose_secret())
            .header(REQUEST_ID_HEADER, request_id))
    }

    /// Send a request and return the response body on success.
    async fn send(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        classify(status, &headers, &body)?;
        Ok(body)
    }

    /// Send a request and parse the JSON response body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body, LOG_BODY_LIMIT),
                "Failed to parse basket gateway response"
            );
            GatewayError::Parse(e)
        })
    }
}

#[async_trait]
impl BasketGateway for HttpBasketGateway {
    #[instrument(skip_all, fields(request_id = tracing::field::Empty))]
    async fn fetch_basket(&self, token: &SecretString) -> Result<Vec<BasketLine>, GatewayError> {
        let request = self.request(Method::GET, "basket", token)?;
        let basket: BasketResponse = self.send_json(request).await?;
        debug!(lines = basket.items.len(), "Fetched basket");
        Ok(basket.items)
    }

    #[instrument(skip_all, fields(product_id = %product_id, quantity = %quantity, request_id = tracing::field::Empty))]
    async fn add_line(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), GatewayError> {
        let body = AddLineRequest {
            product_id: product_id.as_str(),
            quantity: quantity.get(),
        };
        let request = self
            .request(Method::POST, "basket/items", token)?
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(line_id = %line_id, request_id = tracing::field::Empty))]
    async fn remove_line(
        &self,
        token: &SecretString,
        line_id: &LineId,
    ) -> Result<(), GatewayError> {
        let path = format!("basket/items/{}", encode_segment(line_id.as_str()));
        let request = self.request(Method::DELETE, &path, token)?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(request_id = tracing::field::Empty))]
    async fn clear_basket(&self, token: &SecretString) -> Result<(), GatewayError> {
        let request = self.request(Method::DELETE, "basket", token)?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(request_id = tracing::field::Empty))]
    async fn initiate_checkout(
        &self,
        token: &SecretString,
    ) -> Result<CheckoutOutcome, GatewayError> {
        let request = self.request(Method::POST, "checkout", token)?;
        let response: CheckoutResponse = self.send_json(request).await?;
        convert_checkout(response)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Truncate a string to at most `limit` characters.
fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

/// Percent-encode a single path segment.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Map a non-success response onto a [`GatewayError`].
///
/// 429 carries the `Retry-After` seconds (default 1), 401 and 403 both mean
/// the credential was rejected.
fn classify(status: StatusCode, headers: &HeaderMap, body: &str) -> Result<(), GatewayError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(1);
        return Err(GatewayError::RateLimited(retry_after));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GatewayError::Unauthorized);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound(truncate(body, ERROR_BODY_LIMIT)));
    }

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %truncate(body, LOG_BODY_LIMIT),
            "Basket gateway returned non-success status"
        );
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message: truncate(body, ERROR_BODY_LIMIT),
        });
    }

    Ok(())
}
