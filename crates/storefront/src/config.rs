//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PINBAZAAR_GATEWAY_URL` - Base URL of the basket gateway
//!
//! ## Optional
//! - `PINBAZAAR_ACCESS_TOKEN` - Bearer credential used when no auth provider
//!   is wired in (the CLI reads it at startup)
//! - `PINBAZAAR_REQUEST_TIMEOUT_SECS` - HTTP timeout (default: 15)
//! - `PINBAZAAR_STABILIZATION_DELAY_MS` - Pause between remove and re-add
//!   when changing a quantity (default: 100)
//! - `PINBAZAAR_UNIT_PRICE_MIN` - Lower bound of the plausible unit price band (default: 50)
//! - `PINBAZAAR_UNIT_PRICE_MAX` - Upper bound of the plausible unit price band (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Sentry event sample rate (default: 1.0)

use std::str::FromStr;
use std::time::Duration;

use pinbazaar_core::{BandError, PlausibilityBand};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_STABILIZATION_DELAY_MS: u64 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid unit price band: {0}")]
    InvalidBand(#[from] BandError),
}

/// Storefront application configuration.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Basket gateway connection settings
    pub gateway: GatewayConfig,
    /// Static bearer credential, if one was provided
    pub access_token: Option<SecretString>,
    /// Cart behavior tuning
    pub cart: CartConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry event sample rate
    pub sentry_sample_rate: f32,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("gateway", &self.gateway)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cart", &self.cart)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .finish()
    }
}

/// Basket gateway connection settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL; always ends with `/` so relative paths join beneath it
    pub base_url: Url,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Cart behavior tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartConfig {
    /// Pause between removing and re-adding a line during a quantity change
    pub stabilization_delay: Duration,
    /// Unit prices considered plausible when disambiguating line prices
    pub unit_price_band: PlausibilityBand,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            stabilization_delay: Duration::from_millis(DEFAULT_STABILIZATION_DELAY_MS),
            unit_price_band: PlausibilityBand::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required keys are missing or any value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let gateway = GatewayConfig {
            base_url: parse_base_url("PINBAZAAR_GATEWAY_URL", &env.required("PINBAZAAR_GATEWAY_URL")?)?,
            request_timeout: Duration::from_secs(
                env.parsed_or("PINBAZAAR_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            ),
        };

        let band = PlausibilityBand::new(
            env.parsed_or(
                "PINBAZAAR_UNIT_PRICE_MIN",
                Decimal::from(PlausibilityBand::DEFAULT_MIN),
            )?,
            env.parsed_or(
                "PINBAZAAR_UNIT_PRICE_MAX",
                Decimal::from(PlausibilityBand::DEFAULT_MAX),
            )?,
        )?;

        let cart = CartConfig {
            stabilization_delay: Duration::from_millis(
                env.parsed_or("PINBAZAAR_STABILIZATION_DELAY_MS", DEFAULT_STABILIZATION_DELAY_MS)?,
            ),
            unit_price_band: band,
        };

        Ok(Self {
            gateway,
            access_token: env
                .optional("PINBAZAAR_ACCESS_TOKEN")
                .filter(|t| !t.trim().is_empty())
                .map(SecretString::from),
            cart,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parsed_or("SENTRY_SAMPLE_RATE", 1.0)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Thin wrapper over a key lookup with typed accessors.
struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.is_empty())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Parse the gateway base URL, ensuring a trailing slash.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_missing_gateway_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "PINBAZAAR_GATEWAY_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("PINBAZAAR_GATEWAY_URL", "https://api.example.com/v1")]).unwrap();
        assert_eq!(
            config.gateway.base_url.as_str(),
            "https://api.example.com/v1/"
        );
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(15));
        assert_eq!(config.cart, CartConfig::default());
        assert_eq!(
            config.cart.stabilization_delay,
            Duration::from_millis(100)
        );
        assert!(config.access_token.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_custom_band_and_delay() {
        let config = load(&[
            ("PINBAZAAR_GATEWAY_URL", "https://api.example.com/"),
            ("PINBAZAAR_UNIT_PRICE_MIN", "10"),
            ("PINBAZAAR_UNIT_PRICE_MAX", "250.5"),
            ("PINBAZAAR_STABILIZATION_DELAY_MS", "250"),
            ("PINBAZAAR_ACCESS_TOKEN", "tok_abc"),
        ])
        .unwrap();
        assert_eq!(config.cart.unit_price_band.min(), Decimal::from(10));
        assert_eq!(config.cart.unit_price_band.max(), Decimal::new(2505, 1));
        assert_eq!(config.cart.stabilization_delay, Duration::from_millis(250));
        assert_eq!(
            config.access_token.unwrap().expose_secret(),
            "tok_abc"
        );
    }

    #[test]
    fn test_inverted_band_rejected() {
        let err = load(&[
            ("PINBAZAAR_GATEWAY_URL", "https://api.example.com/"),
            ("PINBAZAAR_UNIT_PRICE_MIN", "6000"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBand(_)));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = load(&[
            ("PINBAZAAR_GATEWAY_URL", "https://api.example.com/"),
            ("PINBAZAAR_REQUEST_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "PINBAZAAR_REQUEST_TIMEOUT_SECS")
        );
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let err = load(&[("PINBAZAAR_GATEWAY_URL", "ftp://api.example.com/")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[
            ("PINBAZAAR_GATEWAY_URL", "https://api.example.com/"),
            ("PINBAZAAR_ACCESS_TOKEN", "super_secret_token_value"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
        ])
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_value"));
        assert!(!debug_output.contains("key@sentry"));
    }
}
