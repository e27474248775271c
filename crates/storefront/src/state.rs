//! Application state shared by the presentation layer.

use std::sync::Arc;

use crate::cart::CartStore;
use crate::checkout::{CheckoutSession, Clipboard};
use crate::config::StorefrontConfig;
use crate::credentials::Credentials;
use crate::gateway::{BasketGateway, GatewayError, HttpBasketGateway};
use crate::notify::Notifier;

/// Application state shared across the presentation layer.
///
/// This struct is cheaply cloneable via `Arc` and owns the one cart store,
/// the credential signal and the notice channel.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    gateway: Arc<dyn BasketGateway>,
    credentials: Credentials,
    notifier: Notifier,
    cart: Arc<CartStore>,
}

impl AppState {
    /// Create application state talking to the HTTP gateway.
    ///
    /// If the configuration carries an access token the credential signal
    /// starts signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, GatewayError> {
        let gateway = HttpBasketGateway::new(&config.gateway)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// Create application state over any gateway.
    #[must_use]
    pub fn with_gateway(config: StorefrontConfig, gateway: Arc<dyn BasketGateway>) -> Self {
        let credentials = config
            .access_token
            .clone()
            .map_or_else(Credentials::signed_out, Credentials::signed_in);
        let notifier = Notifier::new();
        let cart = Arc::new(CartStore::new(
            Arc::clone(&gateway),
            credentials.watch(),
            notifier.clone(),
            config.cart,
        ));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                credentials,
                notifier,
                cart,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The credential signal. The auth collaborator signs in and out here.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn cart(&self) -> &Arc<CartStore> {
        &self.inner.cart
    }

    /// Start a checkout session controller that copies through `clipboard`.
    #[must_use]
    pub fn checkout(&self, clipboard: Arc<dyn Clipboard>) -> CheckoutSession {
        CheckoutSession::new(
            Arc::clone(&self.inner.gateway),
            Arc::clone(&self.inner.cart),
            self.inner.credentials.watch(),
            self.inner.notifier.clone(),
            clipboard,
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}
