//! The cart store: sole owner of the cart snapshot.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use pinbazaar_core::{LineId, Money, PlausibilityBand, ProductId, Quantity};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::instrument;

use super::policy::{CartOperation, MutationPolicy};
use super::quantity::{QuantityCoordinator, QuantityUpdateReport};
use super::snapshot::{CartSnapshot, LineView};
use crate::config::CartConfig;
use crate::credentials::CredentialWatch;
use crate::error::{CartError, add_breadcrumb, report_gateway_error};
use crate::gateway::{BasketGateway, GatewayError, convert_basket};
use crate::notify::Notifier;

/// Authoritative cart state for one user session.
///
/// All mutation goes through the methods on this type. Readers either take a
/// [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe) to changes.
/// How each operation treats the local snapshot is decided by
/// [`MutationPolicy::for_operation`].
pub struct CartStore {
    gateway: Arc<dyn BasketGateway>,
    credentials: CredentialWatch,
    notifier: Notifier,
    config: CartConfig,
    snapshot: watch::Sender<CartSnapshot>,
    pending_loads: AtomicUsize,
    updating: watch::Sender<HashSet<LineId>>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("config", &self.config)
            .field("snapshot", &*self.snapshot.borrow())
            .field("pending_loads", &self.pending_loads.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store with an empty snapshot.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn BasketGateway>,
        credentials: CredentialWatch,
        notifier: Notifier,
        config: CartConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot::default());
        let (updating, _) = watch::channel(HashSet::new());
        Self {
            gateway,
            credentials,
            notifier,
            config,
            snapshot,
            pending_loads: AtomicUsize::new(0),
            updating,
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Replace the snapshot with the gateway's basket.
    ///
    /// Without a credential this clears the snapshot and makes no call.
    /// Overlapping loads are not serialized; whichever resolves last wins.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` if the gateway call fails. The failure
    /// has already been reported and published as a notice.
    #[instrument(skip_all)]
    pub async fn load(&self) -> Result<(), CartError> {
        let Some(token) = self.credentials.bearer() else {
            self.reset();
            return Ok(());
        };

        let _loading = LoadingGuard::enter(self);
        match self.gateway.fetch_basket(&token).await {
            Ok(raw) => {
                if !self.credentials.is_authenticated() {
                    tracing::debug!("Signed out while loading; discarding basket");
                    return Ok(());
                }
                let lines = convert_basket(raw);
                tracing::info!(line_count = lines.len(), "Cart loaded");
                self.snapshot.send_modify(|s| {
                    s.lines = lines;
                    s.last_error = None;
                    s.loaded_at = Some(Utc::now());
                });
                Ok(())
            }
            Err(source) => Err(self.fail(CartOperation::Load, source)),
        }
    }

    /// Add `quantity` of a product, then reload.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthenticated` without a credential, or
    /// `CartError::Network` if the gateway rejects the call.
    #[instrument(skip_all, fields(product_id = %product_id, quantity = quantity.get()))]
    pub async fn add_line(&self, product_id: &ProductId, quantity: Quantity) -> Result<(), CartError> {
        let token = self.authorize(CartOperation::AddLine)?;
        add_breadcrumb(
            "cart",
            "Add line",
            Some(&[("product_id", product_id.as_str())]),
        );

        let result = self.gateway.add_line(&token, product_id, quantity).await;
        self.settle(CartOperation::AddLine, "Added to cart.", result)
            .await
    }

    /// Remove a line, then reload.
    ///
    /// On failure the snapshot is left as it was until the reconciling load
    /// replaces it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthenticated` without a credential, or
    /// `CartError::RemovalFailed` if the gateway rejects the call.
    #[instrument(skip_all, fields(line_id = %line_id))]
    pub async fn remove_line(&self, line_id: &LineId) -> Result<(), CartError> {
        let token = self.authorize(CartOperation::RemoveLine)?;
        add_breadcrumb("cart", "Remove line", Some(&[("line_id", line_id.as_str())]));

        let result = self.gateway.remove_line(&token, line_id).await;
        self.settle(CartOperation::RemoveLine, "Removed from cart.", result)
            .await
    }

    /// Set a line's quantity.
    ///
    /// Zero removes the line. Anything else runs a [`QuantityCoordinator`].
    /// Callers should not start a second update for a line while
    /// [`is_updating`](Self::is_updating) reports it in flight.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the update. The cart has been reloaded
    /// regardless.
    pub async fn update_quantity(&self, line_id: &LineId, quantity: u32) -> Result<(), CartError> {
        match Quantity::new(quantity) {
            None => self.remove_line(line_id).await,
            Some(quantity) => self
                .quantity_coordinator()
                .update_quantity(line_id, quantity)
                .await
                .and_then(QuantityUpdateReport::into_result),
        }
    }

    /// Empty the cart.
    ///
    /// The local snapshot is emptied before the gateway call. Success is
    /// silent and nothing is reloaded either way.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthenticated` without a credential, or
    /// `CartError::Network` if the gateway rejects the call.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> Result<(), CartError> {
        let token = self.authorize(CartOperation::Clear)?;
        add_breadcrumb("cart", "Clear cart", None);

        self.apply_optimistic(CartOperation::Clear);
        let result = self.gateway.clear_basket(&token).await;
        self.settle(CartOperation::Clear, "Cart emptied.", result)
            .await
    }

    /// Follow login/logout for as long as the credential writer lives.
    ///
    /// Login loads the basket; logout resets the snapshot.
    pub async fn follow_credentials(&self) {
        let mut credentials = self.credentials.clone();
        while let Some(authenticated) = credentials.changed().await {
            if authenticated {
                tracing::info!("Signed in; loading cart");
                self.reconcile().await;
            } else {
                tracing::info!("Signed out; resetting cart");
                self.reset();
            }
        }
        tracing::debug!("Credential signal closed");
    }

    /// A coordinator for a single quantity change, for callers that want to
    /// observe its phases.
    #[must_use]
    pub fn quantity_coordinator(&self) -> QuantityCoordinator<'_> {
        QuantityCoordinator::new(self)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Clone of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every snapshot change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot.subscribe()
    }

    /// Whether any load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.snapshot.borrow().loading
    }

    /// Grand total in canonical display form, e.g. `₺1.000,00`.
    #[must_use]
    pub fn total(&self) -> String {
        self.total_amount().display()
    }

    /// Grand total as an amount.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.snapshot.borrow().total(self.band())
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.snapshot.borrow().item_count()
    }

    /// Every line with its disambiguated unit price and subtotal.
    #[must_use]
    pub fn line_views(&self) -> Vec<LineView> {
        self.snapshot.borrow().line_views(self.band())
    }

    /// Whether a quantity update is in flight for `line_id`.
    #[must_use]
    pub fn is_updating(&self, line_id: &LineId) -> bool {
        self.updating.borrow().contains(line_id)
    }

    /// Receiver that observes the set of lines with an update in flight.
    #[must_use]
    pub fn subscribe_updating(&self) -> watch::Receiver<HashSet<LineId>> {
        self.updating.subscribe()
    }

    /// Band used to tell unit prices from line totals.
    #[must_use]
    pub const fn band(&self) -> &PlausibilityBand {
        &self.config.unit_price_band
    }

    /// Cart settings.
    #[must_use]
    pub const fn config(&self) -> &CartConfig {
        &self.config
    }

    // =========================================================================
    // Coordinator access
    // =========================================================================

    pub(super) fn gateway(&self) -> &dyn BasketGateway {
        self.gateway.as_ref()
    }

    pub(super) const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Check the credential for `operation`, publishing a notice if it is
    /// required and absent.
    pub(super) fn authorize(&self, operation: CartOperation) -> Result<SecretString, CartError> {
        if let Some(token) = self.credentials.bearer() {
            return Ok(token);
        }
        tracing::debug!(%operation, "Blocked: not signed in");
        let err = CartError::Unauthenticated;
        if MutationPolicy::for_operation(operation).requires_auth {
            self.notifier.error(err.user_message());
        }
        Err(err)
    }

    /// Report a gateway failure, record it on the snapshot and publish it.
    pub(super) fn fail(&self, operation: CartOperation, source: GatewayError) -> CartError {
        report_gateway_error(operation.as_str(), &source);

        let err = match operation {
            CartOperation::RemoveLine => CartError::RemovalFailed(source),
            _ => CartError::Network { operation, source },
        };
        self.record_error(&err);
        err
    }

    /// Record a failure on the snapshot and publish it.
    pub(super) fn record_error(&self, err: &CartError) {
        self.publish_failure(err.user_message());
    }

    /// Record a failure message on the snapshot and publish it.
    pub(super) fn publish_failure(&self, message: String) {
        self.snapshot
            .send_modify(|s| s.last_error = Some(message.clone()));
        self.notifier.error(message);
    }

    /// Load, logging rather than returning a failure.
    pub(super) async fn reconcile(&self) -> bool {
        match self.load().await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "Reconciling load failed");
                false
            }
        }
    }

    /// Mark `line_id` as updating until the returned guard is dropped.
    pub(super) fn mark_updating(&self, line_id: &LineId) -> UpdatingGuard<'_> {
        self.updating.send_modify(|set| {
            set.insert(line_id.clone());
        });
        UpdatingGuard {
            store: self,
            line_id: line_id.clone(),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Apply the outcome of a gateway call according to the policy table.
    async fn settle(
        &self,
        operation: CartOperation,
        success_message: &str,
        result: Result<(), GatewayError>,
    ) -> Result<(), CartError> {
        let policy = MutationPolicy::for_operation(operation);
        match result {
            Ok(()) => {
                tracing::info!(%operation, "Cart mutation succeeded");
                if policy.announce_success {
                    self.notifier.success(success_message);
                }
                if policy.reconcile_on_success {
                    self.reconcile().await;
                }
                Ok(())
            }
            Err(source) => {
                let err = self.fail(operation, source);
                if policy.reconcile_on_failure {
                    self.reconcile().await;
                }
                Err(err)
            }
        }
    }

    /// Apply the expected result of an optimistic operation locally.
    fn apply_optimistic(&self, operation: CartOperation) {
        if !MutationPolicy::for_operation(operation).optimistic {
            return;
        }
        if operation == CartOperation::Clear {
            self.snapshot.send_modify(|s| {
                s.lines.clear();
                s.last_error = None;
            });
        }
    }

    /// Empty the snapshot, keeping the loading flag in step with any loads
    /// still in flight.
    fn reset(&self) {
        let loading = self.pending_loads.load(Ordering::SeqCst) > 0;
        self.snapshot.send_replace(CartSnapshot {
            loading,
            ..CartSnapshot::default()
        });
    }
}

/// Keeps the snapshot's loading flag raised while a load is in flight.
///
/// Dropping the guard lowers it again once no other load is pending, so a
/// failed or cancelled load never leaves the flag stuck.
struct LoadingGuard<'a> {
    store: &'a CartStore,
}

impl<'a> LoadingGuard<'a> {
    fn enter(store: &'a CartStore) -> Self {
        store.pending_loads.fetch_add(1, Ordering::SeqCst);
        store.snapshot.send_if_modified(|s| !std::mem::replace(&mut s.loading, true));
        Self { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let remaining = self
            .store
            .pending_loads
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        if remaining == 0 {
            self.store
                .snapshot
                .send_if_modified(|s| std::mem::replace(&mut s.loading, false));
        }
    }
}

/// Clears a line's in-flight mark on drop.
pub(super) struct UpdatingGuard<'a> {
    store: &'a CartStore,
    line_id: LineId,
}

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.store
            .updating
            .send_if_modified(|set| set.remove(&self.line_id));
    }
}
