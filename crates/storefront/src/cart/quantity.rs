//! "Set quantity" emulated on top of remove and add.
//!
//! The gateway has no way to change a line's quantity in place. A change is
//! made by removing the line, waiting a short stabilization delay, adding the
//! product back with the new quantity and then reloading the basket:
//!
//! ```text
//! Idle -> Removing -> Stabilizing -> ReAdding -> Reconciling -> Idle
//! ```
//!
//! Each step starts only after the previous one has settled, whether it
//! succeeded or not. The final reload always runs: a half-finished
//! remove/re-add cannot be rolled back locally without risking duplicate
//! lines, so the gateway's view is taken as the answer.
//!
//! Two runs for the same line are not prevented here. The store marks a line
//! while a run is in flight (see [`CartStore::is_updating`]) so the
//! presentation can disable its control.

use pinbazaar_core::{LineId, Quantity};
use serde::Serialize;
use tokio::sync::watch;
use tracing::instrument;

use super::policy::CartOperation;
use super::store::CartStore;
use crate::error::{CartError, add_breadcrumb, failure_message, report_gateway_error};
use crate::gateway::GatewayError;

/// Where a quantity change currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorPhase {
    #[default]
    Idle,
    Removing,
    Stabilizing,
    ReAdding,
    Reconciling,
}

/// Outcome of one gateway step.
#[derive(Debug)]
pub enum StepOutcome {
    Succeeded,
    Failed(GatewayError),
}

impl StepOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<Result<(), GatewayError>> for StepOutcome {
    fn from(result: Result<(), GatewayError>) -> Self {
        match result {
            Ok(()) => Self::Succeeded,
            Err(err) => Self::Failed(err),
        }
    }
}

/// What happened during one quantity change.
#[derive(Debug)]
pub struct QuantityUpdateReport {
    pub line_id: LineId,
    pub requested: Quantity,
    pub removal: StepOutcome,
    pub re_add: StepOutcome,
    /// Whether the final reload succeeded.
    pub reconciled: bool,
}

impl QuantityUpdateReport {
    /// Both gateway mutations succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.removal.is_success() && self.re_add.is_success()
    }

    /// Collapse into the first failed mutation, if any.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` for the first step that failed.
    pub fn into_result(self) -> Result<(), CartError> {
        for step in [self.removal, self.re_add] {
            if let StepOutcome::Failed(source) = step {
                return Err(CartError::Network {
                    operation: CartOperation::UpdateQuantity,
                    source,
                });
            }
        }
        Ok(())
    }
}

/// Runs quantity changes against a [`CartStore`].
pub struct QuantityCoordinator<'a> {
    store: &'a CartStore,
    phase: watch::Sender<CoordinatorPhase>,
}

impl<'a> QuantityCoordinator<'a> {
    #[must_use]
    pub fn new(store: &'a CartStore) -> Self {
        let (phase, _) = watch::channel(CoordinatorPhase::Idle);
        Self { store, phase }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> CoordinatorPhase {
        *self.phase.borrow()
    }

    /// Receiver that observes every phase transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorPhase> {
        self.phase.subscribe()
    }

    /// Change `line_id` to `quantity`.
    ///
    /// Issues exactly one remove, one add and one load, in that order,
    /// whatever the outcome of each. Step failures are published as a single
    /// notice and recorded in the report rather than returned.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthenticated` without a credential and
    /// `CartError::UnknownLine` if the line is not in the snapshot. Nothing is
    /// sent to the gateway in either case.
    #[instrument(skip_all, fields(line_id = %line_id, quantity = quantity.get()))]
    pub async fn update_quantity(
        &self,
        line_id: &LineId,
        quantity: Quantity,
    ) -> Result<QuantityUpdateReport, CartError> {
        let token = self.store.authorize(CartOperation::UpdateQuantity)?;
        let Some(product_id) = self
            .store
            .snapshot()
            .line(line_id)
            .map(|line| line.product_id.clone())
        else {
            let err = CartError::UnknownLine(line_id.clone());
            self.store.record_error(&err);
            return Err(err);
        };

        let quantity_text = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Update quantity",
            Some(&[("line_id", line_id.as_str()), ("quantity", &quantity_text)]),
        );
        let _updating = self.store.mark_updating(line_id);
        let gateway = self.store.gateway();

        self.enter(CoordinatorPhase::Removing);
        let removal = gateway.remove_line(&token, line_id).await;

        self.enter(CoordinatorPhase::Stabilizing);
        tokio::time::sleep(self.store.config().stabilization_delay).await;

        self.enter(CoordinatorPhase::ReAdding);
        let re_add = gateway.add_line(&token, &product_id, quantity).await;

        let first_failure = removal.as_ref().err().or_else(|| re_add.as_ref().err());
        if let Some(err) = first_failure {
            for failed in [&removal, &re_add].into_iter().filter_map(|r| r.as_ref().err()) {
                report_gateway_error(CartOperation::UpdateQuantity.as_str(), failed);
            }
            self.store.publish_failure(
                failure_message(CartOperation::UpdateQuantity, err).to_string(),
            );
        }

        self.enter(CoordinatorPhase::Reconciling);
        let reconciled = self.store.reconcile().await;
        self.enter(CoordinatorPhase::Idle);

        let report = QuantityUpdateReport {
            line_id: line_id.clone(),
            requested: quantity,
            removal: removal.into(),
            re_add: re_add.into(),
            reconciled,
        };
        if report.is_success() {
            tracing::info!("Quantity updated");
            self.store.notifier().success("Quantity updated.");
        }
        Ok(report)
    }

    fn enter(&self, phase: CoordinatorPhase) {
        tracing::debug!(?phase, "Quantity update phase");
        self.phase.send_replace(phase);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success() {
        let report = QuantityUpdateReport {
            line_id: LineId::new("a"),
            requested: Quantity::new(3).unwrap(),
            removal: StepOutcome::Succeeded,
            re_add: StepOutcome::Succeeded,
            reconciled: true,
        };
        assert!(report.is_success());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_report_surfaces_first_failure() {
        let report = QuantityUpdateReport {
            line_id: LineId::new("a"),
            requested: Quantity::new(3).unwrap(),
            removal: StepOutcome::Failed(GatewayError::NotFound("a".to_string())),
            re_add: StepOutcome::Failed(GatewayError::Unauthorized),
            reconciled: false,
        };
        assert!(!report.is_success());
        let err = report.into_result().unwrap_err();
        assert!(matches!(
            err,
            CartError::Network {
                operation: CartOperation::UpdateQuantity,
                source: GatewayError::NotFound(_),
            }
        ));
    }

    #[test]
    fn test_phase_defaults_to_idle() {
        assert_eq!(CoordinatorPhase::default(), CoordinatorPhase::Idle);
    }
}
