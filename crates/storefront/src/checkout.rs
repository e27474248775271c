//! Checkout session controller.
//!
//! A session turns the basket into one-time bank-transfer instructions and,
//! once the user confirms the transfer, clears the cart and hands off to
//! order history.
//!
//! ```text
//! Closed -> FetchingInstructions -> Ready -> Confirming -> Closed
//!                  |                  ^          |
//!                  |                  +-- error -+
//!                  +-> SpecialNotice
//!                  +-> Unavailable
//! ```
//!
//! Each open-to-close cycle initiates checkout at most once. Closing from any
//! state discards the instructions, and a response that arrives after the
//! session was closed is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use pinbazaar_core::{CheckoutInstructions, OrderId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use crate::cart::CartStore;
use crate::credentials::CredentialWatch;
use crate::error::{CheckoutError, add_breadcrumb, report_gateway_error};
use crate::gateway::{BasketGateway, CheckoutOutcome};
use crate::notify::Notifier;

/// Error writing to the clipboard.
#[derive(Debug, Error)]
#[error("Clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);

/// Somewhere to copy payment details to.
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Place `text` on the clipboard. `label` names it for logs.
    async fn copy(&self, label: &str, text: &str) -> Result<(), ClipboardError>;
}

/// Where the session currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Closed,
    FetchingInstructions,
    Ready(CheckoutInstructions),
    /// The order needs manual handling; the text is shown as-is.
    SpecialNotice(String),
    /// Checkout could not be started. Holds the user-facing message.
    Unavailable(String),
    Confirming(CheckoutInstructions),
}

impl CheckoutState {
    /// Payment instructions, while they are held.
    #[must_use]
    pub const fn instructions(&self) -> Option<&CheckoutInstructions> {
        match self {
            Self::Ready(instructions) | Self::Confirming(instructions) => Some(instructions),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Where the user goes after a confirmed checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    OrderHistory,
}

/// Result of a successful confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmOutcome {
    pub order_id: OrderId,
    pub next: Destination,
}

/// Drives one checkout at a time.
pub struct CheckoutSession {
    gateway: Arc<dyn BasketGateway>,
    store: Arc<CartStore>,
    credentials: CredentialWatch,
    notifier: Notifier,
    clipboard: Arc<dyn Clipboard>,
    state: watch::Sender<CheckoutState>,
    /// Bumped on every close so late responses can be recognized.
    generation: AtomicU64,
}

impl std::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("state", &*self.state.borrow())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CheckoutSession {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn BasketGateway>,
        store: Arc<CartStore>,
        credentials: CredentialWatch,
        notifier: Notifier,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Closed);
        Self {
            gateway,
            store,
            credentials,
            notifier,
            clipboard,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn instructions(&self) -> Option<CheckoutInstructions> {
        self.state.borrow().instructions().cloned()
    }

    /// Whether the confirm control should be enabled.
    #[must_use]
    pub fn can_confirm(&self) -> bool {
        matches!(*self.state.borrow(), CheckoutState::Ready(_))
    }

    /// Open the session and fetch payment instructions.
    ///
    /// Does nothing if the session is already open, so repeated calls during
    /// one cycle never initiate checkout twice.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Unauthenticated` without a credential, or
    /// `CheckoutError::Network` if initiation fails. Both are also published
    /// as notices.
    #[instrument(skip_all)]
    pub async fn open(&self) -> Result<(), CheckoutError> {
        let Some(token) = self.credentials.bearer() else {
            let err = CheckoutError::Unauthenticated;
            self.notifier.error(err.user_message());
            return Err(err);
        };

        let started = self.state.send_if_modified(|state| {
            if state.is_open() {
                return false;
            }
            *state = CheckoutState::FetchingInstructions;
            true
        });
        if !started {
            tracing::debug!("Checkout already open; not fetching again");
            return Ok(());
        }

        add_breadcrumb("checkout", "Open checkout", None);
        let guard = FetchGuard::enter(self);
        let result = self.gateway.initiate_checkout(&token).await;

        if self.generation.load(Ordering::SeqCst) != guard.generation {
            tracing::debug!("Checkout closed while fetching; discarding response");
            return Ok(());
        }

        match result {
            Ok(CheckoutOutcome::Instructions(instructions)) => {
                tracing::info!(order_id = %instructions.order_id, "Checkout instructions ready");
                self.state.send_replace(CheckoutState::Ready(instructions));
                Ok(())
            }
            Ok(CheckoutOutcome::SpecialNotice(text)) => {
                tracing::info!("Checkout returned a special notice");
                self.notifier.info(text.clone());
                self.state.send_replace(CheckoutState::SpecialNotice(text));
                Ok(())
            }
            Err(source) => {
                report_gateway_error("initiate checkout", &source);
                let err = CheckoutError::Network(source);
                let message = err.user_message();
                self.notifier.error(message.clone());
                self.state.send_replace(CheckoutState::Unavailable(message));
                Err(err)
            }
        }
    }

    /// Confirm the transfer: clear the cart, close the session and send the
    /// user to order history.
    ///
    /// The confirm control is disabled only by [`can_confirm`](Self::can_confirm)
    /// turning false while this runs; the gateway offers nothing that would
    /// make a second confirmation harmless.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotReady` without instructions,
    /// `CheckoutError::ConfirmInFlight` while another confirm runs, or
    /// `CheckoutError::Cart` if clearing the cart fails. After a failed clear
    /// the session is back in `Ready`.
    #[instrument(skip_all)]
    pub async fn confirm(&self) -> Result<ConfirmOutcome, CheckoutError> {
        let mut rejection = None;
        self.state.send_if_modified(|state| match state {
            CheckoutState::Ready(instructions) => {
                *state = CheckoutState::Confirming(instructions.clone());
                true
            }
            CheckoutState::Confirming(_) => {
                rejection = Some(CheckoutError::ConfirmInFlight);
                false
            }
            _ => {
                rejection = Some(CheckoutError::NotReady);
                false
            }
        });
        if let Some(err) = rejection {
            tracing::debug!(error = %err, "Confirm rejected");
            self.notifier.error(err.user_message());
            return Err(err);
        }

        let Some(instructions) = self.instructions() else {
            return Err(CheckoutError::NotReady);
        };
        let order_id = instructions.order_id.clone();
        add_breadcrumb(
            "checkout",
            "Confirm transfer",
            Some(&[("order_id", order_id.as_str())]),
        );

        match self.store.clear().await {
            Ok(()) => {
                tracing::info!(%order_id, "Checkout confirmed");
                self.close();
                self.notifier
                    .success("Your order has been received. We will process it once your transfer arrives.");
                Ok(ConfirmOutcome {
                    order_id,
                    next: Destination::OrderHistory,
                })
            }
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "Clearing cart during checkout failed");
                self.state.send_if_modified(|state| {
                    if let CheckoutState::Confirming(instructions) = state {
                        *state = CheckoutState::Ready(instructions.clone());
                        return true;
                    }
                    false
                });
                Err(CheckoutError::Cart(err))
            }
        }
    }

    /// Close the session from any state, discarding instructions.
    ///
    /// The next [`open`](Self::open) fetches fresh instructions.
    pub fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.state.send_replace(CheckoutState::Closed);
        if previous.is_open() {
            tracing::debug!("Checkout closed");
        }
    }

    /// Copy the beneficiary bank name. Failure only publishes a notice.
    pub async fn copy_bank_name(&self) {
        let Some(instructions) = self.instructions() else {
            return;
        };
        self.copy("bank name", &instructions.bank_name, "Bank name copied.")
            .await;
    }

    /// Copy the IBAN. Failure only publishes a notice.
    pub async fn copy_iban(&self) {
        let Some(instructions) = self.instructions() else {
            return;
        };
        self.copy("IBAN", &instructions.iban, "IBAN copied.").await;
    }

    async fn copy(&self, label: &str, text: &str, success: &str) {
        match self.clipboard.copy(label, text).await {
            Ok(()) => self.notifier.success(success),
            Err(err) => {
                tracing::warn!(label, error = %err, "Copy to clipboard failed");
                self.notifier.error(format!("Could not copy the {label}."));
            }
        }
    }
}

/// Marks an instruction fetch in flight.
///
/// Dropping the guard while the session is still fetching for the same
/// cycle puts it back to `Closed`, so a cancelled [`CheckoutSession::open`]
/// can be retried.
struct FetchGuard<'a> {
    session: &'a CheckoutSession,
    generation: u64,
}

impl<'a> FetchGuard<'a> {
    fn enter(session: &'a CheckoutSession) -> Self {
        Self {
            session,
            generation: session.generation.load(Ordering::SeqCst),
        }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.session.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        self.session.state.send_if_modified(|state| {
            if *state == CheckoutState::FetchingInstructions {
                tracing::debug!("Instruction fetch abandoned");
                *state = CheckoutState::Closed;
                return true;
            }
            false
        });
    }
}
