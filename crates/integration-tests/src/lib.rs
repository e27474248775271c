//! Integration test support for Pinbazaar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pinbazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_store` - load/add/remove/clear against the mock gateway
//! - `quantity_coordinator` - the remove, stabilize, re-add, reload sequence
//! - `checkout_session` - instruction fetch, copy, confirm and close
//!
//! [`MockGateway`] keeps a basket in memory, records every call in order and
//! can be told to fail specific operations. [`TestContext`] wires it to a
//! cart store the way the application state does.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pinbazaar_core::{CheckoutInstructions, LineId, Money, OrderId, ProductId, Quantity};
use pinbazaar_storefront::cart::CartStore;
use pinbazaar_storefront::checkout::{CheckoutSession, Clipboard, ClipboardError};
use pinbazaar_storefront::config::CartConfig;
use pinbazaar_storefront::credentials::Credentials;
use pinbazaar_storefront::gateway::{
    BasketGateway, BasketLine, CheckoutOutcome, GatewayError, RawPrice,
};
use pinbazaar_storefront::notify::{Notice, Notifier};
use secrecy::SecretString;
use tokio::sync::broadcast;

/// Bearer credential used by [`TestContext::signed_in`].
pub const TEST_TOKEN: &str = "test-token";

// =============================================================================
// Mock Gateway
// =============================================================================

/// Gateway operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Fetch,
    Add,
    Remove,
    Clear,
    Checkout,
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Add { product_id: ProductId, quantity: u32 },
    Remove(LineId),
    Clear,
    Checkout,
}

impl Call {
    #[must_use]
    pub const fn op(&self) -> MockOp {
        match self {
            Self::Fetch => MockOp::Fetch,
            Self::Add { .. } => MockOp::Add,
            Self::Remove(_) => MockOp::Remove,
            Self::Clear => MockOp::Clear,
            Self::Checkout => MockOp::Checkout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Once,
    Always,
}

/// How the mock reports a product's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceReport {
    /// The unit price, whatever the quantity.
    Unit,
    /// Unit price times quantity.
    LineTotal,
}

#[derive(Debug, Clone)]
struct Product {
    name: String,
    unit_price: Money,
    report: PriceReport,
}

#[derive(Debug, Clone)]
struct Line {
    line_id: LineId,
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug)]
struct MockState {
    catalog: HashMap<ProductId, Product>,
    lines: Vec<Line>,
    next_line: u64,
    calls: Vec<Call>,
    failures: HashMap<MockOp, Failure>,
    checkout: Option<CheckoutOutcome>,
    delays: HashMap<MockOp, Duration>,
}

/// In-memory basket gateway.
///
/// Adding a product that is already in the basket merges into the existing
/// line, as the real gateway does.
#[derive(Debug)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                catalog: HashMap::new(),
                lines: Vec::new(),
                next_line: 1,
                calls: Vec::new(),
                failures: HashMap::new(),
                checkout: None,
                delays: HashMap::new(),
            }),
        }
    }

    /// Register a product. `unit_price` is a lira string such as `₺120,00`.
    ///
    /// # Panics
    ///
    /// Panics if `unit_price` does not parse.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn with_product(
        self,
        product_id: &str,
        name: &str,
        unit_price: &str,
        report: PriceReport,
    ) -> Self {
        self.lock().catalog.insert(
            ProductId::new(product_id),
            Product {
                name: name.to_string(),
                unit_price: Money::parse(unit_price).unwrap(),
                report,
            },
        );
        self
    }

    /// Put a line in the basket without recording a call. Returns its ID.
    pub fn seed_line(&self, product_id: &str, quantity: u32) -> LineId {
        let mut state = self.lock();
        insert_line(&mut state, &ProductId::new(product_id), quantity)
    }

    /// Answer checkout initiation with `outcome` instead of instructions
    /// derived from the basket.
    #[must_use]
    pub fn with_checkout(self, outcome: CheckoutOutcome) -> Self {
        self.lock().checkout = Some(outcome);
        self
    }

    /// Make every call of `op` take `delay` before answering.
    #[must_use]
    pub fn with_delay(self, op: MockOp, delay: Duration) -> Self {
        self.lock().delays.insert(op, delay);
        self
    }

    /// Fail the next call of `op`.
    pub fn fail_once(&self, op: MockOp) {
        self.lock().failures.insert(op, Failure::Once);
    }

    /// Fail every call of `op` until [`recover`](Self::recover).
    pub fn fail_always(&self, op: MockOp) {
        self.lock().failures.insert(op, Failure::Always);
    }

    pub fn recover(&self, op: MockOp) {
        self.lock().failures.remove(&op);
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls of `op` so far.
    #[must_use]
    pub fn count(&self, op: MockOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    /// The basket as `(line, product, quantity)` triples.
    #[must_use]
    pub fn basket(&self) -> Vec<(LineId, ProductId, u32)> {
        self.lock()
            .lines
            .iter()
            .map(|l| (l.line_id.clone(), l.product_id.clone(), l.quantity))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, then wait out any delay and check for an injected
    /// failure.
    async fn begin(&self, call: Call) -> Result<(), GatewayError> {
        let op = call.op();
        let delay = {
            let mut state = self.lock();
            state.calls.push(call);
            state.delays.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        match state.failures.get(&op).copied() {
            Some(Failure::Once) => {
                state.failures.remove(&op);
                Err(injected(op))
            }
            Some(Failure::Always) => Err(injected(op)),
            None => Ok(()),
        }
    }
}

fn injected(op: MockOp) -> GatewayError {
    GatewayError::Unavailable(format!("injected {op:?} failure"))
}

fn insert_line(state: &mut MockState, product_id: &ProductId, quantity: u32) -> LineId {
    if let Some(line) = state.lines.iter_mut().find(|l| &l.product_id == product_id) {
        line.quantity += quantity;
        return line.line_id.clone();
    }
    let line_id = LineId::new(format!("line-{}", state.next_line));
    state.next_line += 1;
    state.lines.push(Line {
        line_id: line_id.clone(),
        product_id: product_id.clone(),
        quantity,
    });
    line_id
}

fn basket_total(state: &MockState) -> Money {
    state
        .lines
        .iter()
        .filter_map(|l| {
            state
                .catalog
                .get(&l.product_id)
                .map(|p| p.unit_price.times(l.quantity))
        })
        .sum()
}

#[async_trait]
impl BasketGateway for MockGateway {
    async fn fetch_basket(&self, _token: &SecretString) -> Result<Vec<BasketLine>, GatewayError> {
        self.begin(Call::Fetch).await?;

        let state = self.lock();
        Ok(state
            .lines
            .iter()
            .map(|line| {
                let product = state.catalog.get(&line.product_id);
                let price = product.map(|p| match p.report {
                    PriceReport::Unit => p.unit_price,
                    PriceReport::LineTotal => p.unit_price.times(line.quantity),
                });
                BasketLine {
                    id: line.line_id.to_string(),
                    product_id: line.product_id.to_string(),
                    name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    image: None,
                    price: price.map(|p| RawPrice::Text(p.display())),
                    quantity: i64::from(line.quantity),
                }
            })
            .collect())
    }

    async fn add_line(
        &self,
        _token: &SecretString,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), GatewayError> {
        self.begin(Call::Add {
            product_id: product_id.clone(),
            quantity: quantity.get(),
        })
        .await?;

        let mut state = self.lock();
        if !state.catalog.contains_key(product_id) {
            return Err(GatewayError::NotFound(product_id.to_string()));
        }
        insert_line(&mut state, product_id, quantity.get());
        Ok(())
    }

    async fn remove_line(&self, _token: &SecretString, line_id: &LineId) -> Result<(), GatewayError> {
        self.begin(Call::Remove(line_id.clone())).await?;

        let mut state = self.lock();
        let before = state.lines.len();
        state.lines.retain(|l| &l.line_id != line_id);
        if state.lines.len() == before {
            return Err(GatewayError::NotFound(line_id.to_string()));
        }
        Ok(())
    }

    async fn clear_basket(&self, _token: &SecretString) -> Result<(), GatewayError> {
        self.begin(Call::Clear).await?;
        self.lock().lines.clear();
        Ok(())
    }

    async fn initiate_checkout(&self, _token: &SecretString) -> Result<CheckoutOutcome, GatewayError> {
        self.begin(Call::Checkout).await?;

        let state = self.lock();
        if let Some(outcome) = &state.checkout {
            return Ok(outcome.clone());
        }
        Ok(CheckoutOutcome::Instructions(CheckoutInstructions {
            bank_name: "Ziraat Bankası".to_string(),
            iban: "TR330006100519786457841326".to_string(),
            amount: basket_total(&state),
            description: "PB-1001".to_string(),
            order_id: OrderId::new("PB-1001"),
            issued_at: Utc::now(),
        }))
    }
}

// =============================================================================
// Clipboard
// =============================================================================

/// Clipboard that remembers what was copied.
#[derive(Debug, Default)]
pub struct RecordingClipboard {
    copies: Mutex<Vec<(String, String)>>,
    broken: bool,
}

impl RecordingClipboard {
    /// A clipboard whose every copy fails.
    #[must_use]
    pub fn broken() -> Self {
        Self {
            copies: Mutex::new(Vec::new()),
            broken: true,
        }
    }

    /// `(label, text)` pairs in copy order.
    #[must_use]
    pub fn copies(&self) -> Vec<(String, String)> {
        self.copies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Clipboard for RecordingClipboard {
    async fn copy(&self, label: &str, text: &str) -> Result<(), ClipboardError> {
        if self.broken {
            return Err(ClipboardError("no clipboard".to_string()));
        }
        self.copies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((label.to_string(), text.to_string()));
        Ok(())
    }
}

// =============================================================================
// Test Context
// =============================================================================

/// A cart store wired to a [`MockGateway`].
pub struct TestContext {
    pub gateway: Arc<MockGateway>,
    pub credentials: Credentials,
    pub notifier: Notifier,
    pub cart: Arc<CartStore>,
}

impl TestContext {
    /// Context with [`TEST_TOKEN`] already signed in.
    #[must_use]
    pub fn signed_in(gateway: MockGateway) -> Self {
        Self::build(gateway, Credentials::signed_in(SecretString::from(TEST_TOKEN)))
    }

    #[must_use]
    pub fn signed_out(gateway: MockGateway) -> Self {
        Self::build(gateway, Credentials::signed_out())
    }

    fn build(gateway: MockGateway, credentials: Credentials) -> Self {
        let gateway = Arc::new(gateway);
        let notifier = Notifier::new();
        let cart = Arc::new(CartStore::new(
            Arc::clone(&gateway) as Arc<dyn BasketGateway>,
            credentials.watch(),
            notifier.clone(),
            CartConfig::default(),
        ));
        Self {
            gateway,
            credentials,
            notifier,
            cart,
        }
    }

    /// Subscribe to notices published from now on.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    /// A checkout session over the same gateway and store.
    #[must_use]
    pub fn checkout(&self, clipboard: Arc<dyn Clipboard>) -> CheckoutSession {
        CheckoutSession::new(
            Arc::clone(&self.gateway) as Arc<dyn BasketGateway>,
            Arc::clone(&self.cart),
            self.credentials.watch(),
            self.notifier.clone(),
            clipboard,
        )
    }
}

/// Drain every notice currently buffered.
pub fn drain(notices: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        out.push(notice);
    }
    out
}
