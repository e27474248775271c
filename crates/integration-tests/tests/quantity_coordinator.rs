//! Integration tests for quantity changes.
//!
//! A change is always remove, stabilization delay, add, reload - in that
//! order and whatever the outcome of each step.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pinbazaar_core::{LineId, ProductId, Quantity};
use pinbazaar_integration_tests::{Call, MockGateway, MockOp, PriceReport, TestContext, drain};
use pinbazaar_storefront::cart::{CartOperation, CoordinatorPhase, StepOutcome};
use pinbazaar_storefront::error::CartError;
use pinbazaar_storefront::notify::Notice;
use tokio::time::Instant;

fn product() -> ProductId {
    ProductId::new("valorant-1000vp")
}

/// Signed-in context with one line of `quantity`, loaded into the store.
async fn with_line(quantity: u32) -> (TestContext, LineId) {
    let gateway = MockGateway::new().with_product(
        "valorant-1000vp",
        "Valorant 1000 VP",
        "₺120,00",
        PriceReport::Unit,
    );
    let ctx = TestContext::signed_in(gateway);
    let line_id = ctx.gateway.seed_line("valorant-1000vp", quantity);
    ctx.cart.load().await.unwrap();
    ctx.gateway.reset_calls();
    (ctx, line_id)
}

fn expected_sequence(line_id: &LineId, quantity: u32) -> Vec<Call> {
    vec![
        Call::Remove(line_id.clone()),
        Call::Add {
            product_id: product(),
            quantity,
        },
        Call::Fetch,
    ]
}

#[tokio::test(start_paused = true)]
async fn test_update_issues_remove_add_load() {
    let (ctx, line_id) = with_line(2).await;
    let mut notices = ctx.notices();

    ctx.cart.update_quantity(&line_id, 5).await.unwrap();

    assert_eq!(ctx.gateway.calls(), expected_sequence(&line_id, 5));
    let snapshot = ctx.cart.snapshot();
    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].quantity.get(), 5);
    assert_eq!(snapshot.lines[0].product_id, product());
    assert_eq!(ctx.cart.item_count(), 5);
    assert_eq!(drain(&mut notices), vec![Notice::success("Quantity updated.")]);
}

#[tokio::test(start_paused = true)]
async fn test_update_continues_after_failed_remove() {
    let (ctx, line_id) = with_line(2).await;
    ctx.gateway.fail_once(MockOp::Remove);
    let mut notices = ctx.notices();

    let err = ctx.cart.update_quantity(&line_id, 5).await.unwrap_err();

    assert!(matches!(
        err,
        CartError::Network {
            operation: CartOperation::UpdateQuantity,
            ..
        }
    ));
    assert_eq!(ctx.gateway.calls(), expected_sequence(&line_id, 5));
    // The old line survived and the gateway merged the re-add into it; the
    // store shows exactly that.
    assert_eq!(ctx.gateway.basket(), vec![(line_id, product(), 7)]);
    assert_eq!(ctx.cart.item_count(), 7);
    assert_eq!(
        drain(&mut notices),
        vec![Notice::error("Could not update the quantity.")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_continues_after_failed_add() {
    let (ctx, line_id) = with_line(2).await;
    ctx.gateway.fail_once(MockOp::Add);

    let report = ctx
        .cart
        .quantity_coordinator()
        .update_quantity(&line_id, Quantity::new(5).unwrap())
        .await
        .unwrap();

    assert!(report.removal.is_success());
    assert!(matches!(report.re_add, StepOutcome::Failed(_)));
    assert!(report.reconciled);
    assert_eq!(ctx.gateway.calls(), expected_sequence(&line_id, 5));
    // Removed but never re-added: the store reflects the empty basket
    assert!(ctx.gateway.basket().is_empty());
    assert!(ctx.cart.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_update_reloads_even_when_everything_fails() {
    let (ctx, line_id) = with_line(2).await;
    ctx.gateway.fail_once(MockOp::Remove);
    ctx.gateway.fail_once(MockOp::Add);
    ctx.gateway.fail_once(MockOp::Fetch);

    let report = ctx
        .cart
        .quantity_coordinator()
        .update_quantity(&line_id, Quantity::new(5).unwrap())
        .await
        .unwrap();

    assert!(!report.is_success());
    assert!(!report.reconciled);
    assert_eq!(ctx.gateway.calls(), expected_sequence(&line_id, 5));
    assert!(!ctx.cart.is_loading());
    assert!(!ctx.cart.is_updating(&line_id));
}

#[tokio::test(start_paused = true)]
async fn test_zero_quantity_removes_without_add() {
    let (ctx, line_id) = with_line(2).await;

    ctx.cart.update_quantity(&line_id, 0).await.unwrap();

    assert_eq!(
        ctx.gateway.calls(),
        vec![Call::Remove(line_id), Call::Fetch]
    );
    assert_eq!(ctx.gateway.count(MockOp::Add), 0);
    assert!(ctx.cart.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stabilization_delay_between_remove_and_add() {
    let (ctx, line_id) = with_line(2).await;
    let coordinator = ctx.cart.quantity_coordinator();
    let started = Instant::now();

    let (report, ()) = tokio::join!(
        coordinator.update_quantity(&line_id, Quantity::new(4).unwrap()),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(coordinator.phase(), CoordinatorPhase::Stabilizing);
            assert!(ctx.cart.is_updating(&line_id));
            // Removed, not yet re-added
            assert_eq!(ctx.gateway.count(MockOp::Remove), 1);
            assert_eq!(ctx.gateway.count(MockOp::Add), 0);
        }
    );

    assert!(report.unwrap().is_success());
    assert!(started.elapsed() >= ctx.cart.config().stabilization_delay);
    assert_eq!(coordinator.phase(), CoordinatorPhase::Idle);
    assert!(!ctx.cart.is_updating(&line_id));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_line_is_rejected_before_any_call() {
    let (ctx, _) = with_line(2).await;

    let err = ctx
        .cart
        .update_quantity(&LineId::new("line-404"), 3)
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::UnknownLine(_)));
    assert!(ctx.gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_update_is_rejected_before_any_call() {
    let (ctx, line_id) = with_line(2).await;
    ctx.credentials.sign_out();

    let err = ctx.cart.update_quantity(&line_id, 3).await.unwrap_err();

    assert!(matches!(err, CartError::Unauthenticated));
    assert!(ctx.gateway.calls().is_empty());
}
