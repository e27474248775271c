//! Checkout command.

use std::sync::Arc;

use pinbazaar_core::{CheckoutInstructions, OrderId};
use pinbazaar_storefront::checkout::{CheckoutState, Destination};
use pinbazaar_storefront::state::AppState;

use crate::clipboard::Osc52Clipboard;
use crate::{CliError, CopyTarget};

/// Open a checkout, optionally copy a detail and confirm, then close.
pub async fn run(state: &AppState, copy: Option<CopyTarget>, confirm: bool) -> Result<(), CliError> {
    let session = state.checkout(Arc::new(Osc52Clipboard::stdout()));
    session.open().await?;

    let CheckoutState::Ready(instructions) = session.state() else {
        // Special notices and failures were already published
        session.close();
        return Ok(());
    };
    print_instructions(&instructions);

    match copy {
        Some(CopyTarget::Iban) => session.copy_iban().await,
        Some(CopyTarget::Bank) => session.copy_bank_name().await,
        None => {}
    }

    if !confirm {
        session.close();
        return Ok(());
    }

    let outcome = session.confirm().await?;
    match outcome.next {
        Destination::OrderHistory => print_next(&outcome.order_id),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_instructions(instructions: &CheckoutInstructions) {
    println!("Bank:        {}", instructions.bank_name);
    println!("IBAN:        {}", instructions.formatted_iban());
    println!("Amount:      {}", instructions.amount.display());
    println!("Description: {}", instructions.description);
    println!("Order:       {}", instructions.order_id);
}

#[allow(clippy::print_stdout)]
fn print_next(order_id: &OrderId) {
    println!("Order {order_id} is now in your order history.");
}
