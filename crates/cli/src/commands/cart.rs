//! Cart commands.
//!
//! Every command loads the cart first so line IDs from `cart show` can be
//! used directly, and prints the cart again after a change.

use pinbazaar_core::{LineId, ProductId, Quantity};
use pinbazaar_storefront::cart::CartStore;
use pinbazaar_storefront::state::AppState;

use crate::CliError;

/// Print the cart.
pub async fn show(state: &AppState) -> Result<(), CliError> {
    let cart = state.cart();
    cart.load().await?;
    print_cart(cart);
    Ok(())
}

/// Add `quantity` of `product`.
pub async fn add(state: &AppState, product: &str, quantity: u32) -> Result<(), CliError> {
    let quantity = Quantity::new(quantity).ok_or(CliError::InvalidQuantity(quantity))?;
    let cart = state.cart();
    cart.add_line(&ProductId::new(product), quantity).await?;
    print_cart(cart);
    Ok(())
}

/// Remove a line.
pub async fn remove(state: &AppState, line: &str) -> Result<(), CliError> {
    let cart = state.cart();
    cart.remove_line(&LineId::new(line)).await?;
    print_cart(cart);
    Ok(())
}

/// Set a line's quantity.
pub async fn set(state: &AppState, line: &str, quantity: u32) -> Result<(), CliError> {
    let cart = state.cart();
    // The coordinator needs the line's product, so the snapshot must be current
    cart.load().await?;
    cart.update_quantity(&LineId::new(line), quantity).await?;
    print_cart(cart);
    Ok(())
}

/// Empty the cart.
pub async fn clear(state: &AppState) -> Result<(), CliError> {
    state.cart().clear().await?;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn print_cart(cart: &CartStore) {
    let views = cart.line_views();
    if views.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for view in &views {
        println!(
            "{:<24} {:<32} {:>3} x {:>12} = {:>12}",
            view.line.line_id.as_str(),
            view.line.name,
            view.line.quantity.get(),
            view.unit_price_display(),
            view.line_total_display(),
        );
    }
    println!();
    println!("Items: {}", cart.item_count());
    println!("Total: {}", cart.total());
}
