//! Pinbazaar storefront library.
//!
//! Cart and checkout engine for the Pinbazaar storefront. The remote basket
//! gateway only offers coarse add/remove primitives and does not say whether
//! a returned price is per unit or per line; this crate owns the cart view,
//! reconciles it against the gateway and drives the bank-transfer checkout.
//!
//! # Example
//!
//! ```rust,ignore
//! use pinbazaar_storefront::{config::StorefrontConfig, state::AppState};
//!
//! let state = AppState::new(StorefrontConfig::from_env()?)?;
//! state.cart().load().await?;
//! println!("{}", state.cart().total());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod state;
