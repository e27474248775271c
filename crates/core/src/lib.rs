//! Pinbazaar Core - Shared domain types.
//!
//! This crate provides the types used across all Pinbazaar components:
//! - `storefront` - Cart store, checkout controller and basket gateway client
//! - `cli` - Terminal front end driving the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. Price handling lives here so that every consumer
//! formats and disambiguates money the same way.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money and price normalization, unit-price
//!   disambiguation, cart lines and checkout instructions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
