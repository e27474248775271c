//! Cart store and quantity coordination.
//!
//! The [`CartStore`] is the single writer of the cart snapshot. Every
//! mutation goes through it, and each operation's optimism and
//! reconciliation behavior is read from the [`MutationPolicy`] table rather
//! than being scattered through the code.
//!
//! Quantity changes are emulated on top of the gateway's add/remove
//! primitives by the [`QuantityCoordinator`].

mod policy;
mod quantity;
mod snapshot;
mod store;

pub use policy::{CartOperation, MutationPolicy};
pub use quantity::{CoordinatorPhase, QuantityCoordinator, QuantityUpdateReport, StepOutcome};
pub use snapshot::{CartSnapshot, LineView};
pub use store::CartStore;
