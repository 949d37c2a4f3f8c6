//! Cart lifecycle events
//!
//! Explicit synchronous extension points: mutation paths notify the
//! observers registered on the context after each committed change.

use crate::{carts::CartId, lines::LineKey};

/// A committed change to a cart or order.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    /// A line was created or its quantity changed.
    LineUpdated {
        /// The mutated cart.
        cart: CartId,
        /// Identity of the affected line.
        key: LineKey,
        /// The committed quantity.
        quantity: u32,
    },

    /// A line was removed.
    LineRemoved {
        /// The mutated cart.
        cart: CartId,
        /// Identity of the removed line.
        key: LineKey,
    },

    /// The cart was emptied; for orders, the record itself was deleted.
    Cleared {
        /// The cleared cart.
        cart: CartId,
    },

    /// A source cart was materialized into a persisted order.
    Materialized {
        /// The cart that was read.
        source: CartId,
        /// The order that was written.
        target: CartId,
    },
}

/// Observer notified synchronously after each committed change.
pub trait CartObserver {
    /// Called once per event, after the change has been applied.
    fn on_event(&self, event: &CartEvent);
}
