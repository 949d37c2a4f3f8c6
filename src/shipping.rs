//! Shipping calculator contract
//!
//! Shipping-cost algorithms live outside this crate; the engine only defines
//! how it consults them. A context without a shipping module ships for free
//! and reports no shipping errors.

use rust_decimal::Decimal;

use crate::{carts::Cart, items::ErrorMessage};

/// Pluggable shipping-cost calculator.
pub trait ShippingModule {
    /// Non-negative delivery cost for the cart as it stands.
    fn calculate(&self, cart: &dyn Cart) -> Decimal;

    /// Shipping-related validation errors, e.g. an unserviceable region or
    /// a missing delivery selection.
    fn get_errors(&self, _cart: &dyn Cart) -> Vec<ErrorMessage> {
        Vec::new()
    }
}
