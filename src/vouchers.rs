//! Voucher discount contract
//!
//! Discount algorithms live outside this crate; the engine defines how it
//! consults them and how computed discounts are stored against an order.
//! A context without a voucher module discounts nothing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::carts::Cart;

/// A discount applied against a cart total, keyed by the code producing it.
///
/// Also the row shape persisted per order; re-materializing an order
/// replaces its stored discounts wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    /// The voucher code the discount came from.
    pub code: String,

    /// Amount deducted from the cart total.
    pub amount: Decimal,
}

/// Pluggable voucher discount calculator.
pub trait VoucherModule {
    /// Valid discounts for the given codes, plus the first code that did
    /// not validate, if any. Invalid codes never fail the calculation.
    fn calculate_discounts(
        &self,
        cart: &dyn Cart,
        codes: &[String],
        include_shipping: bool,
    ) -> (Vec<Discount>, Option<String>);
}
