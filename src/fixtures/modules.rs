//! Reference pluggable modules
//!
//! Minimal shipping and voucher calculators satisfying the contracts in
//! [`crate::shipping`] and [`crate::vouchers`]. Production calculators live
//! in their own crates; these exist for tests and examples.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::{
    carts::Cart,
    items::ErrorMessage,
    shipping::ShippingModule,
    vouchers::{Discount, VoucherModule},
};

/// Flat delivery fee for any non-empty cart.
#[derive(Debug, Clone)]
pub struct FlatRateShipping {
    rate: Decimal,
    requires_selection: bool,
}

impl FlatRateShipping {
    /// Creates a flat-rate calculator.
    #[must_use]
    pub fn new(rate: Decimal) -> Self {
        Self {
            rate,
            requires_selection: false,
        }
    }

    /// Also reports an error until shipping options have been stored.
    #[must_use]
    pub fn requiring_selection(mut self) -> Self {
        self.requires_selection = true;
        self
    }
}

impl ShippingModule for FlatRateShipping {
    fn calculate(&self, cart: &dyn Cart) -> Decimal {
        if cart.is_empty() {
            Decimal::ZERO
        } else {
            self.rate
        }
    }

    fn get_errors(&self, cart: &dyn Cart) -> Vec<ErrorMessage> {
        if self.requires_selection && !cart.is_empty() && cart.shipping_options().is_none() {
            vec!["No shipping option selected".into()]
        } else {
            Vec::new()
        }
    }
}

/// Voucher table mapping codes to fixed amounts off.
///
/// Discounts are capped so the running total never goes negative; codes not
/// in the table are reported back as invalid rather than failing.
#[derive(Debug, Clone, Default)]
pub struct CodeTableVouchers {
    codes: FxHashMap<String, Decimal>,
}

impl CodeTableVouchers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a code worth a fixed amount off.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>, amount: Decimal) -> Self {
        self.codes.insert(code.into(), amount);
        self
    }
}

impl VoucherModule for CodeTableVouchers {
    fn calculate_discounts(
        &self,
        cart: &dyn Cart,
        codes: &[String],
        include_shipping: bool,
    ) -> (Vec<Discount>, Option<String>) {
        let mut remaining = cart.subtotal();
        if include_shipping {
            remaining += cart.shipping_cost();
        }

        let mut discounts = Vec::new();
        let mut invalid = None;

        for code in codes {
            match self.codes.get(code) {
                Some(amount) => {
                    let amount = (*amount).min(remaining);
                    remaining -= amount;
                    discounts.push(Discount {
                        code: code.clone(),
                        amount,
                    });
                }
                None => {
                    if invalid.is_none() {
                        invalid = Some(code.clone());
                    }
                }
            }
        }

        (discounts, invalid)
    }
}
