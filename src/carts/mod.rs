//! Carts
//!
//! The uniform contract shared by the ephemeral [`SessionCart`] and the
//! persisted [`Order`]. Calculators, renderers and the materializer treat
//! the two identically through the [`Cart`] trait; everything derived
//! (counts, totals, validity, payloads) lives here as provided methods.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    context::CartContext,
    items::{ErrorMessage, ItemRef},
    lines::{LinePayload, ResolvedLine},
    options::RawOptions,
    storage::StorageError,
    vouchers::Discount,
};

mod order;
mod session;

pub use order::Order;
pub use session::{SessionCart, SessionState};

/// Cart identity: a visitor session token or a persisted order key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum CartId {
    /// Ephemeral cart scoped to one visitor session.
    Session(String),

    /// Durable order record.
    Order(u64),
}

/// How `update_quantity` interprets the requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Replace the line quantity outright.
    Set,

    /// Add the signed delta to the current quantity.
    Add,
}

/// Successful result of a quantity update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The line now exists with the committed quantity.
    Updated,

    /// The line was deleted, or a removal targeted a line that never
    /// existed.
    Removed,
}

/// Errors returned by cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Additive update with a zero delta.
    #[error("no quantity specified")]
    NoQuantity,

    /// The referenced item cannot be resolved, so the line cannot be keyed
    /// or validated.
    #[error("unknown item {0}")]
    UnknownItem(ItemRef),

    /// The resulting quantity does not fit the storable range.
    #[error("quantity out of range: {0}")]
    QuantityOutOfRange(i64),

    /// The item rejected the update; the cart is unchanged.
    #[error("update rejected: {}", .0.join("; "))]
    Rejected(Vec<ErrorMessage>),

    /// Underlying order storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Uniform contract over cart-like containers.
///
/// A template or API handler can hold either variant behind `&dyn Cart` and
/// never learn whether the lines live in a session or in a database.
pub trait Cart {
    /// The cart's identity.
    fn id(&self) -> CartId;

    /// The engine context this cart consults.
    fn context(&self) -> &CartContext;

    /// Self as a trait object, for handing to pluggable calculators.
    fn as_dyn(&self) -> &dyn Cart;

    /// Creates, updates or deletes the line identified by `item` plus the
    /// normalized form of `raw`.
    ///
    /// Validate-then-commit: an update the item rejects leaves the cart
    /// unchanged. A resulting quantity of zero or less deletes the line;
    /// deleting a line that never existed succeeds as a no-op.
    ///
    /// # Errors
    ///
    /// - [`CartError::NoQuantity`]: additive update with a zero delta.
    /// - [`CartError::UnknownItem`]: the item no longer resolves.
    /// - [`CartError::QuantityOutOfRange`]: the result does not fit `u32`.
    /// - [`CartError::Rejected`]: the item's validation failed.
    /// - [`CartError::Storage`]: the persisted backend failed.
    fn update_quantity(
        &mut self,
        item: &ItemRef,
        quantity: i64,
        mode: UpdateMode,
        raw: &RawOptions,
    ) -> Result<UpdateOutcome, CartError>;

    /// All lines whose item still resolves, in stable order.
    ///
    /// Re-queries on every call. Lines whose item has vanished are excluded
    /// from the listing and from every derived total, but are not deleted.
    fn lines(&self) -> Vec<ResolvedLine<'_>>;

    /// Deletes all lines. A persisted order deletes its own record too.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the persisted backend failed.
    fn clear(&mut self) -> Result<(), CartError>;

    /// The opaque shipping options payload, if one has been stored.
    fn shipping_options(&self) -> Option<Value>;

    /// Stores the shipping options payload verbatim. Validation is the
    /// shipping module's business and happens before the payload gets here.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the persisted backend failed.
    fn set_shipping_options(&mut self, options: Option<Value>) -> Result<(), CartError>;

    /// Voucher codes attached to this cart.
    fn voucher_codes(&self) -> Vec<String>;

    /// Replaces the attached voucher codes.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the persisted backend failed.
    fn set_voucher_codes(&mut self, codes: Vec<String>) -> Result<(), CartError>;

    /// Adds `quantity` of the item, merging into any existing line with the
    /// same identity.
    ///
    /// # Errors
    ///
    /// As for [`Cart::update_quantity`].
    fn add(
        &mut self,
        item: &ItemRef,
        quantity: i64,
        raw: &RawOptions,
    ) -> Result<UpdateOutcome, CartError> {
        self.update_quantity(item, quantity, UpdateMode::Add, raw)
    }

    /// Removes the line for the item and options, if present.
    ///
    /// # Errors
    ///
    /// As for [`Cart::update_quantity`].
    fn remove(&mut self, item: &ItemRef, raw: &RawOptions) -> Result<UpdateOutcome, CartError> {
        self.update_quantity(item, 0, UpdateMode::Set, raw)
    }

    /// Sum of line quantities.
    fn count(&self) -> u32 {
        self.lines().iter().map(ResolvedLine::quantity).sum()
    }

    /// Whether the cart holds no quantity at all.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Sum of line totals, in currency-precision decimals.
    fn subtotal(&self) -> Decimal {
        self.lines().iter().map(ResolvedLine::total).sum()
    }

    /// Delivery cost from the configured shipping module, or zero.
    fn shipping_cost(&self) -> Decimal {
        self.context()
            .shipping()
            .map_or(Decimal::ZERO, |module| module.calculate(self.as_dyn()))
    }

    /// Shipping validation errors from the configured module, or none.
    fn shipping_errors(&self) -> Vec<ErrorMessage> {
        self.context()
            .shipping()
            .map_or_else(Vec::new, |module| module.get_errors(self.as_dyn()))
    }

    /// Valid discounts for the attached voucher codes, plus the first
    /// invalid code. Without a voucher module there is nothing to report.
    fn discounts(&self) -> (Vec<Discount>, Option<String>) {
        match self.context().vouchers() {
            Some(module) => {
                module.calculate_discounts(self.as_dyn(), &self.voucher_codes(), true)
            }
            None => (Vec::new(), None),
        }
    }

    /// Sum of valid discount amounts.
    fn total_discount(&self) -> Decimal {
        let (discounts, _invalid) = self.discounts();

        discounts.iter().map(|discount| discount.amount).sum()
    }

    /// Grand total: subtotal plus shipping, less discounts.
    fn total(&self) -> Decimal {
        self.subtotal() + self.shipping_cost() - self.total_discount()
    }

    /// Every line error followed by every shipping error.
    ///
    /// Line-level problems are collected as data; reads never fail.
    fn get_errors(&self) -> Vec<ErrorMessage> {
        let mut errors: SmallVec<[ErrorMessage; 4]> = SmallVec::new();

        for line in self.lines() {
            errors.extend(line.errors());
        }
        errors.extend(self.shipping_errors());

        errors.into_vec()
    }

    /// A cart is valid when it holds quantity and nothing reports errors.
    ///
    /// An empty cart is never valid, errors or not.
    fn is_valid(&self) -> bool {
        self.count() > 0 && self.get_errors().is_empty()
    }

    /// Serializable projection of the whole cart.
    fn payload(&self) -> CartPayload {
        let lines: Vec<LinePayload> =
            self.lines().iter().map(ResolvedLine::payload).collect();

        CartPayload {
            count: self.count(),
            lines,
            shipping_options: self.shipping_options(),
            subtotal: self.subtotal(),
            total: self.total(),
            html_snippet: self
                .context()
                .renderer()
                .map(|renderer| renderer.render(self.as_dyn())),
        }
    }
}

/// JSON-compatible projection of a cart, consumed by the presentation layer.
///
/// Monetary fields stay decimal internally and project to floats here, at
/// the serialization boundary only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartPayload {
    /// Sum of line quantities.
    pub count: u32,

    /// The serialized lines, in cart order.
    pub lines: Vec<LinePayload>,

    /// The shipping options payload, when one is stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_options: Option<Value>,

    /// Sum of line totals.
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,

    /// Grand total after shipping and discounts.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,

    /// Rendered display snippet, when a renderer is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_snippet: Option<String>,
}

/// Resolves the requested change against the existing quantity.
///
/// `Add` applies a signed delta, `Set` replaces outright. `Ok(None)` means
/// the line should be deleted.
pub(crate) fn resolve_quantity(
    existing: u32,
    requested: i64,
    mode: UpdateMode,
) -> Result<Option<u32>, CartError> {
    if mode == UpdateMode::Add && requested == 0 {
        return Err(CartError::NoQuantity);
    }

    let base = match mode {
        UpdateMode::Add => i64::from(existing),
        UpdateMode::Set => 0,
    };

    let next = base
        .checked_add(requested)
        .ok_or(CartError::QuantityOutOfRange(requested))?;

    if next <= 0 {
        return Ok(None);
    }

    match u32::try_from(next) {
        Ok(quantity) => Ok(Some(quantity)),
        Err(_) => Err(CartError::QuantityOutOfRange(next)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_outright() {
        let result = resolve_quantity(4, 2, UpdateMode::Set);

        assert!(matches!(result, Ok(Some(2))));
    }

    #[test]
    fn add_applies_the_delta() {
        let result = resolve_quantity(4, 2, UpdateMode::Add);

        assert!(matches!(result, Ok(Some(6))));
    }

    #[test]
    fn negative_delta_can_delete() {
        let result = resolve_quantity(2, -2, UpdateMode::Add);

        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn set_to_zero_deletes() {
        let result = resolve_quantity(2, 0, UpdateMode::Set);

        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn additive_zero_is_rejected() {
        let result = resolve_quantity(2, 0, UpdateMode::Add);

        assert!(matches!(result, Err(CartError::NoQuantity)));
    }

    #[test]
    fn overflowing_quantity_is_rejected() {
        let result = resolve_quantity(0, i64::from(u32::MAX) + 1, UpdateMode::Set);

        assert!(matches!(result, Err(CartError::QuantityOutOfRange(_))));
    }
}
