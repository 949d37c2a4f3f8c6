//! Session carts
//!
//! The ephemeral cart variant. Lines live in memory in insertion order and
//! are captured to and restored from the caller's session storage between
//! requests; [`save_to`](crate::checkout::save_to) turns them into a
//! persisted order at checkout.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    carts::{Cart, CartError, CartId, UpdateMode, UpdateOutcome, resolve_quantity},
    context::CartContext,
    events::CartEvent,
    items::ItemRef,
    lines::{Line, LineKey, ResolvedLine},
    options::{NormalizedOptions, RawOptions},
};

/// Snapshot of a session cart, as stored in session storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Stored lines, in insertion order.
    pub lines: Vec<Line>,

    /// Shipping options payload, if one was chosen.
    pub shipping_options: Option<Value>,

    /// Voucher codes entered by the visitor.
    pub voucher_codes: Vec<String>,
}

/// Ephemeral cart scoped to one visitor session.
#[derive(Debug)]
pub struct SessionCart<'a> {
    ctx: &'a CartContext,
    token: String,
    lines: Vec<Line>,
    shipping_options: Option<Value>,
    voucher_codes: Vec<String>,
}

impl<'a> SessionCart<'a> {
    /// Creates an empty cart for the given session token.
    #[must_use]
    pub fn new(ctx: &'a CartContext, token: impl Into<String>) -> Self {
        Self::restore(ctx, token, SessionState::default())
    }

    /// Restores a cart previously captured from session storage.
    #[must_use]
    pub fn restore(ctx: &'a CartContext, token: impl Into<String>, state: SessionState) -> Self {
        Self {
            ctx,
            token: token.into(),
            lines: state.lines,
            shipping_options: state.shipping_options,
            voucher_codes: state.voucher_codes,
        }
    }

    /// Captures the cart for session storage.
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState {
            lines: self.lines.clone(),
            shipping_options: self.shipping_options.clone(),
            voucher_codes: self.voucher_codes.clone(),
        }
    }

    /// The owning session token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Cart for SessionCart<'_> {
    fn id(&self) -> CartId {
        CartId::Session(self.token.clone())
    }

    fn context(&self) -> &CartContext {
        self.ctx
    }

    fn as_dyn(&self) -> &dyn Cart {
        self
    }

    fn update_quantity(
        &mut self,
        item: &ItemRef,
        quantity: i64,
        mode: UpdateMode,
        raw: &RawOptions,
    ) -> Result<UpdateOutcome, CartError> {
        let ctx = self.ctx;
        let resolved = ctx
            .registry()
            .resolve(item)
            .ok_or_else(|| CartError::UnknownItem(item.clone()))?;

        let options = NormalizedOptions::normalize(&resolved.options_schema(), raw);
        let key = LineKey::new(item.clone(), options.clone());

        let position = self.lines.iter().position(|line| line.matches(&key));
        let existing = position
            .and_then(|i| self.lines.get(i))
            .map_or(0, Line::quantity);

        let Some(next) = resolve_quantity(existing, quantity, mode)? else {
            if let Some(i) = position {
                self.lines.remove(i);
                debug!(cart = %self.token, item = %item, "cart line removed");
                ctx.notify(&CartEvent::LineRemoved { cart: self.id(), key });
            }
            return Ok(UpdateOutcome::Removed);
        };

        let candidate = Line::new(item.clone(), options, next);
        let errors = resolved.cart_errors(&candidate);
        if !errors.is_empty() {
            return Err(CartError::Rejected(errors));
        }

        match position {
            Some(i) => {
                if let Some(line) = self.lines.get_mut(i) {
                    line.set_quantity(next);
                }
            }
            None => self.lines.push(candidate),
        }

        debug!(cart = %self.token, item = %item, quantity = next, "cart line updated");
        ctx.notify(&CartEvent::LineUpdated {
            cart: self.id(),
            key,
            quantity: next,
        });

        Ok(UpdateOutcome::Updated)
    }

    fn lines(&self) -> Vec<ResolvedLine<'_>> {
        self.lines
            .iter()
            .filter_map(|line| match self.ctx.registry().resolve(line.item()) {
                Some(item) => Some(ResolvedLine::new(line.clone(), item)),
                None => {
                    warn!(cart = %self.token, item = %line.item(), "cart line item no longer resolves");
                    None
                }
            })
            .collect()
    }

    fn clear(&mut self) -> Result<(), CartError> {
        self.lines.clear();
        self.ctx.notify(&CartEvent::Cleared { cart: self.id() });
        Ok(())
    }

    fn shipping_options(&self) -> Option<Value> {
        self.shipping_options.clone()
    }

    fn set_shipping_options(&mut self, options: Option<Value>) -> Result<(), CartError> {
        self.shipping_options = options;
        Ok(())
    }

    fn voucher_codes(&self) -> Vec<String> {
        self.voucher_codes.clone()
    }

    fn set_voucher_codes(&mut self, codes: Vec<String>) -> Result<(), CartError> {
        self.voucher_codes = codes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        fixtures::{Catalogue, CatalogueProduct},
        items::ItemRegistry,
        options::OptionsSchema,
    };

    use super::*;

    const PRODUCT: &str = "catalogue.product";

    fn context() -> CartContext {
        let mut catalogue = Catalogue::new();
        catalogue.insert(1, CatalogueProduct::new("Widget", Decimal::new(1000, 2)));
        catalogue.insert(2, CatalogueProduct::new("Gadget", Decimal::new(550, 2)));
        catalogue.insert(
            3,
            CatalogueProduct::new("Limited", Decimal::new(1999, 2)).with_stock(2),
        );
        catalogue.insert(
            4,
            CatalogueProduct::new("Tee", Decimal::new(2500, 2)).with_options(
                OptionsSchema::new().field("size", &["S", "M", "L"]),
            ),
        );

        let mut registry = ItemRegistry::new();
        registry.register(PRODUCT, catalogue);

        CartContext::new(registry)
    }

    fn no_options() -> RawOptions {
        RawOptions::default()
    }

    #[test]
    fn adding_twice_merges_into_one_line() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");
        let widget = ItemRef::new(PRODUCT, 1);

        cart.add(&widget, 2, &no_options())?;
        cart.add(&widget, 3, &no_options())?;

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.count(), 5);

        Ok(())
    }

    #[test]
    fn different_options_make_different_lines() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");
        let tee = ItemRef::new(PRODUCT, 4);

        let small: RawOptions = [("size".to_string(), "S".to_string())].into_iter().collect();
        let large: RawOptions = [("size".to_string(), "L".to_string())].into_iter().collect();

        cart.add(&tee, 1, &small)?;
        cart.add(&tee, 1, &large)?;

        assert_eq!(cart.lines().len(), 2);

        Ok(())
    }

    #[test]
    fn invalid_option_value_merges_with_the_default_line() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");
        let tee = ItemRef::new(PRODUCT, 4);

        let bogus: RawOptions = [("size".to_string(), "XXL".to_string())].into_iter().collect();

        cart.add(&tee, 1, &no_options())?;
        cart.add(&tee, 1, &bogus)?;

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.count(), 2);

        Ok(())
    }

    #[test]
    fn set_to_zero_removes_the_line() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");
        let widget = ItemRef::new(PRODUCT, 1);

        cart.add(&widget, 2, &no_options())?;
        let outcome = cart.update_quantity(&widget, 0, UpdateMode::Set, &no_options())?;

        assert_eq!(outcome, UpdateOutcome::Removed);
        assert!(cart.lines().is_empty());

        Ok(())
    }

    #[test]
    fn removing_an_absent_line_is_a_no_op() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");

        let outcome = cart.remove(&ItemRef::new(PRODUCT, 1), &no_options())?;

        assert_eq!(outcome, UpdateOutcome::Removed);
        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn negative_delta_below_zero_removes_the_line() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");
        let widget = ItemRef::new(PRODUCT, 1);

        cart.add(&widget, 2, &no_options())?;
        cart.add(&widget, -5, &no_options())?;

        assert!(cart.lines().is_empty());

        Ok(())
    }

    #[test]
    fn additive_zero_is_rejected_upfront() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");

        let result = cart.add(&ItemRef::new(PRODUCT, 1), 0, &no_options());

        assert!(matches!(result, Err(CartError::NoQuantity)));

        Ok(())
    }

    #[test]
    fn rejected_update_leaves_the_quantity_unchanged() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");
        let limited = ItemRef::new(PRODUCT, 3);

        cart.add(&limited, 2, &no_options())?;
        let result = cart.add(&limited, 1, &no_options());

        assert!(matches!(result, Err(CartError::Rejected(_))));
        assert_eq!(cart.count(), 2);

        Ok(())
    }

    #[test]
    fn unknown_item_is_a_typed_error() {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");

        let result = cart.add(&ItemRef::new(PRODUCT, 99), 1, &no_options());

        assert!(matches!(result, Err(CartError::UnknownItem(_))));
    }

    #[test]
    fn count_and_subtotal_sum_over_lines() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");

        cart.add(&ItemRef::new(PRODUCT, 1), 2, &no_options())?;
        cart.add(&ItemRef::new(PRODUCT, 2), 1, &no_options())?;

        assert_eq!(cart.count(), 3);
        assert_eq!(cart.subtotal(), Decimal::new(2550, 2));

        Ok(())
    }

    #[test]
    fn clear_empties_the_cart_but_keeps_it_usable() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");
        let widget = ItemRef::new(PRODUCT, 1);

        cart.add(&widget, 2, &no_options())?;
        cart.clear()?;

        assert!(cart.is_empty());

        cart.add(&widget, 1, &no_options())?;
        assert_eq!(cart.count(), 1);

        Ok(())
    }

    #[test]
    fn empty_cart_is_never_valid() {
        let ctx = context();
        let cart = SessionCart::new(&ctx, "s1");

        assert!(cart.get_errors().is_empty());
        assert!(!cart.is_valid());
    }

    #[test]
    fn cart_with_lines_and_no_errors_is_valid() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");

        cart.add(&ItemRef::new(PRODUCT, 1), 1, &no_options())?;

        assert!(cart.is_valid());

        Ok(())
    }

    #[test]
    fn vanished_items_are_excluded_but_not_deleted() -> TestResult {
        let state = {
            let ctx = context();
            let mut cart = SessionCart::new(&ctx, "s1");
            cart.add(&ItemRef::new(PRODUCT, 1), 2, &no_options())?;
            cart.add(&ItemRef::new(PRODUCT, 2), 1, &no_options())?;
            cart.state()
        };

        // A catalogue where Gadget (id 2) has since been deleted.
        let mut catalogue = Catalogue::new();
        catalogue.insert(1, CatalogueProduct::new("Widget", Decimal::new(1000, 2)));
        let mut registry = ItemRegistry::new();
        registry.register(PRODUCT, catalogue);
        let ctx = CartContext::new(registry);

        let cart = SessionCart::restore(&ctx, "s1", state);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.subtotal(), Decimal::new(2000, 2));
        assert_eq!(cart.state().lines.len(), 2, "stored lines must survive");

        Ok(())
    }

    #[test]
    fn state_round_trips_through_session_storage() -> TestResult {
        let ctx = context();
        let mut cart = SessionCart::new(&ctx, "s1");

        cart.add(&ItemRef::new(PRODUCT, 1), 2, &no_options())?;
        cart.set_voucher_codes(vec!["SAVE10".into()])?;

        let state = cart.state();
        let json = serde_json::to_string(&state)?;
        let restored: SessionState = serde_json::from_str(&json)?;

        let cart = SessionCart::restore(&ctx, "s1", restored);

        assert_eq!(cart.count(), 2);
        assert_eq!(cart.voucher_codes(), vec!["SAVE10".to_string()]);

        Ok(())
    }
}
