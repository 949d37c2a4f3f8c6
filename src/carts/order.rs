//! Persisted orders
//!
//! The durable cart variant. Behaves identically to a session cart through
//! the [`Cart`] contract; the differences are lifecycle ones: rows live in
//! an [`OrderStore`], and clearing deletes the order record itself rather
//! than just its lines.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    carts::{Cart, CartError, CartId, UpdateMode, UpdateOutcome, resolve_quantity},
    context::CartContext,
    events::CartEvent,
    items::ItemRef,
    lines::{Line, LineKey, ResolvedLine},
    options::{NormalizedOptions, RawOptions},
    storage::OrderStore,
};

/// Durable cart variant backed by an [`OrderStore`].
#[derive(Debug)]
pub struct Order<'a, S: OrderStore> {
    ctx: &'a CartContext,
    id: u64,
    store: &'a mut S,
}

impl<'a, S: OrderStore> Order<'a, S> {
    /// Opens the order, creating its backing record on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the backend cannot create the
    /// record.
    pub fn open(ctx: &'a CartContext, id: u64, store: &'a mut S) -> Result<Self, CartError> {
        store.ensure_order(id)?;

        Ok(Self { ctx, id, store })
    }

    /// The order's primary key.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.id
    }

    /// Whether the backing record still exists.
    ///
    /// `false` after [`Cart::clear`], which deletes the record.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.store.order_exists(self.id)
    }

    pub(crate) fn ctx(&self) -> &'a CartContext {
        self.ctx
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        self.store
    }
}

impl<S: OrderStore> Cart for Order<'_, S> {
    fn id(&self) -> CartId {
        CartId::Order(self.id)
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

        let existing = self
            .store
            .lines(self.id)?
            .into_iter()
            .find(|line| line.matches(&key))
            .map_or(0, |line| line.quantity());

        let Some(next) = resolve_quantity(existing, quantity, mode)? else {
            let removed = self.store.delete_line(self.id, &key)?;
            if removed {
                debug!(order = self.id, item = %item, "order line removed");
                ctx.notify(&CartEvent::LineRemoved {
                    cart: CartId::Order(self.id),
                    key,
                });
            }
            return Ok(UpdateOutcome::Removed);
        };

        let candidate = Line::new(item.clone(), options, next);
        let errors = resolved.cart_errors(&candidate);
        if !errors.is_empty() {
            return Err(CartError::Rejected(errors));
        }

        self.store.upsert_line(self.id, candidate)?;

        debug!(order = self.id, item = %item, quantity = next, "order line updated");
        ctx.notify(&CartEvent::LineUpdated {
            cart: CartId::Order(self.id),
            key,
            quantity: next,
        });

        Ok(UpdateOutcome::Updated)
    }

    fn lines(&self) -> Vec<ResolvedLine<'_>> {
        let stored = match self.store.lines(self.id) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(order = self.id, error = %err, "order lines could not be read");
                Vec::new()
            }
        };

        stored
            .into_iter()
            .filter_map(|line| match self.ctx.registry().resolve(line.item()) {
                Some(item) => Some(ResolvedLine::new(line, item)),
                None => {
                    warn!(order = self.id, item = %line.item(), "order line item no longer resolves");
                    None
                }
            })
            .collect()
    }

    fn clear(&mut self) -> Result<(), CartError> {
        // An order's identity is its existence; clearing deletes the record.
        self.store.delete_order(self.id)?;
        self.ctx.notify(&CartEvent::Cleared {
            cart: CartId::Order(self.id),
        });
        Ok(())
    }

    fn shipping_options(&self) -> Option<Value> {
        self.store.shipping_options(self.id).ok().flatten()
    }

    fn set_shipping_options(&mut self, options: Option<Value>) -> Result<(), CartError> {
        self.store.set_shipping_options(self.id, options)?;
        Ok(())
    }

    fn voucher_codes(&self) -> Vec<String> {
        let discounts = self.store.discounts(self.id).unwrap_or_default();
        let mut codes: Vec<String> = Vec::with_capacity(discounts.len());

        for discount in discounts {
            if !codes.contains(&discount.code) {
                codes.push(discount.code);
            }
        }

        codes
    }

    fn set_voucher_codes(&mut self, codes: Vec<String>) -> Result<(), CartError> {
        let ctx = self.ctx;
        let discounts = match ctx.vouchers() {
            Some(module) => module.calculate_discounts(self.as_dyn(), &codes, true).0,
            None => Vec::new(),
        };

        self.store.replace_discounts(self.id, discounts)?;
        Ok(())
    }
}
