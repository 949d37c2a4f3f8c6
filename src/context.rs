//! Engine context
//!
//! Everything a cart consults beyond its own lines: the item registry and
//! the optional shipping, voucher, renderer and observer capabilities.
//! Absence of an optional capability is a typed `None`, never an error.

use std::fmt;

use crate::{
    carts::Cart,
    events::{CartEvent, CartObserver},
    items::ItemRegistry,
    shipping::ShippingModule,
    vouchers::VoucherModule,
};

/// Renders a cart into a display snippet for the serialized payload.
pub trait CartRenderer {
    /// Produces the snippet for the given cart.
    fn render(&self, cart: &dyn Cart) -> String;
}

/// Shared context carts of either variant are constructed against.
pub struct CartContext {
    registry: ItemRegistry,
    shipping: Option<Box<dyn ShippingModule>>,
    vouchers: Option<Box<dyn VoucherModule>>,
    renderer: Option<Box<dyn CartRenderer>>,
    observers: Vec<Box<dyn CartObserver>>,
}

impl CartContext {
    /// Creates a context with no optional capabilities attached.
    #[must_use]
    pub fn new(registry: ItemRegistry) -> Self {
        Self {
            registry,
            shipping: None,
            vouchers: None,
            renderer: None,
            observers: Vec::new(),
        }
    }

    /// Attaches the shipping calculator.
    #[must_use]
    pub fn with_shipping(mut self, module: impl ShippingModule + 'static) -> Self {
        self.shipping = Some(Box::new(module));
        self
    }

    /// Attaches the voucher discount calculator.
    #[must_use]
    pub fn with_vouchers(mut self, module: impl VoucherModule + 'static) -> Self {
        self.vouchers = Some(Box::new(module));
        self
    }

    /// Attaches the payload snippet renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl CartRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Registers an observer for cart lifecycle events.
    #[must_use]
    pub fn with_observer(mut self, observer: impl CartObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// The item registry.
    #[must_use]
    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    /// The shipping calculator, if one is attached.
    #[must_use]
    pub fn shipping(&self) -> Option<&dyn ShippingModule> {
        self.shipping.as_deref()
    }

    /// The voucher calculator, if one is attached.
    #[must_use]
    pub fn vouchers(&self) -> Option<&dyn VoucherModule> {
        self.vouchers.as_deref()
    }

    /// The snippet renderer, if one is attached.
    #[must_use]
    pub fn renderer(&self) -> Option<&dyn CartRenderer> {
        self.renderer.as_deref()
    }

    /// Notifies every registered observer, synchronously and in order.
    pub fn notify(&self, event: &CartEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

impl fmt::Debug for CartContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartContext")
            .field("registry", &self.registry)
            .field("shipping", &self.shipping.is_some())
            .field("vouchers", &self.vouchers.is_some())
            .field("renderer", &self.renderer.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}
