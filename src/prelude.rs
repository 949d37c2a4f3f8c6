//! Trolley prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    carts::{
        Cart, CartError, CartId, CartPayload, Order, SessionCart, SessionState, UpdateMode,
        UpdateOutcome,
    },
    checkout::{CheckoutError, save_to},
    context::{CartContext, CartRenderer},
    events::{CartEvent, CartObserver},
    items::{CartItem, ErrorMessage, ItemRef, ItemRegistry, ItemSource},
    lines::{Line, LineKey, LinePayload, ResolvedLine},
    options::{NormalizedOptions, OptionsSchema, RawOptions},
    shipping::ShippingModule,
    storage::{MemoryOrderStore, OrderStore, StorageError},
    vouchers::{Discount, VoucherModule},
};
