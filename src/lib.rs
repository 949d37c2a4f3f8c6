//! Trolley
//!
//! Trolley is a storage-agnostic shopping cart and order engine: one uniform
//! contract over an ephemeral session cart and a durable persisted order,
//! schema-driven purchase-option normalization, pluggable shipping and
//! voucher calculators, and a transactional cart-to-order materializer.

pub mod carts;
pub mod checkout;
pub mod context;
pub mod events;
pub mod fixtures;
pub mod items;
pub mod lines;
pub mod options;
pub mod prelude;
pub mod shipping;
pub mod storage;
pub mod vouchers;
