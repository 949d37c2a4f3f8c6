//! Checkout materialization
//!
//! Converts any cart-like source into a persisted order in one atomic
//! replace. This is the only place a failure is fatal rather than collected
//! as data: a half-converted order is unacceptable.

use thiserror::Error;
use tracing::info;

use crate::{
    carts::{Cart, CartId, Order},
    events::CartEvent,
    lines::Line,
    storage::{OrderStore, StorageError},
};

/// Errors fatal to a checkout conversion.
///
/// A failure here means the storage transaction rolled back; the target
/// order keeps exactly the line set it had before the call.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The storage transaction failed and was rolled back.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Materializes `source` into `target`, replacing everything the order held.
///
/// Inside one storage transaction: the target's lines are deleted, the
/// source's resolvable lines are copied over as `(item, normalized options,
/// quantity)`, the shipping options payload is copied verbatim, and — when a
/// voucher module is configured and the source carries codes — the stored
/// discounts are replaced with ones recomputed for those codes.
///
/// Full-replace semantics, not a merge: re-running with a different source
/// fully supersedes the previous contents. Re-running with the same source
/// is idempotent.
///
/// # Errors
///
/// [`CheckoutError::Storage`] if any step fails; the transaction is rolled
/// back and no partial line set survives.
pub fn save_to<C, S>(source: &C, target: &mut Order<'_, S>) -> Result<(), CheckoutError>
where
    C: Cart + ?Sized,
    S: OrderStore,
{
    let order = target.key();
    let lines: Vec<Line> = source
        .lines()
        .into_iter()
        .map(crate::lines::ResolvedLine::into_line)
        .collect();
    let shipping_options = source.shipping_options();
    let codes = source.voucher_codes();

    // Shipping options were validated when they were stored on the source;
    // discounts are recomputed so stale target rows cannot survive.
    let discounts = match target.ctx().vouchers() {
        Some(module) if !codes.is_empty() => {
            Some(module.calculate_discounts(source.as_dyn(), &codes, true).0)
        }
        _ => None,
    };

    target.store_mut().transaction(order, &mut |store| {
        store.delete_lines(order)?;
        for line in &lines {
            store.upsert_line(order, line.clone())?;
        }
        store.set_shipping_options(order, shipping_options.clone())?;
        if let Some(discounts) = &discounts {
            store.replace_discounts(order, discounts.clone())?;
        }
        Ok(())
    })?;

    info!(order, source = ?source.id(), "cart materialized into order");
    target.ctx().notify(&CartEvent::Materialized {
        source: source.id(),
        target: CartId::Order(order),
    });

    Ok(())
}
