//! Cart lines
//!
//! One `(item, options, quantity)` entry within a cart. Line identity is the
//! item reference plus the normalized options; within one cart there is at
//! most one line per [`LineKey`].

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    items::{CartItem, ErrorMessage, ItemRef},
    options::NormalizedOptions,
};

/// Canonical identity of a line within one cart.
///
/// Writes upsert on this key; persisted backends enforce uniqueness of
/// `(order, item kind, item id, canonical options)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    item: ItemRef,
    options: NormalizedOptions,
}

impl LineKey {
    /// Creates a key from an item reference and normalized options.
    #[must_use]
    pub fn new(item: ItemRef, options: NormalizedOptions) -> Self {
        Self { item, options }
    }

    /// The referenced item.
    #[must_use]
    pub fn item(&self) -> &ItemRef {
        &self.item
    }

    /// The normalized options.
    #[must_use]
    pub fn options(&self) -> &NormalizedOptions {
        &self.options
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.item, self.options.canonical())
    }
}

/// One item + options + quantity entry, as stored by either cart variant.
///
/// Quantity is always positive: a line that would reach zero is deleted by
/// the owning cart, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    item: ItemRef,
    options: NormalizedOptions,
    quantity: u32,
}

impl Line {
    /// Creates a line.
    #[must_use]
    pub fn new(item: ItemRef, options: NormalizedOptions, quantity: u32) -> Self {
        Self {
            item,
            options,
            quantity,
        }
    }

    /// The referenced item.
    #[must_use]
    pub fn item(&self) -> &ItemRef {
        &self.item
    }

    /// The normalized options chosen for this line.
    #[must_use]
    pub fn options(&self) -> &NormalizedOptions {
        &self.options
    }

    /// Units of the item on this line.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    /// The line's identity key.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.item.clone(), self.options.clone())
    }

    /// Whether this line carries the given identity.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        &self.item == key.item() && &self.options == key.options()
    }
}

/// A line paired with its resolved item.
///
/// Carts only list resolvable lines; a line whose item has vanished is
/// excluded from listings and totals but kept in storage.
#[derive(Clone)]
pub struct ResolvedLine<'a> {
    line: Line,
    item: &'a dyn CartItem,
}

impl<'a> ResolvedLine<'a> {
    pub(crate) fn new(line: Line, item: &'a dyn CartItem) -> Self {
        Self { line, item }
    }

    /// The stored line.
    #[must_use]
    pub fn line(&self) -> &Line {
        &self.line
    }

    /// Unwraps the stored line.
    #[must_use]
    pub fn into_line(self) -> Line {
        self.line
    }

    /// The resolved item.
    #[must_use]
    pub fn item(&self) -> &'a dyn CartItem {
        self.item
    }

    /// The referenced item.
    #[must_use]
    pub fn item_ref(&self) -> &ItemRef {
        self.line.item()
    }

    /// The normalized options chosen for this line.
    #[must_use]
    pub fn options(&self) -> &NormalizedOptions {
        self.line.options()
    }

    /// Units of the item on this line.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.line.quantity()
    }

    /// Line total, priced by the item in currency-precision decimals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.item.line_total(self.line.quantity(), self.line.options())
    }

    /// The item's purchase description.
    #[must_use]
    pub fn description(&self) -> String {
        self.item.cart_description()
    }

    /// Item-level validation errors for this line.
    #[must_use]
    pub fn errors(&self) -> Vec<ErrorMessage> {
        self.item.cart_errors(&self.line)
    }

    /// Renders the chosen options as `name: value, …`.
    #[must_use]
    pub fn options_text(&self) -> String {
        self.line.options().to_string()
    }

    /// Serializable projection of this line.
    #[must_use]
    pub fn payload(&self) -> LinePayload {
        LinePayload {
            description: self.description(),
            options: self.line.options().clone(),
            quantity: self.line.quantity(),
            total: self.total(),
        }
    }
}

impl fmt::Debug for ResolvedLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedLine")
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

/// Serialized form of one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePayload {
    /// The item's purchase description.
    pub description: String,

    /// The normalized options chosen for the line.
    pub options: NormalizedOptions,

    /// Units of the item.
    pub quantity: u32,

    /// Line total, projected to a float at this boundary only.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}
