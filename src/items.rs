//! Items
//!
//! Anything that can price, validate and describe itself may live in a cart.
//! The catalogue owns the items; carts hold only a [`ItemRef`] and resolve
//! it through the [`ItemRegistry`] on every read.

use std::fmt;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    lines::Line,
    options::{NormalizedOptions, OptionsSchema},
};

/// Human-readable validation message surfaced to the caller as data.
pub type ErrorMessage = String;

/// Reference to a cart-capable item: a registered kind tag plus an id.
///
/// The non-owning stand-in for whatever entity the catalogue subsystem
/// manages; a reference may stop resolving if the item is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    kind: String,
    id: u64,
}

impl ItemRef {
    /// Creates a reference from a kind tag and an id.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: u64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// The registered kind tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The id within the kind's source.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

/// Capability an item must provide to participate in a cart.
pub trait CartItem {
    /// Total price for a quantity of this item with the given options.
    fn line_total(&self, quantity: u32, options: &NormalizedOptions) -> Decimal;

    /// Business-rule errors for a prospective line, e.g. out of stock.
    fn cart_errors(&self, _line: &Line) -> Vec<ErrorMessage> {
        Vec::new()
    }

    /// Describes the item as purchased. Orders keep this description even
    /// after the item itself changes or disappears.
    fn cart_description(&self) -> String;

    /// Available purchase options; the first value per name is the default.
    fn options_schema(&self) -> OptionsSchema {
        OptionsSchema::new()
    }
}

/// Lookup for one kind of item.
pub trait ItemSource {
    /// Resolves an id to an item, or `None` if it no longer exists.
    fn resolve(&self, id: u64) -> Option<&dyn CartItem>;
}

/// Registry mapping kind tags to their item sources.
#[derive(Default)]
pub struct ItemRegistry {
    sources: FxHashMap<String, Box<dyn ItemSource>>,
}

impl ItemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the source for a kind tag, replacing any existing one.
    pub fn register(&mut self, kind: impl Into<String>, source: impl ItemSource + 'static) {
        self.sources.insert(kind.into(), Box::new(source));
    }

    /// Resolves a reference, or `None` for unregistered kinds and vanished ids.
    #[must_use]
    pub fn resolve(&self, item: &ItemRef) -> Option<&dyn CartItem> {
        self.sources.get(item.kind())?.resolve(item.id())
    }

    /// Whether any sources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for ItemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.sources.keys().collect();
        kinds.sort();

        f.debug_struct("ItemRegistry").field("kinds", &kinds).finish()
    }
}
