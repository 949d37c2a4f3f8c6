//! Fixtures
//!
//! Reusable sample catalogue and reference implementations of the pluggable
//! module contracts, for tests and examples.

use std::{fs, path::Path};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    items::{CartItem, ErrorMessage, ItemSource},
    lines::Line,
    options::{NormalizedOptions, OptionsSchema},
};

pub mod modules;

/// Fixture parsing errors.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files.
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format.
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),
}

/// One sample product, priced per unit.
#[derive(Debug, Clone)]
pub struct CatalogueProduct {
    name: String,
    price: Decimal,
    stock: Option<u32>,
    options: OptionsSchema,
}

impl CatalogueProduct {
    /// Creates a product with unlimited stock and no options.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
            stock: None,
            options: OptionsSchema::new(),
        }
    }

    /// Limits the available stock.
    #[must_use]
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = Some(stock);
        self
    }

    /// Declares the product's purchase options.
    #[must_use]
    pub fn with_options(mut self, options: OptionsSchema) -> Self {
        self.options = options;
        self
    }

    /// The unit price.
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }
}

impl CartItem for CatalogueProduct {
    fn line_total(&self, quantity: u32, _options: &NormalizedOptions) -> Decimal {
        self.price * Decimal::from(quantity)
    }

    fn cart_errors(&self, line: &Line) -> Vec<ErrorMessage> {
        match self.stock {
            Some(0) => vec![format!("{} is out of stock", self.name)],
            Some(stock) if line.quantity() > stock => {
                vec![format!("Only {stock} of {} available", self.name)]
            }
            _ => Vec::new(),
        }
    }

    fn cart_description(&self) -> String {
        self.name.clone()
    }

    fn options_schema(&self) -> OptionsSchema {
        self.options.clone()
    }
}

/// Sample catalogue resolving product ids for one item kind.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    products: FxHashMap<u64, CatalogueProduct>,
}

impl Catalogue {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product under the given id.
    pub fn insert(&mut self, id: u64, product: CatalogueProduct) {
        self.products.insert(id, product);
    }

    /// Removes a product, simulating deletion from the catalogue.
    pub fn remove(&mut self, id: u64) -> Option<CatalogueProduct> {
        self.products.remove(&id)
    }

    /// Loads a catalogue from YAML:
    ///
    /// ```yaml
    /// products:
    ///   - id: 1
    ///     name: Widget
    ///     price: "19.99"
    ///     stock: 3
    ///     options:
    ///       - name: colour
    ///         values: [red, black]
    /// ```
    ///
    /// # Errors
    ///
    /// - [`FixtureError::Yaml`]: the document does not parse.
    /// - [`FixtureError::InvalidPrice`]: a price is not a decimal string.
    pub fn from_yaml(yaml: &str) -> Result<Self, FixtureError> {
        let spec: CatalogueSpec = serde_norway::from_str(yaml)?;

        Self::from_spec(spec)
    }

    /// Loads a catalogue from a YAML file.
    ///
    /// # Errors
    ///
    /// As for [`Catalogue::from_yaml`], plus [`FixtureError::Io`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let yaml = fs::read_to_string(path)?;

        Self::from_yaml(&yaml)
    }

    fn from_spec(spec: CatalogueSpec) -> Result<Self, FixtureError> {
        let mut catalogue = Self::new();

        for product in spec.products {
            let Ok(price) = product.price.parse::<Decimal>() else {
                return Err(FixtureError::InvalidPrice(product.price));
            };

            let mut options = OptionsSchema::new();
            for option in product.options {
                let values: Vec<&str> = option.values.iter().map(String::as_str).collect();
                options = options.field(option.name, &values);
            }

            let mut entry = CatalogueProduct::new(product.name, price).with_options(options);
            if let Some(stock) = product.stock {
                entry = entry.with_stock(stock);
            }

            catalogue.insert(product.id, entry);
        }

        Ok(catalogue)
    }
}

impl ItemSource for Catalogue {
    fn resolve(&self, id: u64) -> Option<&dyn CartItem> {
        self.products.get(&id).map(|product| product as &dyn CartItem)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogueSpec {
    products: Vec<ProductSpec>,
}

#[derive(Debug, Deserialize)]
struct ProductSpec {
    id: u64,
    name: String,
    price: String,
    #[serde(default)]
    stock: Option<u32>,
    #[serde(default)]
    options: Vec<OptionSpec>,
}

#[derive(Debug, Deserialize)]
struct OptionSpec {
    name: String,
    values: Vec<String>,
}
