//! Purchase options
//!
//! Ad-hoc per-item options ("Add monogramming", colour, size) chosen when an
//! item is added to a cart. Raw caller input is normalized against the
//! item's schema before it ever touches line identity.

use std::{collections::BTreeMap, fmt};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Caller-supplied option values, untrusted and unordered.
///
/// A fresh map is expected per call; raw input is never stored.
pub type RawOptions = FxHashMap<String, String>;

/// Ordered mapping of option name to its allowed values.
///
/// The first listed value for each name is that option's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsSchema {
    fields: Vec<(String, Vec<String>)>,
}

impl OptionsSchema {
    /// Creates a schema with no options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option with its allowed values, in preference order.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, values: &[&str]) -> Self {
        self.fields.push((
            name.into(),
            values.iter().map(ToString::to_string).collect(),
        ));
        self
    }

    /// Iterates over the declared options in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Whether the schema declares any options at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Option values restricted to an item's schema, with stable key order.
///
/// Two option maps are equal iff their canonical serializations are equal.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NormalizedOptions(BTreeMap<String, String>);

impl NormalizedOptions {
    /// Normalizes raw option input against a schema.
    ///
    /// For each schema key the raw value is kept when it is listed as
    /// allowed; anything else falls back to the first allowed value. Keys
    /// the schema does not declare are dropped, as are schema keys with no
    /// allowed values. Pure and total: invalid input never fails, and
    /// normalizing an already-normalized map is the identity.
    #[must_use]
    pub fn normalize(schema: &OptionsSchema, raw: &RawOptions) -> Self {
        let mut options = BTreeMap::new();

        for (name, allowed) in schema.iter() {
            let value = raw
                .get(name)
                .filter(|value| allowed.contains(*value))
                .or_else(|| allowed.first());

            if let Some(value) = value {
                options.insert(name.to_string(), value.clone());
            }
        }

        Self(options)
    }

    /// Stable `name=value;…` serialization with sorted keys.
    ///
    /// The persisted line-uniqueness constraint is declared over this form.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = String::new();

        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            out.push_str(name);
            out.push('=');
            out.push_str(value);
        }

        out
    }

    /// The normalized value for an option, if the schema declared it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of normalized options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no options survived normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedOptions {
    /// Renders `name: value, …` for line descriptions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> OptionsSchema {
        OptionsSchema::new()
            .field("colour", &["red", "black"])
            .field("size", &["S", "M", "L"])
    }

    fn raw(pairs: &[(&str, &str)]) -> RawOptions {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn missing_values_default_to_first_allowed() {
        let options = NormalizedOptions::normalize(&schema(), &raw(&[]));

        assert_eq!(options.get("colour"), Some("red"));
        assert_eq!(options.get("size"), Some("S"));
    }

    #[test]
    fn listed_values_are_kept() {
        let options = NormalizedOptions::normalize(&schema(), &raw(&[("size", "L")]));

        assert_eq!(options.get("size"), Some("L"));
        assert_eq!(options.get("colour"), Some("red"));
    }

    #[test]
    fn unlisted_values_fall_back_to_default() {
        let options = NormalizedOptions::normalize(&schema(), &raw(&[("size", "XXL")]));

        assert_eq!(options.get("size"), Some("S"));
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let options =
            NormalizedOptions::normalize(&schema(), &raw(&[("giftwrap", "yes")]));

        assert_eq!(options.get("giftwrap"), None);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn empty_schema_normalizes_to_nothing() {
        let options =
            NormalizedOptions::normalize(&OptionsSchema::new(), &raw(&[("size", "L")]));

        assert!(options.is_empty());
    }

    #[test]
    fn normalization_is_idempotent() {
        let schema = schema();
        let once = NormalizedOptions::normalize(&schema, &raw(&[("size", "M")]));

        let again: RawOptions = once
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let twice = NormalizedOptions::normalize(&schema, &again);

        assert_eq!(once, twice);
    }

    #[test]
    fn canonical_form_is_sorted_and_stable() {
        let options = NormalizedOptions::normalize(&schema(), &raw(&[("size", "M")]));

        assert_eq!(options.canonical(), "colour=red;size=M");
    }

    #[test]
    fn equal_options_have_equal_canonical_forms() {
        let schema = schema();
        let left =
            NormalizedOptions::normalize(&schema, &raw(&[("size", "M"), ("colour", "red")]));
        let right =
            NormalizedOptions::normalize(&schema, &raw(&[("colour", "red"), ("size", "M")]));

        assert_eq!(left, right);
        assert_eq!(left.canonical(), right.canonical());
    }

    #[test]
    fn display_renders_name_value_pairs() {
        let options = NormalizedOptions::normalize(&schema(), &raw(&[("size", "M")]));

        assert_eq!(options.to_string(), "colour: red, size: M");
    }
}
