//! Defines the parameter map carried by route states and match results.

use std::fmt;
use std::iter::FromIterator;

use serde::{Deserialize, Serialize};

/// A single route parameter value: a scalar, a list (repeated query keys),
/// or null (a bare query key with no value).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A single scalar value.
    Single(String),
    /// Repeated values for the same key.
    List(Vec<String>),
    /// A key that is present without a value.
    Null,
}

impl ParamValue {
    /// The scalar form of this value, if it has one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::List(values) => values.first().map(String::as_str),
            ParamValue::Null => None,
        }
    }

    /// All values, scalar or repeated.
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Single(s) => vec![s.as_str()],
            ParamValue::List(values) => values.iter().map(String::as_str).collect(),
            ParamValue::Null => vec![],
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Single(s) => f.write_str(s),
            ParamValue::List(values) => f.write_str(&values.join(",")),
            ParamValue::Null => Ok(()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Single(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Single(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

/// Whether a parameter comes from the URL path or the query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Captured from the path portion (URL, matrix and splat parameters).
    Url,
    /// Parsed from the query string.
    Query,
}

/// An insertion-ordered map of parameter names to values.
///
/// Ordering is preserved so that built URLs and serialized states are
/// stable; equality is order-insensitive.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Params::default()
    }

    /// Inserts a value, replacing in place if the key already exists.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Looks a value up by key.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// True when the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts every entry of `other`, overriding existing keys.
    pub fn extend(&mut self, other: &Params) {
        for (k, v) in other.iter() {
            self.insert(k, v.clone());
        }
    }

    /// Inserts entries of `other` whose keys are not yet present.
    pub(crate) fn merge_defaults(&mut self, defaults: &Params) {
        for (k, v) in defaults.iter() {
            if !self.contains_key(k) {
                self.insert(k, v.clone());
            }
        }
    }

    /// True when both maps contain the same keys with equal values,
    /// restricted to `keys` when given.
    pub(crate) fn equal_on<'k>(
        &self,
        other: &Params,
        keys: impl Iterator<Item = &'k str>,
    ) -> bool {
        for key in keys {
            if self.get(key) != other.get(key) {
                return false;
            }
        }
        true
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| ov == v))
    }
}

impl Eq for Params {}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut params = Params::new();
        params.insert("a", "1");
        params.insert("b", "2");
        params.insert("a", "3");

        let keys: Vec<_> = params.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(params.get("a").unwrap().as_str(), Some("3"));
    }

    #[test]
    fn equality_ignores_order() {
        let mut a = Params::new();
        a.insert("x", "1");
        a.insert("y", "2");

        let mut b = Params::new();
        b.insert("y", "2");
        b.insert("x", "1");

        assert_eq!(a, b);
    }

    #[test]
    fn defaults_do_not_override() {
        let mut params = Params::new();
        params.insert("id", "42");

        let mut defaults = Params::new();
        defaults.insert("id", "1");
        defaults.insert("lang", "en");

        params.merge_defaults(&defaults);
        assert_eq!(params.get("id").unwrap().as_str(), Some("42"));
        assert_eq!(params.get("lang").unwrap().as_str(), Some("en"));
    }
}
