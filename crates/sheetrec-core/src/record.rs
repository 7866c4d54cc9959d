//! Keyed records and header mappings

use crate::value::CellValue;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// One row of a sheet, keyed by column header
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, CellValue>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    /// Set a field value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Option<CellValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, CellValue> {
        self.fields.iter()
    }

    /// Copy every field of `other` onto this record; `other` wins on shared keys
    pub fn assign(&mut self, other: &Record) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Compact JSON rendering for error messages
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self.fields))
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a CellValue);
    type IntoIter = btree_map::Iter<'a, String, CellValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Ordered pairs of (destination header, source key)
///
/// Used where the caller's records are keyed differently from the sheet's
/// column headers. Order is kept so join keys built from a mapping are
/// deterministic. A destination header appears at most once; pushing it
/// again replaces its source key in place.
///
/// In JSON a mapping is either an object (`{"First Name": "firstName"}`,
/// document order kept) or an array of two-element arrays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMapping {
    pairs: Vec<(String, String)>,
}

impl HeaderMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from (destination, source) pairs
    pub fn from_pairs<I, D, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, S)>,
        D: Into<String>,
        S: Into<String>,
    {
        let mut mapping = Self::new();
        for (dest, source) in pairs {
            mapping.push(dest, source);
        }
        mapping
    }

    /// Add or replace the source key for a destination header
    pub fn push(&mut self, dest: impl Into<String>, source: impl Into<String>) {
        let dest = dest.into();
        let source = source.into();
        match self.pairs.iter_mut().find(|(d, _)| *d == dest) {
            Some(pair) => pair.1 = source,
            None => self.pairs.push((dest, source)),
        }
    }

    /// Source key for a destination header
    pub fn source_for(&self, dest: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(d, _)| d == dest)
            .map(|(_, s)| s.as_str())
    }

    /// Iterate over (destination, source) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(d, s)| (d.as_str(), s.as_str()))
    }

    /// Destination headers in order
    pub fn dest_headers(&self) -> Vec<&str> {
        self.pairs.iter().map(|(d, _)| d.as_str()).collect()
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the mapping is empty
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Serialize for HeaderMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (dest, source) in &self.pairs {
            map.serialize_entry(dest, source)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(HeaderMappingVisitor)
    }
}

struct HeaderMappingVisitor;

impl<'de> Visitor<'de> for HeaderMappingVisitor {
    type Value = HeaderMapping;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of destination header to source key, or an array of [header, key] pairs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut mapping = HeaderMapping::new();
        while let Some((dest, source)) = access.next_entry::<String, String>()? {
            mapping.push(dest, source);
        }
        Ok(mapping)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut mapping = HeaderMapping::new();
        while let Some(pair) = access.next_element::<Vec<String>>()? {
            match <[String; 2]>::try_from(pair) {
                Ok([dest, source]) => mapping.push(dest, source),
                Err(pair) => {
                    return Err(de::Error::invalid_length(pair.len(), &"a [header, key] pair"));
                }
            }
        }
        Ok(mapping)
    }
}
