//! Generic field-value map handed between the extractor and the record constructor

use crate::entity::types::Timestamp;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive field value, or the explicit null marker meaning "clear this field"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text sent on the wire, `None` for the null marker
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::String(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "null"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(ts: Timestamp) -> Self {
        FieldValue::String(ts.to_canonical())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Ordered map from wire field name to value.
///
/// A key mapped to [`FieldValue::Null`] clears the field; a missing key leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(IndexMap<String, FieldValue>);

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Set a field, replacing any previous value in place
    pub fn insert<K, V>(&mut self, name: K, value: V) -> Option<FieldValue>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.0.insert(name.into(), value.into())
    }

    /// Mark a field to be cleared on the server
    pub fn insert_null<K: Into<String>>(&mut self, name: K) -> Option<FieldValue> {
        self.0.insert(name.into(), FieldValue::Null)
    }

    /// Builder-style variant of [`FieldValues::insert`]
    pub fn with<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Whether the field is present with a non-null value
    pub fn has_value(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for FieldValues
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for FieldValues {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldValues {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = indexmap::map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let values = FieldValues::new()
            .with("Name", "Acme")
            .with("NumberOfEmployees", 12)
            .with("IsActive__c", true);
        let names: Vec<&str> = values.names().collect();
        assert_eq!(names, vec!["Name", "NumberOfEmployees", "IsActive__c"]);
    }

    #[test]
    fn test_null_is_distinct_from_absent() {
        let mut values = FieldValues::new();
        values.insert_null("Description");
        assert!(values.contains_key("Description"));
        assert!(!values.has_value("Description"));
        assert!(!values.contains_key("Phone"));
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<&str> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(3_i64)), FieldValue::Int(3));
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(FieldValue::from(true).to_text().as_deref(), Some("true"));
        assert_eq!(FieldValue::from(1.5).to_text().as_deref(), Some("1.5"));
        assert_eq!(FieldValue::from(42).to_text().as_deref(), Some("42"));
        assert_eq!(FieldValue::Null.to_text(), None);
        let ts = Timestamp::from_timestamp(0).unwrap();
        assert_eq!(FieldValue::from(ts).to_text().as_deref(), Some("1970-01-01T00:00:00"));
    }

    #[test]
    fn test_reinsert_replaces_in_place() {
        let mut values: FieldValues = [("A", 1), ("B", 2)].into_iter().collect();
        values.insert("A", 10);
        let collected: Vec<(String, FieldValue)> = values.into_iter().collect();
        assert_eq!(
            collected,
            vec![
                ("A".to_string(), FieldValue::Int(10)),
                ("B".to_string(), FieldValue::Int(2)),
            ]
        );
    }
}
