//! Generic record and field value types
//!
//! A [`Record`] is an ordered mapping from field name to [`FieldValue`]. The
//! same type carries both naming views (external mixed-case and internal
//! underscore-case); only the `mapper` module converts between them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrudError, CrudResult};

/// Name of the identifier field in both naming views
pub const ID_FIELD: &str = "id";

/// A single storage-representable value
///
/// Deserialization never produces `Timestamp`: JSON strings always become
/// `Text`. Timestamps are created programmatically and serialize as RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<FieldValue>),
    Record(Record),
}

impl FieldValue {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::List(_) => "list",
            FieldValue::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Borrow the text content, if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the nested record, if this is a record value
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Interpret integer and boolean values as a flag
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Convert from a JSON value
    pub fn from_json(value: serde_json::Value) -> CrudResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            FieldValue::List(_) | FieldValue::Record(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(t)
    }
}

impl From<Record> for FieldValue {
    fn from(r: Record) -> Self {
        FieldValue::Record(r)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// An ordered mapping from field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// The populated identifier of this record
    ///
    /// A missing, null or blank `id` yields `Ok(None)`. Any non-text value is
    /// a params error.
    pub fn id(&self) -> CrudResult<Option<&str>> {
        match self.0.get(ID_FIELD) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(FieldValue::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(CrudError::Params(format!(
                "Invalid value type for field `{}`: expected text, found {}",
                ID_FIELD,
                other.kind()
            ))),
        }
    }

    /// Copy of this record with `other`'s fields written over it
    pub fn merged_with(&self, other: &Record) -> Record {
        let mut merged = self.clone();
        for (key, value) in other.iter() {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Convert a JSON object into a record
    ///
    /// Anything other than an object is a mapping error.
    pub fn from_json(value: serde_json::Value) -> CrudResult<Self> {
        match value {
            serde_json::Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(CrudError::Mapping(format!(
                "expected a structured record, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Convert a JSON object or array of objects into records
    pub fn many_from_json(value: serde_json::Value) -> CrudResult<Vec<Self>> {
        match value {
            serde_json::Value::Array(items) => items.into_iter().map(Record::from_json).collect(),
            other => Ok(vec![Record::from_json(other)?]),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Record(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "record",
    }
}

/// Build a [`Record`] from `field => value` pairs
#[macro_export]
macro_rules! record {
    () => {
        $crate::models::Record::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::models::Record::new();
        $(record.insert($field, $value);)+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion() {
        let record = Record::from_json(json!({
            "name": "services",
            "count": 3,
            "ratio": 0.5,
            "active": true,
            "tags": ["a", "b"],
            "owner": {"id": "u1"},
            "note": null
        }))
        .unwrap();

        assert_eq!(record.get("name"), Some(&FieldValue::Text("services".into())));
        assert_eq!(record.get("count"), Some(&FieldValue::Int(3)));
        assert_eq!(record.get("ratio"), Some(&FieldValue::Float(0.5)));
        assert_eq!(record.get("active"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.get("tags").map(FieldValue::kind), Some("list"));
        assert_eq!(record.get("owner").map(FieldValue::kind), Some("record"));
        assert!(record.get("note").unwrap().is_null());
    }

    #[test]
    fn test_non_object_is_mapping_error() {
        let err = Record::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, CrudError::Mapping(_)));

        let err = Record::from_json(json!("text")).unwrap_err();
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_many_from_json() {
        let records = Record::many_from_json(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(records.len(), 2);

        let single = Record::many_from_json(json!({"a": 1})).unwrap();
        assert_eq!(single.len(), 1);

        assert!(Record::many_from_json(json!([{"a": 1}, 5])).is_err());
    }

    #[test]
    fn test_id_extraction() {
        assert_eq!(record! {"id" => "abc"}.id().unwrap(), Some("abc"));
        assert_eq!(record! {"id" => ""}.id().unwrap(), None);
        assert_eq!(record! {"name" => "x"}.id().unwrap(), None);
        assert_eq!(record! {"id" => FieldValue::Null}.id().unwrap(), None);

        let err = record! {"id" => 42}.id().unwrap_err();
        assert!(err.is_params());
    }

    #[test]
    fn test_timestamp_serializes_as_text() {
        let ts = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let value = FieldValue::Timestamp(ts);
        assert_eq!(value.to_json(), json!("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn test_merged_with() {
        let base = record! {"id" => "1", "name" => "old", "kind" => "x"};
        let changes = record! {"name" => "new"};
        let merged = base.merged_with(&changes);
        assert_eq!(merged.get("name"), Some(&FieldValue::from("new")));
        assert_eq!(merged.get("kind"), Some(&FieldValue::from("x")));
    }
}
