//! Insert requests
//!
//! Callers either build an [`InsertRequest`] directly or hand over a loose
//! [`ContentValues`] bag with the well-known keys, the way a generic file
//! provider receives them.

use crate::errors::{GwError, GwErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const KEY_PATH: &str = "path";
pub const KEY_MANIFEST: &str = "manifest";
pub const KEY_AUTHOR: &str = "author";
pub const KEY_VERSION: &str = "version";
pub const KEY_DATE: &str = "date";
pub const KEY_NAME: &str = "name";
pub const KEY_SAVE_MANIFEST: &str = "save_manifest";

/// Independently optional inputs of an insert
///
/// `author` distinguishes "not given" (`None`, use the default identity)
/// from "given but empty" (`Some("")`, submit without an author).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertRequest {
    pub payload_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub author: Option<String>,
    pub version: Option<u64>,
    pub date_millis: Option<i64>,
    pub name: Option<String>,
    pub save_manifest_path: Option<PathBuf>,
}

impl InsertRequest {
    /// Build a request from a loose key/value bag
    ///
    /// Unknown keys are ignored. Numbers may be given as JSON numbers or as
    /// decimal strings; anything else for `version`/`date` is `InvalidInput`.
    pub fn from_values(values: &ContentValues) -> Result<Self, GwError> {
        Ok(Self {
            payload_path: values.get_as_string(KEY_PATH)?.map(PathBuf::from),
            manifest_path: values.get_as_string(KEY_MANIFEST)?.map(PathBuf::from),
            author: values.get_as_string(KEY_AUTHOR)?,
            version: values
                .get_as_i64(KEY_VERSION)?
                .map(|v| {
                    u64::try_from(v).map_err(|_| {
                        GwError::new(GwErrorKind::InvalidInput)
                            .with_message(format!("'{}' cannot be negative: {}", KEY_VERSION, v))
                    })
                })
                .transpose()?,
            date_millis: values.get_as_i64(KEY_DATE)?,
            name: values.get_as_string(KEY_NAME)?,
            save_manifest_path: values.get_as_string(KEY_SAVE_MANIFEST)?.map(PathBuf::from),
        })
    }

    /// True when any manifest-field override is present
    pub fn has_overrides(&self) -> bool {
        self.author.is_some()
            || self.version.is_some()
            || self.date_millis.is_some()
            || self.name.is_some()
    }
}

/// Loose key/value bag, mirroring a provider's value container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentValues(BTreeMap<String, Value>);

impl ContentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Text value; numbers and booleans are rendered, `null` counts as absent
    pub fn get_as_string(&self, key: &str) -> Result<Option<String>, GwError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(invalid_value(key, other, "expected text")),
        }
    }

    /// Integer value; decimal strings are accepted
    pub fn get_as_i64(&self, key: &str) -> Result<Option<i64>, GwError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| invalid_value(key, &Value::Number(n.clone()), "expected integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid_value(key, &Value::String(s.clone()), "expected integer")),
            Some(other) => Err(invalid_value(key, other, "expected integer")),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ContentValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn invalid_value(key: &str, value: &Value, reason: &str) -> GwError {
    GwError::new(GwErrorKind::InvalidInput)
        .with_op("parse_content_values")
        .with_message(format!("value for '{}' is invalid ({}): {}", key, reason, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_all_fields() {
        let values: ContentValues = [
            (KEY_PATH, Value::from("/tmp/p.bin")),
            (KEY_MANIFEST, Value::from("/tmp/m")),
            (KEY_AUTHOR, Value::from("")),
            (KEY_VERSION, Value::from(5)),
            (KEY_DATE, Value::from("1700000000000")),
            (KEY_NAME, Value::from("p.bin")),
            (KEY_SAVE_MANIFEST, Value::from("/tmp/out")),
        ]
        .into_iter()
        .collect();

        let req = InsertRequest::from_values(&values).unwrap();
        assert_eq!(req.payload_path, Some(PathBuf::from("/tmp/p.bin")));
        assert_eq!(req.author.as_deref(), Some(""));
        assert_eq!(req.version, Some(5));
        assert_eq!(req.date_millis, Some(1_700_000_000_000));
        assert_eq!(req.save_manifest_path, Some(PathBuf::from("/tmp/out")));
        assert!(req.has_overrides());
    }

    #[test]
    fn test_from_values_empty_is_default() {
        let req = InsertRequest::from_values(&ContentValues::new()).unwrap();
        assert_eq!(req, InsertRequest::default());
        assert!(!req.has_overrides());
    }

    #[test]
    fn test_null_counts_as_absent() {
        let mut values = ContentValues::new();
        values.put(KEY_AUTHOR, Value::Null);
        let req = InsertRequest::from_values(&values).unwrap();
        assert_eq!(req.author, None);
    }

    #[test]
    fn test_bad_number_is_invalid_input() {
        let mut values = ContentValues::new();
        values.put(KEY_VERSION, "seven");
        let err = InsertRequest::from_values(&values).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::InvalidInput);
        assert!(err.message().contains("version"));
    }

    #[test]
    fn test_negative_version_is_invalid_input() {
        let mut values = ContentValues::new();
        values.put(KEY_VERSION, -1);
        let err = InsertRequest::from_values(&values).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::InvalidInput);
    }

    #[test]
    fn test_values_deserialize_from_json_object() {
        let values: ContentValues =
            serde_json::from_str(r#"{"name":"n","version":"3"}"#).unwrap();
        let req = InsertRequest::from_values(&values).unwrap();
        assert_eq!(req.name.as_deref(), Some("n"));
        assert_eq!(req.version, Some(3));
    }
}
