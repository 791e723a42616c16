//! Request/response body serializers.
//!
//! A [`Serializer`] turns a JSON value into wire bytes plus content headers,
//! and turns response text back into a JSON value. The client converts typed
//! bodies to and from [`serde_json::Value`] around it, so the serializer
//! strategy never needs to know the caller's types.

mod case_insensitive;
mod compression;
mod form;
mod json;

pub use compression::{Compression, GzipCompression};
pub use form::FormUrlEncodedSerializer;
pub use json::{GzipJsonSerializer, JsonSerializer};

use crate::{Error, Result};
use http::HeaderMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;

/// An encoded request body and the content headers that describe it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedBody {
    /// The bytes to send.
    pub bytes: Vec<u8>,
    /// Content headers such as `Content-Type` and `Content-Encoding`.
    pub headers: HeaderMap,
}

/// Strategy for encoding request bodies and decoding response bodies.
///
/// # Examples
///
/// ```
/// use restline::serializer::{EncodedBody, Serializer};
/// use restline::Result;
/// use serde_json::Value;
///
/// #[derive(Debug)]
/// struct PlainText;
///
/// impl Serializer for PlainText {
///     fn serialize(&self, body: &Value) -> Result<EncodedBody> {
///         Ok(EncodedBody {
///             bytes: body.to_string().into_bytes(),
///             ..Default::default()
///         })
///     }
///
///     fn deserialize(&self, text: &str) -> Result<Value> {
///         Ok(Value::String(text.to_string()))
///     }
/// }
/// ```
pub trait Serializer: Send + Sync + fmt::Debug {
    /// Encodes a request body.
    fn serialize(&self, body: &Value) -> Result<EncodedBody>;

    /// Decodes a response body.
    fn deserialize(&self, text: &str) -> Result<Value>;
}

/// Converts a typed body into the JSON value handed to a [`Serializer`].
pub(crate) fn to_value<T: Serialize + ?Sized>(body: &T) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))
}

/// Converts a decoded JSON value into the caller's type.
///
/// Object keys that do not exactly match a field name are matched against the
/// field names case-insensitively.
pub fn from_value<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    T::deserialize(case_insensitive::CaseInsensitive(value))
}

/// Removes null-valued fields from every object in the value.
pub(crate) fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Widget {
        id: u32,
        display_name: String,
        tags: Vec<Tag>,
        parent: Option<Box<Widget>>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Tag {
        label: String,
    }

    #[test]
    fn test_from_value_matches_case_insensitively() {
        let value = json!({
            "ID": 7,
            "Display_Name": "gear",
            "TAGS": [{"Label": "a"}],
            "Parent": {"id": 1, "display_name": "root", "tags": [], "parent": null}
        });

        let widget: Widget = from_value(value).unwrap();
        assert_eq!(widget.id, 7);
        assert_eq!(widget.display_name, "gear");
        assert_eq!(widget.tags, vec![Tag { label: "a".into() }]);
        assert_eq!(widget.parent.unwrap().display_name, "root");
    }

    #[test]
    fn test_from_value_prefers_exact_match() {
        #[derive(Deserialize)]
        struct Pair {
            value: String,
            #[serde(rename = "Value")]
            upper: String,
        }

        let pair: Pair = from_value(json!({"value": "lower", "Value": "upper"})).unwrap();
        assert_eq!(pair.value, "lower");
        assert_eq!(pair.upper, "upper");
    }

    #[test]
    fn test_from_value_reports_type_errors() {
        let result = from_value::<Tag>(json!({"label": 5}));
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_nulls_is_recursive() {
        let value = json!({"a": null, "b": {"c": null, "d": 1}, "e": [{"f": null}, null]});
        assert_eq!(strip_nulls(value), json!({"b": {"d": 1}, "e": [{}, null]}));
    }
}
