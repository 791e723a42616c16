use super::{EncodedBody, Serializer};
use crate::{Error, Result};
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use serde_json::Value;

/// `application/x-www-form-urlencoded` request bodies.
///
/// The body must be a flat object. Strings are sent verbatim, numbers and
/// booleans as their JSON text, and null fields are skipped. Decoding is not
/// supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormUrlEncodedSerializer;

impl Serializer for FormUrlEncodedSerializer {
    fn serialize(&self, body: &Value) -> Result<EncodedBody> {
        let Value::Object(fields) = body else {
            return Err(Error::SerializationFailed(
                "form body must be an object".to_string(),
            ));
        };

        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            match value {
                Value::Null => {}
                Value::String(text) => {
                    form.append_pair(key, text);
                }
                Value::Number(_) | Value::Bool(_) => {
                    form.append_pair(key, &value.to_string());
                }
                Value::Array(_) | Value::Object(_) => {
                    return Err(Error::SerializationFailed(format!(
                        "form field '{}' is not a scalar",
                        key
                    )));
                }
            }
        }

        let mut encoded = EncodedBody {
            bytes: form.finish().into_bytes(),
            ..Default::default()
        };
        encoded.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        Ok(encoded)
    }

    fn deserialize(&self, _text: &str) -> Result<Value> {
        Err(Error::NotSupported(
            "form-urlencoded response bodies cannot be deserialized".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_flattens_scalars() {
        let body = json!({"name": "a b", "count": 3, "active": true, "missing": null});
        let encoded = FormUrlEncodedSerializer.serialize(&body).unwrap();

        let text = String::from_utf8(encoded.bytes).unwrap();
        let mut pairs: Vec<&str> = text.split('&').collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec!["active=true", "count=3", "name=a+b"]);
        assert_eq!(
            encoded.headers[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_form_rejects_nested_values() {
        let body = json!({"nested": {"a": 1}});
        let result = FormUrlEncodedSerializer.serialize(&body);
        assert!(matches!(result, Err(Error::SerializationFailed(_))));
    }

    #[test]
    fn test_form_rejects_non_objects() {
        let result = FormUrlEncodedSerializer.serialize(&json!([1, 2]));
        assert!(matches!(result, Err(Error::SerializationFailed(_))));
    }

    #[test]
    fn test_form_decode_is_not_supported() {
        let result = FormUrlEncodedSerializer.deserialize("a=b");
        assert!(matches!(result, Err(Error::NotSupported(_))));
    }
}
