use super::{strip_nulls, Compression, EncodedBody, GzipCompression, Serializer};
use crate::{Error, Result};
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use http::HeaderValue;
use serde_json::Value;
use std::sync::Arc;

/// `application/json` bodies.
///
/// Null-valued fields are omitted on encode. Decoded values are matched to
/// the caller's type case-insensitively by the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    fn encode(body: &Value) -> Result<Vec<u8>> {
        serde_json::to_vec(&strip_nulls(body.clone()))
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, body: &Value) -> Result<EncodedBody> {
        let mut encoded = EncodedBody {
            bytes: Self::encode(body)?,
            ..Default::default()
        };
        encoded
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(encoded)
    }

    fn deserialize(&self, text: &str) -> Result<Value> {
        serde_json::from_str(text).map_err(|e| Error::SerializationFailed(e.to_string()))
    }
}

/// JSON bodies compressed before sending, with `Content-Encoding` set.
///
/// Responses are decoded as plain JSON; the transport decompresses them.
#[derive(Debug, Clone)]
pub struct GzipJsonSerializer {
    compression: Arc<dyn Compression>,
}

impl GzipJsonSerializer {
    /// Uses the given compression instead of default gzip.
    pub fn with_compression(compression: Arc<dyn Compression>) -> Self {
        Self { compression }
    }
}

impl Default for GzipJsonSerializer {
    fn default() -> Self {
        Self::with_compression(Arc::new(GzipCompression::default()))
    }
}

impl Serializer for GzipJsonSerializer {
    fn serialize(&self, body: &Value) -> Result<EncodedBody> {
        let json = JsonSerializer::encode(body)?;
        let mut encoded = EncodedBody {
            bytes: self.compression.compress(&json)?,
            ..Default::default()
        };
        encoded
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        encoded.headers.insert(
            CONTENT_ENCODING,
            HeaderValue::from_static(self.compression.content_encoding()),
        );
        Ok(encoded)
    }

    fn deserialize(&self, text: &str) -> Result<Value> {
        JsonSerializer.deserialize(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::from_value;
    use flate2::read::GzDecoder;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::io::Read;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        value: String,
        note: Option<String>,
    }

    #[test]
    fn test_json_omits_nulls_and_sets_content_type() {
        let body = json!({"aaa": "aaa", "bbb": null});
        let encoded = JsonSerializer.serialize(&body).unwrap();

        assert_eq!(encoded.bytes, br#"{"aaa":"aaa"}"#.to_vec());
        assert_eq!(encoded.headers[CONTENT_TYPE], "application/json");
        assert!(encoded.headers.get(CONTENT_ENCODING).is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let item = Item {
            id: 1,
            value: "1".into(),
            note: None,
        };
        let encoded = JsonSerializer
            .serialize(&serde_json::to_value(&item).unwrap())
            .unwrap();
        let text = String::from_utf8(encoded.bytes).unwrap();
        let decoded: Item = from_value(JsonSerializer.deserialize(&text).unwrap()).unwrap();

        assert_eq!(decoded, item);
    }

    #[test]
    fn test_json_deserialize_rejects_invalid_text() {
        let result = JsonSerializer.deserialize("not json");
        assert!(matches!(result, Err(Error::SerializationFailed(_))));
    }

    #[test]
    fn test_gzip_json_compresses_payload() {
        let body = json!({"aaa": "aaa", "skip": null});
        let encoded = GzipJsonSerializer::default().serialize(&body).unwrap();

        assert_eq!(encoded.headers[CONTENT_ENCODING], "gzip");
        assert_eq!(encoded.headers[CONTENT_TYPE], "application/json");

        let mut decoder = GzDecoder::new(encoded.bytes.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text, r#"{"aaa":"aaa"}"#);
    }

    #[test]
    fn test_gzip_json_decodes_plain_json() {
        let value = GzipJsonSerializer::default()
            .deserialize(r#"{"id":1}"#)
            .unwrap();
        assert_eq!(value, json!({"id": 1}));
    }
}
