use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Value};

/// Deserializer over a JSON value that resolves struct field names
/// case-insensitively at every nesting level.
pub(crate) struct CaseInsensitive(pub(crate) Value);

impl CaseInsensitive {
    fn visit_object<'de, V>(map: Map<String, Value>, visitor: V) -> Result<V::Value, serde_json::Error>
    where
        V: Visitor<'de>,
    {
        let mut access: MapDeserializer<'de, _, serde_json::Error> =
            MapDeserializer::new(map.into_iter().map(|(k, v)| (k, CaseInsensitive(v))));
        let value = visitor.visit_map(&mut access)?;
        access.end()?;
        Ok(value)
    }

    fn visit_array<'de, V>(items: Vec<Value>, visitor: V) -> Result<V::Value, serde_json::Error>
    where
        V: Visitor<'de>,
    {
        let mut access: SeqDeserializer<_, serde_json::Error> =
            SeqDeserializer::new(items.into_iter().map(CaseInsensitive));
        let value = visitor.visit_seq(&mut access)?;
        access.end()?;
        Ok(value)
    }
}

/// Renames keys that only differ from a field name by case.
fn normalize_keys(map: Map<String, Value>, fields: &'static [&'static str]) -> Map<String, Value> {
    let mut normalized = Map::with_capacity(map.len());
    let exact: Vec<String> = map
        .keys()
        .filter(|key| fields.contains(&key.as_str()))
        .cloned()
        .collect();

    for (key, value) in map {
        if exact.contains(&key) {
            normalized.insert(key, value);
            continue;
        }
        let field = fields
            .iter()
            .find(|field| field.eq_ignore_ascii_case(&key) && !exact.iter().any(|e| e.as_str() == **field));
        match field {
            Some(field) if !normalized.contains_key(*field) => {
                normalized.insert((*field).to_string(), value);
            }
            _ => {
                normalized.insert(key, value);
            }
        }
    }
    normalized
}

impl<'de> Deserializer<'de> for CaseInsensitive {
    type Error = serde_json::Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Object(map) => Self::visit_object(map, visitor),
            Value::Array(items) => Self::visit_array(items, visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(CaseInsensitive(other)),
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Object(map) => Self::visit_object(normalize_keys(map, fields), visitor),
            other => CaseInsensitive(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for CaseInsensitive {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}
