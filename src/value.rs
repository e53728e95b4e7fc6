//! Dynamically-typed cached values.
//!
//! A tenant hash often mixes value types (`{"a": 1, "b": "x"}`). [`CacheValue`]
//! gives those mappings a single Rust type, and it is also what every blob
//! carries: writes convert the caller's value into a `CacheValue`, reads convert
//! it back into the requested type. A read with the wrong type is then a type
//! error rather than a reinterpretation of someone else's bytes.
//!
//! `CacheValue` serializes in its natural shape (`1`, `"x"`, `[..]`, `{..}`),
//! which is what the `serde_json` bridge needs. Inside a blob it travels as
//! a tagged mirror whose variant tags survive Postcard's non-self-describing
//! encoding.

use crate::error::Error;
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A value of any shape the cache can hold.
///
/// The data model is JSON's, with integers and floats kept apart. Integers
/// beyond the `i64` range become `Float`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CacheValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
}

impl Serialize for CacheValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CacheValue::Null => serializer.serialize_unit(),
            CacheValue::Bool(b) => serializer.serialize_bool(*b),
            CacheValue::Int(n) => serializer.serialize_i64(*n),
            CacheValue::Float(f) => serializer.serialize_f64(*f),
            CacheValue::Text(s) => serializer.serialize_str(s),
            CacheValue::List(items) => items.serialize(serializer),
            CacheValue::Map(map) => map.serialize(serializer),
        }
    }
}

struct CacheValueVisitor;

impl<'de> Visitor<'de> for CacheValueVisitor {
    type Value = CacheValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any self-describing value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<CacheValue, E> {
        Ok(CacheValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<CacheValue, E> {
        Ok(CacheValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<CacheValue, D::Error> {
        CacheValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<CacheValue, E> {
        Ok(CacheValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CacheValue, E> {
        Ok(CacheValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CacheValue, E> {
        Ok(i64::try_from(v).map_or(CacheValue::Float(v as f64), CacheValue::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<CacheValue, E> {
        Ok(CacheValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CacheValue, E> {
        Ok(CacheValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<CacheValue, E> {
        Ok(CacheValue::Text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<CacheValue, E> {
        Ok(CacheValue::List(
            v.iter().map(|b| CacheValue::Int(i64::from(*b))).collect(),
        ))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<CacheValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(CacheValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CacheValue, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, CacheValue>()? {
            map.insert(key, value);
        }
        Ok(CacheValue::Map(map))
    }
}

impl<'de> Deserialize<'de> for CacheValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CacheValueVisitor)
    }
}

impl CacheValue {
    /// Capture any serializable value.
    ///
    /// # Errors
    ///
    /// `Error::SerializationError` for values with no `CacheValue` form, such as
    /// maps keyed by something other than strings or integers.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> crate::Result<CacheValue> {
        serde_json::to_value(value)
            .map(CacheValue::from)
            .map_err(|e| Error::SerializationError(e.to_string()))
    }

    /// Convert into `T`.
    ///
    /// # Errors
    ///
    /// `Error::DeserializationError` when the value does not have `T`'s shape.
    pub fn into_typed<T: DeserializeOwned>(self) -> crate::Result<T> {
        serde_json::from_value(serde_json::Value::from(self))
            .map_err(|e| Error::DeserializationError(e.to_string()))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CacheValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CacheValue::Null)
    }
}

/// Blob form of [`CacheValue`].
// Postcard tags variants by index: append new variants, never reorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
}

impl From<CacheValue> for WireValue {
    fn from(v: CacheValue) -> Self {
        match v {
            CacheValue::Null => WireValue::Null,
            CacheValue::Bool(b) => WireValue::Bool(b),
            CacheValue::Int(n) => WireValue::Int(n),
            CacheValue::Float(f) => WireValue::Float(f),
            CacheValue::Text(s) => WireValue::Text(s),
            CacheValue::List(items) => WireValue::List(items.into_iter().map(Into::into).collect()),
            CacheValue::Map(map) => {
                WireValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<WireValue> for CacheValue {
    fn from(v: WireValue) -> Self {
        match v {
            WireValue::Null => CacheValue::Null,
            WireValue::Bool(b) => CacheValue::Bool(b),
            WireValue::Int(n) => CacheValue::Int(n),
            WireValue::Float(f) => CacheValue::Float(f),
            WireValue::Text(s) => CacheValue::Text(s),
            WireValue::List(items) => CacheValue::List(items.into_iter().map(Into::into).collect()),
            WireValue::Map(map) => {
                CacheValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<bool> for CacheValue {
    fn from(v: bool) -> Self {
        CacheValue::Bool(v)
    }
}

impl From<i64> for CacheValue {
    fn from(v: i64) -> Self {
        CacheValue::Int(v)
    }
}

impl From<i32> for CacheValue {
    fn from(v: i32) -> Self {
        CacheValue::Int(v.into())
    }
}

impl From<f64> for CacheValue {
    fn from(v: f64) -> Self {
        CacheValue::Float(v)
    }
}

impl From<&str> for CacheValue {
    fn from(v: &str) -> Self {
        CacheValue::Text(v.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(v: String) -> Self {
        CacheValue::Text(v)
    }
}

impl<T: Into<CacheValue>> From<Option<T>> for CacheValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CacheValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match v {
            Json::Null => CacheValue::Null,
            Json::Bool(b) => CacheValue::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => CacheValue::Int(i),
                None => n.as_f64().map_or(CacheValue::Null, CacheValue::Float),
            },
            Json::String(s) => CacheValue::Text(s),
            Json::Array(items) => CacheValue::List(items.into_iter().map(Into::into).collect()),
            Json::Object(map) => {
                CacheValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<CacheValue> for serde_json::Value {
    fn from(v: CacheValue) -> Self {
        use serde_json::Value as Json;

        match v {
            CacheValue::Null => Json::Null,
            CacheValue::Bool(b) => Json::Bool(b),
            CacheValue::Int(i) => Json::from(i),
            // Non-finite floats have no JSON form.
            CacheValue::Float(f) => {
                serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number)
            }
            CacheValue::Text(s) => Json::String(s),
            CacheValue::List(items) => Json::Array(items.into_iter().map(Into::into).collect()),
            CacheValue::Map(map) => {
                Json::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{decode_value, deserialize_from_cache, serialize_for_cache};

    fn nested() -> CacheValue {
        let mut map = BTreeMap::new();
        map.insert("count".to_string(), CacheValue::Int(3));
        map.insert("name".to_string(), CacheValue::from("loja"));
        map.insert(
            "tags".to_string(),
            CacheValue::List(vec![CacheValue::Bool(true), CacheValue::Null]),
        );
        map.insert("ratio".to_string(), CacheValue::Float(0.5));
        CacheValue::Map(map)
    }

    #[test]
    fn test_blob_roundtrip_nested() {
        let bytes = serialize_for_cache(&nested()).unwrap();
        let decoded: CacheValue = deserialize_from_cache(&bytes).unwrap();
        assert_eq!(decoded, nested());
    }

    #[test]
    fn test_integer_text_decodes_as_int() {
        assert_eq!(decode_value::<CacheValue>(b"42").unwrap(), CacheValue::Int(42));
        assert_eq!(decode_value::<CacheValue>(b"-5").unwrap(), CacheValue::Int(-5));
    }

    #[test]
    fn test_text_that_looks_numeric_stays_text() {
        let bytes = serialize_for_cache(&CacheValue::from("42")).unwrap();
        assert_eq!(
            decode_value::<CacheValue>(&bytes).unwrap(),
            CacheValue::Text("42".to_string())
        );
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"a": 1, "b": "x", "c": [true, null], "d": 1.5});
        let value = CacheValue::from(json.clone());

        let CacheValue::Map(map) = &value else {
            panic!("Expected a map, got {:?}", value);
        };
        assert_eq!(map["a"], CacheValue::Int(1));
        assert_eq!(map["b"].as_str(), Some("x"));
        assert_eq!(map["d"], CacheValue::Float(1.5));

        assert_eq!(serde_json::Value::from(value), json);
    }

    #[test]
    fn test_non_finite_float_to_json_is_null() {
        assert!(serde_json::Value::from(CacheValue::Float(f64::NAN)).is_null());
    }

    #[test]
    fn test_from_serialize_struct_becomes_map() {
        #[derive(Serialize)]
        struct Store {
            id: u32,
            name: &'static str,
        }

        let value = CacheValue::from_serialize(&Store { id: 7, name: "Centro" }).unwrap();
        let CacheValue::Map(map) = &value else {
            panic!("Expected a map, got {:?}", value);
        };
        assert_eq!(map["id"], CacheValue::Int(7));
        assert_eq!(map["name"].as_str(), Some("Centro"));
    }

    #[test]
    fn test_cache_value_captures_itself_unchanged() {
        assert_eq!(CacheValue::from_serialize(&nested()).unwrap(), nested());
        assert_eq!(
            CacheValue::from_serialize(&CacheValue::Int(1)).unwrap(),
            CacheValue::Int(1)
        );
    }

    #[test]
    fn test_into_typed_rejects_other_shapes() {
        assert!(CacheValue::from("ab").into_typed::<i64>().is_err());
        assert!(CacheValue::Int(1).into_typed::<String>().is_err());
        assert!(CacheValue::Float(1.5).into_typed::<i64>().is_err());
        assert_eq!(CacheValue::Int(3).into_typed::<f64>().unwrap(), 3.0);
        assert_eq!(CacheValue::from("").into_typed::<String>().unwrap(), "");
    }

    #[test]
    fn test_wire_value_mirrors_cache_value() {
        let wire = WireValue::from(nested());
        assert_eq!(CacheValue::from(wire), nested());
    }

    #[test]
    fn test_option_conversion() {
        assert!(CacheValue::from(None::<i64>).is_null());
        assert_eq!(CacheValue::from(Some(7i64)).as_i64(), Some(7));
    }
}
