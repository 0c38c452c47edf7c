//! Serde deserializer over an owned [`Value`].
//!
//! This is how the typed entry points hand a decoded tree to `Deserialize` implementations.
//! The tree already has the layout the caller's shape asked for, so most methods defer to
//! [`Deserializer::deserialize_any`]; the rest cover options, enums, bytes and newtypes.

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::error::Error;
use crate::value::{Mapping, Struct, Value};

/// Convert a decoded [`Value`] into any `T: Deserialize`.
///
/// ```rust
/// use yaml_decode::{Shape, from_value};
///
/// let value = yaml_decode::decode(b"[1, 2, 3]", &Shape::Dynamic, false).unwrap();
/// let numbers: Vec<u8> = from_value(value).unwrap();
/// assert_eq!(numbers, vec![1, 2, 3]);
/// ```
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    T::deserialize(value)
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    /// Hand the value to the visitor in its natural form.
    ///
    /// Timestamps are offered as RFC 3339 text; structs and mappings both as maps, with
    /// inlined fields spliced into their parent.
    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Int(v) => visitor.visit_i64(v),
            Value::Uint(v) => visitor.visit_u64(v),
            Value::Float(v) => visitor.visit_f64(v),
            Value::String(s) => visitor.visit_string(s),
            Value::Timestamp(ts) => visitor.visit_string(ts.to_rfc3339()),
            Value::Sequence(items) => visit_sequence(items, visitor),
            Value::Mapping(map) => visit_entries(map.into_iter(), visitor),
            Value::Items(items) => visit_entries(items.into_iter(), visitor),
            Value::Struct(st) => visit_entries(flatten_struct(st).into_iter(), visitor),
        }
    }

    /// `Null` is `None`; anything else is `Some`.
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    /// Strings give their UTF-8 bytes; sequences of small integers are accepted too.
    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Value::String(s) => visitor.visit_byte_buf(s.into_bytes()),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    /// Externally tagged enums: `Variant` or `{Variant: payload}`.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Value::String(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                payload: None,
            }),
            Value::Mapping(map) if map.len() == 1 => {
                let mut entries = map.into_iter();
                match entries.next() {
                    Some((Value::String(variant), payload)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        payload: Some(payload),
                    }),
                    _ => Err(Error::msg("expected string key for externally tagged enum")),
                }
            }
            other => Err(Error::msg(format!(
                "externally tagged enum expected string or single-key mapping, found {}",
                other.kind_name()
            ))),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        drop(self);
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq tuple tuple_struct map struct identifier
    }
}

impl IntoDeserializer<'_, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

fn visit_sequence<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value, Error> {
    let len = items.len();
    let mut access = SeqDeserializer {
        iter: items.into_iter(),
    };
    let result = visitor.visit_seq(&mut access)?;
    if access.iter.len() == 0 {
        Ok(result)
    } else {
        Err(de::Error::invalid_length(len, &"fewer elements in sequence"))
    }
}

fn visit_entries<'de, I, V>(entries: I, visitor: V) -> Result<V::Value, Error>
where
    I: ExactSizeIterator<Item = (Value, Value)>,
    V: Visitor<'de>,
{
    let mut access = MapDeserializer {
        iter: entries,
        value: None,
    };
    visitor.visit_map(&mut access)
}

/// Struct fields as map entries, with inlined structs and maps spliced in.
fn flatten_struct(st: Struct) -> Mapping {
    let mut out = Mapping::with_capacity(st.fields.len());
    flatten_into(st, &mut out);
    out
}

fn flatten_into(st: Struct, out: &mut Mapping) {
    for field in st.fields {
        match (field.value, field.inline) {
            (Value::Struct(inner), true) => flatten_into(inner, out),
            (Value::Mapping(map), true) => {
                for (k, v) in map {
                    out.insert(k, v);
                }
            }
            (value, _) => {
                out.insert(Value::String(field.name), value);
            }
        }
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl<'de> SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Error> {
        match self.iter.next() {
            Some(value) => seed.deserialize(value).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer<I> {
    iter: I,
    value: Option<Value>,
}

impl<'de, I: ExactSizeIterator<Item = (Value, Value)>> MapAccess<'de> for MapDeserializer<I> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        match self.value.take() {
            Some(value) => seed.deserialize(value),
            None => Err(Error::msg("map value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer {
    variant: String,
    payload: Option<Value>,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant), Error> {
        let variant = seed.deserialize(Value::String(self.variant))?;
        Ok((
            variant,
            VariantDeserializer {
                payload: self.payload,
            },
        ))
    }
}

struct VariantDeserializer {
    payload: Option<Value>,
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        match self.payload {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(Error::msg(format!(
                "unexpected {} for unit enum variant",
                other.kind_name()
            ))),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, Error> {
        seed.deserialize(self.payload.unwrap_or_default())
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        match self.payload {
            Some(Value::Sequence(items)) => visit_sequence(items, visitor),
            _ => Err(Error::msg("expected sequence for tuple enum variant")),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.payload {
            Some(Value::Mapping(map)) => visit_entries(map.into_iter(), visitor),
            Some(Value::Struct(st)) => visit_entries(flatten_struct(st).into_iter(), visitor),
            _ => Err(Error::msg("expected mapping for struct enum variant")),
        }
    }
}
