//! The decoded value tree.
//!
//! A [`Value`] is what the decoder binds a document onto. Its variant always matches the
//! [`crate::Shape`] it was decoded with: typed shapes produce typed variants, dynamic
//! positions take whatever the resolver found.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use ahash::RandomState;
use chrono::{DateTime, FixedOffset};
use indexmap::{Equivalent, IndexMap};
use ordered_float::OrderedFloat;
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

mod de;

pub use de::from_value;

/// A decoded YAML value.
///
/// Values are usable as mapping keys: floats compare and hash as [`OrderedFloat`], so `NaN`
/// equals itself, and mappings compare without regard to order.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    /// Integers that do not fit `i64`, or any integer bound to an unsigned shape.
    Uint(u64),
    Float(f64),
    String(String),
    Timestamp(DateTime<FixedOffset>),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    /// Key/value pairs in document order, duplicates kept.
    Items(Vec<(Value, Value)>),
    Struct(Struct),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as `i64`, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// The value as `u64`, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_items(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Items(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(st) => Some(st),
            _ => None,
        }
    }

    /// Look up a string key in a mapping, or a field by name in a struct. For item lists the
    /// last entry with that key wins.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get_str(key),
            Value::Items(items) => items
                .iter()
                .rev()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            Value::Struct(st) => st.get(key),
            _ => None,
        }
    }

    /// Short name of the variant, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Uint(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) | Value::Items(_) => "mapping",
            Value::Struct(_) => "struct",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
            Value::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Mapping(map) => fmt_entries(f, map.iter()),
            Value::Items(items) => fmt_entries(f, items.iter().map(|(k, v)| (k, v))),
            Value::Struct(st) => {
                write!(f, "{} {{", st.name)?;
                for (i, field) in st.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {}: {}", field.name, field.value)?;
                }
                f.write_str(" }")
            }
        }
    }
}

fn fmt_entries<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a Value, &'a Value)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k}: {v}")?;
    }
    f.write_str("}")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            (Value::Items(a), Value::Items(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Uint(v) => v.hash(state),
            Value::Float(v) => OrderedFloat(*v).hash(state),
            Value::String(s) => s.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
            Value::Sequence(items) => items.hash(state),
            // Equal mappings may list their entries in different orders.
            Value::Mapping(map) => map.len().hash(state),
            Value::Items(items) => items.hash(state),
            Value::Struct(st) => st.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// A borrowed string key, hashed and compared like [`Value::String`].
struct StrKey<'a>(&'a str);

impl Hash for StrKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(&Value::String(String::new())).hash(state);
        self.0.hash(state);
    }
}

impl Equivalent<Value> for StrKey<'_> {
    fn equivalent(&self, key: &Value) -> bool {
        key.as_str() == Some(self.0)
    }
}

/// Insertion-ordered mapping.
///
/// [`Mapping::insert`] replaces the value of an existing key in place, so a mapping built from
/// a document keeps the position of each key's first appearance.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    map: IndexMap<Value, Value, RandomState>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: IndexMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.map.get_mut(key)
    }

    /// Lookup by string key without building a [`Value`] for it first.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.map.get(&StrKey(key))
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.map.contains_key(key)
    }

    /// Set `key` to `value`, returning the previous value if the key was present.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.map.insert(key, value)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.map.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, Value, Value> {
        self.map.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, Value, Value> {
        self.map.values()
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

impl IntoIterator for Mapping {
    type Item = (Value, Value);
    type IntoIter = indexmap::map::IntoIter<Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

impl<'a> IntoIterator for &'a Mapping {
    type Item = (&'a Value, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, Value, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

impl FromIterator<(Value, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = Mapping::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// A value bound onto a struct shape: its fields in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Struct {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub value: Value,
    /// Inlined fields contribute their own fields (or entries) to the parent.
    pub inline: bool,
}

impl Struct {
    /// Field by name, looking through inlined structs.
    pub fn get(&self, name: &str) -> Option<&Value> {
        for field in &self.fields {
            if field.name == name {
                return Some(&field.value);
            }
            if field.inline
                && let Value::Struct(inner) = &field.value
                && let Some(found) = inner.get(name)
            {
                return Some(found);
            }
        }
        None
    }

    /// Follow a path of field positions through inlined structs.
    pub(crate) fn field_at_mut(&mut self, path: &[usize]) -> Option<&mut Value> {
        let (first, rest) = path.split_first()?;
        let value = &mut self.fields.get_mut(*first)?.value;
        if rest.is_empty() {
            return Some(value);
        }
        match value {
            Value::Struct(inner) => inner.field_at_mut(rest),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Uint(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(map) => map.serialize(serializer),
            Value::Items(items) => {
                let mut out = serializer.serialize_map(Some(items.len()))?;
                for (k, v) in items {
                    out.serialize_entry(&MapKey(k), v)?;
                }
                out.end()
            }
            Value::Struct(st) => {
                let mut out = serializer.serialize_map(None)?;
                serialize_fields(st, &mut out)?;
                out.end()
            }
        }
    }
}

fn serialize_fields<M: SerializeMap>(st: &Struct, out: &mut M) -> Result<(), M::Error> {
    for field in &st.fields {
        match (&field.value, field.inline) {
            (Value::Struct(inner), true) => serialize_fields(inner, out)?,
            (Value::Mapping(map), true) => {
                for (k, v) in map {
                    out.serialize_entry(&MapKey(k), v)?;
                }
            }
            (value, _) => out.serialize_entry(&field.name, value)?,
        }
    }
    Ok(())
}

/// Scalar keys are written as text so that formats with string-only keys accept them.
struct MapKey<'a>(&'a Value);

impl Serialize for MapKey<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(_) | Value::Mapping(_) | Value::Items(_) | Value::Struct(_) => {
                self.0.serialize(serializer)
            }
            other => serializer.collect_str(other),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(match i64::try_from(v) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Uint(v),
        })
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry()? {
            map.insert(k, v);
        }
        Ok(Value::Mapping(map))
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

/// Later entries replace earlier ones with the same key.
struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = Mapping;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a YAML mapping")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Mapping, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry()? {
            map.insert(k, v);
        }
        Ok(map)
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self {
            out.serialize_entry(&MapKey(k), v)?;
        }
        out.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_position_and_last_value() {
        let mut map = Mapping::new();
        map.insert("a".into(), Value::Int(1));
        map.insert("b".into(), Value::Int(2));
        assert_eq!(map.insert("a".into(), Value::Int(3)), Some(Value::Int(1)));
        let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get_str("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn items_keep_duplicates() {
        let items = Value::Items(vec![
            ("a".into(), Value::Int(1)),
            ("b".into(), Value::Int(2)),
            ("a".into(), Value::Int(3)),
        ]);
        assert_eq!(items.as_items().map(<[_]>::len), Some(3));
        assert_eq!(items.get("a"), Some(&Value::Int(3)));
        assert_eq!(items.to_string(), "{a: 1, b: 2, a: 3}");
    }

    #[test]
    fn nan_and_collection_keys() {
        let mut map = Mapping::new();
        map.insert(Value::Float(f64::NAN), "nan".into());
        assert_eq!(map.get(&Value::Float(f64::NAN)), Some(&Value::from("nan")));
        let key = Value::Sequence(vec![Value::Int(1), Value::Int(2)]);
        map.insert(key.clone(), "seq".into());
        assert!(map.contains_key(&key));
        assert_eq!(map.get_str("nan"), None);
    }

    #[test]
    fn mappings_compare_without_order() {
        let ab: Mapping = [("a".into(), Value::Int(1)), ("b".into(), Value::Int(2))]
            .into_iter()
            .collect();
        let ba: Mapping = [("b".into(), Value::Int(2)), ("a".into(), Value::Int(1))]
            .into_iter()
            .collect();
        assert_eq!(Value::Mapping(ab), Value::Mapping(ba));
    }

    #[test]
    fn int_and_float_keys_differ() {
        let mut map = Mapping::new();
        map.insert(Value::Int(1), "int".into());
        map.insert(Value::Float(1.0), "float".into());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&Value::Int(1)), Some(&Value::from("int")));
    }

    #[test]
    fn struct_lookup_sees_inlined_fields() {
        let inner = Struct {
            name: "Inner".into(),
            fields: vec![Field {
                name: "port".into(),
                value: Value::Int(80),
                inline: false,
            }],
        };
        let outer = Struct {
            name: "Outer".into(),
            fields: vec![
                Field {
                    name: "host".into(),
                    value: "localhost".into(),
                    inline: false,
                },
                Field {
                    name: "inner".into(),
                    value: Value::Struct(inner),
                    inline: true,
                },
            ],
        };
        assert_eq!(outer.get("port"), Some(&Value::Int(80)));
        let value = Value::Struct(outer);
        assert_eq!(value.get("host").and_then(Value::as_str), Some("localhost"));
        assert_eq!(value.to_string(), "Outer { host: localhost, inner: Inner { port: 80 } }");
    }
}
