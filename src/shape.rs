//! Destination descriptors.
//!
//! A [`Shape`] tells the decoder what a position in the document should become. Rust types
//! describe themselves through [`Describe`]; hand-built shapes work just as well for callers
//! that only know the layout at run time.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use num_traits::ToPrimitive;

use crate::value::{Field, Mapping, Struct, Value};

/// Width of an integer destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub(crate) fn fits_signed(self, v: i64) -> bool {
        match self {
            IntWidth::W8 => v.to_i8().is_some(),
            IntWidth::W16 => v.to_i16().is_some(),
            IntWidth::W32 => v.to_i32().is_some(),
            IntWidth::W64 => true,
        }
    }

    pub(crate) fn fits_unsigned(self, v: u64) -> bool {
        match self {
            IntWidth::W8 => v.to_u8().is_some(),
            IntWidth::W16 => v.to_u16().is_some(),
            IntWidth::W32 => v.to_u32().is_some(),
            IntWidth::W64 => true,
        }
    }

    fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
}

type DecodeText = dyn Fn(&[u8]) -> Result<Value, String> + Send + Sync;

/// A destination that parses itself from scalar text.
///
/// The codec receives the raw literal, or the decoded bytes of a `!!binary` scalar, and
/// returns the value to store. A failure is reported as a decode error at the scalar.
#[derive(Clone)]
pub struct TextCodec {
    name: String,
    decode: Arc<DecodeText>,
}

impl TextCodec {
    pub fn new<F>(name: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decode: Arc::new(decode),
        }
    }

    /// A codec for any `FromStr` type; the parsed value is stored in its `Display` form.
    pub fn parse<T>(name: impl Into<String>) -> Self
    where
        T: FromStr + fmt::Display,
        T::Err: fmt::Display,
    {
        Self::new(name, |text| {
            let text = std::str::from_utf8(text).map_err(|err| err.to_string())?;
            text.parse::<T>()
                .map(|v| Value::String(v.to_string()))
                .map_err(|err| err.to_string())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn decode(&self, text: &[u8]) -> Result<Value, String> {
        (self.decode)(text)
    }
}

impl fmt::Debug for TextCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextCodec").field(&self.name).finish()
    }
}

/// What a position in the document decodes into.
#[derive(Clone, Debug)]
pub enum Shape {
    /// Whatever the document holds: resolved scalars, sequences and ordered mappings.
    Dynamic,
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
    Str,
    Timestamp,
    Text(TextCodec),
    /// Null leaves `Value::Null`; anything else decodes into the inner shape.
    Optional(Box<Shape>),
    Seq(Box<Shape>),
    /// Fixed length; a sequence of any other length is rejected.
    Array(Box<Shape>, usize),
    Map(Box<Shape>, Box<Shape>),
    /// Ordered key/value pairs with duplicates kept.
    MapItems,
    Struct(StructShape),
}

impl Shape {
    pub fn optional(inner: Shape) -> Self {
        Shape::Optional(Box::new(inner))
    }

    pub fn seq(elem: Shape) -> Self {
        Shape::Seq(Box::new(elem))
    }

    pub fn array(elem: Shape, len: usize) -> Self {
        Shape::Array(Box::new(elem), len)
    }

    pub fn map(key: Shape, value: Shape) -> Self {
        Shape::Map(Box::new(key), Box::new(value))
    }

    /// The value a destination of this shape holds before anything is decoded into it.
    pub fn zero(&self) -> Value {
        match self {
            Shape::Dynamic | Shape::Timestamp | Shape::Text(_) | Shape::Optional(_) => Value::Null,
            Shape::Bool => Value::Bool(false),
            Shape::Int(_) => Value::Int(0),
            Shape::Uint(_) => Value::Uint(0),
            Shape::Float(_) => Value::Float(0.0),
            Shape::Str => Value::String(String::new()),
            Shape::Seq(_) => Value::Sequence(Vec::new()),
            Shape::Array(elem, len) => Value::Sequence(vec![elem.zero(); *len]),
            Shape::Map(..) => Value::Mapping(Mapping::new()),
            Shape::MapItems => Value::Items(Vec::new()),
            Shape::Struct(st) => Value::Struct(st.zero()),
        }
    }

    /// Type name used in mismatch messages.
    pub fn type_name(&self) -> String {
        match self {
            Shape::Dynamic => "Value".to_owned(),
            Shape::Bool => "bool".to_owned(),
            Shape::Int(w) => format!("i{}", w.bits()),
            Shape::Uint(w) => format!("u{}", w.bits()),
            Shape::Float(FloatWidth::F32) => "f32".to_owned(),
            Shape::Float(FloatWidth::F64) => "f64".to_owned(),
            Shape::Str => "String".to_owned(),
            Shape::Timestamp => "DateTime".to_owned(),
            Shape::Text(codec) => codec.name().to_owned(),
            Shape::Optional(inner) => format!("Option<{}>", inner.type_name()),
            Shape::Seq(elem) => format!("Vec<{}>", elem.type_name()),
            Shape::Array(elem, len) => format!("[{}; {len}]", elem.type_name()),
            Shape::Map(k, v) => format!("Map<{}, {}>", k.type_name(), v.type_name()),
            Shape::MapItems => "MapItems".to_owned(),
            Shape::Struct(st) => st.name.clone(),
        }
    }
}

/// A struct destination: a name and its fields in declaration order.
#[derive(Clone, Debug)]
pub struct StructShape {
    pub name: String,
    pub(crate) type_id: Option<TypeId>,
    pub fields: Vec<FieldShape>,
}

/// One struct field.
///
/// `name` is the name the value carries after decoding (and the one serde sees). `tag` holds
/// the mapping options: `key,omitempty,flow,inline`, or `-` to skip the field. Without a tag
/// the key is the lowercased name.
#[derive(Clone, Debug)]
pub struct FieldShape {
    pub name: String,
    pub tag: Option<String>,
    pub shape: Shape,
}

impl StructShape {
    /// A struct shape identified by its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: None,
            fields: Vec::new(),
        }
    }

    /// A struct shape identified by a Rust type.
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            type_id: Some(TypeId::of::<T>()),
            ..Self::new(name)
        }
    }

    pub fn field(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            tag: None,
            shape,
        });
        self
    }

    pub fn tagged(mut self, name: impl Into<String>, tag: impl Into<String>, shape: Shape) -> Self {
        self.fields.push(FieldShape {
            name: name.into(),
            tag: Some(tag.into()),
            shape,
        });
        self
    }

    /// The shape at a path of field positions, following inlined structs.
    pub(crate) fn field_shape(&self, path: &[usize]) -> Option<&Shape> {
        let (first, rest) = path.split_first()?;
        let shape = &self.fields.get(*first)?.shape;
        match shape {
            _ if rest.is_empty() => Some(shape),
            Shape::Struct(inner) => inner.field_shape(rest),
            _ => None,
        }
    }

    pub(crate) fn zero(&self) -> Struct {
        Struct {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|field| Field {
                    name: field.name.clone(),
                    value: field.shape.zero(),
                    inline: field.is_inline(),
                })
                .collect(),
        }
    }
}

impl FieldShape {
    pub(crate) fn is_inline(&self) -> bool {
        self.tag
            .as_deref()
            .is_some_and(|tag| tag.split(',').skip(1).any(|flag| flag == "inline"))
    }
}

/// Rust types that know their [`Shape`].
///
/// Structs implement it by listing their fields:
///
/// ```rust
/// use yaml_decode::{Describe, Shape, StructShape};
///
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// impl Describe for Server {
///     fn shape() -> Shape {
///         Shape::Struct(
///             StructShape::of::<Self>("Server")
///                 .field("host", String::shape())
///                 .tagged("port", "listen", u16::shape()),
///         )
///     }
/// }
/// # assert_eq!(Server::shape().type_name(), "Server");
/// ```
pub trait Describe {
    fn shape() -> Shape;
}

macro_rules! describe_scalar {
    ($($ty:ty => $shape:expr),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn shape() -> Shape {
                    $shape
                }
            }
        )*
    };
}

describe_scalar! {
    bool => Shape::Bool,
    i8 => Shape::Int(IntWidth::W8),
    i16 => Shape::Int(IntWidth::W16),
    i32 => Shape::Int(IntWidth::W32),
    i64 => Shape::Int(IntWidth::W64),
    isize => Shape::Int(IntWidth::W64),
    u8 => Shape::Uint(IntWidth::W8),
    u16 => Shape::Uint(IntWidth::W16),
    u32 => Shape::Uint(IntWidth::W32),
    u64 => Shape::Uint(IntWidth::W64),
    usize => Shape::Uint(IntWidth::W64),
    f32 => Shape::Float(FloatWidth::F32),
    f64 => Shape::Float(FloatWidth::F64),
    String => Shape::Str,
    Value => Shape::Dynamic,
    DateTime<FixedOffset> => Shape::Timestamp,
    IpAddr => Shape::Text(TextCodec::parse::<IpAddr>("IpAddr")),
    Ipv4Addr => Shape::Text(TextCodec::parse::<Ipv4Addr>("Ipv4Addr")),
    Ipv6Addr => Shape::Text(TextCodec::parse::<Ipv6Addr>("Ipv6Addr")),
    SocketAddr => Shape::Text(TextCodec::parse::<SocketAddr>("SocketAddr")),
}

impl<T: Describe> Describe for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }
}

impl<T: Describe> Describe for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn shape() -> Shape {
        Shape::seq(T::shape())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn shape() -> Shape {
        Shape::array(T::shape(), N)
    }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn shape() -> Shape {
        Shape::map(K::shape(), V::shape())
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn shape() -> Shape {
        Shape::map(K::shape(), V::shape())
    }
}

impl Describe for Mapping {
    fn shape() -> Shape {
        Shape::map(Shape::Dynamic, Shape::Dynamic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(i32::shape().type_name(), "i32");
        assert_eq!(Vec::<Option<u8>>::shape().type_name(), "Vec<Option<u8>>");
        assert_eq!(<[f64; 3]>::shape().type_name(), "[f64; 3]");
        assert_eq!(HashMap::<String, bool>::shape().type_name(), "Map<String, bool>");
        assert_eq!(IpAddr::shape().type_name(), "IpAddr");
    }

    #[test]
    fn zero_values() {
        assert_eq!(<[u8; 2]>::shape().zero(), Value::Sequence(vec![Value::Uint(0); 2]));
        assert_eq!(Option::<String>::shape().zero(), Value::Null);
        let shape = StructShape::new("S")
            .field("a", Shape::Str)
            .tagged("b", ",inline", Shape::map(Shape::Str, Shape::Dynamic));
        let zero = shape.zero();
        assert_eq!(zero.fields.len(), 2);
        assert!(!zero.fields[0].inline);
        assert!(zero.fields[1].inline);
        assert_eq!(zero.fields[1].value, Value::Mapping(Mapping::new()));
    }

    #[test]
    fn width_checks() {
        assert!(IntWidth::W8.fits_signed(-128));
        assert!(!IntWidth::W8.fits_signed(128));
        assert!(IntWidth::W16.fits_unsigned(65_535));
        assert!(!IntWidth::W32.fits_unsigned(1 << 32));
    }

    #[test]
    fn text_codec_parse() {
        let codec = TextCodec::parse::<IpAddr>("IpAddr");
        assert_eq!(codec.decode(b"::1").unwrap(), Value::from("::1"));
        assert!(codec.decode(b"not an address").is_err());
    }
}
