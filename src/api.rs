//! Public entry points.

use std::io::Read;

use serde::de::DeserializeOwned;

use crate::composer::Composer;
use crate::decode::Decoder;
use crate::error::Error;
use crate::options::Options;
use crate::parser::Parser;
use crate::reader::Reader;
use crate::scanner::Scanner;
use crate::shape::{Describe, Shape};
use crate::value::{Value, from_value};

fn composer<'a>(reader: Reader<'a>, options: &Options) -> Composer<'a> {
    let scanner = Scanner::new(reader.with_max_bytes(options.max_input_bytes))
        .with_limits(options.max_flow_depth, options.max_indent_depth);
    Composer::new(Parser::new(scanner))
}

/// Decode the first document of the stream into `out`. An empty stream leaves `out` alone.
fn decode_document(
    mut composer: Composer<'_>,
    shape: &Shape,
    out: &mut Value,
    options: &Options,
) -> Result<(), Error> {
    let Some(doc) = composer.compose_document()? else {
        debug_print!("empty stream");
        return Ok(());
    };
    Decoder::new(&doc, options.strict, options.alias_budget.clone()).run(shape, out)
}

fn attach_source(err: Error, input: &[u8], options: &Options) -> Error {
    match std::str::from_utf8(input) {
        Ok(text) if options.with_snippet => err.with_snippet(text),
        _ => err,
    }
}

/// Decode the first YAML document in `input` as `shape`.
///
/// An empty stream yields the zero value of `shape`. Type mismatches do not stop decoding;
/// they are collected and returned together as [`Error::Unmarshal`]. Use [`decode_into`]
/// to keep the partially decoded value in that case.
///
/// ```rust
/// use yaml_decode::{Shape, Value};
///
/// let value = yaml_decode::decode(b"a: 1\nb: [x, y]\n", &Shape::Dynamic, false).unwrap();
/// assert_eq!(value.get("a"), Some(&Value::Int(1)));
/// ```
pub fn decode(input: &[u8], shape: &Shape, strict: bool) -> Result<Value, Error> {
    decode_with_options(input, shape, &crate::options! { strict: strict })
}

/// Like [`decode`], with all settings taken from `options`.
pub fn decode_with_options(input: &[u8], shape: &Shape, options: &Options) -> Result<Value, Error> {
    let mut out = shape.zero();
    decode_into(input, shape, &mut out, options)?;
    Ok(out)
}

/// Decode `input` into an existing value.
///
/// On [`Error::Unmarshal`] every position that could be decoded has been written to `out`;
/// positions that failed keep their zero value.
///
/// ```rust
/// use yaml_decode::{Options, Shape, Value};
///
/// let shape = Shape::seq(Shape::Bool);
/// let mut out = shape.zero();
/// let err = yaml_decode::decode_into(b"[true, 3, false]", &shape, &mut out, &Options::default())
///     .unwrap_err();
/// assert_eq!(err.unmarshal_errors().map(|e| e.len()), Some(1));
/// assert_eq!(out, Value::Sequence(vec![Value::Bool(true), Value::Bool(false)]));
/// ```
pub fn decode_into(
    input: &[u8],
    shape: &Shape,
    out: &mut Value,
    options: &Options,
) -> Result<(), Error> {
    decode_document(composer(Reader::from_slice(input), options), shape, out, options)
        .map_err(|err| attach_source(err, input, options))
}

/// Decode YAML pulled from `reader` as `shape`.
///
/// Input is read incrementally; decoding stops at the end of the first document. Errors
/// carry no snippet because the source text is not retained.
pub fn decode_reader<R: Read>(reader: R, shape: &Shape, options: &Options) -> Result<Value, Error> {
    let mut out = shape.zero();
    decode_document(composer(Reader::from_read(reader), options), shape, &mut out, options)?;
    Ok(out)
}

/// Deserialize a `T` from YAML text.
///
/// ```rust
/// use serde::Deserialize;
/// use yaml_decode::{Describe, Shape, StructShape};
///
/// #[derive(Deserialize)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Describe for Point {
///     fn shape() -> Shape {
///         Shape::Struct(
///             StructShape::of::<Point>("Point")
///                 .field("x", i32::shape())
///                 .field("y", i32::shape()),
///         )
///     }
/// }
///
/// let p: Point = yaml_decode::from_str("x: 3\ny: -4\n").unwrap();
/// assert_eq!((p.x, p.y), (3, -4));
/// ```
pub fn from_str<T: Describe + DeserializeOwned>(input: &str) -> Result<T, Error> {
    from_slice(input.as_bytes())
}

/// Like [`from_str`], with explicit [`Options`].
pub fn from_str_with_options<T: Describe + DeserializeOwned>(
    input: &str,
    options: &Options,
) -> Result<T, Error> {
    from_slice_with_options(input.as_bytes(), options)
}

/// Deserialize a `T` from YAML bytes in UTF-8 or UTF-16 with a byte order mark.
pub fn from_slice<T: Describe + DeserializeOwned>(input: &[u8]) -> Result<T, Error> {
    from_slice_with_options(input, &Options::default())
}

/// Like [`from_slice`], with explicit [`Options`].
pub fn from_slice_with_options<T: Describe + DeserializeOwned>(
    input: &[u8],
    options: &Options,
) -> Result<T, Error> {
    let value = decode_with_options(input, &T::shape(), options)?;
    from_value(value)
}

/// Deserialize a `T` from a reader.
pub fn from_reader<R: Read, T: Describe + DeserializeOwned>(reader: R) -> Result<T, Error> {
    from_reader_with_options(reader, &Options::default())
}

/// Like [`from_reader`], with explicit [`Options`].
pub fn from_reader_with_options<R: Read, T: Describe + DeserializeOwned>(
    reader: R,
    options: &Options,
) -> Result<T, Error> {
    let value = decode_reader(reader, &T::shape(), options)?;
    from_value(value)
}
