//! YAML 1.1 decoder.
//!
//! Bytes go through a reader (UTF-8 or UTF-16 with BOM), a scanner, an event parser and a
//! composer that builds a node tree with anchors resolved. The decoder then binds that tree
//! onto a [`Shape`], producing a [`Value`]. Typed entry points convert the value into any
//! `T: Describe + Deserialize`.
//!
//! ```rust
//! use yaml_decode::{Shape, StructShape, Value};
//!
//! let header = Shape::Struct(
//!     StructShape::new("Header")
//!         .field("filetype", Shape::Str)
//!         .field("detect", Shape::optional(Shape::Str)),
//! );
//! let value = yaml_decode::decode(b"filetype: rust\ndetect: '\\.rs$'\n", &header, true).unwrap();
//! assert_eq!(value.get("filetype"), Some(&Value::from("rust")));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
mod debug;

mod api;
pub mod budget;
mod char_traits;
pub mod composer;
mod decode;
mod error;
pub mod fields;
mod location;
mod macros;
mod options;
mod parse_scalars;
pub mod parser;
mod reader;
pub mod resolve;
pub mod scanner;
mod shape;
mod snippet;
mod tags;
mod value;

pub use api::{
    decode, decode_into, decode_reader, decode_with_options, from_reader,
    from_reader_with_options, from_slice, from_slice_with_options, from_str,
    from_str_with_options,
};
pub use budget::{AliasBudget, BudgetBreach};
pub use error::{DecodeError, Error, ReaderError, ScanError, UnmarshalErrors};
pub use location::{Location, Mark};
pub use options::Options;
pub use reader::Encoding;
pub use shape::{Describe, FieldShape, FloatWidth, IntWidth, Shape, StructShape, TextCodec};
pub use value::{Field, Mapping, Struct, Value, from_value};
