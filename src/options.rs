use serde::{Deserialize, Serialize};

use crate::budget::AliasBudget;

/// Decoder configuration.
///
/// Build it with [`options!`](crate::options!) or by updating [`Options::default`].
///
/// ```rust
/// use yaml_decode::{Shape, StructShape};
///
/// let options = yaml_decode::options! {
///     strict: true,
///     max_input_bytes: Some(1024),
/// };
///
/// let shape = Shape::Struct(StructShape::new("Config").field("name", Shape::Str));
/// let err = yaml_decode::decode_with_options(b"name: a\nnmae: b\n", &shape, &options)
///     .unwrap_err();
/// assert!(err.to_string().contains("field nmae not found in type Config"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Report duplicate keys and unknown struct fields. Default: false.
    pub strict: bool,
    /// Maximum nesting of flow collections (`[` and `{`). Default: 10,000.
    pub max_flow_depth: usize,
    /// Maximum number of nested block indentation levels. Default: 10,000.
    pub max_indent_depth: usize,
    /// Refuse inputs larger than this many bytes. Default: unlimited.
    pub max_input_bytes: Option<usize>,
    /// Thresholds of the excessive-aliasing guard.
    pub alias_budget: AliasBudget,
    /// When true (default), entry points that own the source text return errors wrapped in
    /// [`Error::WithSnippet`](crate::Error::WithSnippet), which display as a caret snippet.
    pub with_snippet: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strict: false,
            max_flow_depth: 10_000,
            max_indent_depth: 10_000,
            max_input_bytes: None,
            alias_budget: AliasBudget::default(),
            with_snippet: true,
        }
    }
}
