//! Binding of a composed document onto a [`Shape`].
//!
//! Two error channels: fatal problems (alias cycles, excessive aliasing, bad merges, invalid
//! `!!binary` data, array length mismatches) abort the walk through `Result`, while type
//! mismatches and strict-mode violations are collected and reported together at the end.
//! A position that fails softly keeps its zero value, so the caller still gets everything
//! that could be decoded.

use ahash::AHashSet;
use num_traits::ToPrimitive;

use crate::budget::{AliasBudget, AliasMeter};
use crate::composer::{Document, Node, NodeId, NodeKind};
use crate::error::{DecodeError, Error, UnmarshalErrors};
use crate::fields::{StructInfo, struct_info};
use crate::parse_scalars::{decode_binary, parse_timestamp};
use crate::resolve::{Resolved, resolve};
use crate::shape::{FloatWidth, Shape, StructShape};
use crate::tags::{TAG_BINARY, TAG_MAP, TAG_MERGE, TAG_NULL, TAG_SEQ, TAG_STR, short_tag};
use crate::value::{Mapping, Value};

/// Where the entries of a mapping node go.
#[derive(Clone, Copy)]
enum MapTarget<'s> {
    Map { key: &'s Shape, value: &'s Shape },
    Items,
    Struct {
        shape: &'s StructShape,
        info: &'s StructInfo,
    },
}

pub(crate) struct Decoder<'d> {
    doc: &'d Document,
    strict: bool,
    meter: AliasMeter,
    /// Alias nodes currently being expanded.
    aliases: AHashSet<NodeId>,
    /// Depth of merge-key expansion; inline maps are only reset outside of it.
    merging: usize,
    errors: Vec<DecodeError>,
}

impl<'d> Decoder<'d> {
    pub(crate) fn new(doc: &'d Document, strict: bool, budget: AliasBudget) -> Self {
        Self {
            doc,
            strict,
            meter: AliasMeter::new(budget),
            aliases: AHashSet::new(),
            merging: 0,
            errors: Vec::new(),
        }
    }

    /// Decode the document into `out`.
    ///
    /// Collected mismatches are returned as one [`Error::Unmarshal`]; `out` keeps whatever
    /// was decoded either way.
    pub(crate) fn run(mut self, shape: &Shape, out: &mut Value) -> Result<(), Error> {
        let root = self.doc.root();
        self.unmarshal(root, shape, out)?;
        debug_print!("decoded with {} soft errors", self.errors.len());
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Unmarshal(UnmarshalErrors::new(self.errors)))
        }
    }

    fn observe(&mut self) -> Result<(), Error> {
        self.meter
            .observe()
            .map_err(|breach| Error::msg(breach.to_string()))
    }

    /// Decode one node. `Ok(false)` means the node did not fit and a soft error was recorded.
    fn unmarshal(&mut self, id: NodeId, shape: &Shape, out: &mut Value) -> Result<bool, Error> {
        self.observe()?;
        let doc = self.doc;
        let node = &doc[id];
        match node.kind {
            NodeKind::Document => match node.children.first() {
                Some(&content) => self.unmarshal(content, shape, out),
                None => Ok(false),
            },
            NodeKind::Alias => {
                self.through_alias(id, |this, target| this.unmarshal(target, shape, out))
            }
            NodeKind::Scalar | NodeKind::Mapping | NodeKind::Sequence => {
                let Some(shape) = prepare(node, shape, out) else {
                    return Ok(true);
                };
                match node.kind {
                    NodeKind::Scalar => self.scalar(node, shape, out),
                    NodeKind::Mapping => self.mapping(node, shape, out),
                    _ => self.sequence(node, shape, out),
                }
            }
        }
    }

    /// Run `f` on the target of the alias node `id`, guarding against cycles.
    fn through_alias<T>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Self, NodeId) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let doc = self.doc;
        let node = &doc[id];
        let Some(target) = node.alias else {
            return Err(
                Error::msg(format!("unknown anchor '{}' referenced", node.value)).at(node.mark)
            );
        };
        if !self.aliases.insert(id) {
            return Err(
                Error::msg(format!("anchor '{}' value contains itself", node.value)).at(node.mark)
            );
        }
        self.meter.enter_alias();
        let result = f(self, target);
        self.meter.leave_alias();
        self.aliases.remove(&id);
        result
    }

    fn scalar(&mut self, node: &Node, shape: &Shape, out: &mut Value) -> Result<bool, Error> {
        let (tag, resolved) = if node.tag.is_empty() && !node.implicit {
            (TAG_STR, Resolved::Str(node.value.as_str()))
        } else {
            resolve(&node.tag, &node.value).map_err(|err| err.at(node.mark))?
        };
        let binary = if tag == TAG_BINARY {
            let bytes = decode_binary(&node.value).ok_or_else(|| {
                Error::msg("!!binary value contains invalid base64 data").at(node.mark)
            })?;
            Some(bytes)
        } else {
            None
        };
        if resolved.is_null() {
            *out = shape.zero();
            return Ok(true);
        }
        let text = || match &binary {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => node.value.clone(),
        };

        let converted = match shape {
            Shape::Text(codec) => {
                let raw = binary.as_deref().unwrap_or(node.value.as_bytes());
                return match codec.decode(raw) {
                    Ok(value) => {
                        *out = value;
                        Ok(true)
                    }
                    Err(reason) => {
                        let msg = format!("{}: {reason}", mismatch(node, tag, shape));
                        self.errors.push(DecodeError::new(node.mark, msg));
                        Ok(false)
                    }
                };
            }
            Shape::Str => Some(Value::String(text())),
            Shape::Dynamic => Some(match resolved {
                // Timestamp-looking text stays text in untyped positions.
                Resolved::Timestamp(_) => Value::String(node.value.clone()),
                Resolved::Str(_) => Value::String(text()),
                other => scalar_value(other),
            }),
            Shape::Bool => match resolved {
                Resolved::Bool(b) => Some(Value::Bool(b)),
                _ => None,
            },
            Shape::Int(width) => match resolved {
                Resolved::Int(v) => Some(v),
                Resolved::Uint(v) => v.to_i64(),
                Resolved::Float(v) => v.to_i64(),
                _ => None,
            }
            .filter(|&v| width.fits_signed(v))
            .map(Value::Int),
            Shape::Uint(width) => match resolved {
                Resolved::Int(v) => v.to_u64(),
                Resolved::Uint(v) => Some(v),
                Resolved::Float(v) if v >= 0.0 => v.to_u64(),
                _ => None,
            }
            .filter(|&v| width.fits_unsigned(v))
            .map(Value::Uint),
            Shape::Float(width) => match resolved {
                Resolved::Int(v) => Some(v as f64),
                Resolved::Uint(v) => Some(v as f64),
                Resolved::Float(v) => Some(v),
                _ => None,
            }
            .map(|v| match width {
                FloatWidth::F32 => Value::Float(f64::from(v as f32)),
                FloatWidth::F64 => Value::Float(v),
            }),
            Shape::Timestamp => match resolved {
                Resolved::Timestamp(ts) => Some(Value::Timestamp(ts)),
                Resolved::Str(s) if tag == TAG_STR => parse_timestamp(s).map(Value::Timestamp),
                _ => None,
            },
            Shape::Optional(_)
            | Shape::Seq(_)
            | Shape::Array(..)
            | Shape::Map(..)
            | Shape::MapItems
            | Shape::Struct(_) => None,
        };

        match converted {
            Some(value) => {
                *out = value;
                Ok(true)
            }
            None => {
                self.terror(node, tag, shape);
                Ok(false)
            }
        }
    }

    fn sequence(&mut self, node: &Node, shape: &Shape, out: &mut Value) -> Result<bool, Error> {
        let len = node.children.len();
        match shape {
            Shape::Seq(elem) => {
                *out = Value::Sequence(self.elements(node, elem)?);
            }
            Shape::Dynamic => {
                *out = Value::Sequence(self.elements(node, &Shape::Dynamic)?);
            }
            Shape::Array(elem, want) => {
                if len != *want {
                    return Err(Error::msg(format!(
                        "invalid array: want {want} elements but got {len}"
                    ))
                    .at(node.mark));
                }
                let mut items = Vec::with_capacity(len);
                for &child in &node.children {
                    let mut item = elem.zero();
                    if !self.unmarshal(child, elem, &mut item)? {
                        item = elem.zero();
                    }
                    items.push(item);
                }
                *out = Value::Sequence(items);
            }
            _ => {
                self.terror(node, TAG_SEQ, shape);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Elements that decoded cleanly; the others are dropped.
    fn elements(&mut self, node: &Node, elem: &Shape) -> Result<Vec<Value>, Error> {
        let mut items = Vec::with_capacity(node.children.len());
        for &child in &node.children {
            let mut item = elem.zero();
            if self.unmarshal(child, elem, &mut item)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    fn mapping(&mut self, node: &Node, shape: &Shape, out: &mut Value) -> Result<bool, Error> {
        match shape {
            Shape::Struct(st) => {
                let info = struct_info(st).map_err(|err| err.at(node.mark))?;
                if !matches!(out, Value::Struct(current) if current.name == st.name) {
                    *out = Value::Struct(st.zero());
                }
                self.map_into(node, MapTarget::Struct { shape: st, info: &info }, out)
            }
            Shape::Map(key, value) => {
                if !matches!(out, Value::Mapping(_)) {
                    *out = Value::Mapping(Mapping::new());
                }
                self.map_into(node, MapTarget::Map { key, value }, out)
            }
            Shape::Dynamic => {
                *out = Value::Mapping(Mapping::new());
                let target = MapTarget::Map {
                    key: &Shape::Dynamic,
                    value: &Shape::Dynamic,
                };
                self.map_into(node, target, out)
            }
            Shape::MapItems => {
                if !matches!(out, Value::Items(_)) {
                    *out = Value::Items(Vec::new());
                }
                self.map_into(node, MapTarget::Items, out)
            }
            _ => {
                self.terror(node, TAG_MAP, shape);
                Ok(false)
            }
        }
    }

    /// Apply merge keys, then the explicit entries, so explicit keys always win.
    fn map_into(&mut self, node: &Node, target: MapTarget<'_>, out: &mut Value) -> Result<bool, Error> {
        let doc = self.doc;
        if let MapTarget::Struct { info, .. } = target
            && let Some(inline) = &info.inline_map
            && self.merging == 0
            && let Value::Struct(st) = &mut *out
            && let Some(slot) = st.field_at_mut(&[inline.num])
        {
            *slot = Value::Mapping(Mapping::new());
        }

        for pair in node.children.chunks_exact(2) {
            if is_merge(&doc[pair[0]]) {
                self.merge(pair[1], target, out)?;
            }
        }

        match target {
            MapTarget::Map { key, value } => self.map_entries(node, key, value, out),
            MapTarget::Items => self.item_entries(node, out),
            MapTarget::Struct { shape, info } => self.struct_entries(node, shape, info, out),
        }
    }

    fn map_entries(
        &mut self,
        node: &Node,
        key_shape: &Shape,
        value_shape: &Shape,
        out: &mut Value,
    ) -> Result<bool, Error> {
        let doc = self.doc;
        let mut explicit = Mapping::new();
        for pair in node.children.chunks_exact(2) {
            let key_node = &doc[pair[0]];
            if is_merge(key_node) {
                continue;
            }
            let mut key = key_shape.zero();
            if !self.unmarshal(pair[0], key_shape, &mut key)? {
                continue;
            }
            if matches!(key, Value::Sequence(_) | Value::Mapping(_) | Value::Items(_)) {
                return Err(Error::msg(format!("invalid map key: {key}")).at(key_node.mark));
            }
            let mut value = value_shape.zero();
            if self.unmarshal(pair[1], value_shape, &mut value)? {
                self.set_map_index(&doc[pair[1]], &mut explicit, out, key, value);
            }
        }
        Ok(true)
    }

    fn set_map_index(
        &mut self,
        node: &Node,
        explicit: &mut Mapping,
        out: &mut Value,
        key: Value,
        value: Value,
    ) {
        if self.strict && explicit.contains_key(&key) {
            let msg = format!("key {} already set in map", key_repr(&key));
            self.errors.push(DecodeError::new(node.mark, msg));
            return;
        }
        explicit.insert(key.clone(), Value::Null);
        if let Value::Mapping(map) = out {
            map.insert(key, value);
        }
    }

    /// Ordered pairs: duplicates are kept and nothing is strict-checked.
    fn item_entries(&mut self, node: &Node, out: &mut Value) -> Result<bool, Error> {
        let doc = self.doc;
        for pair in node.children.chunks_exact(2) {
            if is_merge(&doc[pair[0]]) {
                continue;
            }
            let mut key = Value::Null;
            if !self.unmarshal(pair[0], &Shape::Dynamic, &mut key)? {
                continue;
            }
            let mut value = Value::Null;
            if self.unmarshal(pair[1], &Shape::Dynamic, &mut value)?
                && let Value::Items(items) = out
            {
                items.push((key, value));
            }
        }
        Ok(true)
    }

    fn struct_entries(
        &mut self,
        node: &Node,
        shape: &StructShape,
        info: &StructInfo,
        out: &mut Value,
    ) -> Result<bool, Error> {
        let doc = self.doc;
        let Value::Struct(st) = out else {
            return Ok(false);
        };
        let mut done = vec![false; info.fields_list.len()];
        let mut explicit = Mapping::new();
        for pair in node.children.chunks_exact(2) {
            let key_node = &doc[pair[0]];
            if is_merge(key_node) {
                continue;
            }
            let mut name = Value::String(String::new());
            if !self.unmarshal(pair[0], &Shape::Str, &mut name)? {
                continue;
            }
            let name = match name {
                Value::String(name) => name,
                _ => String::new(),
            };

            if let Some(field) = info.field(&name) {
                if self.strict {
                    if done[field.id] {
                        let msg = format!("field {name} already set in type {}", shape.name);
                        self.errors.push(DecodeError::new(key_node.mark, msg));
                        continue;
                    }
                    done[field.id] = true;
                }
                if let Some(field_shape) = shape.field_shape(&field.path)
                    && let Some(slot) = st.field_at_mut(&field.path)
                {
                    self.unmarshal(pair[1], field_shape, slot)?;
                }
            } else if let Some(inline) = &info.inline_map
                && let Some(Shape::Map(_, value_shape)) = shape.field_shape(&[inline.num])
            {
                let mut value = value_shape.zero();
                self.unmarshal(pair[1], value_shape, &mut value)?;
                if let Some(slot) = st.field_at_mut(&[inline.num]) {
                    if !matches!(slot, Value::Mapping(_)) {
                        *slot = Value::Mapping(Mapping::new());
                    }
                    self.set_map_index(&doc[pair[1]], &mut explicit, slot, Value::String(name), value);
                }
            } else if self.strict {
                let msg = format!("field {name} not found in type {}", shape.name);
                self.errors.push(DecodeError::new(key_node.mark, msg));
            }
        }
        Ok(true)
    }

    /// Apply the value of a `<<` key: a mapping, an alias of one, or a sequence of those.
    fn merge(&mut self, id: NodeId, target: MapTarget<'_>, out: &mut Value) -> Result<(), Error> {
        let doc = self.doc;
        let node = &doc[id];
        let is_mapping = |id: NodeId| {
            let node = &doc[id];
            match node.kind {
                NodeKind::Mapping => true,
                NodeKind::Alias => node.alias.is_some_and(|t| doc[t].kind == NodeKind::Mapping),
                _ => false,
            }
        };
        match node.kind {
            NodeKind::Mapping | NodeKind::Alias if is_mapping(id) => self.merge_one(id, target, out),
            NodeKind::Sequence => {
                // Earlier entries take precedence, so they are applied last.
                for &item in node.children.iter().rev() {
                    if !is_mapping(item) {
                        return Err(merge_error(&doc[item]));
                    }
                    self.merge_one(item, target, out)?;
                }
                Ok(())
            }
            _ => Err(merge_error(node)),
        }
    }

    fn merge_one(&mut self, id: NodeId, target: MapTarget<'_>, out: &mut Value) -> Result<(), Error> {
        self.observe()?;
        let doc = self.doc;
        let node = &doc[id];
        if node.kind == NodeKind::Alias {
            return self.through_alias(id, |this, anchored| this.merge_one(anchored, target, out));
        }
        self.merging += 1;
        let result = self.map_into(node, target, out);
        self.merging -= 1;
        result.map(|_| ())
    }

    fn terror(&mut self, node: &Node, tag: &str, shape: &Shape) {
        let msg = mismatch(node, tag, shape);
        self.errors.push(DecodeError::new(node.mark, msg));
    }
}

/// Unwrap optional shapes. `None` when the node is null and `out` was reset to `Null`.
fn prepare<'s>(node: &Node, mut shape: &'s Shape, out: &mut Value) -> Option<&'s Shape> {
    while let Shape::Optional(inner) = shape {
        if is_null(node) {
            *out = Value::Null;
            return None;
        }
        if out.is_null() {
            *out = inner.zero();
        }
        shape = inner;
    }
    Some(shape)
}

fn is_null(node: &Node) -> bool {
    node.tag == TAG_NULL
        || (node.kind == NodeKind::Scalar
            && node.tag.is_empty()
            && (node.value == "null" || node.value == "~" || (node.value.is_empty() && node.implicit)))
}

fn is_merge(node: &Node) -> bool {
    node.kind == NodeKind::Scalar && node.value == "<<" && (node.implicit || node.tag == TAG_MERGE)
}

fn merge_error(node: &Node) -> Error {
    Error::msg("map merge requires map or sequence of maps as the value").at(node.mark)
}

fn scalar_value(resolved: Resolved<'_>) -> Value {
    match resolved {
        Resolved::Null => Value::Null,
        Resolved::Bool(b) => Value::Bool(b),
        Resolved::Int(v) => Value::Int(v),
        Resolved::Uint(v) => Value::Uint(v),
        Resolved::Float(v) => Value::Float(v),
        Resolved::Timestamp(ts) => Value::Timestamp(ts),
        Resolved::Str(s) => Value::String(s.to_owned()),
    }
}

/// `cannot unmarshal !!str `abc` into i32`. Collections omit the literal; long literals are cut.
fn mismatch(node: &Node, tag: &str, shape: &Shape) -> String {
    let tag = if node.tag.is_empty() { tag } else { node.tag.as_str() };
    let literal = if tag == TAG_SEQ || tag == TAG_MAP {
        String::new()
    } else if node.value.len() > 10 {
        let mut end = 7;
        while !node.value.is_char_boundary(end) {
            end -= 1;
        }
        format!(" `{}...`", &node.value[..end])
    } else {
        format!(" `{}`", node.value)
    };
    format!(
        "cannot unmarshal {}{literal} into {}",
        short_tag(tag),
        shape.type_name()
    )
}

fn key_repr(key: &Value) -> String {
    match key {
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}
