//! Struct field metadata.
//!
//! Mapping keys are matched against struct fields through a [`StructInfo`] computed from the
//! [`StructShape`] the first time a struct is decoded. Infos are cached for the lifetime of
//! the process and shared between threads. An info only maps keys to field positions; the
//! shapes of the values always come from the shape being decoded.

use std::any::TypeId;
use std::fmt::Write;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use ahash::AHashMap;
use smallvec::{SmallVec, smallvec};

use crate::error::Error;
use crate::shape::{Shape, StructShape};

/// Field positions from the outer struct down through inlined structs.
pub type FieldPath = SmallVec<[usize; 4]>;

/// How one mapping key binds to a struct field.
#[derive(Clone, Debug)]
pub struct FieldInfo {
    /// The mapping key.
    pub key: String,
    /// Position of the field in the struct that declares it.
    pub num: usize,
    /// Ordinal among all keys of the outer struct, inlined ones included.
    pub id: usize,
    pub path: FieldPath,
    pub omit_empty: bool,
    pub flow: bool,
}

/// The map field that collects keys no other field claims.
#[derive(Clone, Debug)]
pub struct InlineMap {
    pub num: usize,
}

#[derive(Debug)]
pub struct StructInfo {
    pub fields_map: AHashMap<String, usize>,
    pub fields_list: Vec<FieldInfo>,
    pub inline_map: Option<InlineMap>,
}

impl StructInfo {
    pub fn field(&self, key: &str) -> Option<&FieldInfo> {
        self.fields_map.get(key).map(|&i| &self.fields_list[i])
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum TypeKey {
    Type(TypeId),
    /// Layout of a hand-built shape, see [`layout`].
    Layout(String),
}

impl TypeKey {
    fn of(shape: &StructShape) -> Self {
        match shape.type_id {
            Some(id) => TypeKey::Type(id),
            None => {
                let mut key = String::new();
                layout(shape, &mut key);
                TypeKey::Layout(key)
            }
        }
    }
}

/// Everything a [`StructInfo`] is built from: the name, every field name and tag, and the
/// layout of inlined fields.
fn layout(shape: &StructShape, out: &mut String) {
    let _ = write!(out, "{:?}{{", shape.name);
    for field in &shape.fields {
        let _ = write!(out, "{:?}:{:?}", field.name, field.tag);
        if field.is_inline() {
            match &field.shape {
                Shape::Struct(inner) => layout(inner, out),
                Shape::Map(key, _) => {
                    let _ = write!(out, "map<{}>", key.type_name());
                }
                other => out.push_str(&other.type_name()),
            }
        }
        out.push(';');
    }
    out.push('}');
}

static STRUCT_INFOS: LazyLock<RwLock<AHashMap<TypeKey, Arc<StructInfo>>>> =
    LazyLock::new(|| RwLock::new(AHashMap::new()));

/// Field metadata for `shape`, computed on first use.
///
/// Shapes built with [`StructShape::of`] are identified by their Rust type, hand-built ones
/// by their layout.
pub fn struct_info(shape: &StructShape) -> Result<Arc<StructInfo>, Error> {
    let key = TypeKey::of(shape);
    {
        let cache = STRUCT_INFOS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(info) = cache.get(&key) {
            return Ok(Arc::clone(info));
        }
    }
    let info = Arc::new(build(shape)?);
    let mut cache = STRUCT_INFOS.write().unwrap_or_else(PoisonError::into_inner);
    // Another thread may have won the race; keep the first entry.
    Ok(Arc::clone(cache.entry(key).or_insert(info)))
}

fn build(shape: &StructShape) -> Result<StructInfo, Error> {
    let mut fields_map = AHashMap::with_capacity(shape.fields.len());
    let mut fields_list: Vec<FieldInfo> = Vec::with_capacity(shape.fields.len());
    let mut inline_map: Option<InlineMap> = None;

    for (num, field) in shape.fields.iter().enumerate() {
        let tag = field.tag.as_deref().unwrap_or("");
        if tag == "-" {
            continue;
        }
        let mut parts = tag.split(',');
        let key = parts.next().unwrap_or("");
        let mut omit_empty = false;
        let mut flow = false;
        let mut inline = false;
        for flag in parts {
            match flag {
                "omitempty" => omit_empty = true,
                "flow" => flow = true,
                "inline" => inline = true,
                _ => {
                    return Err(Error::msg(format!(
                        "unsupported flag {flag:?} in tag {tag:?} of type {}",
                        shape.name
                    )));
                }
            }
        }

        if inline {
            match &field.shape {
                Shape::Map(k, _) => {
                    if inline_map.is_some() {
                        return Err(Error::msg(format!(
                            "multiple ,inline maps in struct {}",
                            shape.name
                        )));
                    }
                    if !matches!(**k, Shape::Str) {
                        return Err(Error::msg(format!(
                            "option ,inline needs a map with string keys in struct {}",
                            shape.name
                        )));
                    }
                    inline_map = Some(InlineMap { num });
                }
                Shape::Struct(inner) => {
                    let inner = struct_info(inner)?;
                    for info in &inner.fields_list {
                        if fields_map.contains_key(&info.key) {
                            return Err(duplicated(&info.key, shape));
                        }
                        let mut path: FieldPath = smallvec![num];
                        path.extend_from_slice(&info.path);
                        let id = fields_list.len();
                        fields_map.insert(info.key.clone(), id);
                        fields_list.push(FieldInfo {
                            id,
                            path,
                            ..info.clone()
                        });
                    }
                }
                _ => {
                    return Err(Error::msg(format!(
                        "option ,inline needs a struct or map field in struct {}",
                        shape.name
                    )));
                }
            }
            continue;
        }

        let key = if key.is_empty() {
            field.name.to_lowercase()
        } else {
            key.to_owned()
        };
        if fields_map.contains_key(&key) {
            return Err(duplicated(&key, shape));
        }
        let id = fields_list.len();
        fields_map.insert(key.clone(), id);
        fields_list.push(FieldInfo {
            key,
            num,
            id,
            path: smallvec![num],
            omit_empty,
            flow,
        });
    }

    debug_print!(
        "struct info for {}: {} keys, inline map: {}",
        shape.name,
        fields_list.len(),
        inline_map.is_some()
    );
    Ok(StructInfo {
        fields_map,
        fields_list,
        inline_map,
    })
}

fn duplicated(key: &str, shape: &StructShape) -> Error {
    Error::msg(format!("duplicated key '{key}' in struct {}", shape.name))
}
