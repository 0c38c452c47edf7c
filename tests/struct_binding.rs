use std::collections::BTreeMap;
use std::io::Cursor;

use indoc::indoc;
use serde::Deserialize;
use serde_json::json;

use yaml_decode::{
    Describe, IntWidth, Mapping, Options, Shape, StructShape, Value, decode, decode_into,
    from_reader, from_str,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Detect {
    filename: Option<String>,
    header: Option<String>,
    signature: Option<String>,
}

impl Describe for Detect {
    fn shape() -> Shape {
        Shape::Struct(
            StructShape::of::<Self>("Detect")
                .field("filename", Option::<String>::shape())
                .field("header", Option::<String>::shape())
                .field("signature", Option::<String>::shape()),
        )
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Header {
    filetype: String,
    detect: Detect,
}

impl Describe for Header {
    fn shape() -> Shape {
        Shape::Struct(
            StructShape::of::<Self>("Header")
                .field("filetype", String::shape())
                .field("detect", Detect::shape()),
        )
    }
}

const SYNTAX: &str = indoc! {r#"
    filetype: go

    detect:
        filename: "\\.go$"
        signature: "^package "

    rules:
        - statement: "\\b(break|case|continue|default|go|goto|range|return)\\b"
        - type: "\\b(bool|byte|complex64|error|int|string)\\b"
        - constant.string:
            start: "\""
            end: "\""
            skip: "\\\\."
            rules:
                - constant.specialChar: "%."
        - comment:
            start: "//"
            end: "$"
            rules: []
"#};

#[test]
fn header_record_then_dynamic_file() -> anyhow::Result<()> {
    let header: Header = from_str(SYNTAX)?;
    assert_eq!(
        header,
        Header {
            filetype: "go".to_owned(),
            detect: Detect {
                filename: Some("\\.go$".to_owned()),
                header: None,
                signature: Some("^package ".to_owned()),
            },
        }
    );

    let file = decode(SYNTAX.as_bytes(), &Shape::Dynamic, false)?;
    let mapping = file.as_mapping().expect("top level is a mapping");
    let keys: Vec<String> = mapping.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["filetype", "detect", "rules"]);

    let rules = serde_json::to_value(file.get("rules").expect("rules"))?;
    assert_eq!(rules[0], json!({"statement": "\\b(break|case|continue|default|go|goto|range|return)\\b"}));
    assert_eq!(rules[2]["constant.string"]["skip"], json!("\\\\."));
    assert_eq!(rules[2]["constant.string"]["rules"][0], json!({"constant.specialChar": "%."}));
    assert_eq!(rules[3]["comment"]["rules"], json!([]));
    Ok(())
}

#[derive(Debug, Deserialize, PartialEq)]
struct Base {
    id: u32,
}

impl Describe for Base {
    fn shape() -> Shape {
        Shape::Struct(StructShape::of::<Self>("Base").field("id", u32::shape()))
    }
}

#[derive(Debug, Deserialize)]
struct Service {
    name: String,
    port: u16,
    #[serde(skip)]
    secret: Option<String>,
    #[serde(flatten)]
    base: Base,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl Describe for Service {
    fn shape() -> Shape {
        Shape::Struct(
            StructShape::of::<Self>("Service")
                .field("name", String::shape())
                .tagged("port", "listen", u16::shape())
                .tagged("secret", "-", Option::<String>::shape())
                .tagged("base", ",inline", Base::shape())
                .tagged("extra", ",inline", BTreeMap::<String, Value>::shape()),
        )
    }
}

#[test]
fn renamed_skipped_and_inline_fields() -> anyhow::Result<()> {
    let yaml = indoc! {"
        name: api
        listen: 8080
        secret: hunter2
        id: 7
        replicas: 3
    "};
    let service: Service = from_str(yaml)?;
    assert_eq!(service.name, "api");
    assert_eq!(service.port, 8080);
    assert_eq!(service.secret, None);
    assert_eq!(service.base, Base { id: 7 });
    assert_eq!(service.extra.get("replicas"), Some(&Value::Int(3)));
    assert_eq!(service.extra.get("secret"), Some(&Value::from("hunter2")));
    Ok(())
}

#[test]
fn typed_decode_from_reader() -> anyhow::Result<()> {
    let header: Header = from_reader(Cursor::new(SYNTAX.as_bytes().to_vec()))?;
    assert_eq!(header.filetype, "go");
    Ok(())
}

#[test]
fn type_errors_surface_through_typed_entry_points() {
    let err = from_str::<Header>("filetype: [a]\n").unwrap_err();
    let errors = err.unmarshal_errors().expect("collected errors");
    assert_eq!(errors.errors()[0].message(), "cannot unmarshal !!seq into String");
}

#[test]
fn ordered_items_keep_duplicates() {
    let value = decode(b"a: 1\nb: 2\na: 3\n", &Shape::MapItems, true).unwrap();
    let items = value.as_items().unwrap();
    let keys: Vec<String> = items.iter().map(|(k, _)| k.to_string()).collect();
    assert_eq!(keys, vec!["a", "b", "a"]);
    assert_eq!(value.get("a"), Some(&Value::Int(3)));

    let value = decode(b"b: 1\na: 2\nb: 3\n", &Mapping::shape(), false).unwrap();
    let mapping = value.as_mapping().unwrap();
    let keys: Vec<String> = mapping.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["b", "a"]);
    assert_eq!(mapping.get_str("b"), Some(&Value::Int(3)));
}

#[test]
fn arrays_have_fixed_length() {
    let shape = <[u8; 3]>::shape();
    let err = decode(b"[1, 2]", &shape, false).unwrap_err();
    assert!(err.is_fatal());
    assert!(
        err.to_string().contains("invalid array: want 3 elements but got 2"),
        "{err}"
    );

    let mut out = shape.zero();
    let err = decode_into(b"[1, x, 3]", &shape, &mut out, &Options::default()).unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(
        out,
        Value::Sequence(vec![Value::Uint(1), Value::Uint(0), Value::Uint(3)])
    );
}

#[test]
fn partial_struct_after_mismatch() {
    let shape = Shape::Struct(
        StructShape::new("binding::Limits")
            .field("min", Shape::Int(IntWidth::W32))
            .field("max", Shape::Int(IntWidth::W32))
            .field("names", Shape::seq(Shape::Str)),
    );
    let mut out = shape.zero();
    let yaml = "min: 1\nmax: lots\nnames: [a, [b], c]\n";
    let err = decode_into(yaml.as_bytes(), &shape, &mut out, &Options::default()).unwrap_err();
    assert_eq!(err.unmarshal_errors().map(|e| e.len()), Some(2));
    assert_eq!(out.get("min"), Some(&Value::Int(1)));
    assert_eq!(out.get("max"), Some(&Value::Int(0)));
    assert_eq!(
        out.get("names"),
        Some(&Value::Sequence(vec![Value::from("a"), Value::from("c")]))
    );
}

#[test]
fn empty_input_yields_zero_value() {
    let shape = Header::shape();
    let value = decode(b"", &shape, true).unwrap();
    assert_eq!(value, shape.zero());
    let value = decode(b"# only a comment\n", &Shape::Dynamic, false).unwrap();
    assert!(value.is_null());
}

#[test]
fn same_named_shapes_keep_their_own_fields() {
    let first = Shape::Struct(
        StructShape::new("binding::Rec")
            .field("name", Shape::Str)
            .field("port", Shape::Uint(IntWidth::W16)),
    );
    let second = Shape::Struct(
        StructShape::new("binding::Rec")
            .field("host", Shape::Str)
            .field("name", Shape::Int(IntWidth::W64)),
    );

    let value = decode(b"name: x\n", &first, false).unwrap();
    assert_eq!(value.get("name"), Some(&Value::from("x")));

    for strict in [false, true] {
        let value = decode(b"host: h\nname: 5\n", &second, strict).unwrap();
        assert_eq!(value.get("host"), Some(&Value::from("h")));
        assert_eq!(value.get("name"), Some(&Value::Int(5)));
    }

    let value = decode(b"name: y\nport: 80\n", &first, true).unwrap();
    assert_eq!(value.get("port"), Some(&Value::Uint(80)));
}
