use indoc::indoc;
use serde_json::json;

use yaml_decode::{Error, Shape, StructShape, Value, decode};

#[test]
fn alias_decodes_like_its_anchor() {
    let yaml = indoc! {"
        a: &x { k: [1, 2], s: text }
        b: *x
    "};
    let value = decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap();
    assert_eq!(value.get("a"), value.get("b"));
    assert_eq!(
        serde_json::to_value(&value).unwrap()["b"],
        json!({"k": [1, 2], "s": "text"})
    );
}

#[test]
fn alias_into_typed_destinations() {
    let shape = Shape::Struct(
        StructShape::new("anchors::Pair")
            .field("left", Shape::seq(Shape::Str))
            .field("right", Shape::seq(Shape::Str)),
    );
    let value = decode(b"left: &l [a, b]\nright: *l\n", &shape, true).unwrap();
    assert_eq!(value.get("left"), value.get("right"));
}

#[test]
fn redefined_anchor_applies_to_later_aliases() {
    let yaml = indoc! {"
        a: &x 1
        b: *x
        c: &x 2
        d: *x
    "};
    let value = decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap();
    assert_eq!(value.get("b"), Some(&Value::Int(1)));
    assert_eq!(value.get("d"), Some(&Value::Int(2)));
}

#[test]
fn self_reference_fails() {
    for yaml in ["a: &a [*a]\n", "a: &a { b: *a }\n"] {
        let err = decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap_err();
        assert!(err.is_fatal());
        assert!(
            err.to_string().contains("anchor 'a' value contains itself"),
            "{yaml}: {err}"
        );
    }
}

#[test]
fn unknown_anchor_fails() {
    let err = decode(b"a: *nope\n", &Shape::Dynamic, false).unwrap_err();
    match err.without_snippet() {
        Error::Message { msg, location } => {
            assert_eq!(msg, "unknown anchor 'nope' referenced");
            assert_eq!((location.line(), location.column()), (1, 4));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn anchored_scalars_keep_their_type() {
    let yaml = "base: &n 42\ncopies: [*n, *n]\n";
    let value = decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap();
    assert_eq!(
        value.get("copies"),
        Some(&Value::Sequence(vec![Value::Int(42), Value::Int(42)]))
    );
}
