use indoc::indoc;
use serde_json::json;

use yaml_decode::{Shape, StructShape, Value, decode};

fn dynamic(yaml: &str) -> serde_json::Value {
    let value = decode(yaml.as_bytes(), &Shape::Dynamic, false).expect("merge must decode");
    serde_json::to_value(&value).expect("value must serialize")
}

#[test]
fn merge_expands_nested_mappings() {
    let yaml = indoc! {"
        base1: &B1 { a: 1, b: 2 }
        base2: &B2
          <<: { c: 3 }
          d: 4
        target:
          <<: [*B1, *B2]
          e: 5
    "};
    assert_eq!(
        dynamic(yaml)["target"],
        json!({"a": 1, "b": 2, "c": 3, "d": 4, "e": 5})
    );
}

#[test]
fn earlier_merged_mapping_wins() {
    let yaml = indoc! {"
        base1: &B1 { a: 1, b: 2 }
        base2: &B2 { b: 20, c: 3 }
        target:
          <<: [*B1, *B2]
    "};
    assert_eq!(dynamic(yaml)["target"], json!({"a": 1, "b": 2, "c": 3}));
}

#[test]
fn explicit_keys_win_wherever_they_appear() {
    let yaml = indoc! {"
        base: &B { a: 1, b: 2 }
        before: { a: 0, <<: *B }
        after: { <<: *B, b: 0 }
    "};
    let doc = dynamic(yaml);
    assert_eq!(doc["before"], json!({"a": 0, "b": 2}));
    assert_eq!(doc["after"], json!({"a": 1, "b": 0}));
}

#[test]
fn merged_keys_are_not_duplicates_in_strict_mode() {
    let yaml = indoc! {"
        base: &B { a: 1, b: 2 }
        target:
          <<: *B
          a: 10
    "};
    let shape = Shape::map(Shape::Str, Shape::map(Shape::Str, Shape::Dynamic));
    let value = decode(yaml.as_bytes(), &shape, true).expect("strict merge must decode");
    let target = value.get("target").and_then(Value::as_mapping).unwrap();
    assert_eq!(target.get_str("a"), Some(&Value::Int(10)));
    assert_eq!(target.get_str("b"), Some(&Value::Int(2)));
}

#[test]
fn merge_into_structs() {
    let point = Shape::Struct(
        StructShape::new("merge::Point")
            .field("x", Shape::Int(yaml_decode::IntWidth::W64))
            .field("y", Shape::Int(yaml_decode::IntWidth::W64))
            .field("r", Shape::Int(yaml_decode::IntWidth::W64))
            .field("label", Shape::Str),
    );
    let yaml = indoc! {"
        CENTER: &CENTER { x: 1, y: 2 }
        LEFT: &LEFT { x: 0, y: 2 }
        BIG: &BIG { r: 10 }
        SMALL: &SMALL { r: 1 }

        plain: { x: 1, y: 2, r: 10, label: center/big }
        mixed:
          << : *CENTER
          r: 10
          label: center/big
        multiple:
          << : [ *CENTER, *BIG ]
          label: center/big
        override:
          << : [ *BIG, *LEFT, *SMALL ]
          x: 1
          label: center/big
    "};
    let value = decode(yaml.as_bytes(), &Shape::map(Shape::Str, point), true)
        .expect("merge into structs must decode");
    let expected = value.get("plain").cloned().unwrap();
    for name in ["mixed", "multiple", "override"] {
        assert_eq!(value.get(name), Some(&expected), "{name}");
    }
}

#[test]
fn tagged_merge_key_merges_and_quoted_key_does_not() {
    let yaml = indoc! {"
        base: &B { a: 1 }
        tagged: { !!merge <<: *B }
        quoted: { '<<': *B }
    "};
    let doc = dynamic(yaml);
    assert_eq!(doc["tagged"], json!({"a": 1}));
    assert_eq!(doc["quoted"], json!({"<<": {"a": 1}}));
}

#[test]
fn merge_requires_mappings() {
    for yaml in [
        "a: { <<: 1 }\n",
        "a: { <<: [ {b: 1}, 2 ] }\n",
        "x: &X [1]\na: { <<: *X }\n",
    ] {
        let err = decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap_err();
        assert!(err.is_fatal());
        assert!(
            err.to_string()
                .contains("map merge requires map or sequence of maps as the value"),
            "{yaml}: {err}"
        );
    }
}

#[test]
fn merge_of_self_is_a_cycle() {
    let yaml = "a: &a { b: 1, <<: *a }\n";
    let err = decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap_err();
    assert!(err.to_string().contains("anchor 'a' value contains itself"), "{err}");
}
