use indoc::indoc;

use yaml_decode::{Shape, Value, decode};

fn strings(yaml: &str) -> Value {
    decode(yaml.as_bytes(), &Shape::map(Shape::Str, Shape::Str), false).expect("must decode")
}

fn text<'v>(doc: &'v Value, key: &str) -> &'v str {
    doc.get(key).and_then(Value::as_str).unwrap_or_default()
}

#[test]
fn chomping_indicators() {
    let doc = strings(indoc! {"
        clip: |
          a
          b

        strip: |-
          a

        keep: |+
          a

        last: end
    "});
    assert_eq!(text(&doc, "clip"), "a\nb\n");
    assert_eq!(text(&doc, "strip"), "a");
    assert_eq!(text(&doc, "keep"), "a\n\n");
    assert_eq!(text(&doc, "last"), "end");
}

#[test]
fn folding() {
    let doc = strings(indoc! {"
        folded: >
          a
          b

          c
        more: >
          a
            b
          c
        stripped: >-
          one
          two
    "});
    assert_eq!(text(&doc, "folded"), "a b\nc\n");
    assert_eq!(text(&doc, "more"), "a\n  b\nc\n");
    assert_eq!(text(&doc, "stripped"), "one two");
}

#[test]
fn explicit_indentation_indicator() {
    let doc = strings(indoc! {"
        explicit: |2
           leading
          normal
    "});
    assert_eq!(text(&doc, "explicit"), " leading\nnormal\n");
}

#[test]
fn block_scalar_in_sequence() {
    let yaml = indoc! {"
        - |
          first
        - >-
          second
          line
    "};
    let value = decode(yaml.as_bytes(), &Shape::seq(Shape::Str), false).unwrap();
    assert_eq!(
        value,
        Value::Sequence(vec![Value::from("first\n"), Value::from("second line")])
    );
}

#[test]
fn quoted_scalars_fold_and_escape() {
    let doc = strings(indoc! {r#"
        double: "a
          b"
        escapes: "\x41☺\t."
        single: 'it''s'
        plain: multi
          line
    "#});
    assert_eq!(text(&doc, "double"), "a b");
    assert_eq!(text(&doc, "escapes"), "A\u{263A}\t.");
    assert_eq!(text(&doc, "single"), "it's");
    assert_eq!(text(&doc, "plain"), "multi line");
}
