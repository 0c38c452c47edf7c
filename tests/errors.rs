use indoc::indoc;

use yaml_decode::{Error, IntWidth, Shape, decode, decode_with_options};

#[test]
fn scan_errors_carry_position_and_context() {
    let yaml = "key: value\n- item\n";
    let err = decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap_err();
    let location = err.location().expect("scan errors are located");
    assert_eq!((location.line(), location.column()), (2, 1));
    match err.without_snippet() {
        Error::Scan(scan) => {
            assert_eq!(scan.context(), Some("while parsing a block mapping"));
            assert_eq!(scan.problem(), "did not find expected key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn undefined_tag_handle() {
    let err = decode(b"a: !x!foo 1\n", &Shape::Dynamic, false).unwrap_err();
    match err.without_snippet() {
        Error::Scan(scan) => assert_eq!(scan.problem(), "found undefined tag handle"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn declared_tag_handles_expand() {
    let yaml = indoc! {"
        %TAG !e! tag:example.com,2000:
        ---
        a: !e!point 1
    "};
    assert!(decode(yaml.as_bytes(), &Shape::Dynamic, false).is_ok());
}

#[test]
fn unsupported_yaml_version() {
    let err = decode(b"%YAML 1.2\n---\na: 1\n", &Shape::Dynamic, false).unwrap_err();
    match err.without_snippet() {
        Error::Scan(scan) => assert_eq!(scan.problem(), "found incompatible YAML document"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(decode(b"%YAML 1.1\n---\na: 1\n", &Shape::Dynamic, false).is_ok());
}

#[test]
fn snippets_point_at_the_offending_line() {
    let yaml = indoc! {"
        name: demo
        count: many
        other: 1
    "};
    let shape = Shape::map(Shape::Str, Shape::Int(IntWidth::W32));
    let err = decode(yaml.as_bytes(), &shape, false).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.starts_with("unmarshal errors:"), "{rendered}");
    assert!(rendered.contains("count: many"), "{rendered}");
    assert!(rendered.contains("cannot unmarshal !!str `many` into i32"), "{rendered}");
    assert!(rendered.contains('^'), "{rendered}");
}

#[test]
fn snippets_can_be_disabled() {
    let options = yaml_decode::options! { with_snippet: false };
    let err = decode_with_options(b"a: *missing\n", &Shape::Dynamic, &options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown anchor 'missing' referenced at line 1, column 4"
    );
}

#[test]
fn render_uses_the_given_path() {
    let yaml = "a: [\n";
    let options = yaml_decode::options! { with_snippet: false };
    let err = decode_with_options(yaml.as_bytes(), &Shape::Dynamic, &options).unwrap_err();
    let rendered = err.render(yaml, "settings.yaml");
    assert!(rendered.contains("settings.yaml"), "{rendered}");
}
