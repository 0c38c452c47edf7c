use yaml_decode::{Error, Shape, Value, decode};

const TEXT: &str = "name: Grüße ☺\nitems: [1, two, 3.5]\nnested:\n  key: 𝄞\n";

fn utf16(text: &str, little_endian: bool) -> Vec<u8> {
    let mut bytes = if little_endian {
        vec![0xFF, 0xFE]
    } else {
        vec![0xFE, 0xFF]
    };
    for unit in text.encode_utf16() {
        let pair = if little_endian {
            unit.to_le_bytes()
        } else {
            unit.to_be_bytes()
        };
        bytes.extend_from_slice(&pair);
    }
    bytes
}

fn dynamic(bytes: &[u8]) -> Value {
    decode(bytes, &Shape::Dynamic, false).expect("input must decode")
}

#[test]
fn utf16_matches_utf8() {
    let expected = dynamic(TEXT.as_bytes());
    assert_eq!(dynamic(&utf16(TEXT, true)), expected);
    assert_eq!(dynamic(&utf16(TEXT, false)), expected);
    assert_eq!(
        expected.get("nested").and_then(|n| n.get("key")),
        Some(&Value::from("𝄞"))
    );
}

#[test]
fn utf8_bom_is_skipped() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(TEXT.as_bytes());
    assert_eq!(dynamic(&bytes), dynamic(TEXT.as_bytes()));
}

#[test]
fn control_characters_are_rejected() {
    let err = decode(b"a: \x01\n", &Shape::Dynamic, false).unwrap_err();
    match err {
        Error::Reader(err) => {
            assert_eq!(err.problem(), "control characters are not allowed");
            assert_eq!(err.offset(), 3);
            assert_eq!(err.value(), Some(1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn invalid_utf8_is_rejected() {
    let err = decode(b"a: \xFF\n", &Shape::Dynamic, false).unwrap_err();
    assert!(matches!(err, Error::Reader(ref e) if e.offset() == 3), "{err:?}");
}

#[test]
fn truncated_utf16_is_rejected() {
    let mut bytes = utf16("a: b\n", true);
    bytes.push(b'c');
    let err = decode(&bytes, &Shape::Dynamic, false).unwrap_err();
    assert!(matches!(err, Error::Reader(_)), "{err:?}");
}
