#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_decode::{IntWidth, Shape, StructShape};

// Biases inputs toward anchors, aliases and merge keys (<<) by splicing the fuzz input
// into small documents that use them, then decodes into dynamic and typed shapes.
fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let s = String::from_utf8_lossy(data);

    let yaml_alias = format!("a: &A {s}\nb: *A\nseq: &S [1, 2, 3]\nseq_alias: *S\n");
    let yaml_merge = format!(
        "base1: &B1 {{k: 1, v: {s}}}\nbase2: &B2 {{k: 2, w: {s}}}\nmerged: {{<<: [*B1, *B2], extra: 3}}\n"
    );

    let entry = Shape::Struct(
        StructShape::new("fuzz::Entry")
            .field("k", Shape::optional(Shape::Int(IntWidth::W64)))
            .field("v", Shape::optional(Shape::Str))
            .field("w", Shape::optional(Shape::Str))
            .field("extra", Shape::optional(Shape::Int(IntWidth::W64))),
    );
    let typed = Shape::map(Shape::Str, entry);

    for yaml in [&yaml_alias, &yaml_merge] {
        let _ = yaml_decode::decode(yaml.as_bytes(), &Shape::Dynamic, false);
        let _ = yaml_decode::decode(yaml.as_bytes(), &typed, true);
    }
});
