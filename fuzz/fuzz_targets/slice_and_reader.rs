#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_decode::{Options, Shape};

// Arbitrary bytes through both input paths; neither may panic, and both must agree on
// whether the input is valid.
fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let options = yaml_decode::options! {
        max_flow_depth: 256,
        max_indent_depth: 256,
    };
    let from_slice = yaml_decode::decode_with_options(data, &Shape::Dynamic, &options);
    let from_reader = yaml_decode::decode_reader(data, &Shape::Dynamic, &options);
    assert_eq!(from_slice.is_ok(), from_reader.is_ok());

    let _strict = yaml_decode::decode_with_options(
        data,
        &Shape::map(Shape::Str, Shape::seq(Shape::Dynamic)),
        &Options {
            strict: true,
            ..options
        },
    );
});
