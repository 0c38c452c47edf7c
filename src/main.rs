#![forbid(unsafe_code)]

use std::process::exit;

use yaml_decode::{Error, Options, Shape, Value, decode_with_options};

/// Decode a YAML file and print it as JSON. Usage: `yaml-decode [--strict] <file>`.
fn main() {
    let mut strict = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--strict" => strict = true,
            _ => path = Some(arg),
        }
    }
    let Some(path) = path else {
        eprintln!(
            "Decodes a YAML file and prints it as JSON; can also be used as a YAML validator. \
            Expected a path to a YAML file as the argument"
        );
        exit(1);
    };

    let content = match std::fs::read(&path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Failed to read {path}: {err}");
            exit(2);
        }
    };

    let options = Options {
        strict,
        with_snippet: false,
        ..Options::default()
    };
    let result: Result<Value, Error> = decode_with_options(&content, &Shape::Dynamic, &options);

    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("Failed to serialize {path}: {err}");
                exit(4);
            }
        },
        Err(err) => {
            let source = String::from_utf8_lossy(&content);
            eprintln!("{path} invalid:\n{}", err.render(&source, &path));
            exit(3);
        }
    }
}
