//! Debugging helpers.
//!
//! Debug output is compiled in only with the `debug_prints` feature, and even then it is
//! printed only when the `YAML_DECODE_DEBUG` environment variable is set.

#[cfg(not(feature = "debug_prints"))]
macro_rules! debug_print {
    ($($arg:tt)*) => {{}};
}

#[cfg(feature = "debug_prints")]
macro_rules! debug_print {
    ($($arg:tt)*) => {{
        if $crate::debug::enabled() {
            eprintln!($($arg)*)
        }
    }};
}

/// Whether debug output was requested for this process.
#[cfg(feature = "debug_prints")]
pub(crate) fn enabled() -> bool {
    use std::sync::OnceLock;

    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var_os("YAML_DECODE_DEBUG").is_some())
}
