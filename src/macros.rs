//! Public macros for constructing option structs without relying on struct literal syntax.
//!
//! Call sites stay valid when fields are added to the option structs later.

/// Construct [`crate::Options`] from `Default` and a list of field assignments.
///
/// Example:
///
/// ```rust
/// let options = yaml_decode::options! {
///     strict: true,
///     max_flow_depth: 64,
/// };
/// assert!(options.strict);
/// ```
#[macro_export]
macro_rules! options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::Options::default();
        $(
            #[allow(deprecated)]
            {
                opt.$field = $value;
            }
        )*
        opt
    }};
}
