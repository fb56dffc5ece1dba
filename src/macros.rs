//! Public macros for constructing option structs without relying on struct literal syntax.
//!
//! These macros keep call sites ergonomic while letting the option structs grow new
//! fields without breaking callers.

/// Construct [`crate::MapperOptions`] from `Default` and a list of field assignments.
///
/// Example:
///
/// ```rust
/// use saphyr_mapper::options::DefaultValuesHandling;
/// use saphyr_mapper::NamingStyle;
///
/// let options = saphyr_mapper::mapper_options! {
///     naming: NamingStyle::Underscored,
///     default_values: DefaultValuesHandling::OmitNull,
/// };
/// assert_eq!(options.max_depth, 128);
/// ```
#[macro_export]
macro_rules! mapper_options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::MapperOptions::default();
        $(
            #[allow(deprecated)]
            {
                opt.$field = $value;
            }
        )*
        opt
    }};
}
