use serde::{Deserialize, Serialize};

use crate::inspector::PropertyOrder;
use crate::naming::NamingStyle;

/// Duplicate key handling policy for mappings and objects.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateKeyPolicy {
    /// Error out on encountering a duplicate key.
    Error,
    /// First key wins: later duplicate pairs are skipped (key+value are consumed and ignored).
    FirstWins,
    /// Last key wins: later duplicate pairs overwrite the earlier value.
    LastWins,
}

/// Which members the write path leaves out.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValuesHandling {
    /// Emit every readable property.
    #[default]
    Preserve,
    /// Skip properties whose value is null.
    OmitNull,
    /// Skip null, `false`, `0` and `0.0`.
    OmitDefaults,
    /// Skip null and empty sequences, arrays and mappings.
    OmitEmptyCollections,
}

/// Mapper configuration options.
///
/// Plain data: everything that can be stated without trait objects. Strategies,
/// converters and custom naming conventions go through [`MapperBuilder`](crate::MapperBuilder).
///
/// ```rust
/// use saphyr_mapper::options::DuplicateKeyPolicy;
///
/// let options = saphyr_mapper::mapper_options! {
///     case_insensitive_properties: true,
///     duplicate_keys: DuplicateKeyPolicy::LastWins,
/// };
/// assert!(!options.ignore_unmatched_properties);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// Match mapping keys to property names ignoring case. Keys that then match more
    /// than one property fail as ambiguous. Default: false.
    pub case_insensitive_properties: bool,
    /// Skip mapping keys that match no property instead of failing. Default: false.
    pub ignore_unmatched_properties: bool,
    /// Naming convention for property names without an explicit alias.
    pub naming: NamingStyle,
    /// Naming convention for enum variant names.
    pub enum_naming: NamingStyle,
    /// Secondary emission order for properties sharing an `order` value.
    pub property_order: PropertyOrder,
    /// Which properties the write path omits.
    pub default_values: DefaultValuesHandling,
    /// Policy for duplicate keys.
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Maximum nesting depth on both paths. Must be at least 1.
    pub max_depth: usize,
    /// If true, interpret only `true`/`false` (any case form of YAML 1.2) as booleans.
    /// YAML 1.1 forms like `yes`/`no`/`on`/`off` will be rejected and not inferred.
    /// Default: false (accept YAML 1.1 boolean forms).
    pub strict_booleans: bool,
    /// Fail on tags that are neither core YAML tags nor mapped to a type.
    pub reject_unknown_tags: bool,
    /// Emit property descriptions as comments above their keys.
    pub emit_comments: bool,
    /// Double-quote strings and write collections in flow style.
    pub json_compatible: bool,
    /// Custom anchor names, called with the 1-based anchor number.
    /// Default names are `a1`, `a2`, ...
    #[serde(skip)]
    pub anchor_generator: Option<fn(usize) -> String>,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            case_insensitive_properties: false,
            ignore_unmatched_properties: false,
            naming: NamingStyle::Null,
            enum_naming: NamingStyle::Null,
            property_order: PropertyOrder::Declared,
            default_values: DefaultValuesHandling::Preserve,
            duplicate_keys: DuplicateKeyPolicy::Error,
            max_depth: 128,
            strict_booleans: false,
            reject_unknown_tags: false,
            emit_comments: false,
            json_compatible: false,
            anchor_generator: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let opts = MapperOptions::default();
        assert!(!opts.case_insensitive_properties);
        assert!(!opts.ignore_unmatched_properties);
        assert_eq!(opts.duplicate_keys, DuplicateKeyPolicy::Error);
        assert_eq!(opts.default_values, DefaultValuesHandling::Preserve);
        assert_eq!(opts.max_depth, 128);
        assert!(opts.anchor_generator.is_none());
    }

    #[test]
    fn test_options_macro() {
        let opts = crate::mapper_options! {
            strict_booleans: true,
            naming: NamingStyle::CamelCase,
        };
        assert!(opts.strict_booleans);
        assert_eq!(opts.naming, NamingStyle::CamelCase);
        assert!(!opts.emit_comments);
    }
}
