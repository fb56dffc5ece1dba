//! Core YAML tags in every spelling the parser may report.
//!
//! The parser hands tags back either as shorthand (`!!int`), as the bare suffix after
//! an unresolved handle (`!int`), or fully expanded (`tag:yaml.org,2002:int`). A
//! secondary handle written as `!!int` in a document with a `%TAG` directive can also
//! come out as `tag:yaml.org,2002:!int`. All four spellings name the same core tag.

pub(crate) const YAML_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// The YAML core schema tags understood by the mapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoreTag {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Seq,
    Map,
    Binary,
}

impl CoreTag {
    /// Suffix after the `tag:yaml.org,2002:` prefix.
    pub const fn suffix(self) -> &'static str {
        match self {
            CoreTag::Str => "str",
            CoreTag::Int => "int",
            CoreTag::Float => "float",
            CoreTag::Bool => "bool",
            CoreTag::Null => "null",
            CoreTag::Seq => "seq",
            CoreTag::Map => "map",
            CoreTag::Binary => "binary",
        }
    }

    /// Fully expanded tag URI.
    pub fn uri(self) -> String {
        format!("{YAML_TAG_PREFIX}{}", self.suffix())
    }

    /// Recognize any spelling of a core tag.
    pub fn parse(tag: &str) -> Option<CoreTag> {
        let suffix = if let Some(rest) = tag.strip_prefix(YAML_TAG_PREFIX) {
            rest.strip_prefix('!').unwrap_or(rest)
        } else if let Some(rest) = tag.strip_prefix("!!") {
            rest
        } else {
            tag.strip_prefix('!')?
        };
        Some(match suffix {
            "str" => CoreTag::Str,
            "int" => CoreTag::Int,
            "float" => CoreTag::Float,
            "bool" => CoreTag::Bool,
            "null" => CoreTag::Null,
            "seq" => CoreTag::Seq,
            "map" => CoreTag::Map,
            "binary" => CoreTag::Binary,
            _ => return None,
        })
    }
}

/// True for the non-specific tag `!`, which forces string interpretation of a scalar.
pub(crate) fn is_non_specific(tag: &str) -> bool {
    tag == "!"
}

/// True when a scalar with this tag may be read into a string.
pub(crate) fn can_parse_into_string(tag: Option<&str>) -> bool {
    match tag.and_then(CoreTag::parse) {
        None => true,
        Some(core) => matches!(core, CoreTag::Str),
    }
}

pub(crate) fn is_null_tag(tag: Option<&str>) -> bool {
    matches!(tag.and_then(CoreTag::parse), Some(CoreTag::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_spellings_resolve() {
        for spelling in [
            "!!int",
            "!int",
            "tag:yaml.org,2002:int",
            "tag:yaml.org,2002:!int",
        ] {
            assert_eq!(CoreTag::parse(spelling), Some(CoreTag::Int), "{spelling}");
        }
    }

    #[test]
    fn local_tags_are_not_core() {
        assert_eq!(CoreTag::parse("!circle"), None);
        assert_eq!(CoreTag::parse("tag:example.com,2024:int"), None);
        assert_eq!(CoreTag::parse("!"), None);
    }

    #[test]
    fn string_compatibility() {
        assert!(can_parse_into_string(None));
        assert!(can_parse_into_string(Some("!!str")));
        assert!(can_parse_into_string(Some("!custom")));
        assert!(!can_parse_into_string(Some("!!int")));
        assert!(is_null_tag(Some("tag:yaml.org,2002:null")));
    }
}
