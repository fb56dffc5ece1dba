//! Error taxonomy for both mapping directions.
//!
//! - [`DecodeError`]: read path. Node-related variants carry the node's [`Location`].
//! - [`EncodeError`]: write path.
//! - [`ConfigurationError`]: detected while building a mapper or on first use of a
//!   type. Fatal, never retried.
use std::fmt;

use saphyr_parser::ScanError;

use crate::location::{Location, Marker};

/// Boxed foreign error preserved as the cause of a wrapped strategy failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors detected in the mapper configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// More than one registered type converter claims the same type.
    #[error("{count} type converters claim type `{ty}`; exactly one may claim a type")]
    AmbiguousConverter { ty: String, count: usize },
    /// A type is referenced but was never registered with the schema.
    #[error("type `{ty}` is not registered with the schema")]
    UnknownType { ty: String },
    /// Two properties of one type share the same member name.
    #[error("type `{ty}` declares property `{property}` more than once")]
    DuplicateProperty { ty: String, property: String },
    /// The same tag is mapped to two different types.
    #[error("tag `{tag}` is mapped to both `{first}` and `{second}`")]
    DuplicateTagMapping {
        tag: String,
        first: String,
        second: String,
    },
    /// Options that cannot work together or would produce invalid output.
    #[error("invalid mapper options: {0}")]
    InvalidOptions(String),
}

/// Error raised while mapping an event stream into a value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No node deserializer claimed the node.
    #[error("no node deserializer can produce type `{ty}`{}", location.suffix())]
    UnresolvableType { ty: String, location: Location },
    /// Alias references an anchor that has not been defined earlier in the document.
    #[error("alias references unknown anchor `{anchor}`{}", location.suffix())]
    AnchorNotFound { anchor: String, location: Location },
    /// Anchor defined twice in the same document.
    #[error("anchor `{anchor}` is already defined in this document{}", location.suffix())]
    DuplicateAnchor { anchor: String, location: Location },
    /// Mapping key does not match any property of the target type.
    #[error("property `{property}` not found on type `{ty}`{}", location.suffix())]
    PropertyNotFound {
        property: String,
        ty: String,
        location: Location,
    },
    /// Mapping key matches more than one property under case-insensitive matching.
    #[error(
        "property `{property}` is ambiguous on type `{ty}`: matches {}{}",
        candidates.join(", "),
        location.suffix()
    )]
    AmbiguousProperty {
        property: String,
        ty: String,
        candidates: Vec<String>,
        location: Location,
    },
    /// A required property was not present in the mapping.
    #[error("missing required property `{property}` of type `{ty}`{}", location.suffix())]
    MissingProperty {
        property: String,
        ty: String,
        location: Location,
    },
    /// Structural mismatch: another event kind was expected.
    #[error("unexpected {found}: expected {expected}{}", location.suffix())]
    Unexpected {
        expected: &'static str,
        found: &'static str,
        location: Location,
    },
    /// Unexpected end of the event stream.
    #[error("unexpected end of input{}", location.suffix())]
    Eof { location: Location },
    /// Scalar text cannot be read as the requested type.
    #[error("invalid value `{value}` for type `{ty}`{}", location.suffix())]
    InvalidScalar {
        value: String,
        ty: String,
        location: Location,
    },
    /// Produced value cannot be coerced into the requested type.
    #[error("cannot convert {found} into type `{expected}`{}", location.suffix())]
    TypeMismatch {
        expected: String,
        found: String,
        location: Location,
    },
    /// Tag is neither a core YAML tag nor mapped to a type.
    #[error("unknown tag `{tag}`{}", location.suffix())]
    UnknownTag { tag: String, location: Location },
    /// Same key appears twice in a mapping while duplicates are rejected.
    #[error("duplicate mapping key `{key}`{}", location.suffix())]
    DuplicateKey { key: String, location: Location },
    /// Nesting deeper than the configured limit.
    #[error("maximum nesting depth {limit} exceeded{}", location.suffix())]
    RecursionLimit { limit: usize, location: Location },
    /// The underlying parser failed.
    #[error("{msg}{}", location.suffix())]
    Scan { msg: String, location: Location },
    /// Free-form error with optional source location.
    #[error("{msg}{}", location.suffix())]
    Message { msg: String, location: Location },
    /// Foreign error raised inside a strategy, rewrapped with the node's position.
    #[error("{source}{}", location.suffix())]
    Strategy {
        #[source]
        source: BoxError,
        location: Location,
    },
    /// Configuration problem discovered on first use of a type.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl DecodeError {
    /// Construct a `Message` error with no known location.
    pub fn msg<S: Into<String>>(s: S) -> Self {
        DecodeError::Message {
            msg: s.into(),
            location: Location::UNKNOWN,
        }
    }

    /// Wrap a foreign error raised by a strategy or converter. The mapper attaches the
    /// node position when the error crosses the recursion boundary.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DecodeError::Strategy {
            source: Box::new(error),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn unexpected(expected: &'static str, found: &'static str) -> Self {
        DecodeError::Unexpected {
            expected,
            found,
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn eof() -> Self {
        DecodeError::Eof {
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn invalid_scalar(value: &str, ty: impl fmt::Display) -> Self {
        DecodeError::InvalidScalar {
            value: value.to_owned(),
            ty: ty.to_string(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn type_mismatch(expected: impl fmt::Display, found: impl Into<String>) -> Self {
        DecodeError::TypeMismatch {
            expected: expected.to_string(),
            found: found.into(),
            location: Location::UNKNOWN,
        }
    }

    /// Map a `saphyr_parser::ScanError` into our error type with location.
    pub(crate) fn from_scan_error(err: ScanError) -> Self {
        let mark = err.marker();
        let marker = Marker::new(mark.line(), mark.col() + 1, mark.index());
        DecodeError::Scan {
            msg: err.info().to_owned(),
            location: Location::at(marker),
        }
    }

    fn location_mut(&mut self) -> Option<&mut Location> {
        match self {
            DecodeError::UnresolvableType { location, .. }
            | DecodeError::AnchorNotFound { location, .. }
            | DecodeError::DuplicateAnchor { location, .. }
            | DecodeError::PropertyNotFound { location, .. }
            | DecodeError::AmbiguousProperty { location, .. }
            | DecodeError::MissingProperty { location, .. }
            | DecodeError::Unexpected { location, .. }
            | DecodeError::Eof { location }
            | DecodeError::InvalidScalar { location, .. }
            | DecodeError::TypeMismatch { location, .. }
            | DecodeError::UnknownTag { location, .. }
            | DecodeError::DuplicateKey { location, .. }
            | DecodeError::RecursionLimit { location, .. }
            | DecodeError::Scan { location, .. }
            | DecodeError::Message { location, .. }
            | DecodeError::Strategy { location, .. } => Some(location),
            DecodeError::Configuration(_) => None,
        }
    }

    /// Attach/override a concrete location to this error and return it.
    pub fn with_location(mut self, set_location: Location) -> Self {
        if let Some(location) = self.location_mut() {
            *location = set_location;
        }
        self
    }

    /// Attach `fallback` only when no location is known yet. Errors that already carry
    /// a position keep it, so each failure is positioned exactly once.
    pub fn or_location(mut self, fallback: Location) -> Self {
        if let Some(location) = self.location_mut() {
            *location = location.or(fallback);
        }
        self
    }

    /// If the error has a known location, return it.
    pub fn location(&self) -> Option<Location> {
        match self {
            DecodeError::UnresolvableType { location, .. }
            | DecodeError::AnchorNotFound { location, .. }
            | DecodeError::DuplicateAnchor { location, .. }
            | DecodeError::PropertyNotFound { location, .. }
            | DecodeError::AmbiguousProperty { location, .. }
            | DecodeError::MissingProperty { location, .. }
            | DecodeError::Unexpected { location, .. }
            | DecodeError::Eof { location }
            | DecodeError::InvalidScalar { location, .. }
            | DecodeError::TypeMismatch { location, .. }
            | DecodeError::UnknownTag { location, .. }
            | DecodeError::DuplicateKey { location, .. }
            | DecodeError::RecursionLimit { location, .. }
            | DecodeError::Scan { location, .. }
            | DecodeError::Message { location, .. }
            | DecodeError::Strategy { location, .. } => location.is_known().then_some(*location),
            DecodeError::Configuration(_) => None,
        }
    }
}

/// Error raised while mapping a value into an event stream.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Free-form error.
    #[error("{msg}")]
    Message { msg: String },
    /// Wrapper for formatting errors of a text sink.
    #[error("formatting error: {0}")]
    Format(#[from] fmt::Error),
    /// No traversal rule can emit this value.
    #[error("cannot serialize {value} as type `{ty}`")]
    Unsupported { value: String, ty: String },
    /// Reference cycle met while anchors are disabled.
    #[error("reference cycle through a value of type `{ty}`; enable anchors to serialize it")]
    Cycle { ty: String },
    /// Nesting deeper than the configured limit.
    #[error("maximum nesting depth {limit} exceeded")]
    RecursionLimit { limit: usize },
    /// The sink rejected an event sequence.
    #[error("invalid event sequence: {msg}")]
    Sink { msg: String },
    /// Configuration problem discovered on first use of a type.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Foreign error raised by a converter.
    #[error(transparent)]
    Strategy(BoxError),
}

impl EncodeError {
    pub fn msg<S: Into<String>>(s: S) -> Self {
        EncodeError::Message { msg: s.into() }
    }

    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        EncodeError::Strategy(Box::new(error))
    }

    pub(crate) fn sink(msg: impl Into<String>) -> Self {
        EncodeError::Sink { msg: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_location_keeps_first_position() {
        let first = Location::at(Marker::new(1, 2, 1));
        let second = Location::at(Marker::new(9, 9, 90));
        let err = DecodeError::msg("boom").or_location(first).or_location(second);
        assert_eq!(err.location(), Some(first));
        assert_eq!(err.to_string(), "boom at line 1, column 2");
    }

    #[test]
    fn ambiguous_property_lists_candidates() {
        let err = DecodeError::AmbiguousProperty {
            property: "id".into(),
            ty: "app.User".into(),
            candidates: vec!["Id".into(), "ID".into()],
            location: Location::UNKNOWN,
        };
        assert_eq!(
            err.to_string(),
            "property `id` is ambiguous on type `app.User`: matches Id, ID"
        );
    }

    #[test]
    fn strategy_error_preserves_cause() {
        use std::error::Error as _;
        let io = std::io::Error::other("disk on fire");
        let err = DecodeError::custom(io).or_location(Location::at(Marker::new(4, 1, 30)));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "disk on fire at line 4, column 1");
    }
}
