//! Type resolver chain.
//!
//! Each resolver looks at the next (peeked) event and may rewrite the target type in
//! place. The first resolver that reports a match stops the chain.

use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{ConfigurationError, DecodeError};
use crate::events::Event;
use crate::schema::Schema;
use crate::tags::{self, CoreTag};
use crate::types::Type;

pub trait TypeResolver: Send + Sync {
    /// Rewrite `current` from hints on `event`. `Ok(true)` stops the chain.
    fn resolve(&self, event: &Event, current: &mut Type, schema: &Schema) -> Result<bool, DecodeError>;
}

/// Two-way mapping between local tags and types.
#[derive(Clone, Debug, Default)]
pub struct TagMappings {
    by_tag: AHashMap<String, Type>,
    by_type: AHashMap<Type, String>,
}

impl TagMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: &str, ty: Type) -> Result<(), ConfigurationError> {
        if let Some(existing) = self.by_tag.get(tag) {
            if *existing != ty {
                return Err(ConfigurationError::DuplicateTagMapping {
                    tag: tag.to_owned(),
                    first: existing.to_string(),
                    second: ty.to_string(),
                });
            }
        }
        self.by_tag.insert(tag.to_owned(), ty.clone());
        self.by_type.entry(ty).or_insert_with(|| tag.to_owned());
        Ok(())
    }

    pub fn type_for(&self, tag: &str) -> Option<&Type> {
        self.by_tag.get(tag)
    }

    pub fn tag_for(&self, ty: &Type) -> Option<&str> {
        self.by_type.get(ty).map(String::as_str)
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.by_tag.values()
    }

    /// Type named by `tag`: an explicit mapping, or `!Name` for a registered object type.
    pub(crate) fn lookup(&self, tag: &str, schema: &Schema) -> Option<Type> {
        if let Some(ty) = self.by_tag.get(tag) {
            return Some(ty.clone());
        }
        let name = tag.strip_prefix('!')?;
        if name.starts_with('!') {
            return None;
        }
        schema.object(name).map(|d| Type::Object(d.name.clone()))
    }
}

/// Routes types with a self-describing registration to the convertible strategy.
#[derive(Debug, Default)]
pub struct ConvertibleTypeResolver;

impl TypeResolver for ConvertibleTypeResolver {
    fn resolve(&self, _event: &Event, current: &mut Type, schema: &Schema) -> Result<bool, DecodeError> {
        let Some(name) = current.schema_name().map(Arc::<str>::from) else {
            return Ok(false);
        };
        if schema.convertible(&name).is_none() {
            return Ok(false);
        }
        if !matches!(current.non_null(), Type::Custom(_)) {
            let custom = Type::Custom(name);
            *current = match current {
                Type::Nullable(_) => Type::nullable(custom),
                _ => custom,
            };
        }
        Ok(true)
    }
}

/// Resolves core tags on untyped targets and user tags anywhere.
#[derive(Debug)]
pub struct TagTypeResolver {
    mappings: Arc<TagMappings>,
}

impl TagTypeResolver {
    pub fn new(mappings: Arc<TagMappings>) -> Self {
        TagTypeResolver { mappings }
    }
}

impl TypeResolver for TagTypeResolver {
    fn resolve(&self, event: &Event, current: &mut Type, schema: &Schema) -> Result<bool, DecodeError> {
        let Some(tag) = event.tag() else {
            return Ok(false);
        };

        if let Some(mapped) = self.mappings.lookup(tag, schema) {
            if !schema.is_assignable(&mapped, current) {
                return Err(DecodeError::type_mismatch(&*current, format!("tag `{tag}` ({mapped})")));
            }
            *current = mapped;
            return Ok(true);
        }

        // core tags only narrow untyped targets; typed targets parse by their own rules
        if !matches!(current.non_null(), Type::Any) {
            return Ok(false);
        }
        if tags::is_non_specific(tag) && matches!(event, Event::Scalar(_)) {
            *current = Type::Str;
            return Ok(true);
        }
        let narrowed = match CoreTag::parse(tag) {
            Some(CoreTag::Str) => Type::Str,
            Some(CoreTag::Int) => Type::Int,
            Some(CoreTag::Float) => Type::Float,
            Some(CoreTag::Bool) => Type::Bool,
            Some(CoreTag::Binary) => Type::Bytes,
            Some(CoreTag::Seq) => Type::seq(Type::Any),
            Some(CoreTag::Map) => Type::map(Type::Any, Type::Any),
            Some(CoreTag::Null) | None => return Ok(false),
        };
        *current = narrowed;
        Ok(true)
    }
}

/// Fails on tags that are neither core tags nor known to the mapper.
#[derive(Debug, Default)]
pub struct PreventUnknownTagsResolver;

impl TypeResolver for PreventUnknownTagsResolver {
    fn resolve(&self, event: &Event, _current: &mut Type, _schema: &Schema) -> Result<bool, DecodeError> {
        match event.tag() {
            Some(tag) if CoreTag::parse(tag).is_none() && !tags::is_non_specific(tag) => {
                Err(DecodeError::UnknownTag {
                    tag: tag.to_owned(),
                    location: event.location(),
                })
            }
            _ => Ok(false),
        }
    }
}

/// Untyped collections become `seq<any>` and `map<any, any>`.
#[derive(Debug, Default)]
pub struct DefaultContainersTypeResolver;

impl TypeResolver for DefaultContainersTypeResolver {
    fn resolve(&self, event: &Event, current: &mut Type, _schema: &Schema) -> Result<bool, DecodeError> {
        if !matches!(current.non_null(), Type::Any) {
            return Ok(false);
        }
        match event {
            Event::SequenceStart(_) => *current = Type::seq(Type::Any),
            Event::MappingStart(_) => *current = Type::map(Type::Any, Type::Any),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MappingStart, Scalar};
    use crate::schema::ObjectDescriptor;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_object(ObjectDescriptor::new("Shape")).unwrap();
        schema.add_object(ObjectDescriptor::new("Circle").extends("Shape")).unwrap();
        schema.add_object(ObjectDescriptor::new("Label")).unwrap();
        schema
    }

    fn tag_resolver() -> TagTypeResolver {
        let mut mappings = TagMappings::new();
        mappings.insert("!circle", Type::object("Circle")).unwrap();
        TagTypeResolver::new(Arc::new(mappings))
    }

    #[test]
    fn user_tag_narrows_to_subtype() {
        let event: Event = MappingStart::new().with_tag("!circle").into();
        let mut ty = Type::object("Shape");
        assert!(tag_resolver().resolve(&event, &mut ty, &schema()).unwrap());
        assert_eq!(ty, Type::object("Circle"));
    }

    #[test]
    fn user_tag_must_fit_expected_type() {
        let event: Event = MappingStart::new().with_tag("!Label").into();
        let mut ty = Type::object("Shape");
        let err = tag_resolver().resolve(&event, &mut ty, &schema()).unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn core_tags_only_narrow_any() {
        let event: Event = Scalar::new("12").with_tag("tag:yaml.org,2002:str").into();
        let mut any = Type::Any;
        assert!(tag_resolver().resolve(&event, &mut any, &schema()).unwrap());
        assert_eq!(any, Type::Str);

        let mut int = Type::Int;
        assert!(!tag_resolver().resolve(&event, &mut int, &schema()).unwrap());
        assert_eq!(int, Type::Int);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let event: Event = Scalar::new("x").with_tag("!mystery").into();
        let mut ty = Type::Any;
        assert!(PreventUnknownTagsResolver.resolve(&event, &mut ty, &schema()).is_err());
        let core: Event = Scalar::new("1").with_tag("!!int").into();
        assert!(!PreventUnknownTagsResolver.resolve(&core, &mut ty, &schema()).unwrap());
    }

    #[test]
    fn duplicate_tag_mapping_is_a_configuration_error() {
        let mut mappings = TagMappings::new();
        mappings.insert("!c", Type::object("Circle")).unwrap();
        assert!(mappings.insert("!c", Type::object("Circle")).is_ok());
        assert!(matches!(
            mappings.insert("!c", Type::object("Label")),
            Err(ConfigurationError::DuplicateTagMapping { .. })
        ));
    }
}
