//! The top-level mapper and its builder.
//!
//! A [`Mapper`] is configured once through [`MapperBuilder`] and is immutable
//! afterwards. It holds no per-document state, so one instance can serve concurrent
//! documents from several threads; every call creates its own anchor registry.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::anchors::{AnchorAssigner, WriteAnchors};
use crate::converter::{ConverterRegistry, TypeConverter};
use crate::de::{NodeDeserializer, ReadContext, default_deserializers};
use crate::error::{ConfigurationError, DecodeError, EncodeError};
use crate::events::{DocumentEnd, DocumentStart, Event, EventSink, EventSource};
use crate::factory::{DefaultObjectFactory, ObjectFactory};
use crate::inspector::{
    CachedTypeInspector, NamingConventionTypeInspector, OrderedTypeInspector, SchemaTypeInspector,
    TypeInspector,
};
use crate::live_events::LiveEvents;
use crate::naming::NamingConvention;
use crate::options::MapperOptions;
use crate::resolver::{
    ConvertibleTypeResolver, DefaultContainersTypeResolver, PreventUnknownTagsResolver, TagMappings,
    TagTypeResolver, TypeResolver,
};
use crate::schema::Schema;
use crate::ser::{
    AnchorAssigningVisitor, CommentsVisitor, DefaultValuesVisitor, EmittingVisitor, EventEmitter,
    JsonCompatibleEventEmitter, ObjectGraphVisitor, TypeAssigningEventEmitter, WriteContext,
    expand_children,
};
use crate::types::Type;
use crate::value::Value;
use crate::writer::YamlWriter;

/// Two-way mapper between event streams and [`Value`] graphs.
///
/// ```rust
/// use saphyr_mapper::{Mapper, ObjectDescriptor, PropertyDescriptor, Schema, Type};
///
/// let mut schema = Schema::new();
/// schema.add_object(
///     ObjectDescriptor::new("Point")
///         .property(PropertyDescriptor::new("x", Type::Int))
///         .property(PropertyDescriptor::new("y", Type::Int)),
/// )?;
/// let mapper = Mapper::new(schema)?;
///
/// let point = mapper.from_str("x: 1\ny: 2\n", &Type::object("Point"))?;
/// assert_eq!(point.field("y"), Some(saphyr_mapper::Value::Int(2)));
/// assert_eq!(mapper.to_yaml_string(&point, &Type::object("Point"))?, "x: 1\ny: 2\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Mapper {
    pub(crate) schema: Arc<Schema>,
    pub(crate) options: MapperOptions,
    pub(crate) tags: Arc<TagMappings>,
    pub(crate) converters: ConverterRegistry,
    pub(crate) resolvers: Vec<Box<dyn TypeResolver>>,
    pub(crate) deserializers: Vec<Box<dyn NodeDeserializer>>,
    pub(crate) inspector: Box<dyn TypeInspector>,
    pub(crate) factory: Box<dyn ObjectFactory>,
    pub(crate) enum_naming: Arc<dyn NamingConvention>,
    pub(crate) visitors: Vec<Arc<dyn ObjectGraphVisitor>>,
    pub(crate) emitters: Vec<Arc<dyn EventEmitter>>,
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("schema", &self.schema)
            .field("options", &self.options)
            .field("converters", &self.converters)
            .field("resolvers", &self.resolvers.len())
            .field("deserializers", &self.deserializers.len())
            .field("visitors", &self.visitors.len())
            .field("emitters", &self.emitters.len())
            .finish()
    }
}

impl Mapper {
    pub fn builder(schema: Schema) -> MapperBuilder {
        MapperBuilder::new(schema)
    }

    /// Mapper with default options and strategies.
    pub fn new(schema: Schema) -> Result<Mapper, ConfigurationError> {
        MapperBuilder::new(schema).build()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    pub fn tag_mappings(&self) -> &TagMappings {
        &self.tags
    }

    /// Read one document from `events` as `ty`.
    ///
    /// Document markers are optional; an empty document reads as null. Events after the
    /// document (for example the next document) are left in the source.
    pub fn deserialize(&self, events: &mut dyn EventSource, ty: &Type) -> Result<Value, DecodeError> {
        debug!("deserialize document as `{ty}`");
        let mut ctx = ReadContext::new(self, events);
        ctx.try_consume::<DocumentStart>()?;
        let empty = matches!(ctx.peek()?, None | Some(Event::DocumentEnd(_)));
        let value = if empty {
            ctx.coerce(Value::Null, ty)?
        } else {
            ctx.deserialize(ty)?
        };
        ctx.try_consume::<DocumentEnd>()?;
        debug!("document done, {} anchors", ctx.anchors().len());
        Ok(value)
    }

    /// Read every document of the stream, each with a fresh anchor registry.
    pub fn deserialize_all(&self, events: &mut dyn EventSource, ty: &Type) -> Result<Vec<Value>, DecodeError> {
        let mut documents = Vec::new();
        while events.peek()?.is_some() {
            documents.push(self.deserialize(&mut *events, ty)?);
        }
        Ok(documents)
    }

    /// Write `value` as one document of declared type `ty`.
    ///
    /// With `assign_anchors`, every container reachable from more than one position is
    /// anchored at its first occurrence and aliased afterwards. Without it, shared
    /// containers are written out in full and cycles fail with `EncodeError::Cycle`.
    pub fn serialize(
        &self,
        sink: &mut dyn EventSink,
        value: &Value,
        ty: &Type,
        assign_anchors: bool,
    ) -> Result<(), EncodeError> {
        debug!("serialize `{ty}` (anchors: {assign_anchors})");
        let anchors = if assign_anchors {
            AnchorAssigner::new(self.options.anchor_generator)
                .assign(value, |v, out| expand_children(self, v, out))?
        } else {
            WriteAnchors::default()
        };
        sink.emit(DocumentStart { implicit: true, ..DocumentStart::default() }.into())?;
        WriteContext::new(self, &mut *sink, anchors).serialize(value, ty)?;
        sink.emit(DocumentEnd { implicit: true, ..DocumentEnd::default() }.into())?;
        debug!("serialize done");
        Ok(())
    }

    /// Write each value as its own document.
    pub fn serialize_all(
        &self,
        sink: &mut dyn EventSink,
        values: &[Value],
        ty: &Type,
        assign_anchors: bool,
    ) -> Result<(), EncodeError> {
        values
            .iter()
            .try_for_each(|value| self.serialize(&mut *sink, value, ty, assign_anchors))
    }

    /// Parse YAML text holding a single document.
    pub fn from_str(&self, input: &str, ty: &Type) -> Result<Value, DecodeError> {
        let mut events = LiveEvents::new(input);
        let value = self.deserialize(&mut events, ty)?;
        match events.peek()? {
            None => Ok(value),
            Some(event) => Err(DecodeError::msg(
                "input holds more than one document; use `from_str_multi`",
            )
            .with_location(event.location())),
        }
    }

    /// Parse every document of YAML text.
    pub fn from_str_multi(&self, input: &str, ty: &Type) -> Result<Vec<Value>, DecodeError> {
        self.deserialize_all(&mut LiveEvents::new(input), ty)
    }

    /// Render `value` as block-style YAML text, anchoring shared nodes.
    pub fn to_yaml_string(&self, value: &Value, ty: &Type) -> Result<String, EncodeError> {
        let mut writer = YamlWriter::new();
        self.serialize(&mut writer, value, ty, true)?;
        writer.into_string()
    }

    /// Render each value as its own document, separated by `---`.
    pub fn to_yaml_string_multi(&self, values: &[Value], ty: &Type) -> Result<String, EncodeError> {
        let mut writer = YamlWriter::new();
        self.serialize_all(&mut writer, values, ty, true)?;
        writer.into_string()
    }
}

/// Collects strategies and options for a [`Mapper`].
///
/// Custom node deserializers and type resolvers run before the built-in ones. Custom
/// visitors run after the default-value filter and before comments and anchors. Custom
/// emitter links run after scalar text has been assigned.
pub struct MapperBuilder {
    schema: Schema,
    options: MapperOptions,
    tag_mappings: Vec<(String, Type)>,
    converters: Vec<Arc<dyn TypeConverter>>,
    naming: Option<Arc<dyn NamingConvention>>,
    enum_naming: Option<Arc<dyn NamingConvention>>,
    factory: Option<Box<dyn ObjectFactory>>,
    deserializers: Vec<Box<dyn NodeDeserializer>>,
    resolvers: Vec<Box<dyn TypeResolver>>,
    visitors: Vec<Arc<dyn ObjectGraphVisitor>>,
    emitters: Vec<Arc<dyn EventEmitter>>,
}

impl MapperBuilder {
    pub fn new(schema: Schema) -> Self {
        MapperBuilder {
            schema,
            options: MapperOptions::default(),
            tag_mappings: Vec::new(),
            converters: Vec::new(),
            naming: None,
            enum_naming: None,
            factory: None,
            deserializers: Vec::new(),
            resolvers: Vec::new(),
            visitors: Vec::new(),
            emitters: Vec::new(),
        }
    }

    pub fn options(mut self, options: MapperOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_converter(mut self, converter: impl TypeConverter + 'static) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    /// Map local tag `tag` to `ty` in both directions.
    pub fn with_tag_mapping(mut self, tag: &str, ty: Type) -> Self {
        self.tag_mappings.push((tag.to_owned(), ty));
        self
    }

    /// Property naming convention, overriding `options.naming`.
    pub fn with_naming_convention(mut self, convention: impl NamingConvention + 'static) -> Self {
        self.naming = Some(Arc::new(convention));
        self
    }

    /// Enum variant naming convention, overriding `options.enum_naming`.
    pub fn with_enum_naming_convention(mut self, convention: impl NamingConvention + 'static) -> Self {
        self.enum_naming = Some(Arc::new(convention));
        self
    }

    pub fn with_object_factory(mut self, factory: impl ObjectFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn with_node_deserializer(mut self, deserializer: impl NodeDeserializer + 'static) -> Self {
        self.deserializers.push(Box::new(deserializer));
        self
    }

    pub fn with_type_resolver(mut self, resolver: impl TypeResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn with_visitor(mut self, visitor: impl ObjectGraphVisitor + 'static) -> Self {
        self.visitors.push(Arc::new(visitor));
        self
    }

    pub fn with_emitter(mut self, emitter: impl EventEmitter + 'static) -> Self {
        self.emitters.push(Arc::new(emitter));
        self
    }

    /// Validate the configuration and assemble the chains.
    pub fn build(self) -> Result<Mapper, ConfigurationError> {
        let options = self.options;
        if options.max_depth == 0 {
            return Err(ConfigurationError::InvalidOptions("max_depth must be at least 1".into()));
        }
        if options.json_compatible && options.emit_comments {
            return Err(ConfigurationError::InvalidOptions(
                "json_compatible output cannot carry comments".into(),
            ));
        }
        self.schema.validate()?;

        let mut tags = TagMappings::new();
        for (tag, ty) in self.tag_mappings {
            self.schema.check_type(&ty)?;
            tags.insert(&tag, ty)?;
        }
        let tags = Arc::new(tags);
        let schema = Arc::new(self.schema);

        let converters = ConverterRegistry::new(self.converters);
        for ty in referenced_types(&schema, &tags) {
            converters.find(&ty)?;
        }

        let naming: Arc<dyn NamingConvention> = match self.naming {
            Some(naming) => naming,
            None => Arc::new(options.naming),
        };
        let enum_naming: Arc<dyn NamingConvention> = match self.enum_naming {
            Some(naming) => naming,
            None => Arc::new(options.enum_naming),
        };
        let factory: Box<dyn ObjectFactory> = match self.factory {
            Some(factory) => factory,
            None => Box::new(DefaultObjectFactory::new()),
        };
        let inspector = CachedTypeInspector::new(Box::new(OrderedTypeInspector::new(
            Box::new(NamingConventionTypeInspector::new(
                Box::new(SchemaTypeInspector::new(schema.clone())),
                naming,
            )),
            options.property_order,
        )));

        let mut resolvers = self.resolvers;
        resolvers.push(Box::new(ConvertibleTypeResolver));
        resolvers.push(Box::new(TagTypeResolver::new(tags.clone())));
        if options.reject_unknown_tags {
            resolvers.push(Box::new(PreventUnknownTagsResolver));
        }
        resolvers.push(Box::new(DefaultContainersTypeResolver));

        let mut deserializers = self.deserializers;
        deserializers.extend(default_deserializers());

        let mut visitors: Vec<Arc<dyn ObjectGraphVisitor>> = vec![Arc::new(DefaultValuesVisitor)];
        visitors.extend(self.visitors);
        visitors.push(Arc::new(CommentsVisitor));
        visitors.push(Arc::new(AnchorAssigningVisitor));
        visitors.push(Arc::new(EmittingVisitor));

        let mut emitters: Vec<Arc<dyn EventEmitter>> =
            vec![Arc::new(TypeAssigningEventEmitter::new(enum_naming.clone()))];
        emitters.extend(self.emitters);
        if options.json_compatible {
            emitters.push(Arc::new(JsonCompatibleEventEmitter));
        }

        debug!(
            "mapper built: {} resolvers, {} node deserializers, {} converters",
            resolvers.len(),
            deserializers.len(),
            converters.len()
        );
        Ok(Mapper {
            schema,
            options,
            tags,
            converters,
            resolvers,
            deserializers,
            inspector: Box::new(inspector),
            factory,
            enum_naming,
            visitors,
            emitters,
        })
    }
}

/// Every type a property or tag mapping can make the mapper look up, nested element
/// types included.
fn referenced_types(schema: &Schema, tags: &TagMappings) -> Vec<Type> {
    fn walk(ty: &Type, out: &mut Vec<Type>) {
        if !out.contains(ty) {
            out.push(ty.clone());
        }
        match ty {
            Type::Nullable(inner) | Type::Seq(inner) | Type::Array(inner) => walk(inner, out),
            Type::Map(key, value) => {
                walk(key, out);
                walk(value, out);
            }
            _ => {}
        }
    }

    let mut out = Vec::new();
    for descriptor in schema.objects() {
        for property in &descriptor.properties {
            walk(&property.ty, &mut out);
        }
    }
    for ty in tags.types() {
        walk(ty, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Guid, GuidConverter};
    use crate::de::ReadContext;
    use crate::schema::{ObjectDescriptor, PropertyDescriptor};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn mapper_is_shareable() {
        assert_send_sync::<Mapper>();
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = crate::mapper_options! { max_depth: 0 };
        assert!(matches!(
            Mapper::builder(Schema::new()).options(options).build(),
            Err(ConfigurationError::InvalidOptions(_))
        ));

        let options = crate::mapper_options! { json_compatible: true, emit_comments: true };
        assert!(Mapper::builder(Schema::new()).options(options).build().is_err());
    }

    struct AlsoGuid;

    impl TypeConverter for AlsoGuid {
        fn accepts(&self, ty: &Type) -> bool {
            *ty == Guid::ty()
        }

        fn read(&self, ctx: &mut ReadContext<'_>, _ty: &Type) -> Result<Value, DecodeError> {
            ctx.skip_node()?;
            Ok(Value::Null)
        }

        fn write(&self, _ctx: &mut WriteContext<'_>, _value: &Value, _ty: &Type) -> Result<(), EncodeError> {
            Ok(())
        }
    }

    #[test]
    fn converter_ambiguity_is_found_at_build_time() {
        let mut schema = Schema::new();
        schema
            .add_object(ObjectDescriptor::new("Record").property(PropertyDescriptor::new("Id", Guid::ty())))
            .unwrap();
        let err = Mapper::builder(schema)
            .with_converter(GuidConverter)
            .with_converter(AlsoGuid)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::AmbiguousConverter {
                ty: "Guid".into(),
                count: 2
            }
        );
    }

    #[test]
    fn tag_mappings_must_name_known_types() {
        let err = Mapper::builder(Schema::new())
            .with_tag_mapping("!ghost", Type::object("Ghost"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownType { .. }));
    }
}
