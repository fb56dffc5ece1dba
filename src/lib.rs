//! Two-way mapping between YAML event streams and dynamically described object graphs.
//!
//! Types are described at runtime in a [`Schema`]. A [`Mapper`] built over the schema
//! reads events into [`Value`] graphs and writes graphs back out as events, preserving
//! shared and cyclic structure through anchors and aliases. Every stage is an ordered
//! chain of replaceable strategies, configured through [`MapperBuilder`].
//!
//! ```rust
//! use saphyr_mapper::{EnumDescriptor, Mapper, ObjectDescriptor, PropertyDescriptor, Schema, Type, Value};
//!
//! let mut schema = Schema::new();
//! schema.add_enum(EnumDescriptor::new("Color", &["Red", "Green"]));
//! schema.add_object(
//!     ObjectDescriptor::new("Pen")
//!         .property(PropertyDescriptor::new("Color", Type::enumeration("Color")))
//!         .property(PropertyDescriptor::new("Tags", Type::seq(Type::Str))),
//! )?;
//! let mapper = Mapper::new(schema)?;
//!
//! let pen = saphyr_mapper::from_str(&mapper, "Color: Green\nTags: [a, b]\n", &Type::object("Pen"))?;
//! assert_eq!(pen.field("Color"), Some(Value::enumeration("Color", "Green")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use anchors::{AnchorAssigner, AnchorRegistry, WriteAnchors};
pub use converter::{ConverterRegistry, Guid, GuidConverter, GuidParseError, TypeConverter, YamlConvertible};
pub use de::{NodeDeserializer, ReadContext};
pub use error::{BoxError, ConfigurationError, DecodeError, EncodeError};
pub use events::{Event, EventBuffer, EventSink, EventSource, EventSourceExt, ScalarStyle};
pub use factory::{DefaultObjectFactory, ObjectFactory};
pub use inspector::{PropertyOrder, TypeInspector};
pub use live_events::LiveEvents;
pub use location::{Location, Marker};
pub use mapper::{Mapper, MapperBuilder};
pub use naming::{NamingConvention, NamingStyle};
pub use options::MapperOptions;
pub use resolver::{TagMappings, TypeResolver};
pub use schema::{EnumDescriptor, ObjectDescriptor, PropertyDescriptor, Schema};
pub use ser::{EventEmitter, Node, ObjectGraphVisitor, WriteContext};
pub use tags::CoreTag;
pub use types::Type;
pub use value::{CustomValue, EnumValue, Mapping, Object, Value};
pub use writer::YamlWriter;

pub mod anchors;
pub mod converter;
pub mod de;
pub mod error;
pub mod events;
pub mod factory;
pub mod inspector;
mod live_events;
mod location;
mod macros;
mod mapper;
pub mod naming;
pub mod options;
pub mod parse_scalars;
pub mod resolver;
pub mod schema;
pub mod ser;
mod ser_quoting;
mod tags;
mod types;
pub mod value;
mod writer;
mod zmij_format;

/// Parse YAML text holding a single document as `ty`.
pub fn from_str(mapper: &Mapper, input: &str, ty: &Type) -> Result<Value, DecodeError> {
    mapper.from_str(input, ty)
}

/// Parse every document of YAML text as `ty`.
pub fn from_str_multi(mapper: &Mapper, input: &str, ty: &Type) -> Result<Vec<Value>, DecodeError> {
    mapper.from_str_multi(input, ty)
}

/// Render `value`, declared as `ty`, as YAML text.
pub fn to_string(mapper: &Mapper, value: &Value, ty: &Type) -> Result<String, EncodeError> {
    mapper.to_yaml_string(value, ty)
}
