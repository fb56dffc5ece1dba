//! Read path: the recursive value mapper and the node deserializer chain.
//!
//! [`ReadContext::deserialize`] is the single recursion entry point. For every node it
//! peeks the next event, lets the type resolver chain correct the target type, asks
//! the node deserializers in order until one produces a value, registers the node's
//! anchor and finally coerces the raw value into the type the caller asked for.
//!
//! Anchors
//! - Containers register their anchor themselves (through
//!   [`ReadContext::register_placeholder`]) right after creating the empty instance, so
//!   children may alias their parent.
//! - Anything else is registered after construction.
//!
//! Errors
//! - Every error leaving a node gets that node's location unless it already has one.

use std::mem;

use log::trace;

use crate::anchors::AnchorRegistry;
use crate::error::DecodeError;
use crate::events::{Event, EventKind, EventSource, EventSourceExt};
use crate::location::Location;
use crate::mapper::Mapper;
use crate::options::MapperOptions;
use crate::parse_scalars::{parse_bool, parse_float, parse_int};
use crate::schema::Schema;
use crate::tags;
use crate::types::Type;
use crate::value::{EnumValue, Value};
use crate::zmij_format::float_string;

mod array;
mod collection;
mod convertible;
mod converter;
mod object;
mod scalar;

pub use array::ArrayNodeDeserializer;
pub use collection::{CollectionNodeDeserializer, MappingNodeDeserializer};
pub use convertible::ConvertibleNodeDeserializer;
pub use converter::TypeConverterNodeDeserializer;
pub use object::ObjectNodeDeserializer;
pub use scalar::{NullNodeDeserializer, ScalarNodeDeserializer};

/// One strategy of the node deserializer chain.
///
/// Return `Ok(None)` to decline; a strategy that declines must not have consumed
/// anything. Once a strategy consumes an event it has claimed the node and must either
/// produce the value or fail.
pub trait NodeDeserializer: Send + Sync {
    fn deserialize(&self, ctx: &mut ReadContext<'_>, ty: &Type) -> Result<Option<Value>, DecodeError>;
}

/// The default strategy chain, highest priority first.
pub(crate) fn default_deserializers() -> Vec<Box<dyn NodeDeserializer>> {
    vec![
        Box::new(TypeConverterNodeDeserializer),
        Box::new(ConvertibleNodeDeserializer),
        Box::new(NullNodeDeserializer),
        Box::new(ScalarNodeDeserializer),
        Box::new(ArrayNodeDeserializer),
        Box::new(CollectionNodeDeserializer),
        Box::new(MappingNodeDeserializer),
        Box::new(ObjectNodeDeserializer),
    ]
}

struct PendingAnchor {
    name: String,
    location: Location,
}

/// State of one document traversal: the event source, the anchor registry and the
/// recursion depth. Strategies receive it and recurse through [`ReadContext::deserialize`].
pub struct ReadContext<'a> {
    mapper: &'a Mapper,
    events: &'a mut dyn EventSource,
    anchors: AnchorRegistry,
    depth: usize,
    pending_anchor: Option<PendingAnchor>,
}

impl<'a> ReadContext<'a> {
    pub(crate) fn new(mapper: &'a Mapper, events: &'a mut dyn EventSource) -> Self {
        ReadContext {
            mapper,
            events,
            anchors: AnchorRegistry::new(),
            depth: 0,
            pending_anchor: None,
        }
    }

    pub fn mapper(&self) -> &'a Mapper {
        self.mapper
    }

    pub fn schema(&self) -> &'a Schema {
        &self.mapper.schema
    }

    pub fn options(&self) -> &'a MapperOptions {
        &self.mapper.options
    }

    pub fn events(&mut self) -> &mut (dyn EventSource + 'a) {
        &mut *self.events
    }

    pub fn anchors(&self) -> &AnchorRegistry {
        &self.anchors
    }

    pub fn peek(&mut self) -> Result<Option<&Event>, DecodeError> {
        self.events.peek()
    }

    /// Consume the next event, failing unless it is a `T`.
    pub fn consume<T: EventKind>(&mut self) -> Result<T, DecodeError> {
        self.events.consume::<T>()
    }

    pub fn try_consume<T: EventKind>(&mut self) -> Result<Option<T>, DecodeError> {
        self.events.try_consume::<T>()
    }

    pub fn accept<T: EventKind>(&mut self) -> Result<bool, DecodeError> {
        self.events.accept::<T>()
    }

    /// Discard the next node. Anchored nodes inside it are still read as `Any` and
    /// registered, so later aliases can reach them.
    pub fn skip_node(&mut self) -> Result<(), DecodeError> {
        let mut depth = 0usize;
        loop {
            if self.events.peek_required()?.anchor().is_some() {
                self.deserialize(&Type::Any)?;
            } else {
                let event = self
                    .events
                    .next()?
                    .ok_or_else(|| DecodeError::eof().with_location(self.events.last_location()))?;
                match event {
                    Event::SequenceStart(_) | Event::MappingStart(_) => depth += 1,
                    Event::SequenceEnd(_) | Event::MappingEnd(_) => {
                        depth = depth.checked_sub(1).ok_or_else(|| {
                            DecodeError::unexpected("node", event.kind_name()).with_location(event.location())
                        })?;
                    }
                    Event::DocumentStart(_) | Event::DocumentEnd(_) => {
                        return Err(DecodeError::unexpected("node", event.kind_name())
                            .with_location(event.location()));
                    }
                    Event::Comment(_) => continue,
                    Event::Scalar(_) | Event::Alias(_) => {}
                }
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Bind the anchor of the node being read to `value` now, before its children are
    /// read. Containers call this right after creating their empty instance.
    pub fn register_placeholder(&mut self, value: &Value) -> Result<(), DecodeError> {
        match self.pending_anchor.take() {
            Some(pending) => self
                .anchors
                .register(&pending.name, value)
                .map_err(|err| err.with_location(pending.location)),
            None => Ok(()),
        }
    }

    /// Read one node as `expected`. This is the recursion callback for nested values.
    pub fn deserialize(&mut self, expected: &Type) -> Result<Value, DecodeError> {
        let (location, alias) = match self.events.peek()? {
            Some(Event::Alias(alias)) => (alias.location, Some(alias.anchor.clone())),
            Some(event) => (event.location(), None),
            None => return Err(DecodeError::eof().with_location(self.events.last_location())),
        };

        if let Some(name) = alias {
            self.events.next()?;
            trace!("alias *{name} as `{expected}`");
            let value = self
                .anchors
                .resolve(&name)
                .map_err(|err| err.with_location(location))?;
            return self
                .coerce(value, expected)
                .and_then(|value| self.check_shared(&value, expected).map(|()| value))
                .map_err(|err| err.or_location(location));
        }

        let limit = self.mapper.options.max_depth;
        if self.depth >= limit {
            return Err(DecodeError::RecursionLimit { limit, location });
        }
        self.depth += 1;
        let result = self.deserialize_node(expected, location);
        self.depth -= 1;
        result.map_err(|err| err.or_location(location))
    }

    fn deserialize_node(&mut self, expected: &Type, location: Location) -> Result<Value, DecodeError> {
        let mapper = self.mapper;
        let mut ty = expected.clone();
        let (anchor, is_null) = {
            let event = self.events.peek_required()?;
            for resolver in &mapper.resolvers {
                if resolver.resolve(event, &mut ty, &mapper.schema)? {
                    break;
                }
            }
            let anchor = event.anchor().map(|name| PendingAnchor {
                name: name.to_owned(),
                location,
            });
            (anchor, is_null_event(event))
        };
        if ty != *expected {
            trace!("`{expected}` resolved to `{ty}`");
        }
        if let Type::Nullable(inner) = &ty {
            if !is_null {
                ty = (**inner).clone();
            }
        }

        let saved = mem::replace(&mut self.pending_anchor, anchor);
        let produced = self.run_chain(&ty);
        let leftover = mem::replace(&mut self.pending_anchor, saved);
        let value = produced?;

        if let Some(pending) = leftover {
            self.anchors
                .register(&pending.name, &value)
                .map_err(|err| err.with_location(pending.location))?;
        }
        self.coerce(value, expected)
    }

    fn run_chain(&mut self, ty: &Type) -> Result<Value, DecodeError> {
        let mapper = self.mapper;
        for (index, strategy) in mapper.deserializers.iter().enumerate() {
            if let Some(value) = strategy.deserialize(self, ty)? {
                trace!("`{ty}` produced by node deserializer #{index}");
                return Ok(value);
            }
        }
        Err(DecodeError::UnresolvableType {
            ty: ty.to_string(),
            location: Location::UNKNOWN,
        })
    }

    /// Coerce a produced value into the exact type the caller asked for.
    pub(crate) fn coerce(&self, value: Value, expected: &Type) -> Result<Value, DecodeError> {
        let strict = self.mapper.options.strict_booleans;
        let mismatch = |value: &Value| DecodeError::type_mismatch(expected, value.kind());
        match expected {
            Type::Any => Ok(value),
            Type::Nullable(inner) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    self.coerce(value, inner)
                }
            }
            Type::Bool => match value {
                Value::Bool(_) => Ok(value),
                Value::Str(ref s) => parse_bool(s, strict)
                    .map(Value::Bool)
                    .ok_or_else(|| DecodeError::invalid_scalar(s, expected)),
                other => Err(mismatch(&other)),
            },
            Type::Int => match value {
                Value::Int(_) => Ok(value),
                Value::Str(ref s) => parse_int(s)
                    .map(Value::Int)
                    .ok_or_else(|| DecodeError::invalid_scalar(s, expected)),
                other => Err(mismatch(&other)),
            },
            Type::Float => match value {
                Value::Float(_) => Ok(value),
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Str(ref s) => parse_float(s)
                    .map(Value::Float)
                    .ok_or_else(|| DecodeError::invalid_scalar(s, expected)),
                other => Err(mismatch(&other)),
            },
            Type::Str => match value {
                Value::Str(_) => Ok(value),
                Value::Bool(b) => Ok(Value::Str(b.to_string())),
                Value::Int(i) => Ok(Value::Str(i.to_string())),
                Value::Float(f) => Ok(Value::Str(float_string(f))),
                Value::Enum(e) => Ok(Value::Str(e.variant.to_string())),
                other => Err(mismatch(&other)),
            },
            Type::Bytes => match value {
                Value::Bytes(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            Type::Enum(name) => match value {
                Value::Enum(ref e) if e.ty == *name => Ok(value),
                Value::Str(ref s) => self.match_enum(name, s),
                other => Err(mismatch(&other)),
            },
            Type::Seq(_) => match value {
                Value::Seq(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            Type::Array(_) => match value {
                Value::Array(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            Type::Map(..) => match value {
                Value::Map(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            Type::Object(name) if self.schema().convertible(name).is_some() => Ok(value),
            Type::Object(_) => {
                let actual = value
                    .as_object()
                    .and_then(|o| o.try_borrow().ok().map(|o| o.ty.clone()));
                match actual {
                    Some(actual)
                        if self
                            .schema()
                            .is_assignable(&Type::Object(actual.clone()), expected) =>
                    {
                        Ok(value)
                    }
                    _ => Err(mismatch(&value)),
                }
            }
            Type::Custom(name) => match value {
                Value::Custom(ref c) if c.ty != *name => Err(mismatch(&value)),
                _ => Ok(value),
            },
        }
    }

    /// Check that an aliased value already has the shape `expected` describes, down to
    /// its elements. Aliased containers are shared, so nothing is converted here. The
    /// walk follows the type and never enters object members, so cycles end it.
    fn check_shared(&self, value: &Value, expected: &Type) -> Result<(), DecodeError> {
        let each = |items: &[Value], item: &Type| items.iter().try_for_each(|v| self.check_shared(v, item));
        match (expected, value) {
            (Type::Any, _) | (Type::Nullable(_), Value::Null) => Ok(()),
            (Type::Nullable(inner), _) => self.check_shared(value, inner),
            (Type::Bool, Value::Bool(_))
            | (Type::Int, Value::Int(_))
            | (Type::Float, Value::Float(_))
            | (Type::Str, Value::Str(_))
            | (Type::Bytes, Value::Bytes(_)) => Ok(()),
            (Type::Enum(name), Value::Enum(e)) if e.ty == *name => Ok(()),
            (Type::Seq(item), Value::Seq(items)) => match items.try_borrow() {
                Ok(items) => each(&items[..], &**item),
                // still being filled by an enclosing node; its own reads are typed
                Err(_) => Ok(()),
            },
            (Type::Array(item), Value::Array(items)) => each(&items[..], &**item),
            (Type::Map(key_ty, value_ty), Value::Map(entries)) => match entries.try_borrow() {
                Ok(entries) => entries.iter().try_for_each(|(key, entry)| {
                    self.check_shared(key, key_ty)?;
                    self.check_shared(entry, value_ty)
                }),
                Err(_) => Ok(()),
            },
            (Type::Object(_) | Type::Custom(_), _) => self.coerce(value.clone(), expected).map(drop),
            _ => Err(DecodeError::type_mismatch(expected, value.kind())),
        }
    }

    /// Match scalar text against the variants of enum `name`: the declared name, its
    /// naming-convention form, then either of those ignoring case.
    fn match_enum(&self, name: &std::sync::Arc<str>, text: &str) -> Result<Value, DecodeError> {
        let ty = Type::Enum(name.clone());
        let descriptor = self
            .schema()
            .enumeration(name)
            .ok_or_else(|| crate::error::ConfigurationError::UnknownType { ty: name.to_string() })?;
        let naming = &self.mapper.enum_naming;
        let found = |variant: &std::sync::Arc<str>| EnumValue {
            ty: descriptor.name.clone(),
            variant: variant.clone(),
        };

        if let Some(variant) = descriptor
            .variants
            .iter()
            .find(|v| &***v == text || naming.apply(v) == text)
        {
            return Ok(Value::Enum(found(variant)));
        }

        let folded = text.to_lowercase();
        let candidates: Vec<_> = descriptor
            .variants
            .iter()
            .filter(|v| v.to_lowercase() == folded || naming.apply(v).to_lowercase() == folded)
            .collect();
        match candidates.as_slice() {
            [only] => Ok(Value::Enum(found(only))),
            _ => Err(DecodeError::invalid_scalar(text, ty)),
        }
    }
}

/// Null scalar: plain empty/`~`/`null`, or tagged `!!null`.
pub(crate) fn is_null_event(event: &Event) -> bool {
    match event {
        Event::Scalar(scalar) => scalar.is_plain_null() || tags::is_null_tag(scalar.tag.as_deref()),
        _ => false,
    }
}
