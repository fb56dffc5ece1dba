//! Write path: the object graph walk and its visitor chain.
//!
//! [`WriteContext::serialize`] walks a value against its declared type. Every node is
//! offered to the visitor chain first (`enter`); any visitor may veto it. Custom type
//! converters and self-describing types take over their nodes entirely. Everything
//! else becomes scalar, sequence and mapping callbacks, which the terminal
//! [`EmittingVisitor`] turns into events for the [`emitter`] chain.
//!
//! Cycles
//! - With anchors assigned, a node seen again is written as an alias.
//! - Without anchors, re-entering a container that is still being written is
//!   `EncodeError::Cycle`.

use log::trace;

use crate::anchors::WriteAnchors;
use crate::error::EncodeError;
use crate::events::{EventSink, ScalarStyle};
use crate::mapper::Mapper;
use crate::options::MapperOptions;
use crate::schema::{PropertyDescriptor, Schema};
use crate::types::Type;
use crate::value::Value;

pub mod emitter;
mod visitors;

pub use emitter::{
    CollectionInfo, EmitterChain, EmitterEvent, EventEmitter, JsonCompatibleEventEmitter, ScalarInfo,
    TypeAssigningEventEmitter,
};
pub use visitors::{AnchorAssigningVisitor, CommentsVisitor, DefaultValuesVisitor, EmittingVisitor};

/// One position of the walk: the value, the type declared for the position, and the
/// presentation hints computed so far.
#[derive(Debug, Clone)]
pub struct Node<'v> {
    pub value: &'v Value,
    pub ty: &'v Type,
    /// Scalar style requested by the property, `Any` otherwise.
    pub style: ScalarStyle,
    /// Tag naming the runtime type when it differs from the declared one.
    pub tag: Option<String>,
}

impl<'v> Node<'v> {
    pub fn new(value: &'v Value, ty: &'v Type) -> Self {
        Node {
            value,
            ty,
            style: ScalarStyle::Any,
            tag: None,
        }
    }
}

/// One link of the object graph visitor chain. Every hook defaults to a no-op.
///
/// `enter*` hooks run in chain order and stop at the first `false`, which skips the
/// node (or the property, or the mapping entry) entirely. `visit_*` callbacks run on
/// every visitor.
pub trait ObjectGraphVisitor: Send + Sync {
    fn enter(&self, _node: &Node<'_>, _ctx: &mut WriteContext<'_>) -> Result<bool, EncodeError> {
        Ok(true)
    }

    fn enter_mapping_key(
        &self,
        _key: &Value,
        _value: &Value,
        _ctx: &mut WriteContext<'_>,
    ) -> Result<bool, EncodeError> {
        Ok(true)
    }

    fn enter_property(
        &self,
        _property: &PropertyDescriptor,
        _value: &Value,
        _ctx: &mut WriteContext<'_>,
    ) -> Result<bool, EncodeError> {
        Ok(true)
    }

    fn visit_scalar(&self, _node: &Node<'_>, _ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        Ok(())
    }

    fn visit_sequence_start(&self, _node: &Node<'_>, _ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        Ok(())
    }

    fn visit_sequence_end(&self, _node: &Node<'_>, _ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        Ok(())
    }

    fn visit_mapping_start(&self, _node: &Node<'_>, _ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        Ok(())
    }

    fn visit_mapping_end(&self, _node: &Node<'_>, _ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        Ok(())
    }
}

/// State of one document write: the sink, the anchors chosen by the pre-pass and the
/// containers currently open.
pub struct WriteContext<'a> {
    mapper: &'a Mapper,
    sink: &'a mut dyn EventSink,
    anchors: WriteAnchors,
    open: Vec<usize>,
    depth: usize,
}

impl<'a> WriteContext<'a> {
    pub(crate) fn new(mapper: &'a Mapper, sink: &'a mut dyn EventSink, anchors: WriteAnchors) -> Self {
        WriteContext {
            mapper,
            sink,
            anchors,
            open: Vec::new(),
            depth: 0,
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

    pub fn anchors(&self) -> &WriteAnchors {
        &self.anchors
    }

    pub(crate) fn mark_emitted(&mut self, value: &Value) {
        self.anchors.mark_emitted(value);
    }

    /// Send one event through the emitter chain.
    pub fn emit(&mut self, event: EmitterEvent) -> Result<(), EncodeError> {
        let mapper = self.mapper;
        EmitterChain::new(&mapper.emitters, &mut *self.sink).emit(event)
    }

    /// Emit a scalar with preset text. Meant for type converters.
    pub fn emit_scalar(&mut self, text: impl Into<String>, style: ScalarStyle) -> Result<(), EncodeError> {
        let text = text.into();
        self.emit(EmitterEvent::Scalar(ScalarInfo {
            value: Value::Str(text.clone()),
            ty: Type::Str,
            anchor: None,
            tag: None,
            text: Some(text),
            style,
        }))
    }

    /// Write `value` as a node of declared type `ty`. This is the recursion entry point
    /// for nested values.
    pub fn serialize(&mut self, value: &Value, ty: &Type) -> Result<(), EncodeError> {
        self.serialize_node(Node::new(value, ty))
    }

    fn serialize_node(&mut self, node: Node<'_>) -> Result<(), EncodeError> {
        let limit = self.mapper.options.max_depth;
        if self.depth >= limit {
            return Err(EncodeError::RecursionLimit { limit });
        }
        self.depth += 1;
        let result = self.write_node(node);
        self.depth -= 1;
        result
    }

    fn write_node(&mut self, mut node: Node<'_>) -> Result<(), EncodeError> {
        if !self.gate(|visitor, ctx| visitor.enter(&node, ctx))? {
            return Ok(());
        }
        let mapper = self.mapper;
        let value = node.value;
        if value.is_null() {
            return self.each(|visitor, ctx| visitor.visit_scalar(&node, ctx));
        }

        let declared = match (node.ty.non_null(), value) {
            (Type::Any, Value::Custom(custom)) => Type::Custom(custom.ty.clone()),
            (declared, _) => declared.clone(),
        };
        if let Some(converter) = mapper.converters.find(&declared)? {
            trace!("`{declared}` written by type converter");
            return converter.write(self, value, &declared);
        }
        if let Some(routine) = declared.schema_name().and_then(|name| mapper.schema.convertible(name)) {
            return routine.write(self, value);
        }

        match value {
            Value::Seq(items) => {
                let items = items.borrow().clone();
                let element = element_type(&declared);
                self.within(value, |ctx| {
                    ctx.each(|visitor, ctx| visitor.visit_sequence_start(&node, ctx))?;
                    for item in &items {
                        ctx.serialize(item, &element)?;
                    }
                    ctx.each(|visitor, ctx| visitor.visit_sequence_end(&node, ctx))
                })
            }
            Value::Array(items) => {
                let element = element_type(&declared);
                self.within(value, |ctx| {
                    ctx.each(|visitor, ctx| visitor.visit_sequence_start(&node, ctx))?;
                    for item in items.iter() {
                        ctx.serialize(item, &element)?;
                    }
                    ctx.each(|visitor, ctx| visitor.visit_sequence_end(&node, ctx))
                })
            }
            Value::Map(entries) => {
                let entries: Vec<(Value, Value)> =
                    entries.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let (key_ty, value_ty) = match &declared {
                    Type::Map(k, v) => ((**k).clone(), (**v).clone()),
                    _ => (Type::Any, Type::Any),
                };
                self.within(value, |ctx| {
                    ctx.each(|visitor, ctx| visitor.visit_mapping_start(&node, ctx))?;
                    for (k, v) in &entries {
                        if !ctx.gate(|visitor, ctx| visitor.enter_mapping_key(k, v, ctx))? {
                            continue;
                        }
                        ctx.serialize(k, &key_ty)?;
                        ctx.serialize(v, &value_ty)?;
                    }
                    ctx.each(|visitor, ctx| visitor.visit_mapping_end(&node, ctx))
                })
            }
            Value::Object(object) => {
                let actual = object.borrow().ty.clone();
                let runtime = Type::Object(actual.clone());
                if declared != runtime {
                    node.tag = Some(match mapper.tags.tag_for(&runtime) {
                        Some(tag) => tag.to_owned(),
                        None => format!("!{actual}"),
                    });
                }
                let properties = mapper.inspector.properties(&actual)?;
                self.within(value, |ctx| {
                    ctx.each(|visitor, ctx| visitor.visit_mapping_start(&node, ctx))?;
                    for property in properties.iter().filter(|p| p.can_read) {
                        let field = object.borrow().get(&property.member).cloned().unwrap_or(Value::Null);
                        if !ctx.gate(|visitor, ctx| visitor.enter_property(property, &field, ctx))? {
                            continue;
                        }
                        ctx.serialize(&Value::Str(property.name.to_string()), &Type::Str)?;
                        ctx.serialize_node(Node {
                            value: &field,
                            ty: &property.ty,
                            style: property.style.unwrap_or_default(),
                            tag: None,
                        })?;
                    }
                    ctx.each(|visitor, ctx| visitor.visit_mapping_end(&node, ctx))
                })
            }
            Value::Custom(custom) => Err(EncodeError::Unsupported {
                value: format!("`{}`", custom.ty),
                ty: node.ty.to_string(),
            }),
            _ => self.each(|visitor, ctx| visitor.visit_scalar(&node, ctx)),
        }
    }

    /// Run `write` with `value` marked as open, failing if it already is.
    fn within<F>(&mut self, value: &Value, write: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Self) -> Result<(), EncodeError>,
    {
        let Some(id) = value.identity() else {
            return write(self);
        };
        if self.open.contains(&id) {
            return Err(EncodeError::Cycle { ty: value.kind() });
        }
        self.open.push(id);
        let result = write(self);
        self.open.pop();
        result
    }

    fn gate<F>(&mut self, mut hook: F) -> Result<bool, EncodeError>
    where
        F: FnMut(&dyn ObjectGraphVisitor, &mut Self) -> Result<bool, EncodeError>,
    {
        let mapper = self.mapper;
        for visitor in &mapper.visitors {
            if !hook(&**visitor, self)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn each<F>(&mut self, mut callback: F) -> Result<(), EncodeError>
    where
        F: FnMut(&dyn ObjectGraphVisitor, &mut Self) -> Result<(), EncodeError>,
    {
        let mapper = self.mapper;
        for visitor in &mapper.visitors {
            callback(&**visitor, self)?;
        }
        Ok(())
    }
}

fn element_type(declared: &Type) -> Type {
    match declared {
        Type::Seq(element) | Type::Array(element) => (**element).clone(),
        _ => Type::Any,
    }
}

/// Children of `value` in the order the walk emits them, for the anchor pre-pass.
pub(crate) fn expand_children(mapper: &Mapper, value: &Value, out: &mut Vec<Value>) -> Result<(), EncodeError> {
    match value {
        Value::Seq(items) => out.extend(items.borrow().iter().cloned()),
        Value::Array(items) => out.extend(items.iter().cloned()),
        Value::Map(entries) => {
            for (k, v) in entries.borrow().iter() {
                out.push(k.clone());
                out.push(v.clone());
            }
        }
        Value::Object(object) => {
            let object = object.borrow();
            let properties = mapper.inspector.properties(&object.ty)?;
            for property in properties.iter().filter(|p| p.can_read) {
                if let Some(field) = object.get(&property.member) {
                    out.push(field.clone());
                }
            }
        }
        _ => {}
    }
    Ok(())
}
