//! Built-in object graph visitors.

use crate::error::EncodeError;
use crate::options::DefaultValuesHandling;
use crate::schema::PropertyDescriptor;
use crate::ser::emitter::{CollectionInfo, EmitterEvent, ScalarInfo};
use crate::ser::{Node, ObjectGraphVisitor, WriteContext};
use crate::value::Value;

/// Skips properties according to [`DefaultValuesHandling`].
#[derive(Debug, Default)]
pub struct DefaultValuesVisitor;

impl ObjectGraphVisitor for DefaultValuesVisitor {
    fn enter_property(
        &self,
        _property: &PropertyDescriptor,
        value: &Value,
        ctx: &mut WriteContext<'_>,
    ) -> Result<bool, EncodeError> {
        Ok(match ctx.options().default_values {
            DefaultValuesHandling::Preserve => true,
            DefaultValuesHandling::OmitNull => !value.is_null(),
            DefaultValuesHandling::OmitDefaults => !value.is_default(),
            DefaultValuesHandling::OmitEmptyCollections => {
                !(value.is_null() || value.is_empty_collection())
            }
        })
    }
}

/// Writes a property's description as a comment above its key.
#[derive(Debug, Default)]
pub struct CommentsVisitor;

impl ObjectGraphVisitor for CommentsVisitor {
    fn enter_property(
        &self,
        property: &PropertyDescriptor,
        _value: &Value,
        ctx: &mut WriteContext<'_>,
    ) -> Result<bool, EncodeError> {
        if ctx.options().emit_comments {
            if let Some(description) = &property.description {
                ctx.emit(EmitterEvent::Comment(description.to_string()))?;
            }
        }
        Ok(true)
    }
}

/// Replaces every repeated occurrence of an anchored node with an alias.
#[derive(Debug, Default)]
pub struct AnchorAssigningVisitor;

impl ObjectGraphVisitor for AnchorAssigningVisitor {
    fn enter(&self, node: &Node<'_>, ctx: &mut WriteContext<'_>) -> Result<bool, EncodeError> {
        if !ctx.anchors().is_emitted(node.value) {
            return Ok(true);
        }
        match ctx.anchors().name_for(node.value).map(str::to_owned) {
            Some(anchor) => {
                ctx.emit(EmitterEvent::Alias(anchor))?;
                Ok(false)
            }
            None => Ok(true),
        }
    }
}

/// Terminal visitor: turns the walk into node events for the emitter chain.
#[derive(Debug, Default)]
pub struct EmittingVisitor;

impl EmittingVisitor {
    fn start(node: &Node<'_>, ctx: &mut WriteContext<'_>) -> CollectionInfo {
        let anchor = ctx.anchors().name_for(node.value).map(str::to_owned);
        ctx.mark_emitted(node.value);
        CollectionInfo {
            value: node.value.clone(),
            ty: node.ty.clone(),
            anchor,
            tag: node.tag.clone(),
            flow: false,
        }
    }
}

impl ObjectGraphVisitor for EmittingVisitor {
    fn visit_scalar(&self, node: &Node<'_>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.emit(EmitterEvent::Scalar(ScalarInfo {
            value: node.value.clone(),
            ty: node.ty.clone(),
            anchor: None,
            tag: node.tag.clone(),
            text: None,
            style: node.style,
        }))
    }

    fn visit_sequence_start(&self, node: &Node<'_>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        let info = Self::start(node, ctx);
        ctx.emit(EmitterEvent::SequenceStart(info))
    }

    fn visit_sequence_end(&self, _node: &Node<'_>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.emit(EmitterEvent::SequenceEnd)
    }

    fn visit_mapping_start(&self, node: &Node<'_>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        let info = Self::start(node, ctx);
        ctx.emit(EmitterEvent::MappingStart(info))
    }

    fn visit_mapping_end(&self, _node: &Node<'_>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.emit(EmitterEvent::MappingEnd)
    }
}
