//! Event emitter chain.
//!
//! Every node event passes through the configured links in order before it reaches the
//! sink. A link may rewrite the event, emit additional events ahead of it, or swallow
//! it. Calling `next.emit` more than once per received event is not allowed.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

use crate::error::EncodeError;
use crate::events::{
    Alias, Comment, Event, EventSink, MappingEnd, MappingStart, Scalar, ScalarStyle, SequenceEnd,
    SequenceStart,
};
use crate::naming::NamingConvention;
use crate::ser_quoting::resolve_style;
use crate::tags::CoreTag;
use crate::types::Type;
use crate::value::Value;
use crate::zmij_format::float_string;

/// Scalar about to be written: the source value plus what the links decided so far.
#[derive(Debug, Clone)]
pub struct ScalarInfo {
    pub value: Value,
    /// Declared type of the position the value is written at.
    pub ty: Type,
    pub anchor: Option<String>,
    pub tag: Option<String>,
    /// Rendered text, filled in by the type-assigning link unless preset.
    pub text: Option<String>,
    pub style: ScalarStyle,
}

/// Opening of a sequence or mapping.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub value: Value,
    pub ty: Type,
    pub anchor: Option<String>,
    pub tag: Option<String>,
    pub flow: bool,
}

/// Fully described node event travelling through the emitter chain.
#[derive(Debug)]
pub enum EmitterEvent {
    Scalar(ScalarInfo),
    SequenceStart(CollectionInfo),
    SequenceEnd,
    MappingStart(CollectionInfo),
    MappingEnd,
    Alias(String),
    Comment(String),
}

impl EmitterEvent {
    fn into_event(self) -> Result<Event, EncodeError> {
        Ok(match self {
            EmitterEvent::Scalar(info) => {
                let text = match info.text {
                    Some(text) => text,
                    None => render_scalar(&info.value, None)?.0,
                };
                Event::Scalar(Scalar {
                    anchor: info.anchor,
                    tag: info.tag,
                    value: text,
                    style: info.style,
                    ..Scalar::default()
                })
            }
            EmitterEvent::SequenceStart(info) => Event::SequenceStart(SequenceStart {
                anchor: info.anchor,
                tag: info.tag,
                flow: info.flow,
                ..SequenceStart::default()
            }),
            EmitterEvent::SequenceEnd => SequenceEnd::default().into(),
            EmitterEvent::MappingStart(info) => Event::MappingStart(MappingStart {
                anchor: info.anchor,
                tag: info.tag,
                flow: info.flow,
                ..MappingStart::default()
            }),
            EmitterEvent::MappingEnd => MappingEnd::default().into(),
            EmitterEvent::Alias(anchor) => Alias::new(anchor).into(),
            EmitterEvent::Comment(text) => Comment::new(text).into(),
        })
    }
}

pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: EmitterEvent, next: &mut EmitterChain<'_>) -> Result<(), EncodeError>;
}

/// Remaining links of the chain, ending in the sink.
pub struct EmitterChain<'a> {
    links: &'a [Arc<dyn EventEmitter>],
    sink: &'a mut dyn EventSink,
}

impl<'a> EmitterChain<'a> {
    pub(crate) fn new(links: &'a [Arc<dyn EventEmitter>], sink: &'a mut dyn EventSink) -> Self {
        EmitterChain { links, sink }
    }

    /// Pass `event` to the next link, or to the sink after the last one.
    pub fn emit(&mut self, event: EmitterEvent) -> Result<(), EncodeError> {
        match self.links.split_first() {
            Some((link, rest)) => {
                let mut next = EmitterChain {
                    links: rest,
                    sink: &mut *self.sink,
                };
                link.emit(event, &mut next)
            }
            None => self.sink.emit(event.into_event()?),
        }
    }
}

/// Text and implicit tag for a scalar value.
fn render_scalar(value: &Value, enum_naming: Option<&dyn NamingConvention>) -> Result<(String, Option<String>), EncodeError> {
    Ok(match value {
        Value::Null => ("null".to_owned(), None),
        Value::Bool(b) => (b.to_string(), None),
        Value::Int(i) => (i.to_string(), None),
        Value::Float(f) => (float_string(*f), None),
        Value::Str(s) => (s.clone(), None),
        Value::Bytes(bytes) => (B64.encode(bytes), Some(CoreTag::Binary.uri())),
        Value::Enum(e) => match enum_naming {
            Some(naming) => (naming.apply(&e.variant), None),
            None => (e.variant.to_string(), None),
        },
        other => {
            return Err(EncodeError::Unsupported {
                value: other.kind(),
                ty: "scalar".to_owned(),
            });
        }
    })
}

/// First link: renders scalar text, picks a quoting style that reads back as the same
/// type and tags binary payloads.
#[derive(Debug)]
pub struct TypeAssigningEventEmitter {
    enum_naming: Arc<dyn NamingConvention>,
}

impl TypeAssigningEventEmitter {
    pub fn new(enum_naming: Arc<dyn NamingConvention>) -> Self {
        TypeAssigningEventEmitter { enum_naming }
    }
}

impl EventEmitter for TypeAssigningEventEmitter {
    fn emit(&self, event: EmitterEvent, next: &mut EmitterChain<'_>) -> Result<(), EncodeError> {
        let EmitterEvent::Scalar(mut info) = event else {
            return next.emit(event);
        };
        let text = match info.text.take() {
            Some(text) => text,
            None => {
                let (text, tag) = render_scalar(&info.value, Some(&*self.enum_naming))?;
                if info.tag.is_none() {
                    info.tag = tag;
                }
                if !matches!(info.value, Value::Str(_) | Value::Enum(_)) {
                    info.style = ScalarStyle::Plain;
                }
                text
            }
        };
        if !matches!(info.style, ScalarStyle::Plain) || matches!(info.value, Value::Str(_) | Value::Enum(_)) {
            info.style = resolve_style(&text, info.style, false);
        }
        info.text = Some(text);
        next.emit(EmitterEvent::Scalar(info))
    }
}

/// Double-quotes every string and switches collections to flow style, so the output
/// is also valid JSON for documents without anchors, tags or special floats.
#[derive(Debug, Default)]
pub struct JsonCompatibleEventEmitter;

impl EventEmitter for JsonCompatibleEventEmitter {
    fn emit(&self, event: EmitterEvent, next: &mut EmitterChain<'_>) -> Result<(), EncodeError> {
        match event {
            EmitterEvent::Scalar(mut info) => {
                if matches!(info.value, Value::Str(_) | Value::Enum(_) | Value::Bytes(_)) || info.style != ScalarStyle::Plain {
                    info.style = ScalarStyle::DoubleQuoted;
                }
                next.emit(EmitterEvent::Scalar(info))
            }
            EmitterEvent::SequenceStart(mut info) => {
                info.flow = true;
                next.emit(EmitterEvent::SequenceStart(info))
            }
            EmitterEvent::MappingStart(mut info) => {
                info.flow = true;
                next.emit(EmitterEvent::MappingStart(info))
            }
            other => next.emit(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NamingStyle;

    fn run(links: Vec<Arc<dyn EventEmitter>>, event: EmitterEvent) -> Vec<Event> {
        let mut sink: Vec<Event> = Vec::new();
        EmitterChain::new(&links, &mut sink).emit(event).unwrap();
        sink
    }

    fn scalar(value: Value) -> EmitterEvent {
        EmitterEvent::Scalar(ScalarInfo {
            value,
            ty: Type::Any,
            anchor: None,
            tag: None,
            text: None,
            style: ScalarStyle::Any,
        })
    }

    fn type_assigning() -> Arc<dyn EventEmitter> {
        Arc::new(TypeAssigningEventEmitter::new(Arc::new(NamingStyle::Null)))
    }

    #[test]
    fn numeric_looking_strings_are_quoted() {
        let events = run(vec![type_assigning()], scalar(Value::str("42")));
        let Event::Scalar(s) = &events[0] else { panic!("{events:?}") };
        assert_eq!(s.value, "42");
        assert_eq!(s.style, ScalarStyle::DoubleQuoted);

        let events = run(vec![type_assigning()], scalar(Value::Int(42)));
        let Event::Scalar(s) = &events[0] else { panic!("{events:?}") };
        assert_eq!(s.style, ScalarStyle::Plain);
    }

    #[test]
    fn bytes_are_tagged_binary() {
        let events = run(vec![type_assigning()], scalar(Value::Bytes(b"hi".to_vec())));
        let Event::Scalar(s) = &events[0] else { panic!("{events:?}") };
        assert_eq!(s.value, "aGk=");
        assert_eq!(s.tag.as_deref(), Some("tag:yaml.org,2002:binary"));
    }

    #[test]
    fn json_link_quotes_strings_and_flows_collections() {
        let links = vec![type_assigning(), Arc::new(JsonCompatibleEventEmitter) as Arc<dyn EventEmitter>];
        let events = run(links.clone(), scalar(Value::str("plain")));
        let Event::Scalar(s) = &events[0] else { panic!("{events:?}") };
        assert_eq!(s.style, ScalarStyle::DoubleQuoted);

        let start = EmitterEvent::MappingStart(CollectionInfo {
            value: Value::map([]),
            ty: Type::Any,
            anchor: None,
            tag: None,
            flow: false,
        });
        let events = run(links, start);
        assert!(matches!(&events[0], Event::MappingStart(m) if m.flow));
    }
}
