//! Structural events exchanged with the parser and the emitter.
//!
//! The mapper never sees raw text. It pulls [`Event`]s from an [`EventSource`] on the
//! read path and pushes them into an [`EventSink`] on the write path. Every event
//! carries the [`Location`] of the node it came from (unknown for synthesized events).

use std::collections::VecDeque;

use crate::error::{DecodeError, EncodeError};
use crate::location::Location;

/// Presentation style of a scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ScalarStyle {
    /// Let the emitter decide.
    #[default]
    Any,
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }

    /// Plain scalars are the only ones subject to implicit typing.
    pub fn is_plain(self) -> bool {
        matches!(self, ScalarStyle::Plain | ScalarStyle::Any)
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Scalar {
    pub anchor: Option<String>,
    pub tag: Option<String>,
    pub value: String,
    pub style: ScalarStyle,
    pub location: Location,
}

impl Scalar {
    /// Plain scalar without anchor or tag.
    pub fn new(value: impl Into<String>) -> Self {
        Scalar {
            value: value.into(),
            style: ScalarStyle::Plain,
            ..Scalar::default()
        }
    }

    pub fn with_style(mut self, style: ScalarStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// True when the scalar is a plain empty or null literal without a tag.
    pub(crate) fn is_plain_null(&self) -> bool {
        self.style.is_plain()
            && self.tag.is_none()
            && crate::parse_scalars::is_null_literal(&self.value)
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SequenceStart {
    pub anchor: Option<String>,
    pub tag: Option<String>,
    pub flow: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SequenceEnd {
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct MappingStart {
    pub anchor: Option<String>,
    pub tag: Option<String>,
    pub flow: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct MappingEnd {
    pub location: Location,
}

/// Reference to an earlier anchored node.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Alias {
    pub anchor: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct DocumentStart {
    pub implicit: bool,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct DocumentEnd {
    pub implicit: bool,
    pub location: Location,
}

/// Side content injected by the write path. Sources skip comments on read.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Comment {
    pub text: String,
    pub location: Location,
}

macro_rules! collection_start_builders {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
                self.anchor = Some(anchor.into());
                self
            }

            pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
                self.tag = Some(tag.into());
                self
            }

            pub fn at(mut self, location: Location) -> Self {
                self.location = location;
                self
            }
        }
    )*};
}

collection_start_builders!(SequenceStart, MappingStart);

impl Alias {
    pub fn new(anchor: impl Into<String>) -> Self {
        Alias {
            anchor: anchor.into(),
            location: Location::UNKNOWN,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Comment {
            text: text.into(),
            location: Location::UNKNOWN,
        }
    }
}

/// One structural event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    DocumentStart(DocumentStart),
    DocumentEnd(DocumentEnd),
    Scalar(Scalar),
    SequenceStart(SequenceStart),
    SequenceEnd(SequenceEnd),
    MappingStart(MappingStart),
    MappingEnd(MappingEnd),
    Alias(Alias),
    Comment(Comment),
}

impl Event {
    pub fn location(&self) -> Location {
        match self {
            Event::DocumentStart(e) => e.location,
            Event::DocumentEnd(e) => e.location,
            Event::Scalar(e) => e.location,
            Event::SequenceStart(e) => e.location,
            Event::SequenceEnd(e) => e.location,
            Event::MappingStart(e) => e.location,
            Event::MappingEnd(e) => e.location,
            Event::Alias(e) => e.location,
            Event::Comment(e) => e.location,
        }
    }

    /// Human readable kind, used in structural error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::DocumentStart(_) => DocumentStart::NAME,
            Event::DocumentEnd(_) => DocumentEnd::NAME,
            Event::Scalar(_) => Scalar::NAME,
            Event::SequenceStart(_) => SequenceStart::NAME,
            Event::SequenceEnd(_) => SequenceEnd::NAME,
            Event::MappingStart(_) => MappingStart::NAME,
            Event::MappingEnd(_) => MappingEnd::NAME,
            Event::Alias(_) => Alias::NAME,
            Event::Comment(_) => Comment::NAME,
        }
    }

    /// Anchor declared on a node-starting event.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Event::Scalar(e) => e.anchor.as_deref(),
            Event::SequenceStart(e) => e.anchor.as_deref(),
            Event::MappingStart(e) => e.anchor.as_deref(),
            _ => None,
        }
    }

    /// Tag declared on a node-starting event.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Event::Scalar(e) => e.tag.as_deref(),
            Event::SequenceStart(e) => e.tag.as_deref(),
            Event::MappingStart(e) => e.tag.as_deref(),
            _ => None,
        }
    }
}

/// Typed access to one event variant, used by [`EventSourceExt::consume`].
pub trait EventKind: Sized {
    const NAME: &'static str;

    fn matches(event: &Event) -> bool;

    /// Unwrap the variant, handing the event back when it is of another kind.
    fn extract(event: Event) -> Result<Self, Event>;
}

macro_rules! event_kind {
    ($($ty:ident => $name:literal),* $(,)?) => {$(
        impl EventKind for $ty {
            const NAME: &'static str = $name;

            fn matches(event: &Event) -> bool {
                matches!(event, Event::$ty(_))
            }

            fn extract(event: Event) -> Result<Self, Event> {
                match event {
                    Event::$ty(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }

        impl From<$ty> for Event {
            fn from(inner: $ty) -> Self {
                Event::$ty(inner)
            }
        }
    )*};
}

event_kind! {
    DocumentStart => "document start",
    DocumentEnd => "document end",
    Scalar => "scalar",
    SequenceStart => "sequence start",
    SequenceEnd => "sequence end",
    MappingStart => "mapping start",
    MappingEnd => "mapping end",
    Alias => "alias",
    Comment => "comment",
}

/// Pull-style event source.
pub trait EventSource {
    /// Look at the next event without consuming it. `None` at end of stream.
    fn peek(&mut self) -> Result<Option<&Event>, DecodeError>;

    /// Consume the next event. `None` at end of stream.
    fn next(&mut self) -> Result<Option<Event>, DecodeError>;

    /// Location of the last consumed event, for end-of-input errors.
    fn last_location(&self) -> Location;
}

/// Typed helpers over any [`EventSource`].
pub trait EventSourceExt: EventSource {
    /// Consume the next event, failing unless it is a `T`.
    fn consume<T: EventKind>(&mut self) -> Result<T, DecodeError> {
        match self.next()? {
            Some(event) => T::extract(event).map_err(|other| {
                DecodeError::unexpected(T::NAME, other.kind_name()).with_location(other.location())
            }),
            None => Err(DecodeError::eof().with_location(self.last_location())),
        }
    }

    /// Consume the next event only when it is a `T`.
    fn try_consume<T: EventKind>(&mut self) -> Result<Option<T>, DecodeError> {
        if self.accept::<T>()? {
            self.consume::<T>().map(Some)
        } else {
            Ok(None)
        }
    }

    /// True when the next event is a `T`.
    fn accept<T: EventKind>(&mut self) -> Result<bool, DecodeError> {
        Ok(self.peek()?.is_some_and(T::matches))
    }

    /// Peek, failing with `Eof` at end of stream.
    fn peek_required(&mut self) -> Result<&Event, DecodeError> {
        let last = self.last_location();
        self.peek()?
            .ok_or_else(|| DecodeError::eof().with_location(last))
    }

    /// Consume one complete node (scalar, alias or a whole collection).
    fn skip_node(&mut self) -> Result<(), DecodeError> {
        let mut depth = 0usize;
        loop {
            let event = self
                .next()?
                .ok_or_else(|| DecodeError::eof().with_location(self.last_location()))?;
            match event {
                Event::SequenceStart(_) | Event::MappingStart(_) => depth += 1,
                Event::SequenceEnd(_) | Event::MappingEnd(_) => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        DecodeError::unexpected("node", event.kind_name())
                            .with_location(event.location())
                    })?;
                }
                Event::DocumentStart(_) | Event::DocumentEnd(_) => {
                    return Err(DecodeError::unexpected("node", event.kind_name())
                        .with_location(event.location()));
                }
                Event::Scalar(_) | Event::Alias(_) | Event::Comment(_) => {}
            }
            if depth == 0 && !matches!(event, Event::Comment(_)) {
                return Ok(());
            }
        }
    }
}

impl<S: EventSource + ?Sized> EventSourceExt for S {}

/// Push-style event sink.
pub trait EventSink {
    fn emit(&mut self, event: Event) -> Result<(), EncodeError>;
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) -> Result<(), EncodeError> {
        self.push(event);
        Ok(())
    }
}

/// In-memory event queue. Acts as a sink when recording and as a source when
/// replaying; comments are skipped on replay.
#[derive(Clone, Debug, Default)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    last_location: Location,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: impl Into<Event>) {
        self.events.push_back(event.into());
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events.into()
    }

    fn drop_comments(&mut self) {
        while matches!(self.events.front(), Some(Event::Comment(_))) {
            self.events.pop_front();
        }
    }
}

impl FromIterator<Event> for EventBuffer {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        EventBuffer {
            events: iter.into_iter().collect(),
            last_location: Location::UNKNOWN,
        }
    }
}

impl From<Vec<Event>> for EventBuffer {
    fn from(events: Vec<Event>) -> Self {
        events.into_iter().collect()
    }
}

impl EventSource for EventBuffer {
    fn peek(&mut self) -> Result<Option<&Event>, DecodeError> {
        self.drop_comments();
        Ok(self.events.front())
    }

    fn next(&mut self) -> Result<Option<Event>, DecodeError> {
        self.drop_comments();
        let event = self.events.pop_front();
        if let Some(event) = &event {
            self.last_location = event.location();
        }
        Ok(event)
    }

    fn last_location(&self) -> Location {
        self.last_location
    }
}

impl EventSink for EventBuffer {
    fn emit(&mut self, event: Event) -> Result<(), EncodeError> {
        self.events.push_back(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(events: Vec<Event>) -> EventBuffer {
        EventBuffer::from(events)
    }

    #[test]
    fn consume_reports_kind_mismatch() {
        let mut source = buffer(vec![Scalar::new("x").into()]);
        let err = source.consume::<MappingStart>().unwrap_err();
        assert_eq!(err.to_string(), "unexpected scalar: expected mapping start");
    }

    #[test]
    fn try_consume_leaves_other_kinds_in_place() {
        let mut source = buffer(vec![Scalar::new("x").into()]);
        assert!(source.try_consume::<Alias>().unwrap().is_none());
        assert_eq!(source.consume::<Scalar>().unwrap().value, "x");
        assert!(matches!(
            source.consume::<Scalar>(),
            Err(DecodeError::Eof { .. })
        ));
    }

    #[test]
    fn skip_node_consumes_whole_collection() {
        let mut source = buffer(vec![
            MappingStart::new().into(),
            Scalar::new("a").into(),
            SequenceStart::new().into(),
            Scalar::new("1").into(),
            SequenceEnd::default().into(),
            MappingEnd::default().into(),
            Scalar::new("after").into(),
        ]);
        source.skip_node().unwrap();
        assert_eq!(source.consume::<Scalar>().unwrap().value, "after");
    }

    #[test]
    fn comments_are_invisible_to_readers() {
        let mut source = buffer(vec![Comment::new("note").into(), Scalar::new("v").into()]);
        assert!(source.accept::<Scalar>().unwrap());
        assert_eq!(source.len(), 1);
    }
}
