//! Live events: the [`EventSource`] over `saphyr_parser::Parser`.
//!
//! Responsibilities
//! - Translate raw parser events into owned [`Event`]s with locations.
//! - Hide stream markers; surface document markers so the mapper can split documents.
//! - Report anchors and aliases under the names written in the document. The parser
//!   only hands out numeric ids, one per `&name` token in input order, so a second
//!   tokenizer over the same input recovers the names lazily.
//! - Maintain a one-item lookahead.

use std::borrow::Cow;

use saphyr_parser::{Event as RawEvent, Parser, ScalarStyle as RawStyle, ScanError, Scanner, StrInput, TokenType};

use crate::error::DecodeError;
use crate::events::{
    Alias, DocumentEnd, DocumentStart, Event, EventSource, MappingEnd, MappingStart, Scalar, ScalarStyle,
    SequenceEnd, SequenceStart,
};
use crate::location::{Location, location_from_span};

const UNKNOWN_ANCHOR: &str = "found unknown anchor";

pub struct LiveEvents<'a> {
    /// Source text, sliced to name aliases the parser could not resolve.
    input: &'a str,
    /// Underlying streaming parser that produces raw events from the input.
    parser: Parser<'a, StrInput<'a>>,
    /// Anchor names indexed by parser anchor id.
    anchors: AnchorNames<'a>,
    /// Single-item lookahead buffer (peeked event not yet consumed).
    look: Option<Event>,
    /// Location of the last yielded event (for better error reporting).
    last_location: Location,
}

impl<'a> LiveEvents<'a> {
    pub fn new(input: &'a str) -> Self {
        let parser = Parser::new_from_str(input);
        let first_id = parser.get_anchor_offset();
        LiveEvents {
            input,
            parser,
            anchors: AnchorNames::new(input, first_id),
            look: None,
            last_location: Location::UNKNOWN,
        }
    }

    fn next_impl(&mut self) -> Result<Option<Event>, DecodeError> {
        while let Some(item) = self.parser.next() {
            let (raw, span) = item.map_err(|err| self.scan_error(err))?;
            let location = location_from_span(&span);
            let event = match raw {
                RawEvent::StreamStart | RawEvent::StreamEnd | RawEvent::Nothing => {
                    self.last_location = location;
                    continue;
                }
                RawEvent::DocumentStart(explicit) => Event::DocumentStart(DocumentStart {
                    implicit: !explicit,
                    location,
                }),
                RawEvent::DocumentEnd => Event::DocumentEnd(DocumentEnd {
                    implicit: true,
                    location,
                }),
                RawEvent::Scalar(value, style, anchor_id, tag) => Event::Scalar(Scalar {
                    anchor: self.anchors.name(anchor_id),
                    tag: tag.map(|t| t.to_string()),
                    value: match value {
                        Cow::Borrowed(v) => v.to_owned(),
                        Cow::Owned(v) => v,
                    },
                    style: match style {
                        RawStyle::Plain => ScalarStyle::Plain,
                        RawStyle::SingleQuoted => ScalarStyle::SingleQuoted,
                        RawStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
                        RawStyle::Literal => ScalarStyle::Literal,
                        RawStyle::Folded => ScalarStyle::Folded,
                    },
                    location,
                }),
                RawEvent::SequenceStart(anchor_id, tag) => Event::SequenceStart(SequenceStart {
                    anchor: self.anchors.name(anchor_id),
                    tag: tag.map(|t| t.to_string()),
                    flow: false,
                    location,
                }),
                RawEvent::SequenceEnd => Event::SequenceEnd(SequenceEnd { location }),
                RawEvent::MappingStart(anchor_id, tag) => Event::MappingStart(MappingStart {
                    anchor: self.anchors.name(anchor_id),
                    tag: tag.map(|t| t.to_string()),
                    flow: false,
                    location,
                }),
                RawEvent::MappingEnd => Event::MappingEnd(MappingEnd { location }),
                RawEvent::Alias(anchor_id) => {
                    let name = self.anchors.name(anchor_id).unwrap_or_else(|| anchor_id.to_string());
                    Event::Alias(Alias::new(name).at(location))
                }
            };
            return Ok(Some(event));
        }
        Ok(None)
    }

    /// The parser rejects aliases it has not seen an anchor for; report those under the
    /// alias name like any other missing anchor.
    fn scan_error(&self, err: ScanError) -> DecodeError {
        let alias = err
            .info()
            .ends_with(UNKNOWN_ANCHOR)
            .then(|| alias_at(self.input, err.marker().byte_offset(), err.marker().index()))
            .flatten();
        let decoded = DecodeError::from_scan_error(err);
        match (alias, decoded.location()) {
            (Some(anchor), Some(location)) => DecodeError::AnchorNotFound { anchor, location },
            _ => decoded,
        }
    }
}

/// Lazily maps parser anchor ids to the names written after `&`.
struct AnchorNames<'a> {
    tokens: Scanner<'a, StrInput<'a>>,
    first_id: usize,
    names: Vec<String>,
}

impl<'a> AnchorNames<'a> {
    fn new(input: &'a str, first_id: usize) -> Self {
        AnchorNames {
            tokens: Scanner::new(StrInput::new(input)),
            first_id,
            names: Vec::new(),
        }
    }

    /// Anchor id 0 means "no anchor". An id the tokenizer cannot name (it stopped at a
    /// scan error the parser has not reached yet) keeps its number.
    fn name(&mut self, anchor_id: usize) -> Option<String> {
        if anchor_id == 0 {
            return None;
        }
        let index = anchor_id.checked_sub(self.first_id)?;
        while self.names.len() <= index {
            match self.tokens.next() {
                Some(token) => {
                    if let TokenType::Anchor(name) = token.1 {
                        self.names.push(name.into_owned());
                    }
                }
                None => return Some(anchor_id.to_string()),
            }
        }
        self.names.get(index).cloned()
    }
}

/// Read the `*name` token starting at the given position.
fn alias_at(input: &str, byte_offset: Option<usize>, char_index: usize) -> Option<String> {
    let start = match byte_offset {
        Some(offset) => offset,
        None => input.char_indices().nth(char_index).map(|(offset, _)| offset)?,
    };
    let name: String = input
        .get(start..)?
        .strip_prefix('*')?
        .chars()
        .take_while(|c| !c.is_whitespace() && !matches!(c, ',' | '[' | ']' | '{' | '}'))
        .collect();
    (!name.is_empty()).then_some(name)
}
impl EventSource for LiveEvents<'_> {
    fn peek(&mut self) -> Result<Option<&Event>, DecodeError> {
        if self.look.is_none() {
            self.look = self.next_impl()?;
        }
        Ok(self.look.as_ref())
    }

    fn next(&mut self) -> Result<Option<Event>, DecodeError> {
        let event = match self.look.take() {
            Some(event) => Some(event),
            None => self.next_impl()?,
        };
        if let Some(event) = &event {
            self.last_location = event.location();
        }
        Ok(event)
    }

    fn last_location(&self) -> Location {
        self.last_location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSourceExt;
    use crate::tags::CoreTag;

    #[test]
    fn document_markers_are_surfaced() {
        let mut events = LiveEvents::new("a: 1\n");
        assert!(matches!(events.next().unwrap(), Some(Event::DocumentStart(_))));
        assert!(events.accept::<MappingStart>().unwrap());
        events.skip_node().unwrap();
        assert!(matches!(events.next().unwrap(), Some(Event::DocumentEnd(_))));
        assert!(events.next().unwrap().is_none());
    }

    #[test]
    fn anchors_and_aliases_share_names() {
        let mut events = LiveEvents::new("- &x 1\n- *x\n");
        events.consume::<DocumentStart>().unwrap();
        events.consume::<SequenceStart>().unwrap();
        let anchored = events.consume::<Scalar>().unwrap();
        let alias = events.consume::<Alias>().unwrap();
        assert_eq!(anchored.anchor.as_deref(), Some("x"));
        assert_eq!(alias.anchor, "x");
        assert_eq!(alias.location.line(), 2);
    }

    #[test]
    fn redefined_anchors_keep_their_written_name() {
        let mut events = LiveEvents::new("- &x [&inner 1]\n- &x 2\n- *x\n");
        events.consume::<DocumentStart>().unwrap();
        events.consume::<SequenceStart>().unwrap();
        assert_eq!(events.consume::<SequenceStart>().unwrap().anchor.as_deref(), Some("x"));
        assert_eq!(events.consume::<Scalar>().unwrap().anchor.as_deref(), Some("inner"));
        events.consume::<SequenceEnd>().unwrap();
        assert_eq!(events.consume::<Scalar>().unwrap().anchor.as_deref(), Some("x"));
        assert_eq!(events.consume::<Alias>().unwrap().anchor, "x");
    }

    #[test]
    fn alias_without_anchor_is_reported_by_name() {
        let mut events = LiveEvents::new("- *missing\n- &missing 1\n");
        let err = loop {
            match events.next() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected an unknown anchor"),
                Err(err) => break err,
            }
        };
        assert!(
            matches!(&err, DecodeError::AnchorNotFound { anchor, .. } if anchor == "missing"),
            "{err}"
        );
        assert_eq!(err.location().map(|l| l.line()), Some(1));
    }

    #[test]
    fn scalar_style_and_tag_survive() {
        let mut events = LiveEvents::new("!!str 'x'\n");
        events.consume::<DocumentStart>().unwrap();
        let scalar = events.consume::<Scalar>().unwrap();
        assert_eq!(scalar.style, ScalarStyle::SingleQuoted);
        let tag = scalar.tag.as_deref().and_then(CoreTag::parse);
        assert_eq!(tag, Some(CoreTag::Str));
    }

    #[test]
    fn scan_errors_carry_a_location() {
        let mut events = LiveEvents::new("a: [1, 2\n");
        let err = loop {
            match events.next() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a scan error"),
                Err(err) => break err,
            }
        };
        assert!(matches!(err, DecodeError::Scan { .. }), "{err}");
        assert!(err.location().is_some_and(|l| l.is_known()));
    }
}
