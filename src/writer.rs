//! Block-style YAML text writer.
//!
//! [`YamlWriter`] is an [`EventSink`] that renders the event stream produced by the
//! mapper as YAML text. Collections are written in block style unless the start event
//! asks for flow style; everything nested in a flow collection is flow as well.
//!
//! Layout
//! - Nested block collections are indented by two spaces; a collection that is a
//!   sequence item starts on the item's line (`- key: value`).
//! - Empty collections are written as `[]` and `{}`.
//! - `---` separates documents.
//! - Comments are written on their own line above the next key; flow context drops them.

use std::fmt::Write as _;

use crate::error::EncodeError;
use crate::events::{Event, EventSink, Scalar, ScalarStyle};
use crate::ser_quoting::{resolve_style, write_double_quoted, write_single_quoted};
use crate::tags::YAML_TAG_PREFIX;

const INDENT_STEP: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Seq,
    Map,
}

/// Where the node being written sits relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    Top,
    SeqItem { indent: usize },
    Key,
    Value { indent: usize },
    Flow,
    FlowKey,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    kind: Kind,
    /// Column of the collection's block entries.
    indent: usize,
    flow: bool,
    len: usize,
    expect_key: bool,
    position: Position,
}

/// Collection start held back until we know whether the collection is empty.
#[derive(Debug)]
struct PendingStart {
    kind: Kind,
    props: String,
    flow: bool,
    position: Position,
}

#[derive(Debug, Default)]
pub struct YamlWriter {
    out: String,
    stack: Vec<Frame>,
    pending: Option<PendingStart>,
    documents: usize,
    /// The next top-level node must be preceded by `---`.
    needs_marker: bool,
    /// The cursor sits right after `- ` and the next block entry may start there.
    inline_ready: bool,
}

impl YamlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rendered text. Fails when a collection was left open.
    pub fn into_string(self) -> Result<String, EncodeError> {
        if !self.stack.is_empty() || self.pending.is_some() {
            return Err(EncodeError::sink("event stream ended inside a collection"));
        }
        Ok(self.out)
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn in_flow(&self) -> bool {
        self.stack.last().is_some_and(|frame| frame.flow)
    }

    fn write_indent(&mut self, indent: usize) {
        if self.inline_ready {
            self.inline_ready = false;
            return;
        }
        self.out.extend(std::iter::repeat_n(' ', indent));
    }

    fn newline(&mut self) {
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    /// `---` before a top-level node when this document needs it.
    fn write_marker(&mut self, inline: bool) {
        if std::mem::take(&mut self.needs_marker) {
            self.out.push_str(if inline { "--- " } else { "---\n" });
        }
    }

    /// Write whatever precedes a node at the current position.
    fn begin_node(&mut self) -> Position {
        let Some(frame) = self.stack.last().copied() else {
            return Position::Top;
        };
        match (frame.kind, frame.flow, frame.expect_key) {
            (Kind::Seq, true, _) | (Kind::Map, true, true) => {
                if frame.len > 0 {
                    self.out.push_str(", ");
                }
                if frame.kind == Kind::Map {
                    Position::FlowKey
                } else {
                    Position::Flow
                }
            }
            (Kind::Map, true, false) => Position::Flow,
            (Kind::Seq, false, _) => {
                self.write_indent(frame.indent);
                self.out.push_str("- ");
                Position::SeqItem { indent: frame.indent }
            }
            (Kind::Map, false, true) => {
                self.write_indent(frame.indent);
                Position::Key
            }
            (Kind::Map, false, false) => Position::Value { indent: frame.indent },
        }
    }

    /// Finish a node written at `position` and advance the parent.
    fn end_node(&mut self, position: Position) {
        match position {
            Position::Top | Position::SeqItem { .. } | Position::Value { .. } => self.newline(),
            Position::Key => self.out.push(':'),
            Position::FlowKey => self.out.push_str(": "),
            Position::Flow => {}
        }
        if let Some(frame) = self.stack.last_mut() {
            match frame.kind {
                Kind::Seq => frame.len += 1,
                Kind::Map => {
                    if !frame.expect_key {
                        frame.len += 1;
                    }
                    frame.expect_key = !frame.expect_key;
                }
            }
        }
    }

    fn write_scalar(&mut self, scalar: Scalar) -> Result<(), EncodeError> {
        let position = self.begin_node();
        let inline = matches!(position, Position::Flow | Position::FlowKey | Position::Key);
        let style = final_style(&scalar.value, scalar.style, inline, position == Position::FlowKey);

        match position {
            Position::Top => self.write_marker(true),
            Position::Value { .. } => self.out.push(' '),
            _ => {}
        }
        let props = props(scalar.anchor.as_deref(), scalar.tag.as_deref());
        if !props.is_empty() {
            self.out.push_str(&props);
            self.out.push(' ');
        }
        match style {
            ScalarStyle::Literal => {
                let indent = match position {
                    Position::SeqItem { indent } | Position::Value { indent } => indent + INDENT_STEP,
                    _ => INDENT_STEP,
                };
                self.write_literal(&scalar.value, indent);
            }
            ScalarStyle::SingleQuoted => write_single_quoted(&mut self.out, &scalar.value).map_err(fmt_error)?,
            ScalarStyle::DoubleQuoted => write_double_quoted(&mut self.out, &scalar.value).map_err(fmt_error)?,
            _ => self.out.push_str(&scalar.value),
        }
        self.end_node(position);
        Ok(())
    }

    /// `|` block: clip keeps one trailing line break, strip (`|-`) keeps none.
    fn write_literal(&mut self, text: &str, indent: usize) {
        let (header, body) = match text.strip_suffix('\n') {
            Some(body) => ("|", body),
            None => ("|-", text),
        };
        self.out.push_str(header);
        self.out.push('\n');
        for line in body.split('\n') {
            if !line.is_empty() {
                self.out.extend(std::iter::repeat_n(' ', indent));
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }

    fn write_alias(&mut self, anchor: &str) {
        let position = self.begin_node();
        match position {
            Position::Top => self.write_marker(true),
            Position::Value { .. } => self.out.push(' '),
            _ => {}
        }
        self.out.push('*');
        self.out.push_str(anchor);
        // `*a:` would read as an alias named `a:`
        if matches!(position, Position::Key | Position::FlowKey) {
            self.out.push(' ');
        }
        self.end_node(position);
    }

    fn start_collection(
        &mut self,
        kind: Kind,
        anchor: Option<&str>,
        tag: Option<&str>,
        flow: bool,
    ) -> Result<(), EncodeError> {
        let flow = flow || self.in_flow();
        let position = self.begin_node();
        if matches!(position, Position::Key | Position::FlowKey) {
            return Err(EncodeError::Unsupported {
                value: match kind {
                    Kind::Seq => "sequence".to_owned(),
                    Kind::Map => "mapping".to_owned(),
                },
                ty: "mapping key".to_owned(),
            });
        }
        self.pending = Some(PendingStart {
            kind,
            props: props(anchor, tag),
            flow,
            position,
        });
        Ok(())
    }

    fn write_empty(&mut self, pending: PendingStart) {
        match pending.position {
            Position::Top => self.write_marker(true),
            Position::Value { .. } => self.out.push(' '),
            _ => {}
        }
        if !pending.props.is_empty() {
            self.out.push_str(&pending.props);
            self.out.push(' ');
        }
        self.out.push_str(match pending.kind {
            Kind::Seq => "[]",
            Kind::Map => "{}",
        });
        self.end_node(pending.position);
    }

    fn open(&mut self, pending: PendingStart) {
        let PendingStart {
            kind,
            props,
            flow,
            position,
        } = pending;
        let indent = match position {
            Position::SeqItem { indent } | Position::Value { indent } => indent + INDENT_STEP,
            _ => 0,
        };

        if flow {
            match position {
                Position::Top => self.write_marker(true),
                Position::Value { .. } => self.out.push(' '),
                _ => {}
            }
            if !props.is_empty() {
                self.out.push_str(&props);
                self.out.push(' ');
            }
            self.out.push(match kind {
                Kind::Seq => '[',
                Kind::Map => '{',
            });
        } else {
            match position {
                Position::Top if props.is_empty() => self.write_marker(false),
                Position::Top => {
                    self.needs_marker = false;
                    self.out.push_str("--- ");
                    self.out.push_str(&props);
                    self.out.push('\n');
                }
                Position::SeqItem { .. } if props.is_empty() => self.inline_ready = true,
                Position::SeqItem { .. } => {
                    self.out.push_str(&props);
                    self.out.push('\n');
                }
                _ => {
                    if !props.is_empty() {
                        self.out.push(' ');
                        self.out.push_str(&props);
                    }
                    self.out.push('\n');
                }
            }
        }

        self.stack.push(Frame {
            kind,
            indent,
            flow,
            len: 0,
            expect_key: true,
            position,
        });
    }

    fn close(&mut self, kind: Kind) -> Result<(), EncodeError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| EncodeError::sink("collection end without a matching start"))?;
        if frame.kind != kind {
            return Err(EncodeError::sink("collection end does not match its start"));
        }
        if frame.kind == Kind::Map && !frame.expect_key {
            return Err(EncodeError::sink("mapping ended after a key without a value"));
        }
        self.inline_ready = false;
        if frame.flow {
            self.out.push(match kind {
                Kind::Seq => ']',
                Kind::Map => '}',
            });
        }
        self.end_node(frame.position);
        Ok(())
    }

    fn write_comment(&mut self, text: &str) {
        if self.stack.iter().any(|frame| frame.flow) {
            return;
        }
        if !self.at_line_start() && !self.inline_ready {
            return;
        }
        let indent = self.stack.last().map_or(0, |frame| frame.indent);
        for line in text.lines() {
            self.write_indent(indent);
            self.out.push('#');
            if !line.is_empty() {
                self.out.push(' ');
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }
}

impl EventSink for YamlWriter {
    fn emit(&mut self, event: Event) -> Result<(), EncodeError> {
        if let Some(pending) = self.pending.take() {
            let closes = matches!(
                (pending.kind, &event),
                (Kind::Seq, Event::SequenceEnd(_)) | (Kind::Map, Event::MappingEnd(_))
            );
            if closes {
                self.write_empty(pending);
                return Ok(());
            }
            self.open(pending);
        }

        match event {
            Event::DocumentStart(start) => {
                if !self.stack.is_empty() {
                    return Err(EncodeError::sink("document started inside a collection"));
                }
                self.needs_marker = self.documents > 0 || !start.implicit;
            }
            Event::DocumentEnd(end) => {
                if !self.stack.is_empty() {
                    return Err(EncodeError::sink("document ended inside a collection"));
                }
                if !end.implicit {
                    self.out.push_str("...\n");
                }
                self.documents += 1;
            }
            Event::Scalar(scalar) => self.write_scalar(scalar)?,
            Event::Alias(alias) => self.write_alias(&alias.anchor),
            Event::SequenceStart(start) => {
                self.start_collection(Kind::Seq, start.anchor.as_deref(), start.tag.as_deref(), start.flow)?
            }
            Event::MappingStart(start) => {
                self.start_collection(Kind::Map, start.anchor.as_deref(), start.tag.as_deref(), start.flow)?
            }
            Event::SequenceEnd(_) => self.close(Kind::Seq)?,
            Event::MappingEnd(_) => self.close(Kind::Map)?,
            Event::Comment(comment) => self.write_comment(&comment.text),
        }
        Ok(())
    }
}

/// Style actually written. Block scalars cannot appear inline and flow indicators
/// cannot appear unquoted inside flow collections.
fn final_style(text: &str, requested: ScalarStyle, inline: bool, flow_key: bool) -> ScalarStyle {
    match requested {
        ScalarStyle::Any | ScalarStyle::Literal | ScalarStyle::Folded => resolve_style(text, requested, inline),
        ScalarStyle::Plain if text.is_empty() && (inline || flow_key) => ScalarStyle::DoubleQuoted,
        ScalarStyle::Plain if inline && text.contains([',', '[', ']', '{', '}']) => ScalarStyle::DoubleQuoted,
        other => other,
    }
}

/// `&anchor !tag`, either part optional.
fn props(anchor: Option<&str>, tag: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(anchor) = anchor {
        out.push('&');
        out.push_str(anchor);
    }
    if let Some(tag) = tag {
        if !out.is_empty() {
            out.push(' ');
        }
        match tag.strip_prefix(YAML_TAG_PREFIX) {
            Some(suffix) => {
                out.push_str("!!");
                out.push_str(suffix);
            }
            None if tag.starts_with('!') => out.push_str(tag),
            None => {
                let _ = write!(out, "!<{tag}>");
            }
        }
    }
    out
}

fn fmt_error(_: std::fmt::Error) -> EncodeError {
    EncodeError::sink("formatting failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Alias, Comment, MappingEnd, MappingStart, SequenceEnd, SequenceStart};
    use indoc::indoc;

    fn render(events: Vec<Event>) -> String {
        let mut writer = YamlWriter::new();
        for event in events {
            writer.emit(event).unwrap();
        }
        writer.into_string().unwrap()
    }

    fn s(text: &str) -> Event {
        Scalar::new(text).into()
    }

    #[test]
    fn nested_block_collections() {
        let yaml = render(vec![
            MappingStart::new().into(),
            s("name"),
            s("demo"),
            s("items"),
            SequenceStart::new().into(),
            MappingStart::new().into(),
            s("a"),
            s("1"),
            s("b"),
            s("2"),
            MappingEnd::default().into(),
            SequenceStart::new().into(),
            s("x"),
            SequenceEnd::default().into(),
            SequenceEnd::default().into(),
            s("empty"),
            MappingStart::new().into(),
            MappingEnd::default().into(),
            MappingEnd::default().into(),
        ]);
        assert_eq!(
            yaml,
            indoc! {"
                name: demo
                items:
                  - a: 1
                    b: 2
                  - - x
                empty: {}
            "}
        );
    }

    #[test]
    fn anchors_aliases_and_tags() {
        let yaml = render(vec![
            SequenceStart::new().into(),
            MappingStart::new().with_anchor("a1").with_tag("!Node").into(),
            s("next"),
            Alias::new("a1").into(),
            MappingEnd::default().into(),
            Scalar::new("aGk=").with_tag("tag:yaml.org,2002:binary").into(),
            SequenceEnd::default().into(),
        ]);
        assert_eq!(
            yaml,
            indoc! {"
                - &a1 !Node
                  next: *a1
                - !!binary aGk=
            "}
        );
    }

    #[test]
    fn flow_collections_and_quoting() {
        let yaml = render(vec![
            MappingStart { flow: true, ..MappingStart::default() }.into(),
            Scalar::new("k").with_style(ScalarStyle::DoubleQuoted).into(),
            SequenceStart::new().into(),
            s("1"),
            Scalar::new("a,b").into(),
            SequenceEnd::default().into(),
            MappingEnd::default().into(),
        ]);
        assert_eq!(yaml, "{\"k\": [1, \"a,b\"]}\n");
    }

    #[test]
    fn literal_blocks_and_comments() {
        let yaml = render(vec![
            MappingStart::new().into(),
            Comment::new("first line\nsecond line").into(),
            s("text"),
            Scalar::new("one\ntwo\n").with_style(ScalarStyle::Literal).into(),
            s("tail"),
            Scalar::new("x\ny").with_style(ScalarStyle::Folded).into(),
            MappingEnd::default().into(),
        ]);
        assert_eq!(
            yaml,
            indoc! {"
                # first line
                # second line
                text: |
                  one
                  two
                tail: |-
                  x
                  y
            "}
        );
    }

    #[test]
    fn documents_are_separated() {
        let mut writer = YamlWriter::new();
        for _ in 0..2 {
            writer.emit(crate::events::DocumentStart { implicit: true, ..Default::default() }.into()).unwrap();
            writer.emit(s("x")).unwrap();
            writer.emit(crate::events::DocumentEnd { implicit: true, ..Default::default() }.into()).unwrap();
        }
        assert_eq!(writer.into_string().unwrap(), "x\n--- x\n");
    }

    #[test]
    fn collection_keys_are_rejected() {
        let mut writer = YamlWriter::new();
        writer.emit(MappingStart::new().into()).unwrap();
        let err = writer.emit(SequenceStart::new().into());
        assert!(matches!(err, Err(EncodeError::Unsupported { .. })));
    }

    #[test]
    fn unbalanced_stream_is_an_error() {
        let mut writer = YamlWriter::new();
        writer.emit(SequenceStart::new().into()).unwrap();
        writer.emit(s("x")).unwrap();
        assert!(writer.into_string().is_err());
    }
}
