//! Source location utilities.

use std::fmt;

use saphyr_parser::Span as ParserSpan;
use serde::{Deserialize, Serialize};

/// A single position within the source YAML document.
///
/// `line` and `column` are 1-indexed. `offset` is the byte offset from the start of the
/// input when the parser reports it, and the character offset otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Marker {
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) offset: u64,
}

impl Marker {
    /// Sentinel value meaning "position unknown".
    pub const UNKNOWN: Self = Self {
        line: 0,
        column: 0,
        offset: 0,
    };

    /// Create a new marker.
    ///
    /// Arguments:
    /// - `line`: 1-indexed line.
    /// - `column`: 1-indexed column.
    /// - `offset`: offset from the start of the input.
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        // positions only feed error reports; u32 lines and columns are enough
        Self {
            line: line as u32,
            column: column as u32,
            offset: offset as u64,
        }
    }

    #[inline]
    pub fn line(&self) -> u64 {
        self.line as u64
    }

    #[inline]
    pub fn column(&self) -> u64 {
        self.column as u64
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Start/end position of one node or event, used verbatim in error reporting.
///
/// ```
/// use saphyr_mapper::{Location, Marker};
///
/// let loc = Location::new(Marker::new(3, 5, 20), Marker::new(3, 9, 24));
/// assert_eq!(loc.line(), 3);
/// assert_eq!(loc.column(), 5);
/// assert_eq!(loc.to_string(), "line 3, column 5");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub(crate) start: Marker,
    pub(crate) end: Marker,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    ///
    /// Used when a precise position is not yet available at error creation time.
    pub const UNKNOWN: Self = Self {
        start: Marker::UNKNOWN,
        end: Marker::UNKNOWN,
    };

    pub const fn new(start: Marker, end: Marker) -> Self {
        Self { start, end }
    }

    /// Location covering a single point.
    pub const fn at(marker: Marker) -> Self {
        Self {
            start: marker,
            end: marker,
        }
    }

    #[inline]
    pub fn start(&self) -> Marker {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Marker {
        self.end
    }

    /// Line of the start marker.
    #[inline]
    pub fn line(&self) -> u64 {
        self.start.line()
    }

    /// Column of the start marker.
    #[inline]
    pub fn column(&self) -> u64 {
        self.start.column()
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        self.start != Marker::UNKNOWN
    }

    /// Return `self` when known, `fallback` otherwise.
    #[inline]
    pub(crate) fn or(self, fallback: Location) -> Location {
        if self.is_known() { self } else { fallback }
    }

    /// Helper for error messages: renders ` at line L, column C` or nothing.
    pub(crate) fn suffix(&self) -> LocationSuffix {
        LocationSuffix(*self)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "line {}, column {}", self.start.line, self.start.column)
        } else {
            f.write_str("unknown position")
        }
    }
}

/// Display adapter printing the position suffix of an error message.
pub(crate) struct LocationSuffix(Location);

impl fmt::Display for LocationSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_known() {
            write!(f, " at {}", self.0)
        } else {
            Ok(())
        }
    }
}

/// Convert a `saphyr_parser::Span` to a 1-indexed [`Location`].
///
/// Called by:
/// - The live events adapter for each raw parser event.
pub(crate) fn location_from_span(span: &ParserSpan) -> Location {
    let start = &span.start;
    let end = &span.end;
    Location::new(
        Marker::new(
            start.line(),
            start.col() + 1,
            start.byte_offset().unwrap_or(start.index()),
        ),
        Marker::new(
            end.line(),
            end.col() + 1,
            end.byte_offset().unwrap_or(end.index()),
        ),
    )
}
