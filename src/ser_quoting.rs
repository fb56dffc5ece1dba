//! Quoting decisions and quoted-scalar rendering for the text writer.

use std::fmt::{self, Write};

use crate::events::ScalarStyle;
use crate::parse_scalars::{is_null_literal, parse_bool, parse_float, parse_int};

/// True if `s` survives a round trip as a plain scalar: it must not start with an
/// indicator, must not contain comment or mapping separators and must not be read back
/// as null, a boolean (either YAML version) or a number.
pub(crate) fn is_plain_safe(s: &str, flow: bool) -> bool {
    if s.is_empty() || is_null_literal(s) {
        return false;
    }
    if parse_bool(s, false).is_some() || parse_int(s).is_some() || parse_float(s).is_some() {
        return false;
    }
    let bytes = s.as_bytes();
    if bytes[0].is_ascii_whitespace()
        || bytes[bytes.len() - 1].is_ascii_whitespace()
        || matches!(
            bytes[0],
            b'-' | b'?'
                | b':'
                | b'['
                | b']'
                | b'{'
                | b'}'
                | b','
                | b'#'
                | b'&'
                | b'*'
                | b'!'
                | b'|'
                | b'>'
                | b'\''
                | b'"'
                | b'%'
                | b'@'
                | b'`'
        )
    {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    if flow && s.contains([',', '[', ']', '{', '}']) {
        return false;
    }
    !s.chars().any(|c| c.is_control())
}

/// Single quotes cannot carry escapes; anything with a backslash, a quote or a control
/// character goes double-quoted.
pub(crate) fn needs_double_quotes(s: &str) -> bool {
    s.chars().any(|c| c == '\'' || c == '\\' || c.is_control())
}

/// Final style for string text when the event left the choice open.
pub(crate) fn resolve_style(s: &str, requested: ScalarStyle, flow: bool) -> ScalarStyle {
    match requested {
        ScalarStyle::Any | ScalarStyle::Plain if is_plain_safe(s, flow) => ScalarStyle::Plain,
        ScalarStyle::Any | ScalarStyle::Plain => ScalarStyle::DoubleQuoted,
        ScalarStyle::SingleQuoted if needs_double_quotes(s) => ScalarStyle::DoubleQuoted,
        ScalarStyle::Literal | ScalarStyle::Folded if flow || !is_block_safe(s) => ScalarStyle::DoubleQuoted,
        // the writer renders both block styles as literal
        ScalarStyle::Folded => ScalarStyle::Literal,
        other => other,
    }
}

/// Block scalars need a non-empty body that starts at the content indent, keeps at most
/// one trailing line break and has no control characters besides line feeds.
fn is_block_safe(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with([' ', '\n'])
        && !s.ends_with("\n\n")
        && !s.chars().any(|c| c.is_control() && c != '\n')
}

pub(crate) fn write_single_quoted<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('\'')?;
    for ch in s.chars() {
        if ch == '\'' {
            out.write_str("''")?;
        } else {
            out.write_char(ch)?;
        }
    }
    out.write_char('\'')
}

pub(crate) fn write_double_quoted<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '\\' => out.write_str("\\\\")?,
            '"' => out.write_str("\\\"")?,
            '\0' => out.write_str("\\0")?,
            '\u{7}' => out.write_str("\\a")?,
            '\u{8}' => out.write_str("\\b")?,
            '\t' => out.write_str("\\t")?,
            '\n' => out.write_str("\\n")?,
            '\u{b}' => out.write_str("\\v")?,
            '\u{c}' => out.write_str("\\f")?,
            '\r' => out.write_str("\\r")?,
            '\u{1b}' => out.write_str("\\e")?,
            '\u{FEFF}' => out.write_str("\\uFEFF")?,
            '\u{0085}' => out.write_str("\\N")?,
            '\u{2028}' => out.write_str("\\L")?,
            '\u{2029}' => out.write_str("\\P")?,
            c if (c as u32) <= 0xFF && c.is_control() => write!(out, "\\x{:02X}", c as u32)?,
            c if c.is_control() => write!(out, "\\u{:04X}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_looking_text_is_not_plain() {
        for s in ["", "~", "null", "true", "Yes", "off", "12", "0x1F", "1.5", ".inf", "1_000"] {
            assert!(!is_plain_safe(s, false), "{s:?} must be quoted");
        }
    }

    #[test]
    fn indicators_and_separators_are_not_plain() {
        for s in ["- item", "&anchor", "*alias", "!tag", "a: b", "a #b", "key:", " pad"] {
            assert!(!is_plain_safe(s, false), "{s:?} must be quoted");
        }
        assert!(is_plain_safe("a,b", false));
        assert!(!is_plain_safe("a,b", true));
        assert!(is_plain_safe("http://example.com", false));
    }

    #[test]
    fn double_quoting_escapes_controls() {
        let mut out = String::new();
        write_double_quoted(&mut out, "a\"b\\c\n\u{1}").unwrap();
        assert_eq!(out, r#""a\"b\\c\n\x01""#);
    }

    #[test]
    fn single_quotes_are_doubled() {
        let mut out = String::new();
        write_single_quoted(&mut out, "it's").unwrap();
        assert_eq!(out, "'it''s'");
        assert_eq!(resolve_style("it's", ScalarStyle::SingleQuoted, false), ScalarStyle::SingleQuoted);
        assert_eq!(resolve_style("a\nb", ScalarStyle::SingleQuoted, false), ScalarStyle::DoubleQuoted);
    }

    #[test]
    fn block_styles_fall_back_to_double_quotes() {
        assert_eq!(resolve_style("a\nb\n", ScalarStyle::Folded, false), ScalarStyle::Literal);
        assert_eq!(resolve_style("a\nb\n", ScalarStyle::Literal, true), ScalarStyle::DoubleQuoted);
        assert_eq!(resolve_style(" indented", ScalarStyle::Literal, false), ScalarStyle::DoubleQuoted);
        assert_eq!(resolve_style("a\n\n", ScalarStyle::Literal, false), ScalarStyle::DoubleQuoted);
    }
}
