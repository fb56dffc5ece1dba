//! Plain-scalar recognizers used by the scalar deserializer and by the quoting
//! heuristics of the write path.

/// Parse a YAML 1.1 boolean from a &str (handles the "Norway problem").
///
/// Accepted TRUE literals (case-insensitive): "y", "yes", "true", "on"
/// Accepted FALSE literals (case-insensitive): "n", "no", "false", "off"
pub(crate) fn parse_yaml11_bool(s: &str) -> Option<bool> {
    let t = s.trim();
    if ["true", "yes", "y", "on"]
        .iter()
        .any(|lit| t.eq_ignore_ascii_case(lit))
    {
        Some(true)
    } else if ["false", "no", "n", "off"]
        .iter()
        .any(|lit| t.eq_ignore_ascii_case(lit))
    {
        Some(false)
    } else {
        None
    }
}

/// YAML 1.2 core schema booleans: `true`/`false` in lower, title or upper case.
pub(crate) fn parse_yaml12_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_bool(s: &str, strict: bool) -> Option<bool> {
    if strict {
        parse_yaml12_bool(s)
    } else {
        parse_yaml11_bool(s)
    }
}

/// Plain scalars that read as null.
pub(crate) fn is_null_literal(s: &str) -> bool {
    matches!(s, "" | "~" | "null" | "Null" | "NULL")
}

fn parse_digits_u128(digits: &str, radix: u32) -> Option<u128> {
    let mut val: u128 = 0;
    let mut saw = false;
    for c in digits.chars() {
        if c == '_' {
            continue;
        }
        let d = c.to_digit(radix)?;
        val = val.checked_mul(radix as u128)?.checked_add(d as u128)?;
        saw = true;
    }
    saw.then_some(val)
}

/// Parse a signed 64-bit integer with optional sign, `0x`/`0o`/`0b` base prefixes and
/// `_` digit separators.
pub(crate) fn parse_int(s: &str) -> Option<i64> {
    let t = s.trim();
    let (neg, rest) = match t.strip_prefix('+') {
        Some(r) => (false, r),
        None => match t.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, t),
        },
    };
    if rest.starts_with('_') {
        return None;
    }

    let (radix, digits) = if let Some(r) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16u32, r)
    } else if let Some(r) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        (8u32, r)
    } else if let Some(r) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        (2u32, r)
    } else {
        (10u32, rest)
    };

    let mag = i128::try_from(parse_digits_u128(digits, radix)?).ok()?;
    let signed = if neg { -mag } else { mag };
    i64::try_from(signed).ok()
}

/// Parse a YAML 1.2 float, including `.inf`, `-.inf` and `.nan` in any case.
pub(crate) fn parse_float(s: &str) -> Option<f64> {
    let t = s.trim();
    match t.to_ascii_lowercase().as_str() {
        ".nan" | "+.nan" | "-.nan" => return Some(f64::NAN),
        ".inf" | "+.inf" => return Some(f64::INFINITY),
        "-.inf" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    // Rust accepts "inf", "nan" and "infinity" which YAML spells differently.
    if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    let cleaned: String = t.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norway_problem() {
        assert_eq!(parse_bool("no", false), Some(false));
        assert_eq!(parse_bool("no", true), None);
        assert_eq!(parse_bool("On", false), Some(true));
        assert_eq!(parse_bool("True", true), Some(true));
    }

    #[test]
    fn integer_bases() {
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("-0o17"), Some(-15));
        assert_eq!(parse_int("0b1010"), Some(10));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775808"), None);
        assert_eq!(parse_int("12abc"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn floats() {
        assert_eq!(parse_float("1.5"), Some(1.5));
        assert_eq!(parse_float("-.INF"), Some(f64::NEG_INFINITY));
        assert!(parse_float(".NaN").is_some_and(f64::is_nan));
        assert_eq!(parse_float("4.0e-6"), Some(4.0e-6));
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("nan"), None);
    }
}
