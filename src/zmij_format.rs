//! Float text for the write path. zmij may render `4e-6` where YAML wants `4.0e-6`.

/// Format `f` as a YAML float, always carrying a decimal point or a special token.
pub(crate) fn float_string(f: f64) -> String {
    if f.is_nan() {
        return ".nan".to_owned();
    }
    if f.is_infinite() {
        return if f.is_sign_positive() { ".inf" } else { "-.inf" }.to_owned();
    }
    let mut buf = zmij::Buffer::new();
    // nan and infinities are handled above
    let s = buf.format_finite(f);
    if s.contains('.') {
        return s.to_owned();
    }
    let mut target = String::with_capacity(s.len() + 2);
    if let Some(exp_pos) = s.find(['e', 'E']) {
        // "4e-6" -> "4.0e-6"
        target.push_str(&s[..exp_pos]);
        target.push_str(".0");
        target.push_str(&s[exp_pos..]);
    } else {
        target.push_str(s);
        target.push_str(".0");
    }
    target
}

#[cfg(test)]
mod tests {
    use super::float_string;

    #[test]
    fn specials() {
        assert_eq!(float_string(f64::NAN), ".nan");
        assert_eq!(float_string(f64::INFINITY), ".inf");
        assert_eq!(float_string(f64::NEG_INFINITY), "-.inf");
    }

    #[test]
    fn always_has_decimal_point() {
        assert_eq!(float_string(2.0), "2.0");
        assert_eq!(float_string(1.25), "1.25");
        let small = float_string(4e-6);
        assert!(small.contains('.'), "{small}");
        assert_eq!(small.parse::<f64>().ok(), Some(4e-6));
    }
}
