//! XPath 1.0 number ⟷ string conversion.

/// XPath `string(number)`.
///
/// - `NaN`, `Infinity`, `-Infinity` for the special values
/// - negative zero prints as `0`
/// - integral values print without a fractional part
/// - everything else uses the shortest decimal form that parses back to
///   the same double, never exponent notation
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n.is_sign_positive() {
            "Infinity".to_owned()
        } else {
            "-Infinity".to_owned()
        };
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    // f64's Display is shortest round-trip and never switches to exponents.
    format!("{n}")
}

/// XPath `number(string)`: optional surrounding XML whitespace, an optional
/// minus sign, and `Digits ('.' Digits?)? | '.' Digits`. Anything else,
/// including the empty string, is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_xml_whitespace);
    if !is_xpath_number_literal(trimmed) {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

pub(crate) fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_xpath_number_literal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) {
        return false;
    }
    match frac_part {
        None => !int_part.is_empty(),
        Some(f) => all_digits(f) && !(int_part.is_empty() && f.is_empty()),
    }
}

/// XPath `round()`: nearest integer, halves towards positive infinity,
/// keeping negative zero for `-0.5 <= n < 0`.
pub(crate) fn round_half_up(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    (n + 0.5).floor()
}
