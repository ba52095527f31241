// Parsing and formatting helpers shared by the loader, map and metrics.
//
// CSV cells arrive as loose strings; everything past the loader works with
// typed values and only comes back to strings for display.
use num_format::{Locale, ToFormattedString};

/// True for a missing or whitespace-only cell.
pub fn is_blank(s: Option<&str>) -> bool {
    s.map_or(true, |v| v.trim().is_empty())
}

/// Parse a numeric cell, tolerating thousands separators and a leading `$`.
///
/// Returns `None` for blank cells and for anything that is not a number
/// (including text like `N/A`). Callers that need to tell the two apart
/// check [`is_blank`] first.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace([',', '$'], "");
    s.parse::<f64>().ok()
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    // Integer columns sometimes come out of spreadsheet exports as `2023.0`.
    match s.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            let f = parse_f64_safe(Some(s))?;
            (f.fract() == 0.0).then_some(f as i64)
        }
    }
}

/// Round half to even, the way the dashboard has always rounded metrics.
pub fn round_half_even(v: f64) -> i64 {
    if !v.is_finite() {
        return 0;
    }
    v.round_ties_even() as i64
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// `$` in front of the thousands-separated integer, e.g. `$1,234` or `$-50`.
pub fn format_currency(n: i64) -> String {
    format!("${}", format_int(n))
}

/// Escape text for use inside HTML/SVG element content and attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_strips_separators_and_dollar() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("$2,000")), Some(2000.0));
        assert_eq!(parse_f64_safe(Some("N/A")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_i64_accepts_whole_floats_only() {
        assert_eq!(parse_i64_safe(Some("2023")), Some(2023));
        assert_eq!(parse_i64_safe(Some("2023.0")), Some(2023));
        assert_eq!(parse_i64_safe(Some("2.5")), None);
        assert_eq!(parse_i64_safe(Some("  ")), None);
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(None));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some("0")));
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(3.5), 4);
        assert_eq!(round_half_even(2.51), 3);
        assert_eq!(round_half_even(-1.5), -2);
        assert_eq!(round_half_even(f64::NAN), 0);
    }

    #[test]
    fn number_formats() {
        assert_eq!(format_int(1_234_567i64), "1,234,567");
        assert_eq!(format_int(0i64), "0");
        assert_eq!(format_currency(44_210), "$44,210");
        assert_eq!(format_currency(0), "$0");
    }

    #[test]
    fn html_escaping() {
        assert_eq!(escape_html("A&B <C> \"d\""), "A&amp;B &lt;C&gt; &quot;d&quot;");
    }
}
