//! Human-readable number formatting for tables and exports (en-US style).

/// Insert `,` every three digits: `1234567` -> `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format with thousands separators and at most three fraction digits,
/// trailing zeros dropped: `45600.0` -> `45,600`, `1234.5` -> `1,234.5`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let scaled = (value.abs() * 1000.0).round() as u64;
    let (whole, frac) = (scaled / 1000, scaled % 1000);
    let sign = if value < 0.0 && scaled > 0 { "-" } else { "" };
    let mut out = format!("{sign}{}", group_thousands(whole));
    if frac > 0 {
        let frac = format!("{frac:03}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out
}

/// Dollar-prefixed amount: `45600.0` -> `$45,600`.
pub fn format_currency(value: f64) -> String {
    format!("${}", format_number(value))
}

/// Short magnitude with one decimal: `847200.0` -> `847.2K`.
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1_000_000_000.0 {
        (value / 1_000_000_000.0, "B")
    } else if abs >= 1_000_000.0 {
        (value / 1_000_000.0, "M")
    } else if abs >= 1_000.0 {
        (value / 1_000.0, "K")
    } else {
        (value, "")
    };
    let text = format!("{scaled:.1}");
    let text = text.strip_suffix(".0").unwrap_or(&text);
    format!("{text}{suffix}")
}
