//! Chilean (`es-CL`) presentation of money and percentages.

/// Format a CLP amount with `.` thousands separators and no decimals,
/// e.g. `$1.234.567`. Fractions are rounded half away from zero.
pub fn format_clp(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    format!("{sign}${}", group_thousands(&digits))
}

/// Format a ratio (`0.125`) as a percentage with one decimal and a comma
/// decimal separator, e.g. `12,5 %`.
pub fn format_percent(ratio: f64) -> String {
    let pct = format!("{:.1}", ratio * 100.0);
    let pct = if pct == "-0.0" { "0.0".to_string() } else { pct };
    format!("{} %", pct.replace('.', ","))
}

/// Same as [`format_percent`] but with a leading `+` for positive ratios.
pub fn format_signed_percent(ratio: f64) -> String {
    let formatted = format_percent(ratio);
    if ratio > 0.0 && !formatted.starts_with("0,0") {
        format!("+{formatted}")
    } else {
        formatted
    }
}

/// Format a whole amount with `.` separators and no currency sign, the way
/// amount inputs echo what the user typed.
pub fn format_grouped(value: u64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
