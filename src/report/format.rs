//! Fixed-precision number formatting for the report.

/// Placeholder for values that are not defined yet.
pub const UNDEFINED: &str = "n/d";

/// Format `value` with `decimals` places and `,` thousands separators,
/// e.g. `grouped(37020.6, 0) == "37,021"`.
pub fn grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return UNDEFINED.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    // "-0" is printed as "0".
    if value < 0.0 && fixed.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Signed percentage with two decimals: `+1.23%`, `-0.50%`.
pub fn signed_pct(value: f64) -> String {
    if !value.is_finite() {
        return UNDEFINED.to_string();
    }
    format!("{value:+.2}%")
}

/// `currency` + grouped price, or the placeholder.
pub fn money(value: Option<f64>, currency: &str, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{currency}{}", grouped(v, decimals)),
        _ => UNDEFINED.to_string(),
    }
}

pub fn opt_signed_pct(value: Option<f64>) -> String {
    value.map_or_else(|| UNDEFINED.to_string(), signed_pct)
}

pub fn opt_fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => UNDEFINED.to_string(),
    }
}
