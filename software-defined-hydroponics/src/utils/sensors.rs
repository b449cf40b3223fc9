use serde_json::Value;

/// Coerces a loosely typed feed field into a float.
///
/// Devices publish numbers both as JSON numbers and as strings, sometimes with a decimal
/// comma (`"6,9"`). Anything that still fails to parse becomes `NaN` so it can be rendered
/// instead of rejected.
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_decimal(s),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

/// Parses a decimal string, accepting `,` as the decimal separator.
pub fn parse_decimal(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }
    trimmed.replacen(',', ".", 1).parse::<f64>().unwrap_or(f64::NAN)
}

/// Rounds half-up and clamps at zero. `None` when the input is not a finite number.
pub fn round_ppm(value: f64) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    let rounded = (value + 0.5).floor();
    if rounded <= 0.0 {
        Some(0)
    } else if rounded >= u32::MAX as f64 {
        Some(u32::MAX)
    } else {
        Some(rounded as u32)
    }
}

/// Formats a float the way it appears in exported files: shortest round-trip form,
/// no trailing `.0`, `NaN`/`Infinity` spelled out.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}
