use serde_json::Value;

/// Print just the headline number from the output.
///
/// For a simulation that is the median per-share value; for a point
/// valuation the per-share value itself; for a sampling summary the p50.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let headline = result
        .pointer("/per_share_value/p50")
        .or_else(|| result.pointer("/per_share_value"))
        .or_else(|| result.pointer("/statistics/p50"));

    match headline {
        Some(v) => println!("{}", format_minimal(v)),
        None => {
            // Fall back to the first field of the result object.
            if let Some((key, val)) = result.as_object().and_then(|m| m.iter().next()) {
                println!("{key}: {}", format_minimal(val));
            } else {
                println!("{}", format_minimal(result));
            }
        }
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
