use serde_json::Value;
use std::io;

/// Write output as CSV to stdout.
///
/// Simulation results become long-format `dimension,statistic,value` rows;
/// scalar results become `field,value` rows, flattening one level of
/// nesting with dotted keys.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if has_statistics_dimensions(result) {
        write_statistics_csv(&mut wtr, result);
    } else if let Some(map) = result.as_object() {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            match val {
                Value::Object(inner) => {
                    for (subkey, subval) in inner {
                        let _ = wtr.write_record([
                            &format!("{key}.{subkey}"),
                            &format_csv_value(subval),
                        ]);
                    }
                }
                _ => {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
    } else {
        let _ = wtr.write_record([&format_csv_value(result)]);
    }

    let _ = wtr.flush();
}

fn has_statistics_dimensions(result: &Value) -> bool {
    result.as_object().is_some_and(|map| {
        ["enterprise_value", "equity_value", "per_share_value"]
            .iter()
            .all(|d| map.get(*d).map(Value::is_object).unwrap_or(false))
    })
}

fn write_statistics_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Value) {
    let Some(map) = result.as_object() else {
        return;
    };
    let _ = wtr.write_record(["dimension", "statistic", "value"]);

    for dimension in ["enterprise_value", "equity_value", "per_share_value"] {
        if let Some(stats) = map[dimension].as_object() {
            for (statistic, val) in stats {
                let _ = wtr.write_record([dimension, statistic, &format_csv_value(val)]);
            }
        }
    }
    if let Some(pct) = map.get("terminal_value_pct") {
        let _ = wtr.write_record(["terminal_value_pct", "mean", &format_csv_value(pct)]);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
