use serde_json::Value;
use tabled::{builder::Builder, Table};

const DIMENSIONS: [&str; 3] = ["enterprise_value", "equity_value", "per_share_value"];
const STAT_COLUMNS: [&str; 8] = ["mean", "median", "std", "p5", "p25", "p50", "p75", "p95"];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    let envelope = value.as_object();
    let result = envelope
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(table) = statistics_table(result) {
        println!("{table}");
        print_simulation_footer(result);
    } else if let Some(map) = result.as_object() {
        println!("{}", flat_table(map));
    } else {
        println!("{result}");
    }

    if let Some(map) = envelope {
        if let Some(Value::Array(warnings)) = map.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for w in warnings {
                    if let Value::String(s) = w {
                        println!("  - {s}");
                    }
                }
            }
        }
        if let Some(Value::String(methodology)) = map.get("methodology") {
            println!("\nMethodology: {methodology}");
        }
    }
}

/// One row per valuation dimension when the result carries full statistics.
fn statistics_table(result: &Value) -> Option<Table> {
    let map = result.as_object()?;
    if !DIMENSIONS
        .iter()
        .all(|d| map.get(*d).map(Value::is_object).unwrap_or(false))
    {
        return None;
    }

    let mut builder = Builder::default();
    let mut header = vec!["dimension".to_string()];
    header.extend(STAT_COLUMNS.iter().map(|s| s.to_string()));
    builder.push_record(header);

    for dimension in DIMENSIONS {
        let stats = map[dimension].as_object()?;
        let mut row = vec![dimension.to_string()];
        row.extend(
            STAT_COLUMNS
                .iter()
                .map(|s| stats.get(*s).map(format_value).unwrap_or_default()),
        );
        builder.push_record(row);
    }

    Some(Table::from(builder))
}

fn print_simulation_footer(result: &Value) {
    if let Some(n) = result.get("n_scenarios").and_then(Value::as_u64) {
        println!("\nScenarios: {n}");
    }
    if let Some(pct) = result.get("terminal_value_pct").and_then(Value::as_f64) {
        println!("Terminal value share: {:.1}%", pct * 100.0);
    }
    if let Some(bins) = result.get("histogram").and_then(Value::as_array) {
        println!("Histogram bins: {}", bins.len());
    }
}

/// Field/value rows for scalar results (point valuation, sampling summary).
fn flat_table(map: &serde_json::Map<String, Value>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    Table::from(builder)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n
            .as_f64()
            .map(|x| format!("{x:.4}"))
            .unwrap_or_else(|| n.to_string()),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => format!("({} items)", arr.len()),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
