use serde_json::Value;

use super::table::format_value;

/// Headline figure per view, in order of preference.
const PRIORITY_KEYS: [&str; 8] = [
    "profit_after_tax",
    "total_shortfall",
    "net_gst_payable",
    "residual",
    "cumulative_cashflow",
    "amount_ex_gst",
    "npv",
    "irr",
];

/// Print just the key answer value from the output.
///
/// A full report is reduced to its summary; a series (cashflow, line items)
/// to its last row.
pub fn print_minimal(value: &Value) {
    let mut result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(summary) = result.get("summary") {
        result = summary;
    }
    if let Value::Array(rows) = result {
        match rows.last() {
            Some(last) => result = last,
            None => {
                println!("(empty)");
                return;
            }
        }
    }

    if let Value::Object(map) = result {
        // Try priority keys first (skip null values)
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key) {
                if !val.is_null() {
                    println!("{}", format_value(val));
                    return;
                }
            }
        }

        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_value(val));
            return;
        }
    }

    println!("{}", format_value(result));
}
