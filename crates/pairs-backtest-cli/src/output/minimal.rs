use serde_json::Value;

use super::{flatten, format_scalar};

/// Key result fields, most informative first; matched on the last path segment.
const PRIORITY_KEYS: [&str; 5] = [
    "final_equity",
    "adf_statistic",
    "sharpe_ratio",
    "total_return",
    "hedge_ratio",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    if let Some(Value::Array(rows)) = value.get("results") {
        // Series output: the latest row is the answer
        match rows.last() {
            Some(last) => println!("{}", pick(last).unwrap_or_else(|| format_scalar(last))),
            None => println!("(empty)"),
        }
        return;
    }

    let result = value.get("result").unwrap_or(value);
    match pick(result) {
        Some(answer) => println!("{}", answer),
        None => println!("{}", format_scalar(result)),
    }
}

fn pick(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    let flat = flatten(map);
    PRIORITY_KEYS.iter().find_map(|key| {
        flat.iter()
            .find(|(k, v)| !v.is_null() && k.rsplit('.').next() == Some(*key))
            .map(|(_, v)| format_scalar(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_prefers_final_equity() {
        let value = json!({
            "diagnostics": {"adf_statistic": "-4.1"},
            "performance": {"final_equity": "1.07", "sharpe_ratio": "0.8"}
        });
        assert_eq!(pick(&value).as_deref(), Some("1.07"));
    }

    #[test]
    fn test_pick_hedge_ratio_row() {
        let row = json!({"timestamp": "2024-01-02T09:30:00", "hedge_ratio": "2.1"});
        assert_eq!(pick(&row).as_deref(), Some("2.1"));
    }

    #[test]
    fn test_pick_skips_null() {
        let row = json!({"timestamp": "2024-01-02T09:30:00", "hedge_ratio": null});
        assert_eq!(pick(&row), None);
    }
}
