//! Field aggregation across a JSON tree.

use super::json::display_value;
use super::EngineError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::str::FromStr;

/// Supported aggregation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOperation {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl FromStr for AggregateOperation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "count" => Ok(AggregateOperation::Count),
            "sum" => Ok(AggregateOperation::Sum),
            "avg" | "average" | "mean" => Ok(AggregateOperation::Avg),
            "min" => Ok(AggregateOperation::Min),
            "max" => Ok(AggregateOperation::Max),
            _ => Err(EngineError::UnknownOperation(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub field: String,
    pub operation: AggregateOperation,
    pub total_values: usize,
    pub result: Value,
    /// Frequency of each distinct value, in first-occurrence order (`count` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_counts: Option<Map<String, Value>>,
    /// Values that took part in the arithmetic (`sum`/`avg`/`min`/`max` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_values_count: Option<usize>,
}

/// Aggregate every value bound to `field` anywhere in `data`.
pub fn aggregate_data(
    data: &Value,
    field: &str,
    operation: AggregateOperation,
) -> Result<AggregateReport, EngineError> {
    let mut values = Vec::new();
    collect_field(data, field, &mut values);

    let mut report = AggregateReport {
        field: field.to_string(),
        operation,
        total_values: values.len(),
        result: Value::Null,
        value_counts: None,
        numeric_values_count: None,
    };

    let combine: fn(&[&Number]) -> Value = match operation {
        AggregateOperation::Count => {
            report.result = Value::from(values.len());
            report.value_counts = Some(value_counts(&values));
            return Ok(report);
        }
        AggregateOperation::Sum => sum,
        AggregateOperation::Avg => average,
        AggregateOperation::Min => |numbers: &[&Number]| extreme(numbers, |a, b| a < b),
        AggregateOperation::Max => |numbers: &[&Number]| extreme(numbers, |a, b| a > b),
    };

    let numbers: Vec<&Number> = values
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(n),
            _ => None,
        })
        .collect();

    if numbers.is_empty() {
        return Err(EngineError::NoNumericValues(field.to_string()));
    }

    report.numeric_values_count = Some(numbers.len());
    report.result = combine(&numbers);

    Ok(report)
}

fn average(numbers: &[&Number]) -> Value {
    let total: f64 = numbers.iter().filter_map(|n| n.as_f64()).sum();
    float_value(total / numbers.len() as f64)
}

/// Values stored under `field` are collected but not searched further.
fn collect_field<'a>(value: &'a Value, field: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == field {
                    out.push(child);
                } else {
                    collect_field(child, field, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_field(item, field, out);
            }
        }
        _ => {}
    }
}

fn value_counts(values: &[&Value]) -> Map<String, Value> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();

    for value in values {
        let key = display_value(value);
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    order
        .into_iter()
        .map(|key| {
            let count = counts.get(&key).copied().unwrap_or_default();
            (key, Value::from(count))
        })
        .collect()
}

/// Integer sums stay integers unless they overflow or a float is involved.
fn sum(numbers: &[&Number]) -> Value {
    let integer_sum = numbers
        .iter()
        .try_fold(0i64, |acc, n| n.as_i64().and_then(|i| acc.checked_add(i)));

    match integer_sum {
        Some(total) => Value::from(total),
        None => float_value(numbers.iter().filter_map(|n| n.as_f64()).sum()),
    }
}

fn extreme(numbers: &[&Number], better: impl Fn(f64, f64) -> bool) -> Value {
    let mut best = numbers[0];
    for n in &numbers[1..] {
        if let (Some(candidate), Some(current)) = (n.as_f64(), best.as_f64()) {
            if better(candidate, current) {
                best = n;
            }
        }
    }
    Value::Number(best.clone())
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_avg_scenario() {
        let data = json!({"a": {"views": 10}, "b": {"views": 20}});
        let report = aggregate_data(&data, "views", AggregateOperation::Avg).unwrap();

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["result"], json!(15.0));
        assert_eq!(out["numeric_values_count"], json!(2));
    }

    #[test]
    fn test_sum_matches_direct_sum() {
        let data = json!({
            "posts": [{"likes": 3}, {"likes": 4, "extra": {"likes": 5}}, {"likes": "n/a"}]
        });
        let report = aggregate_data(&data, "likes", AggregateOperation::Sum).unwrap();
        assert_eq!(report.result, json!(12));
        assert_eq!(report.total_values, 4);
        assert_eq!(report.numeric_values_count, Some(3));
    }

    #[test]
    fn test_float_sum() {
        let data = json!([{"score": 1.5}, {"score": 2}]);
        let report = aggregate_data(&data, "score", AggregateOperation::Sum).unwrap();
        assert_eq!(report.result, json!(3.5));
    }

    #[test]
    fn test_count_includes_every_type() {
        let data = json!([
            {"type": "reel"},
            {"type": "post"},
            {"type": "reel"},
            {"type": null},
            {"type": {"nested": {"type": "ignored"}}}
        ]);
        let report = aggregate_data(&data, "type", AggregateOperation::Count).unwrap();
        assert_eq!(report.result, json!(5));

        let counts = report.value_counts.unwrap();
        let keys: Vec<_> = counts.keys().cloned().collect();
        assert_eq!(keys[0], "reel");
        assert_eq!(counts["reel"], json!(2));
        assert_eq!(counts["post"], json!(1));
        assert_eq!(counts["null"], json!(1));
    }

    #[test]
    fn test_min_max() {
        let data = json!([{"v": 7}, {"v": -2.5}, {"v": 40}, {"v": true}]);
        assert_eq!(
            aggregate_data(&data, "v", AggregateOperation::Min).unwrap().result,
            json!(-2.5)
        );
        assert_eq!(
            aggregate_data(&data, "v", AggregateOperation::Max).unwrap().result,
            json!(40)
        );
    }

    #[test]
    fn test_no_numeric_values() {
        let data = json!([{"creator": "alice"}]);
        let err = aggregate_data(&data, "creator", AggregateOperation::Sum).unwrap_err();
        assert_eq!(err.to_string(), "No numeric values found for field 'creator'");
    }

    #[test]
    fn test_unknown_operation() {
        let err = "median".parse::<AggregateOperation>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation: median");
    }
}
