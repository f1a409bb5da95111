//! Structural filtering with comparison operators.

use super::json::{compare_values, display_value, values_equal};
use super::EngineError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    pub filters_applied: Map<String, Value>,
    pub matches_found: usize,
    pub results: Vec<Value>,
}

/// A parsed filter condition on one field.
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Equals(Value),
    Gt(Value),
    Lt(Value),
    Gte(Value),
    Lte(Value),
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Contains(String),
}

impl Condition {
    fn holds(&self, candidate: &Value) -> bool {
        match self {
            Condition::Equals(expected) | Condition::Eq(expected) => values_equal(candidate, expected),
            Condition::Ne(expected) => !values_equal(candidate, expected),
            Condition::Gt(bound) => compare_values(candidate, bound) == Some(Ordering::Greater),
            Condition::Lt(bound) => compare_values(candidate, bound) == Some(Ordering::Less),
            Condition::Gte(bound) => matches!(
                compare_values(candidate, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lte(bound) => matches!(
                compare_values(candidate, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::In(options) => options.iter().any(|o| values_equal(candidate, o)),
            Condition::Contains(needle) => display_value(candidate).contains(needle.as_str()),
        }
    }
}

/// A mapping is an operator mapping only when every key is a `$` operator.
fn is_operator_mapping(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn parse_conditions(spec: &Value) -> Result<Vec<Condition>, EngineError> {
    let ops = match spec {
        Value::Object(map) if is_operator_mapping(map) => map,
        literal => return Ok(vec![Condition::Equals(literal.clone())]),
    };

    ops.iter()
        .map(|(op, operand)| {
            let condition = match op.as_str() {
                "$gt" => Condition::Gt(operand.clone()),
                "$lt" => Condition::Lt(operand.clone()),
                "$gte" => Condition::Gte(operand.clone()),
                "$lte" => Condition::Lte(operand.clone()),
                "$eq" => Condition::Eq(operand.clone()),
                "$ne" => Condition::Ne(operand.clone()),
                "$in" => match operand {
                    Value::Array(options) => Condition::In(options.clone()),
                    _ => return Err(EngineError::invalid("filters", "$in expects an array")),
                },
                "$contains" => Condition::Contains(display_value(operand)),
                other => return Err(EngineError::UnknownOperator(other.to_string())),
            };
            Ok(condition)
        })
        .collect()
}

/// Return every object node in `data` that satisfies all `filters`.
///
/// Matched nodes are still searched, so a parent and its child may both be
/// returned.
pub fn filter_json(data: &Value, filters: &Map<String, Value>) -> Result<FilterReport, EngineError> {
    let compiled: Vec<(&str, Vec<Condition>)> = filters
        .iter()
        .map(|(field, spec)| Ok((field.as_str(), parse_conditions(spec)?)))
        .collect::<Result<_, EngineError>>()?;

    let mut results = Vec::new();
    collect_matches(data, &compiled, &mut results);

    Ok(FilterReport {
        filters_applied: filters.clone(),
        matches_found: results.len(),
        results,
    })
}

fn collect_matches(value: &Value, filters: &[(&str, Vec<Condition>)], out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            let matched = filters.iter().all(|(field, conditions)| {
                map.get(*field)
                    .is_some_and(|candidate| conditions.iter().all(|c| c.holds(candidate)))
            });
            if matched {
                out.push(value.clone());
            }
            for child in map.values() {
                collect_matches(child, filters, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_matches(item, filters, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filters(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_gt_scenario() {
        let data = json!({"posts": [{"likes": 120, "tag": "x"}, {"likes": 5, "tag": "y"}]});
        let report = filter_json(&data, &filters(json!({"likes": {"$gt": 100}}))).unwrap();
        assert_eq!(report.results, vec![json!({"likes": 120, "tag": "x"})]);
        assert_eq!(report.matches_found, 1);
    }

    #[test]
    fn test_equality_selects_exact_subtrees() {
        let data = json!({
            "type": "reel",
            "items": [
                {"type": "reel", "id": 1},
                {"type": "post", "id": 2},
                {"id": 3},
                {"type": "reel", "nested": {"type": "reel", "id": 4}}
            ]
        });
        let report = filter_json(&data, &filters(json!({"type": "reel"}))).unwrap();
        assert_eq!(report.matches_found, 4);
        assert_eq!(report.results[0], data);
        assert_eq!(report.results[1], json!({"type": "reel", "id": 1}));
        assert_eq!(report.results[3], json!({"type": "reel", "id": 4}));
    }

    #[test]
    fn test_missing_key_disqualifies() {
        let data = json!([{"views": 10}, {"likes": 10}]);
        let report = filter_json(&data, &filters(json!({"views": {"$ne": 0}}))).unwrap();
        assert_eq!(report.results, vec![json!({"views": 10})]);
    }

    #[test]
    fn test_operator_combinations() {
        let data = json!([
            {"likes": 50, "creator": "alice", "caption": "gym day"},
            {"likes": 150, "creator": "bob", "caption": "gym night"},
            {"likes": 250, "creator": "carol", "caption": "beach"}
        ]);

        let range = filter_json(&data, &filters(json!({"likes": {"$gte": 50, "$lt": 250}}))).unwrap();
        assert_eq!(range.matches_found, 2);

        let member = filter_json(&data, &filters(json!({"creator": {"$in": ["bob", "carol"]}}))).unwrap();
        assert_eq!(member.matches_found, 2);

        let both = filter_json(
            &data,
            &filters(json!({"caption": {"$contains": "gym"}, "likes": {"$lte": 100}})),
        )
        .unwrap();
        assert_eq!(both.results, vec![data[0].clone()]);
    }

    #[test]
    fn test_mixed_types_never_order() {
        let data = json!([{"likes": "many"}, {"likes": 7}]);
        let report = filter_json(&data, &filters(json!({"likes": {"$gt": 1}}))).unwrap();
        assert_eq!(report.results, vec![json!({"likes": 7})]);
    }

    #[test]
    fn test_literal_object_is_equality() {
        let data = json!([{"meta": {"lang": "en"}}, {"meta": {"lang": "de"}}]);
        let report = filter_json(&data, &filters(json!({"meta": {"lang": "en"}}))).unwrap();
        assert_eq!(report.results, vec![json!({"meta": {"lang": "en"}})]);
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let data = json!([{"likes": 1}]);
        let err = filter_json(&data, &filters(json!({"likes": {"$regex": "1"}}))).unwrap_err();
        assert_eq!(err.to_string(), "Unknown filter operator: $regex");
    }
}
