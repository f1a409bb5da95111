//! Hashtag extraction from string values.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));

const TOP_N: usize = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HashtagReport {
    pub total_hashtags: usize,
    pub unique_hashtags: usize,
    /// `(tag, count)` pairs, most frequent first; ties keep first-seen order.
    pub top_10: Vec<(String, usize)>,
    pub all_hashtags: Map<String, Value>,
}

/// Count every `#tag` found in the string values of `data`.
pub fn extract_hashtags(data: &Value) -> HashtagReport {
    let mut tags = Vec::new();
    collect_tags(data, &mut tags);

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in &tags {
        let count = counts.entry(tag.as_str()).or_insert(0);
        if *count == 0 {
            order.push(tag.as_str());
        }
        *count += 1;
    }

    let frequencies: Vec<(String, usize)> = order
        .iter()
        .map(|tag| (tag.to_string(), counts[tag]))
        .collect();

    let mut ranked = frequencies.clone();
    // stable: equal counts keep first-occurrence order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(TOP_N);

    HashtagReport {
        total_hashtags: tags.len(),
        unique_hashtags: frequencies.len(),
        top_10: ranked,
        all_hashtags: frequencies
            .into_iter()
            .map(|(tag, count)| (tag, Value::from(count)))
            .collect(),
    }
}

fn collect_tags(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            out.extend(HASHTAG.captures_iter(s).map(|c| c[1].to_string()));
        }
        Value::Object(map) => {
            for child in map.values() {
                collect_tags(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_tags(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_and_ranking() {
        let data = json!({
            "posts": [
                {"caption": "Leg day #fitness #gym"},
                {"caption": "Rest #recovery #fitness"},
                {"caption": "#gym again #fitness"}
            ]
        });

        let report = extract_hashtags(&data);
        assert_eq!(report.total_hashtags, 6);
        assert_eq!(report.unique_hashtags, 3);
        assert_eq!(
            report.top_10,
            vec![
                ("fitness".to_string(), 3),
                ("gym".to_string(), 2),
                ("recovery".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let data = json!(["#b #a", "#c", "#a #b #c"]);
        let report = extract_hashtags(&data);
        let order: Vec<_> = report.top_10.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_top_is_capped_and_idempotent() {
        let text: String = (0..15).map(|i| format!("#tag{} ", i)).collect();
        let data = json!({ "caption": text, "keys_are_ignored": 1 });

        let first = extract_hashtags(&data);
        let second = extract_hashtags(&data);
        assert_eq!(first.top_10.len(), 10);
        assert_eq!(first.unique_hashtags, 15);
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_hashtags() {
        let report = extract_hashtags(&json!({"caption": "plain text", "n": 3}));
        assert_eq!(report.total_hashtags, 0);
        assert!(report.top_10.is_empty());
    }
}
