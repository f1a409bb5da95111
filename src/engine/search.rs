//! Recursive keyword search over JSON documents.

use super::json::{display_value, truncate_chars};
use serde::Serialize;
use serde_json::Value;

/// Characters of the matched value kept in a match record.
const VALUE_PREVIEW_CHARS: usize = 200;

/// Where a keyword was found.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchLocation {
    Key,
    Value,
}

/// A single keyword hit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeywordMatch {
    /// Breadcrumb to the hit, e.g. `root.posts[3].caption`.
    pub path: String,
    pub keyword: String,
    pub found_in: MatchLocation,
    /// Object key holding the hit, absent for bare strings inside arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
    /// Occurrences inside a string value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordSearchReport {
    pub keywords: Vec<String>,
    pub total_matches: usize,
    pub matches: Vec<KeywordMatch>,
}

/// Search keys and string values of `data` for any of `keywords`.
///
/// Non-string leaves are never matched. Empty keywords are ignored.
pub fn keyword_search(data: &Value, keywords: &[String], case_sensitive: bool) -> KeywordSearchReport {
    let needles: Vec<(&str, String)> = keywords
        .iter()
        .filter(|k| !k.is_empty())
        .map(|k| {
            let folded = if case_sensitive { k.clone() } else { k.to_lowercase() };
            (k.as_str(), folded)
        })
        .collect();

    let mut searcher = Searcher {
        needles: &needles,
        case_sensitive,
        matches: Vec::new(),
    };
    if !needles.is_empty() {
        searcher.walk(data, "root");
    }

    KeywordSearchReport {
        keywords: keywords.to_vec(),
        total_matches: searcher.matches.len(),
        matches: searcher.matches,
    }
}

struct Searcher<'a> {
    /// (original keyword, folded keyword)
    needles: &'a [(&'a str, String)],
    case_sensitive: bool,
    matches: Vec<KeywordMatch>,
}

impl Searcher<'_> {
    fn fold(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }

    fn walk(&mut self, value: &Value, path: &str) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = format!("{}.{}", path, key);

                    let folded_key = self.fold(key);
                    for (keyword, needle) in self.needles {
                        if folded_key.contains(needle.as_str()) {
                            self.matches.push(KeywordMatch {
                                path: child_path.clone(),
                                keyword: keyword.to_string(),
                                found_in: MatchLocation::Key,
                                key: Some(key.clone()),
                                value: truncate_chars(&display_value(child), VALUE_PREVIEW_CHARS),
                                match_count: None,
                            });
                        }
                    }

                    match child {
                        Value::String(s) => self.check_string(s, &child_path, Some(key)),
                        other => self.walk(other, &child_path),
                    }
                }
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.walk(item, &format!("{}[{}]", path, idx));
                }
            }
            Value::String(s) => self.check_string(s, path, None),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    fn check_string(&mut self, s: &str, path: &str, key: Option<&String>) {
        let haystack = self.fold(s);
        for (keyword, needle) in self.needles {
            let count = haystack.matches(needle.as_str()).count();
            if count > 0 {
                self.matches.push(KeywordMatch {
                    path: path.to_string(),
                    keyword: keyword.to_string(),
                    found_in: MatchLocation::Value,
                    key: key.cloned(),
                    value: truncate_chars(s, VALUE_PREVIEW_CHARS),
                    match_count: Some(count),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_finds_keys_and_values_with_paths() {
        let data = json!({
            "posts": [
                {"caption": "Summer fitness routine", "likes": 10},
                {"caption": "Winter recipes", "fitness_score": 3}
            ]
        });

        let report = keyword_search(&data, &kw(&["fitness"]), false);
        assert_eq!(report.total_matches, 2);

        let value_hit = &report.matches[0];
        assert_eq!(value_hit.path, "root.posts[0].caption");
        assert_eq!(value_hit.found_in, MatchLocation::Value);
        assert_eq!(value_hit.match_count, Some(1));

        let key_hit = &report.matches[1];
        assert_eq!(key_hit.path, "root.posts[1].fitness_score");
        assert_eq!(key_hit.found_in, MatchLocation::Key);
        assert_eq!(key_hit.value, "3");
    }

    #[test]
    fn test_case_sensitivity_toggle() {
        let data = json!({"Title": "Travel VLOG"});

        assert_eq!(keyword_search(&data, &kw(&["vlog", "title"]), false).total_matches, 2);
        assert_eq!(keyword_search(&data, &kw(&["vlog", "title"]), true).total_matches, 0);
        assert_eq!(keyword_search(&data, &kw(&["VLOG"]), true).total_matches, 1);
    }

    #[test]
    fn test_bare_strings_in_arrays() {
        let data = json!(["#food is good", "nothing", ["deep food food"]]);
        let report = keyword_search(&data, &kw(&["food"]), false);

        let paths: Vec<_> = report.matches.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["root[0]", "root[2][0]"]);
        assert_eq!(report.matches[1].match_count, Some(2));
        assert!(report.matches[0].key.is_none());
    }

    #[test]
    fn test_empty_keywords_yield_nothing() {
        let data = json!({"a": "anything"});
        assert_eq!(keyword_search(&data, &[], false).total_matches, 0);
        assert_eq!(keyword_search(&data, &kw(&[""]), false).total_matches, 0);
    }

    #[test]
    fn test_no_matches_in_unrelated_document() {
        let data = json!({"views": 100, "flag": true, "tags": ["cats", "dogs"]});
        assert!(keyword_search(&data, &kw(&["zebra"]), false).matches.is_empty());
    }

    #[test]
    fn test_value_is_truncated() {
        let long = "x".repeat(500);
        let data = json!({ "text": format!("needle {}", long) });
        let report = keyword_search(&data, &kw(&["needle"]), false);
        assert_eq!(report.matches[0].value.chars().count(), 200);
    }

    #[test]
    fn test_every_occurrence_reported() {
        let data = json!({
            "a": {"b": "alpha beta"},
            "c": ["gamma", {"alpha_key": "zeta"}]
        });
        let report = keyword_search(&data, &kw(&["alpha", "gamma"]), false);
        let paths: Vec<_> = report.matches.iter().map(|m| (m.path.as_str(), m.keyword.as_str())).collect();
        assert_eq!(
            paths,
            vec![
                ("root.a.b", "alpha"),
                ("root.c[0]", "gamma"),
                ("root.c[1].alpha_key", "alpha"),
            ]
        );
    }
}
