//! Structural diff between two JSON documents.

use super::files::load_json_file;
use super::json::{display_value, truncate_chars, type_name, values_equal};
use super::EngineError;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Differences listed in a report; the count keeps going past this.
pub const MAX_REPORTED_DIFFERENCES: usize = 50;

const VALUE_PREVIEW_CHARS: usize = 100;

/// One structural difference, tagged by kind.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Difference {
    TypeMismatch {
        path: String,
        file1_type: &'static str,
        file2_type: &'static str,
    },
    MissingInFile1 {
        path: String,
        value: Value,
    },
    MissingInFile2 {
        path: String,
        value: Value,
    },
    LengthMismatch {
        path: String,
        file1_length: usize,
        file2_length: usize,
    },
    ValueMismatch {
        path: String,
        file1_value: String,
        file2_value: String,
    },
}

/// Differences between two documents.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiffSummary {
    /// Every difference found, including those not listed.
    pub differences_count: usize,
    /// The first [`MAX_REPORTED_DIFFERENCES`] differences in walk order.
    pub differences: Vec<Difference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub file1: String,
    pub file2: String,
    #[serde(flatten)]
    pub summary: DiffSummary,
}

/// Load two JSON files and diff them.
pub fn compare_files(file1: &Path, file2: &Path) -> Result<DiffReport, EngineError> {
    let left = load_json_file(file1)?;
    let right = load_json_file(file2)?;

    Ok(DiffReport {
        file1: file1.display().to_string(),
        file2: file2.display().to_string(),
        summary: diff_values(&left, &right),
    })
}

/// Diff two in-memory documents.
///
/// Arrays of different length report the length mismatch and then compare
/// only the overlapping prefix.
pub fn diff_values(left: &Value, right: &Value) -> DiffSummary {
    let mut collector = Collector::default();
    collector.walk(left, right, "root");
    DiffSummary {
        differences_count: collector.total,
        differences: collector.listed,
    }
}

#[derive(Default)]
struct Collector {
    total: usize,
    listed: Vec<Difference>,
}

impl Collector {
    fn record(&mut self, diff: Difference) {
        self.total += 1;
        if self.listed.len() < MAX_REPORTED_DIFFERENCES {
            self.listed.push(diff);
        }
    }

    fn walk(&mut self, left: &Value, right: &Value, path: &str) {
        match (left, right) {
            (Value::Object(a), Value::Object(b)) => {
                for (key, a_val) in a {
                    let child = format!("{}.{}", path, key);
                    match b.get(key) {
                        Some(b_val) => self.walk(a_val, b_val, &child),
                        None => self.record(Difference::MissingInFile2 {
                            path: child,
                            value: a_val.clone(),
                        }),
                    }
                }
                for (key, b_val) in b {
                    if !a.contains_key(key) {
                        self.record(Difference::MissingInFile1 {
                            path: format!("{}.{}", path, key),
                            value: b_val.clone(),
                        });
                    }
                }
            }
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    self.record(Difference::LengthMismatch {
                        path: path.to_string(),
                        file1_length: a.len(),
                        file2_length: b.len(),
                    });
                }
                for (idx, (a_item, b_item)) in a.iter().zip(b).enumerate() {
                    self.walk(a_item, b_item, &format!("{}[{}]", path, idx));
                }
            }
            _ if type_name(left) != type_name(right) => {
                self.record(Difference::TypeMismatch {
                    path: path.to_string(),
                    file1_type: type_name(left),
                    file2_type: type_name(right),
                });
            }
            _ => {
                if !values_equal(left, right) {
                    self.record(Difference::ValueMismatch {
                        path: path.to_string(),
                        file1_value: truncate_chars(&display_value(left), VALUE_PREVIEW_CHARS),
                        file2_value: truncate_chars(&display_value(right), VALUE_PREVIEW_CHARS),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_documents() {
        let doc = json!({"posts": [{"likes": 1, "tags": ["a"]}], "meta": null});
        let summary = diff_values(&doc, &doc);
        assert_eq!(summary.differences_count, 0);
        assert!(summary.differences.is_empty());
    }

    #[test]
    fn test_reports_each_kind() {
        let left = json!({
            "a": 1,
            "b": "x",
            "only_left": true,
            "list": [1, 2, 3],
            "kind": "text"
        });
        let right = json!({
            "a": 2,
            "b": "x",
            "list": [1, 5],
            "kind": 7,
            "only_right": {"n": 1}
        });

        let summary = diff_values(&left, &right);
        assert_eq!(
            summary.differences,
            vec![
                Difference::ValueMismatch {
                    path: "root.a".to_string(),
                    file1_value: "1".to_string(),
                    file2_value: "2".to_string(),
                },
                Difference::MissingInFile2 {
                    path: "root.only_left".to_string(),
                    value: json!(true),
                },
                Difference::LengthMismatch {
                    path: "root.list".to_string(),
                    file1_length: 3,
                    file2_length: 2,
                },
                Difference::ValueMismatch {
                    path: "root.list[1]".to_string(),
                    file1_value: "2".to_string(),
                    file2_value: "5".to_string(),
                },
                Difference::TypeMismatch {
                    path: "root.kind".to_string(),
                    file1_type: "string",
                    file2_type: "number",
                },
                Difference::MissingInFile1 {
                    path: "root.only_right".to_string(),
                    value: json!({"n": 1}),
                },
            ]
        );
    }

    #[test]
    fn test_count_exceeds_listed_cap() {
        let left: Vec<i32> = (0..80).collect();
        let right: Vec<i32> = (100..180).collect();
        let summary = diff_values(&json!(left), &json!(right));
        assert_eq!(summary.differences_count, 80);
        assert_eq!(summary.differences.len(), MAX_REPORTED_DIFFERENCES);
    }

    #[test]
    fn test_integer_and_float_compare_by_value() {
        let summary = diff_values(&json!({"v": 1}), &json!({"v": 1.0}));
        assert_eq!(summary.differences_count, 0);
    }

    #[test]
    fn test_compare_file_with_itself() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, r#"{"videos": [{"title": "a", "views": 10}]}"#).unwrap();

        let report = compare_files(&path, &path).unwrap();
        assert_eq!(report.summary.differences_count, 0);

        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["differences_count"], json!(0));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.json");
        std::fs::write(&present, "{}").unwrap();

        let err = compare_files(&present, &dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
    }
}
