//! Data query engine.
//!
//! Deterministic operations over arbitrary JSON documents: keyword search,
//! structural filtering, aggregation, hashtag extraction, structural diffing,
//! file access and lookups over the consolidated media datasets.
//!
//! Operations return typed reports or an [`EngineError`]. The agent's tool
//! registry turns both into the JSON mappings the model sees, so nothing in
//! here needs to know about the loop.

mod aggregate;
mod diff;
mod files;
mod filter;
mod hashtags;
pub mod json;
mod media;
mod search;

pub use aggregate::{aggregate_data, AggregateOperation, AggregateReport};
pub use diff::{compare_files, diff_values, DiffReport, DiffSummary, Difference, MAX_REPORTED_DIFFERENCES};
pub use files::{
    list_json_files, load_json_file, read_json_file, FileResolver, JsonFileEntry, JsonFileListing,
    JsonFileReport, JsonFileSummary,
};
pub use filter::{filter_json, FilterReport};
pub use hashtags::{extract_hashtags, HashtagReport};
pub use media::{DatasetStore, MediaHit, MediaSearchReport, Platform, PlatformDataReport};
pub use search::{keyword_search, KeywordMatch, KeywordSearchReport, MatchLocation};

use serde_json::{json, Map, Value};
use std::path::Path;
use thiserror::Error;

/// Errors raised by engine operations.
///
/// Every variant renders to a message the model can act on; file-related
/// variants also carry the path so callers can tell failures apart.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("File {0} not found in any known location")]
    FileNotFound(String),

    #[error("Directory {0} not found")]
    DirectoryNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("File encoding error: {0} is not valid UTF-8")]
    Encoding(String),

    #[error("Failed to parse JSON file")]
    MalformedJson { path: String, preview: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required {}: {}", parameter_noun(.0), .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),

    #[error("No numeric values found for field '{0}'")]
    NoNumericValues(String),

    #[error("Unknown platform: {0}. Expected 'instagram', 'youtube' or 'all'")]
    UnknownPlatform(String),

    #[error("Consolidated data not found. Run the media consolidation step first")]
    DatasetMissing { dir: String },

    #[error("No {kind} data found for platform: {platform}")]
    NoPlatformData { kind: &'static str, platform: String },
}

fn parameter_noun(names: &[String]) -> &'static str {
    if names.len() == 1 {
        "parameter"
    } else {
        "parameters"
    }
}

impl EngineError {
    /// Classify an I/O failure on `path`.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => EngineError::FileNotFound(path),
            std::io::ErrorKind::PermissionDenied => EngineError::PermissionDenied(path),
            std::io::ErrorKind::InvalidData => EngineError::Encoding(path),
            _ => EngineError::Io { path, source: err },
        }
    }

    pub fn missing(names: &[&str]) -> Self {
        EngineError::MissingParameters(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors caused by the call's parameters; retrying cannot change them.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            EngineError::MissingParameters(_)
                | EngineError::InvalidParameter { .. }
                | EngineError::UnknownOperation(_)
                | EngineError::UnknownOperator(_)
                | EngineError::UnknownPlatform(_)
        )
    }

    /// Render as a tool result: `{"error": ...}` plus any context fields.
    pub fn to_tool_result(&self) -> Value {
        let mut out = Map::new();
        out.insert("error".to_string(), Value::String(self.to_string()));

        match self {
            EngineError::FileNotFound(path)
            | EngineError::PermissionDenied(path)
            | EngineError::Encoding(path)
            | EngineError::Io { path, .. } => {
                out.insert("filename".to_string(), json!(path));
            }
            EngineError::MalformedJson { path, preview } => {
                out.insert("filename".to_string(), json!(path));
                out.insert("content_preview".to_string(), json!(preview));
            }
            EngineError::DatasetMissing { dir } => {
                out.insert("directory".to_string(), json!(dir));
                out.insert(
                    "suggestion".to_string(),
                    json!("Consolidate the scraped Instagram/YouTube files into the consolidated directory"),
                );
            }
            _ => {}
        }

        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameters_message() {
        assert_eq!(
            EngineError::missing(&["query"]).to_string(),
            "Missing required parameter: query"
        );
        assert_eq!(
            EngineError::missing(&["data", "keywords"]).to_string(),
            "Missing required parameters: data, keywords"
        );
    }

    #[test]
    fn test_io_errors_are_distinguishable() {
        let path = Path::new("feed.json");
        let not_found = EngineError::from_io(path, std::io::ErrorKind::NotFound.into());
        let denied = EngineError::from_io(path, std::io::ErrorKind::PermissionDenied.into());
        let encoding = EngineError::from_io(path, std::io::ErrorKind::InvalidData.into());

        assert!(matches!(not_found, EngineError::FileNotFound(_)));
        assert!(matches!(denied, EngineError::PermissionDenied(_)));
        assert!(matches!(encoding, EngineError::Encoding(_)));
        assert_eq!(denied.to_tool_result()["filename"], "feed.json");
    }

    #[test]
    fn test_malformed_result_carries_preview() {
        let err = EngineError::MalformedJson {
            path: "bad.json".to_string(),
            preview: "{oops".to_string(),
        };
        let result = err.to_tool_result();
        assert_eq!(result["error"], "Failed to parse JSON file");
        assert_eq!(result["content_preview"], "{oops");
    }
}
