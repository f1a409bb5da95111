//! Reading and listing JSON files on disk.

use super::json::{safe_parse, truncate_chars, type_name};
use super::EngineError;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const CONTENT_PREVIEW_CHARS: usize = 200;

/// Resolves file names against the dataset root and its search directories.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
    search_dirs: Vec<PathBuf>,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>, search_dirs: &[String]) -> Self {
        Self {
            root: root.into(),
            search_dirs: search_dirs.iter().map(PathBuf::from).collect(),
        }
    }

    /// Path of `name` relative to the root, without checking that it exists.
    pub fn under_root(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Find an existing file: first as given, then inside each search directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        let direct = self.under_root(name);
        if direct.exists() {
            return Ok(direct);
        }

        self.search_dirs
            .iter()
            .map(|dir| self.root.join(dir).join(name))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| EngineError::FileNotFound(name.to_string()))
    }
}

/// Read and parse a JSON file, tolerating fenced or comma-damaged content.
pub fn load_json_file(path: &Path) -> Result<Value, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::from_io(path, e))?;

    safe_parse(&content).ok_or_else(|| EngineError::MalformedJson {
        path: path.display().to_string(),
        preview: truncate_chars(&content, CONTENT_PREVIEW_CHARS),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFileSummary {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub keys: Option<Vec<String>>,
    pub length: Option<usize>,
    pub file_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFileReport {
    pub filename: String,
    pub data: Value,
    pub summary: JsonFileSummary,
}

/// Resolve `filename` and load it with a shape summary.
pub fn read_json_file(resolver: &FileResolver, filename: &str) -> Result<JsonFileReport, EngineError> {
    let path = resolver.resolve(filename)?;
    debug!("Reading JSON file {}", path.display());

    let data = load_json_file(&path)?;
    let file_size = std::fs::metadata(&path)
        .map_err(|e| EngineError::from_io(&path, e))?
        .len();

    let (keys, length) = match &data {
        Value::Object(map) => (Some(map.keys().cloned().collect()), Some(map.len())),
        Value::Array(items) => (None, Some(items.len())),
        _ => (None, None),
    };

    Ok(JsonFileReport {
        filename: path.display().to_string(),
        summary: JsonFileSummary {
            kind: type_name(&data),
            keys,
            length,
            file_size,
        },
        data,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFileEntry {
    pub filename: String,
    pub path: String,
    pub size_bytes: u64,
    pub size_kb: f64,
    /// RFC 3339 local time.
    pub modified: String,
    #[serde(skip)]
    modified_at: SystemTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFileListing {
    pub directory: String,
    pub count: usize,
    pub files: Vec<JsonFileEntry>,
}

/// List `*.json` files directly inside `directory`, newest first.
///
/// Entries whose metadata cannot be read are skipped.
pub fn list_json_files(resolver: &FileResolver, directory: &str) -> Result<JsonFileListing, EngineError> {
    let dir = resolver.under_root(directory);
    if !dir.is_dir() {
        return Err(EngineError::DirectoryNotFound(directory.to_string()));
    }

    let entries = std::fs::read_dir(&dir).map_err(|e| EngineError::from_io(&dir, e))?;

    let mut files: Vec<JsonFileEntry> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| {
            let meta = std::fs::metadata(&path).ok()?;
            let modified_at = meta.modified().ok()?;
            let size = meta.len();
            Some(JsonFileEntry {
                filename: path.file_name()?.to_string_lossy().to_string(),
                path: path.display().to_string(),
                size_bytes: size,
                size_kb: (size as f64 / 1024.0 * 100.0).round() / 100.0,
                modified: DateTime::<Local>::from(modified_at).to_rfc3339(),
                modified_at,
            })
        })
        .collect();

    files.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));

    Ok(JsonFileListing {
        directory: dir.display().to_string(),
        count: files.len(),
        files,
    })
}
