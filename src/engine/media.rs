//! Lookups over the consolidated Instagram/YouTube datasets.
//!
//! The consolidation step that writes these files lives outside this crate;
//! here they are read-only snapshots, re-read on every call so external
//! rewrites are picked up.

use super::files::load_json_file;
use super::json::{as_number, truncate_chars};
use super::EngineError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

const TEXT_PREVIEW_CHARS: usize = 200;
const MAX_TAGS: usize = 10;

/// Dataset platform selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Youtube,
    All,
}

impl Platform {
    /// Concrete platforms covered by this selector.
    pub fn sources(self) -> &'static [Platform] {
        match self {
            Platform::Instagram => &[Platform::Instagram],
            Platform::Youtube => &[Platform::Youtube],
            Platform::All => &[Platform::Instagram, Platform::Youtube],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::All => "all",
        }
    }
}

impl FromStr for Platform {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instagram" | "ig" => Ok(Platform::Instagram),
            "youtube" | "yt" => Ok(Platform::Youtube),
            "all" | "" => Ok(Platform::All),
            _ => Err(EngineError::UnknownPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which artifact of a platform to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Artifact {
    Consolidated,
    Summary,
}

impl Artifact {
    fn suffix(self) -> &'static str {
        match self {
            Artifact::Consolidated => "consolidated",
            Artifact::Summary => "summary",
        }
    }
}

/// Per-platform documents loaded for one request.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformDataReport {
    pub platform: Platform,
    /// Keyed by platform name; platforms without a file are absent.
    pub datasets: Map<String, Value>,
}

/// A ranked search hit, shaped per platform.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum MediaHit {
    Instagram {
        #[serde(rename = "type")]
        kind: String,
        url: String,
        caption: String,
        hashtags: Vec<String>,
        likes: Value,
        comments: Value,
        creator: String,
    },
    Youtube {
        url: String,
        title: String,
        description: String,
        tags: Vec<String>,
        views: Value,
        likes: Value,
        channel: String,
    },
}

impl MediaHit {
    /// `likes + views + comments`, missing or non-numeric counts as zero.
    pub fn engagement(&self) -> f64 {
        let n = |v: &Value| as_number(v).unwrap_or(0.0);
        match self {
            MediaHit::Instagram { likes, comments, .. } => n(likes) + n(comments),
            MediaHit::Youtube { views, likes, .. } => n(views) + n(likes),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaSearchReport {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<MediaHit>,
}

/// Read access to the consolidated dataset directory.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full consolidated records for `platform`.
    pub fn consolidated(&self, platform: Platform) -> Result<PlatformDataReport, EngineError> {
        self.load(platform, Artifact::Consolidated)
    }

    /// Lightweight per-platform summaries.
    pub fn summary(&self, platform: Platform) -> Result<PlatformDataReport, EngineError> {
        self.load(platform, Artifact::Summary)
    }

    fn load(&self, platform: Platform, artifact: Artifact) -> Result<PlatformDataReport, EngineError> {
        if !self.dir.is_dir() {
            return Err(EngineError::DatasetMissing {
                dir: self.dir.display().to_string(),
            });
        }

        let mut datasets = Map::new();
        for source in platform.sources() {
            let path = self
                .dir
                .join(format!("{}_{}.json", source.as_str(), artifact.suffix()));
            if !path.exists() {
                warn!("No {} file for {} at {}", artifact.suffix(), source, path.display());
                continue;
            }
            debug!("Loading {}", path.display());
            datasets.insert(source.as_str().to_string(), load_json_file(&path)?);
        }

        if datasets.is_empty() {
            return Err(EngineError::NoPlatformData {
                kind: artifact.suffix(),
                platform: platform.to_string(),
            });
        }

        Ok(PlatformDataReport { platform, datasets })
    }

    /// Case-insensitive search over captions, titles, descriptions and tags.
    ///
    /// Hits are ranked by engagement, highest first; equal engagement keeps
    /// collection order.
    pub fn search(&self, query: &str, platform: Platform, limit: usize) -> Result<MediaSearchReport, EngineError> {
        let report = self.consolidated(platform)?;
        let needle = query.to_lowercase();

        let mut results = Vec::new();

        if let Some(doc) = report.datasets.get(Platform::Instagram.as_str()) {
            for post in records(doc, "posts") {
                let caption = str_field(post, "caption");
                let hashtags = string_list(post, "hashtags");
                let tag_text = hashtags.join(" ").to_lowercase();

                if caption.to_lowercase().contains(&needle) || tag_text.contains(&needle) {
                    results.push(MediaHit::Instagram {
                        kind: str_field(post, "type").to_string(),
                        url: str_field(post, "url").to_string(),
                        caption: truncate_chars(caption, TEXT_PREVIEW_CHARS),
                        hashtags: hashtags.into_iter().take(MAX_TAGS).collect(),
                        likes: count_field(post, "likes"),
                        comments: count_field(post, "comments"),
                        creator: str_field(post, "creator").to_string(),
                    });
                }
            }
        }

        if let Some(doc) = report.datasets.get(Platform::Youtube.as_str()) {
            for video in records(doc, "videos") {
                let title = str_field(video, "title");
                let description = str_field(video, "description");
                let tags = string_list(video, "tags");
                let tag_text = tags.join(" ").to_lowercase();

                if title.to_lowercase().contains(&needle)
                    || description.to_lowercase().contains(&needle)
                    || tag_text.contains(&needle)
                {
                    results.push(MediaHit::Youtube {
                        url: str_field(video, "url").to_string(),
                        title: truncate_chars(title, TEXT_PREVIEW_CHARS),
                        description: truncate_chars(description, TEXT_PREVIEW_CHARS),
                        tags: tags.into_iter().take(MAX_TAGS).collect(),
                        views: count_field(video, "views"),
                        likes: count_field(video, "likes"),
                        channel: str_field(video, "channel").to_string(),
                    });
                }
            }
        }

        results.sort_by(|a, b| b.engagement().total_cmp(&a.engagement()));
        results.truncate(limit);

        Ok(MediaSearchReport {
            query: query.to_string(),
            total_results: results.len(),
            results,
        })
    }
}

/// Records of a platform document: a top-level array or the array under `key`.
fn records<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    match doc {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn str_field<'a>(record: &'a Value, key: &str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or("")
}

fn string_list(record: &Value, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn count_field(record: &Value, key: &str) -> Value {
    record.get(key).cloned().unwrap_or(Value::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn write(dir: &Path, name: &str, value: Value) {
        std::fs::write(dir.join(name), serde_json::to_string(&value).unwrap()).unwrap();
    }

    fn seeded_store() -> (tempfile::TempDir, DatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "instagram_consolidated.json",
            json!({"posts": [
                {"type": "reel", "caption": "Morning Yoga flow", "hashtags": ["wellness"], "likes": 50, "comments": 5, "creator": "ana", "url": "ig/1"},
                {"type": "post", "caption": "Lunch", "hashtags": ["Yoga", "food"], "likes": 500, "comments": 20, "creator": "ben", "url": "ig/2"},
                {"type": "post", "caption": "Cats", "hashtags": [], "likes": 9000, "creator": "cy", "url": "ig/3"}
            ]}),
        );
        write(
            dir.path(),
            "youtube_consolidated.json",
            json!({"videos": [
                {"title": "Yoga for beginners", "description": "", "tags": [], "views": 300, "likes": 25, "channel": "flow", "url": "yt/1"},
                {"title": "Cooking", "description": "after yoga meals", "tags": ["food"], "views": 55, "likes": 0, "channel": "chef", "url": "yt/2"}
            ]}),
        );
        let store = DatasetStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_search_ranks_by_engagement() {
        let (_dir, store) = seeded_store();
        let report = store.search("yoga", Platform::All, 20).unwrap();

        let urls: Vec<_> = report
            .results
            .iter()
            .map(|hit| match hit {
                MediaHit::Instagram { url, .. } | MediaHit::Youtube { url, .. } => url.as_str(),
            })
            .collect();
        assert_eq!(urls, vec!["ig/2", "yt/1", "ig/1", "yt/2"]);
        assert_eq!(report.total_results, 4);
    }

    #[test]
    fn test_search_ties_keep_collection_order() {
        let (_dir, store) = seeded_store();
        // ig/1 scores 55 and yt/2 scores 55
        let report = store.search("yoga", Platform::All, 20).unwrap();
        let scores: Vec<_> = report.results.iter().map(MediaHit::engagement).collect();
        assert_eq!(scores, vec![520.0, 325.0, 55.0, 55.0]);
    }

    #[test]
    fn test_search_limit_and_platform() {
        let (_dir, store) = seeded_store();
        let report = store.search("YOGA", Platform::Youtube, 1).unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(matches!(report.results[0], MediaHit::Youtube { .. }));
    }

    #[test]
    fn test_partial_platform_data() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "youtube_summary.json", json!({"total_videos": 2}));
        let store = DatasetStore::new(dir.path());

        let report = store.summary(Platform::All).unwrap();
        assert_eq!(report.datasets.len(), 1);
        assert_eq!(report.datasets["youtube"], json!({"total_videos": 2}));

        let err = store.summary(Platform::Instagram).unwrap_err();
        assert_eq!(err.to_string(), "No summary data found for platform: instagram");
    }

    #[test]
    fn test_missing_directory() {
        let store = DatasetStore::new("/definitely/not/here");
        let err = store.consolidated(Platform::All).unwrap_err();
        assert!(matches!(err, EngineError::DatasetMissing { .. }));
        assert!(err.to_tool_result().get("suggestion").is_some());
    }

    #[test]
    fn test_rereads_after_external_rewrite() {
        let (dir, store) = seeded_store();
        assert_eq!(store.search("cats", Platform::Instagram, 5).unwrap().total_results, 1);

        write(dir.path(), "instagram_consolidated.json", json!({"posts": []}));
        assert_eq!(store.search("cats", Platform::Instagram, 5).unwrap().total_results, 0);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("YouTube".parse::<Platform>().unwrap(), Platform::Youtube);
        assert!("tiktok".parse::<Platform>().is_err());
    }
}
