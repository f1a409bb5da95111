//! Tool catalog: descriptors, parameter handling and dispatch into the engine.

use super::retry::{retry, RetryError, RetryPolicy};
use crate::config::Settings;
use crate::engine::{
    aggregate_data, compare_files, extract_hashtags, filter_json, keyword_search, list_json_files,
    read_json_file, AggregateOperation, DatasetStore, EngineError, FileResolver, Platform,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Broad JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    Object,
    /// Any JSON value, or a list of strings for keyword lists.
    Any,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
}

/// Static description of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParamSpec>,
    pub required: Vec<&'static str>,
}

impl ToolDescriptor {
    /// JSON Schema for the parameters, as MCP clients expect it.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                let mut prop = Map::new();
                match p.kind {
                    ParamKind::Any => {}
                    kind => {
                        prop.insert("type".to_string(), json!(kind));
                    }
                }
                prop.insert("description".to_string(), json!(p.description));
                (p.name.to_string(), Value::Object(prop))
            })
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// One catalog entry for the prompt.
    pub fn prompt_line(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                let marker = if self.required.contains(&p.name) { "" } else { ", optional" };
                format!("{} ({}{})", p.name, p.description, marker)
            })
            .collect::<Vec<_>>()
            .join("; ");
        format!("- {}: {}\n  Parameters: {}", self.name, self.description, params)
    }
}

fn param(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        description,
        kind,
    }
}

type Params = Map<String, Value>;
type Handler = fn(&Toolbox, &Params) -> Result<Value, EngineError>;

struct Tool {
    descriptor: ToolDescriptor,
    handler: Handler,
}

/// Read-only resources the tool handlers work against.
#[derive(Debug, Clone)]
pub struct Toolbox {
    pub files: FileResolver,
    pub datasets: DatasetStore,
}

impl Toolbox {
    pub fn new(files: FileResolver, datasets: DatasetStore) -> Self {
        Self { files, datasets }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let root = settings.dataset_root();
        let consolidated = root.join(&settings.dataset.consolidated_dir);
        Self {
            files: FileResolver::new(&root, &settings.dataset.search_dirs),
            datasets: DatasetStore::new(consolidated),
        }
    }
}

/// Every tool the agent can call, keyed by name.
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<&'static str, usize>,
    toolbox: Toolbox,
    retry: RetryPolicy,
}

impl ToolRegistry {
    /// Registry with the full built-in tool set.
    pub fn new(toolbox: Toolbox, retry: RetryPolicy) -> Self {
        let mut registry = Self {
            tools: Vec::new(),
            index: HashMap::new(),
            toolbox,
            retry,
        };
        for (descriptor, handler) in builtin_tools() {
            registry.register(descriptor, handler);
        }
        registry
    }

    /// Registry over the configured dataset, with the configured tool retry.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Toolbox::from_settings(settings),
            RetryPolicy::from(&settings.agent.tool_retry),
        )
    }

    fn register(&mut self, descriptor: ToolDescriptor, handler: Handler) {
        self.index.insert(descriptor.name, self.tools.len());
        self.tools.push(Tool { descriptor, handler });
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i].descriptor)
    }

    /// Catalog text listed in the agent prompt.
    pub fn catalog_text(&self) -> String {
        self.descriptors()
            .map(ToolDescriptor::prompt_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Validate and run one tool call from its raw name and parameters.
    ///
    /// Validation failures are returned as error results without retry.
    pub async fn dispatch(&self, tool: &Value, parameters: &Value, cancel: &CancellationToken) -> Value {
        let Some(name) = tool.as_str() else {
            return error_result("Tool name not specified in action");
        };
        self.execute(name, parameters, cancel).await
    }

    /// Run a registered tool, retrying while the result carries an error.
    ///
    /// Always returns a result mapping: `success: true` plus the payload, or
    /// `error` plus optional context fields.
    pub async fn execute(&self, name: &str, parameters: &Value, cancel: &CancellationToken) -> Value {
        let Some(&idx) = self.index.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return error_result(&format!("Unknown tool: {}", name));
        };
        let Value::Object(params) = parameters else {
            return error_result("Parameters must be a dictionary");
        };

        let tool = &self.tools[idx];
        if let Err(e) = check_required(&tool.descriptor, params) {
            return e.to_tool_result();
        }
        info!("Executing tool {} with {} parameter(s)", name, params.len());

        // invalid input settles the call on the first attempt
        let outcome = retry(self.retry, cancel, name, |attempt| {
            debug!("Tool {} attempt {}", name, attempt);
            let result = (tool.handler)(&self.toolbox, params);
            async move {
                match result {
                    Err(e) if !e.is_invalid_input() => Err(ToolFailure(e.to_tool_result())),
                    settled => Ok(settled),
                }
            }
        })
        .await;

        match outcome {
            Ok(Ok(payload)) => success_result(payload),
            Ok(Err(e)) => e.to_tool_result(),
            Err(RetryError::Exhausted(ToolFailure(result))) => result,
            Err(RetryError::Cancelled) => error_result("Run cancelled"),
        }
    }
}

/// An error result, carried through the retry loop.
struct ToolFailure(Value);

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.get("error").and_then(Value::as_str) {
            Some(msg) => f.write_str(msg),
            None => write!(f, "{}", self.0),
        }
    }
}

fn success_result(payload: Value) -> Value {
    match payload {
        Value::Object(fields) => {
            let mut out = Map::new();
            out.insert("success".to_string(), Value::Bool(true));
            out.extend(fields);
            Value::Object(out)
        }
        other => json!({"success": true, "result": other}),
    }
}

pub(crate) fn error_result(message: &str) -> Value {
    json!({ "error": message })
}

fn check_required(descriptor: &ToolDescriptor, params: &Params) -> Result<(), EngineError> {
    let missing: Vec<&str> = descriptor
        .required
        .iter()
        .copied()
        .filter(|name| params.get(*name).is_none_or(is_blank))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::missing(&missing))
    }
}

/// Absent-equivalent values for required parameters.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

// Parameter accessors. Required parameters have been checked for presence.

fn data_param<'a>(params: &'a Params, name: &str) -> Result<&'a Value, EngineError> {
    params.get(name).ok_or_else(|| EngineError::missing(&[name]))
}

fn str_param<'a>(params: &'a Params, name: &str) -> Result<&'a str, EngineError> {
    match params.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(EngineError::invalid(name, "expected a string")),
        None => Err(EngineError::missing(&[name])),
    }
}

fn opt_str_param<'a>(params: &'a Params, name: &str, default: &'a str) -> Result<&'a str, EngineError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(EngineError::invalid(name, "expected a string")),
    }
}

fn opt_bool_param(params: &Params, name: &str, default: bool) -> Result<bool, EngineError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(EngineError::invalid(name, "expected true or false")),
    }
}

fn opt_count_param(params: &Params, name: &str, default: usize) -> Result<usize, EngineError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .map(|n| n as usize)
            .ok_or_else(|| EngineError::invalid(name, "expected a non-negative integer")),
    }
}

fn platform_param(params: &Params) -> Result<Platform, EngineError> {
    opt_str_param(params, "platform", "all")?.parse()
}

/// Keywords arrive as a list of strings or one string.
fn keywords_param(params: &Params) -> Result<Vec<String>, EngineError> {
    match data_param(params, "keywords")? {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| EngineError::invalid("keywords", "expected strings"))
            })
            .collect(),
        _ => Err(EngineError::invalid("keywords", "expected a string or a list of strings")),
    }
}

// Handlers

fn handle_get_consolidated_data(toolbox: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let report = toolbox.datasets.consolidated(platform_param(params)?)?;
    Ok(json!({ "platform": report.platform, "data": report.datasets }))
}

fn handle_get_media_summary(toolbox: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let report = toolbox.datasets.summary(platform_param(params)?)?;
    Ok(json!({ "platform": report.platform, "summaries": report.datasets }))
}

fn handle_search_media_content(toolbox: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let query = str_param(params, "query")?;
    let platform = platform_param(params)?;
    let limit = opt_count_param(params, "limit", 20)?;
    to_payload(&toolbox.datasets.search(query, platform, limit)?)
}

fn handle_list_json_files(toolbox: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let directory = opt_str_param(params, "directory", ".")?;
    to_payload(&list_json_files(&toolbox.files, directory)?)
}

fn handle_read_json_file(toolbox: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let filename = str_param(params, "filename")?;
    to_payload(&read_json_file(&toolbox.files, filename)?)
}

fn handle_keyword_search(_: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let data = data_param(params, "data")?;
    let keywords = keywords_param(params)?;
    let case_sensitive = opt_bool_param(params, "case_sensitive", false)?;
    to_payload(&keyword_search(data, &keywords, case_sensitive))
}

fn handle_filter_json(_: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let data = data_param(params, "data")?;
    let Value::Object(filters) = data_param(params, "filters")? else {
        return Err(EngineError::invalid("filters", "expected an object of field conditions"));
    };
    to_payload(&filter_json(data, filters)?)
}

fn handle_aggregate_data(_: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let data = data_param(params, "data")?;
    let field = str_param(params, "field")?;
    let operation: AggregateOperation = opt_str_param(params, "operation", "count")?.parse()?;
    to_payload(&aggregate_data(data, field, operation)?)
}

fn handle_extract_hashtags(_: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    to_payload(&extract_hashtags(data_param(params, "data")?))
}

fn handle_compare_files(toolbox: &Toolbox, params: &Params) -> Result<Value, EngineError> {
    let file1 = toolbox.files.resolve(str_param(params, "file1")?)?;
    let file2 = toolbox.files.resolve(str_param(params, "file2")?)?;
    to_payload(&compare_files(&file1, &file2)?)
}

fn to_payload<T: Serialize>(report: &T) -> Result<Value, EngineError> {
    serde_json::to_value(report).map_err(|e| EngineError::invalid("result", e.to_string()))
}

fn builtin_tools() -> Vec<(ToolDescriptor, Handler)> {
    vec![
        (
            ToolDescriptor {
                name: "get_consolidated_data",
                description: "Get consolidated Instagram and/or YouTube data",
                parameters: vec![param("platform", ParamKind::String, "'instagram', 'youtube' or 'all' (default 'all')")],
                required: vec![],
            },
            handle_get_consolidated_data as Handler,
        ),
        (
            ToolDescriptor {
                name: "get_media_summary",
                description: "Get summary statistics of the consolidated media data",
                parameters: vec![param("platform", ParamKind::String, "'instagram', 'youtube' or 'all' (default 'all')")],
                required: vec![],
            },
            handle_get_media_summary as Handler,
        ),
        (
            ToolDescriptor {
                name: "search_media_content",
                description: "Search captions, titles, descriptions and tags across media, ranked by engagement",
                parameters: vec![
                    param("query", ParamKind::String, "Text to search for"),
                    param("platform", ParamKind::String, "'instagram', 'youtube' or 'all' (default 'all')"),
                    param("limit", ParamKind::Integer, "Maximum number of results (default 20)"),
                ],
                required: vec!["query"],
            },
            handle_search_media_content as Handler,
        ),
        (
            ToolDescriptor {
                name: "list_json_files",
                description: "List JSON files in a directory, newest first",
                parameters: vec![param("directory", ParamKind::String, "Directory to list (default '.')")],
                required: vec![],
            },
            handle_list_json_files as Handler,
        ),
        (
            ToolDescriptor {
                name: "read_json_file",
                description: "Read a JSON file from the dataset directories",
                parameters: vec![param("filename", ParamKind::String, "File name or path")],
                required: vec!["filename"],
            },
            handle_read_json_file as Handler,
        ),
        (
            ToolDescriptor {
                name: "keyword_search",
                description: "Search JSON data for keywords in keys and string values",
                parameters: vec![
                    param("data", ParamKind::Any, "JSON data to search"),
                    param("keywords", ParamKind::Any, "Keyword or list of keywords"),
                    param("case_sensitive", ParamKind::Boolean, "Match case exactly (default false)"),
                ],
                required: vec!["data", "keywords"],
            },
            handle_keyword_search as Handler,
        ),
        (
            ToolDescriptor {
                name: "filter_json",
                description: "Filter JSON objects by field conditions ($gt, $lt, $gte, $lte, $eq, $ne, $in, $contains)",
                parameters: vec![
                    param("data", ParamKind::Any, "JSON data to filter"),
                    param("filters", ParamKind::Object, "Field to value or operator mapping"),
                ],
                required: vec!["data", "filters"],
            },
            handle_filter_json as Handler,
        ),
        (
            ToolDescriptor {
                name: "aggregate_data",
                description: "Aggregate a field across JSON data (count, sum, avg, min, max)",
                parameters: vec![
                    param("data", ParamKind::Any, "JSON data to aggregate"),
                    param("field", ParamKind::String, "Field name to aggregate"),
                    param("operation", ParamKind::String, "count, sum, avg, min or max (default count)"),
                ],
                required: vec!["data", "field"],
            },
            handle_aggregate_data as Handler,
        ),
        (
            ToolDescriptor {
                name: "extract_hashtags",
                description: "Extract and count hashtags from text in JSON data",
                parameters: vec![param("data", ParamKind::Any, "JSON data to scan")],
                required: vec!["data"],
            },
            handle_extract_hashtags as Handler,
        ),
        (
            ToolDescriptor {
                name: "compare_files",
                description: "Compare two JSON files and list their structural differences",
                parameters: vec![
                    param("file1", ParamKind::String, "First file"),
                    param("file2", ParamKind::String, "Second file"),
                ],
                required: vec!["file1", "file2"],
            },
            handle_compare_files as Handler,
        ),
    ]
}
