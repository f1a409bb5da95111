//! HTTP API server for integration with other systems.
//!
//! Exposes the tool catalog, direct tool execution, agent runs (blocking or as
//! a server-sent event stream) and the consolidated dataset.

use crate::agent::{Agent, AgentEvent, AgentRun, LanguageModel, OpenAIModel, ToolDescriptor, ToolRegistry};
use crate::cli::Output;
use crate::config::Settings;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    agent: Agent,
    registry: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(settings: &Settings, model: Arc<dyn LanguageModel>) -> crate::error::Result<Self> {
        let registry = Arc::new(ToolRegistry::from_settings(settings));
        let agent = Agent::from_settings(settings, model, registry.clone())?;
        Ok(Self { agent, registry })
    }

    pub fn from_parts(agent: Agent) -> Self {
        Self {
            registry: agent.registry().clone(),
            agent,
        }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if !crate::openai::is_api_key_configured() {
        Output::warning("OPENAI_API_KEY is not set; agent endpoints will fail until it is.");
    }

    let model = Arc::new(OpenAIModel::from_settings(&settings.model)?);
    let state = Arc::new(AppState::new(&settings, model)?);
    let app = router(state);

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Feedscope API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Tools", "GET  /api/agent/tools");
    Output::kv("Execute tool", "POST /api/agent/execute-tool");
    Output::kv("Chat (SSE)", "POST /api/agent/chat");
    Output::kv("Run", "POST /api/agent/run");
    Output::kv("Summary", "GET  /api/consolidated/summary");
    Output::kv("Data", "GET  /api/consolidated/data/{platform}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/agent/tools", get(list_tools))
        .route("/api/agent/execute-tool", post(execute_tool))
        .route("/api/agent/chat", post(chat))
        .route("/api/agent/run", post(run_agent))
        .route("/api/consolidated/summary", get(consolidated_summary))
        .route("/api/consolidated/data/{platform}", get(consolidated_data))
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
pub struct ExecuteToolRequest {
    tool: String,
    #[serde(default = "empty_object")]
    parameters: Value,
}

#[derive(Deserialize)]
pub struct AgentRequest {
    query: String,
    #[serde(default)]
    context: Option<Value>,
}

#[derive(Deserialize)]
pub struct PlatformQuery {
    #[serde(default = "default_platform")]
    platform: String,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn default_platform() -> String {
    "all".to_string()
}

#[derive(Serialize)]
struct ToolsResponse<'a> {
    tools: Vec<&'a ToolDescriptor>,
    count: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Response {
    let tools: Vec<_> = state.registry.descriptors().collect();
    Json(ToolsResponse {
        count: tools.len(),
        tools,
    })
    .into_response()
}

async fn execute_tool(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteToolRequest>,
) -> impl IntoResponse {
    info!("Direct tool execution: {}", req.tool);
    let result = state
        .registry
        .execute(&req.tool, &req.parameters, &CancellationToken::new())
        .await;
    Json(result)
}

async fn run_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AgentRequest>,
) -> Response {
    if req.query.trim().is_empty() {
        return bad_request("query must not be empty");
    }

    let run: AgentRun = state.agent.run(&req.query, req.context.as_ref()).await;
    let status = if run.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(run)).into_response()
}

/// Stream agent events as SSE. Dropping the connection cancels the run.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AgentRequest>,
) -> Response {
    if req.query.trim().is_empty() {
        return bad_request("query must not be empty");
    }

    Sse::new(agent_event_stream(state, req))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn agent_event_stream(
    state: Arc<AppState>,
    req: AgentRequest,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    let cancel = CancellationToken::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<AgentEvent>();

    let run_cancel = cancel.clone();
    tokio::spawn(async move {
        let run = state
            .agent
            .run_with_events(&req.query, req.context.as_ref(), Some(&tx), &run_cancel)
            .await;
        info!("Streamed run {} finished: {}", run.id, run.outcome.status());
    });

    // cancels the run once the client goes away and the stream is dropped
    let guard = cancel.drop_guard();

    stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        let sse = Event::default().json_data(&event).inspect_err(|e| {
            warn!("Failed to encode agent event: {}", e);
        });
        Some((sse, (rx, guard)))
    })
}

async fn consolidated_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlatformQuery>,
) -> Response {
    dataset_response(&state, "get_media_summary", &query.platform).await
}

async fn consolidated_data(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
) -> Response {
    dataset_response(&state, "get_consolidated_data", &platform).await
}

async fn dataset_response(state: &AppState, tool: &str, platform: &str) -> Response {
    let result = state
        .registry
        .execute(tool, &json!({ "platform": platform }), &CancellationToken::new())
        .await;

    if result.get("error").is_some() {
        (StatusCode::NOT_FOUND, Json(result)).into_response()
    } else {
        Json(result).into_response()
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{RetryPolicy, Toolbox};
    use crate::engine::{DatasetStore, FileResolver};
    use crate::error::Result;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use futures::StreamExt;
    use std::time::Duration;

    struct FixedModel(&'static str);

    #[async_trait]
    impl LanguageModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn state(root: &std::path::Path, reply: &'static str) -> Arc<AppState> {
        let toolbox = Toolbox::new(
            FileResolver::new(root, &[".".to_string()]),
            DatasetStore::new(root.join("consolidated")),
        );
        let registry = Arc::new(ToolRegistry::new(toolbox, RetryPolicy::new(1, Duration::ZERO)));
        let agent = Agent::new(Arc::new(FixedModel(reply)), registry)
            .with_model_retry(RetryPolicy::none());
        Arc::new(AppState::from_parts(agent))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_tools() {
        let dir = tempfile::tempdir().unwrap();
        let response = list_tools(State(state(dir.path(), "ok"))).await;
        let body = body_json(response).await;
        assert_eq!(body["count"], json!(10));
        assert_eq!(body["tools"][0]["name"], "get_consolidated_data");
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExecuteToolRequest {
            tool: "extract_hashtags".to_string(),
            parameters: json!({"data": ["#a #b", "#a"]}),
        };
        let response = execute_tool(State(state(dir.path(), "ok")), Json(req))
            .await
            .into_response();
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["top_10"][0], json!(["a", 2]));
    }

    #[tokio::test]
    async fn test_run_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let req = AgentRequest {
            query: "hi".to_string(),
            context: None,
        };
        let response = run_agent(
            State(state(dir.path(), r#"{"action": "answer", "response": "hello"}"#)),
            Json(req),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "answered");
        assert_eq!(body["final_answer"], "hello");
    }

    #[tokio::test]
    async fn test_missing_dataset_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = consolidated_data(State(state(dir.path(), "ok")), Path("youtube".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body.get("suggestion").is_some());
    }

    #[tokio::test]
    async fn test_event_stream_ends_after_done() {
        let dir = tempfile::tempdir().unwrap();
        let req = AgentRequest {
            query: "hi".to_string(),
            context: None,
        };
        let events: Vec<_> = agent_event_stream(state(dir.path(), "plain answer"), req)
            .collect()
            .await;
        // status, content, done
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.is_ok()));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let req = AgentRequest {
            query: "  ".to_string(),
            context: None,
        };
        let response = chat(State(state(dir.path(), "ok")), Json(req)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
