//! MCP server implementation.

use super::protocol::*;
use super::tools::get_tools;
use crate::agent::ToolRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "feedscope";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Feedscope.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    cancel: CancellationToken,
}

impl McpServer {
    /// Create a new MCP server over a tool registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
        }
    }

    /// Run the MCP server (reads from stdin, writes to stdout).
    ///
    /// Stdout carries only JSON-RPC; logs go to stderr.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        info!("Feedscope MCP server starting");

        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            stdout.write_all(out.as_bytes()).await?;
            stdout.flush().await?;
        }

        self.cancel.cancel();
        info!("stdin closed, MCP server stopping");
        Ok(())
    }

    /// Handle one line of input; `None` when nothing should be written back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                Some(JsonRpcResponse::error(None, codes::PARSE_ERROR, "Parse error"))
            }
        }
    }

    /// Handle a single JSON-RPC request.
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("MCP request: {}", request.method);

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                codes::INVALID_REQUEST,
                "Expected jsonrpc 2.0",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id.clone()),
            "notifications/initialized" | "initialized" => JsonRpcResponse::success(request.id.clone(), json!({})),
            "ping" => JsonRpcResponse::success(request.id.clone(), json!({})),
            "tools/list" => self.handle_tools_list(request.id.clone()),
            "tools/call" => {
                self.handle_tools_call(request.id.clone(), request.params.clone())
                    .await
            }
            _ => JsonRpcResponse::error(
                request.id.clone(),
                codes::METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        };

        if request.is_notification() {
            None
        } else {
            Some(response)
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        to_response(id, &result)
    }

    /// Handle tools/list request.
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: get_tools(&self.registry),
        };
        to_response(id, &result)
    }

    /// Handle tools/call request.
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        &format!("Invalid params: {}", e),
                    )
                }
            },
            None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing params"),
        };

        info!("MCP tool call: {}", params.name);
        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = self
            .registry
            .execute(&params.name, &arguments, &self.cancel)
            .await;

        to_response(id, &ToolCallResult::from_tool_result(&result))
    }
}

fn to_response<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, codes::INTERNAL_ERROR, &format!("Internal error: {}", e)),
    }
}
