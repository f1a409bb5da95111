//! MCP command implementation.

use crate::agent::ToolRegistry;
use crate::config::Settings;
use crate::mcp::McpServer;
use anyhow::Result;
use std::sync::Arc;

/// Run the MCP server on stdio.
pub async fn run_mcp(settings: Settings) -> Result<()> {
    let registry = Arc::new(ToolRegistry::from_settings(&settings));
    let server = McpServer::new(registry);
    server.run().await
}
