//! MCP tool definitions for Feedscope.

use super::protocol::Tool;
use crate::agent::ToolRegistry;

/// MCP view of every registered tool.
pub fn get_tools(registry: &ToolRegistry) -> Vec<Tool> {
    registry
        .descriptors()
        .map(|descriptor| Tool {
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            input_schema: descriptor.input_schema(),
        })
        .collect()
}
