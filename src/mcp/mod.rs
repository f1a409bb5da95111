//! MCP (Model Context Protocol) server for Feedscope.
//!
//! Exposes the agent's tool registry to MCP clients.
//! Implements JSON-RPC 2.0 over stdio.

mod protocol;
mod server;
mod tools;

pub use server::McpServer;
