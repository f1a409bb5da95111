//! CLI command implementations.

mod agent;
mod config;
mod mcp;
mod serve;
mod summary;
mod tools;

pub use agent::{run_agent, AgentOptions};
pub use config::run_config;
pub use mcp::run_mcp;
pub use serve::{router, run_serve, AppState};
pub use summary::run_summary;
pub use tools::{run_exec, run_tools};
