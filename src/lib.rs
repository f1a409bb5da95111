//! Feedscope - a tool-calling agent over scraped social-media data
//!
//! Answers natural-language questions about Instagram and YouTube datasets by
//! letting a language model call deterministic JSON query tools.
//!
//! # Architecture
//!
//! - `engine` - Data query engine: search, filter, aggregate, hashtags, diff,
//!   file access and the consolidated media datasets
//! - `agent` - Tool registry, retry policy, model boundary and the agent loop
//! - `config` - Settings and prompt templates
//! - `cli` - Command-line interface, HTTP server
//! - `mcp` - MCP server over stdio
//!
//! # Example
//!
//! ```rust,no_run
//! use feedscope::agent::{Agent, OpenAIModel, ToolRegistry};
//! use feedscope::config::Settings;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let model = Arc::new(OpenAIModel::from_settings(&settings.model)?);
//!     let registry = Arc::new(ToolRegistry::from_settings(&settings));
//!     let agent = Agent::from_settings(&settings, model, registry)?;
//!
//!     let run = agent.run("Which hashtags appear most often?", None).await;
//!     println!("{}", run.final_answer().unwrap_or("no answer"));
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod mcp;
pub mod openai;

pub use error::{FeedscopeError, Result};
