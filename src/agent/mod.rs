//! Tool-calling agent over the data query engine.
//!
//! The agent prompts a language model with the tool catalog, parses the
//! structured action out of each reply, runs the requested tool and feeds the
//! result back until the model answers or the iteration budget runs out.

mod catalog;
mod model;
mod parse;
mod retry;
mod runner;

pub use catalog::{ParamKind, ParamSpec, ToolDescriptor, ToolRegistry, Toolbox};
pub use model::{collect_text, LanguageModel, OpenAIModel, TextStream};
pub use parse::{parse_action, Action};
pub use retry::{retry, RetryError, RetryPolicy};
pub use runner::{Agent, AgentEvent, AgentRun, IterationRecord, RunOutcome};
