//! Configuration module for Feedscope.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, DatasetSettings, GeneralSettings, ModelSettings, PromptSettings,
    RetrySettings, ServerSettings, Settings,
};
