//! Prompt templates for Feedscope.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the tool-calling agent.
///
/// Available variables: `{{tools}}`, `{{max_iterations}}`, `{{context}}`,
/// `{{query}}`, `{{history}}`, `{{iteration}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    /// Preamble sent on every iteration.
    pub system: String,
    /// Appended on the first iteration.
    pub first_turn: String,
    /// Appended once at least one tool has run.
    pub next_turn: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI agent with access to data analysis tools for scraped Instagram and YouTube data. You can use these tools to help answer user queries.

Available Tools:
{{tools}}

Instructions:
1. Analyze the user's query and determine which tools would be helpful
2. Call tools by responding with JSON in this format:
   {"action": "use_tool", "tool": "tool_name", "parameters": {"param": "value"}}
3. After getting tool results, you can call more tools or provide a final answer
4. Provide a final answer by responding with:
   {"action": "answer", "response": "your detailed answer"}
5. You have a maximum of {{max_iterations}} iterations (tool calls)

Current Context: {{context}}"#
                .to_string(),

            first_turn: r#"User Query: {{query}}

What would you like to do?"#
                .to_string(),

            next_turn: r#"User Query: {{query}}

Previous Actions:
{{history}}

You are on iteration {{iteration}}/{{max_iterations}}. What would you like to do next?"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass over the template; placeholders inside
    /// substituted values are left as they are. Unknown placeholders are kept.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
