//! CLI output formatting utilities.

use crate::agent::{AgentEvent, ToolDescriptor};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a JSON value, pretty.
    pub fn json(value: &Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", value),
        }
    }

    /// Print one tool from the catalog.
    pub fn tool(descriptor: &ToolDescriptor) {
        println!(
            "  {} {} - {}",
            style("*").cyan(),
            style(descriptor.name).bold(),
            descriptor.description
        );
        for param in &descriptor.parameters {
            let required = if descriptor.required.contains(&param.name) {
                style("required").yellow().to_string()
            } else {
                style("optional").dim().to_string()
            };
            println!(
                "      {} ({}): {}",
                style(param.name).cyan(),
                required,
                param.description
            );
        }
    }

    /// One-line description of an agent event, for spinners and logs.
    pub fn event_line(event: &AgentEvent) -> Option<String> {
        match event {
            AgentEvent::Status { message, .. } => Some(message.clone()),
            AgentEvent::ToolCall { iteration, tool, parameters } => Some(format!(
                "[{}] {} {}",
                iteration,
                tool,
                content_preview(&parameters.to_string(), 80)
            )),
            AgentEvent::ToolResult { iteration, tool, result } => {
                let status = if result.get("error").is_some() { "failed" } else { "ok" };
                Some(format!("[{}] {} {}", iteration, tool, status))
            }
            _ => None,
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Single-line preview, cut at a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("a\nb", 10), "a b");
        assert_eq!(content_preview("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_event_line() {
        let call = AgentEvent::ToolResult {
            iteration: 2,
            tool: "read_json_file".to_string(),
            result: json!({"error": "File x not found in any known location"}),
        };
        assert_eq!(Output::event_line(&call).unwrap(), "[2] read_json_file failed");

        let done = AgentEvent::Done {
            status: "answered".to_string(),
            total_iterations: 1,
        };
        assert!(Output::event_line(&done).is_none());
    }
}
