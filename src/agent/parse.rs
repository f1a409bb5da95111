//! Extracting the structured action from free-form model output.

use crate::engine::json::safe_parse;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("valid json fence regex"));

static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(.*?)```").expect("valid fence regex"));

/// What the model asked for on one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Run a tool. Name and parameters are unvalidated.
    UseTool { tool: Value, parameters: Value },
    /// A final answer given through the structured format.
    Answer(String),
    /// No usable structure; the raw text is the answer.
    Unstructured(String),
}

/// Classify a model reply.
///
/// Tries a ```` ```json ```` block, then any fenced block, then the first
/// embedded object carrying an `action` key.
pub fn parse_action(text: &str) -> Action {
    let Some(object) = extract_object(text) else {
        return Action::Unstructured(text.to_string());
    };

    match object.get("action").and_then(Value::as_str) {
        Some("use_tool") => Action::UseTool {
            tool: object.get("tool").cloned().unwrap_or(Value::Null),
            parameters: object
                .get("parameters")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        },
        Some("answer") => match object.get("response").and_then(Value::as_str) {
            Some(response) => Action::Answer(response.to_string()),
            None => Action::Answer(text.to_string()),
        },
        _ => Action::Unstructured(text.to_string()),
    }
}

fn extract_object(text: &str) -> Option<Map<String, Value>> {
    for fence in [&*JSON_FENCE, &*ANY_FENCE] {
        if let Some(Value::Object(map)) = fence
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|body| safe_parse(body.as_str()))
        {
            return Some(map);
        }
    }

    embedded_action_object(text)
}

/// First `{...}` in `text` that parses as an object with an `action` key.
fn embedded_action_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(map))) if map.contains_key("action") => Some(map),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_answer() {
        let action = parse_action(r#"{"action": "answer", "response": "Top tag is #yoga"}"#);
        assert_eq!(action, Action::Answer("Top tag is #yoga".to_string()));
    }

    #[test]
    fn test_fenced_tool_call_with_trailing_comma() {
        let text = "Let me check.\n```json\n{\"action\": \"use_tool\", \"tool\": \"get_media_summary\", \"parameters\": {\"platform\": \"all\",},}\n```";
        assert_eq!(
            parse_action(text),
            Action::UseTool {
                tool: json!("get_media_summary"),
                parameters: json!({"platform": "all"}),
            }
        );
    }

    #[test]
    fn test_unlabelled_fence() {
        let text = "```\n{\"action\": \"answer\", \"response\": \"done\"}\n```";
        assert_eq!(parse_action(text), Action::Answer("done".to_string()));
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let text = "I will look {briefly} at it: {\"action\": \"use_tool\", \"tool\": \"extract_hashtags\", \"parameters\": {\"data\": {\"c\": \"#a\"}}} then answer.";
        match parse_action(text) {
            Action::UseTool { tool, parameters } => {
                assert_eq!(tool, json!("extract_hashtags"));
                assert_eq!(parameters, json!({"data": {"c": "#a"}}));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_plain_prose_is_unstructured() {
        let text = "The most liked post is from March.";
        assert_eq!(parse_action(text), Action::Unstructured(text.to_string()));
    }

    #[test]
    fn test_unknown_action_falls_back_to_raw_text() {
        let text = r#"{"action": "think", "thought": "hmm"}"#;
        assert_eq!(parse_action(text), Action::Unstructured(text.to_string()));
    }

    #[test]
    fn test_missing_parameters_default_to_empty() {
        let action = parse_action(r#"{"action": "use_tool", "tool": "list_json_files"}"#);
        assert_eq!(
            action,
            Action::UseTool {
                tool: json!("list_json_files"),
                parameters: json!({}),
            }
        );
    }

    #[test]
    fn test_answer_without_response_uses_raw_text() {
        let text = r#"{"action": "answer"}"#;
        assert_eq!(parse_action(text), Action::Answer(text.to_string()));
    }
}
