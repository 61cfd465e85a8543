// src/llm/json_extract.rs
// Best-effort JSON extraction from an LLM chat-completion response:
// handles markdown code fences, bare objects and "structured output"
// wrapper shapes some providers use (ported from the teacher's
// `extract_json_from_response`).

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::debug;

pub fn extract_json_from_response(response: &str) -> Result<String> {
    // STRATEGY 0: provider "structured output" wrapper, e.g.
    // {"output": [{"type": "message", "content": [{"type": "output_text", "text": "..."}]}]}
    if let Ok(value) = serde_json::from_str::<Value>(response) {
        if let Some(output_array) = value.get("output").and_then(|o| o.as_array()) {
            debug!("detected provider structured-output wrapper");
            for item in output_array {
                if item.get("type").and_then(|t| t.as_str()) == Some("message") {
                    if let Some(content_array) = item.get("content").and_then(|c| c.as_array()) {
                        for content_item in content_array {
                            if content_item.get("type").and_then(|t| t.as_str()) == Some("output_text") {
                                if let Some(text) = content_item.get("text").and_then(|t| t.as_str()) {
                                    return Ok(text.to_string());
                                }
                            }
                        }
                    }
                }
            }
            return Err(anyhow!("no content in structured-output wrapper"));
        }

        // Already valid JSON, not wrapped.
        return Ok(response.to_string());
    }

    // STRATEGY 1: fenced ```json ... ``` block.
    if let Some(opening_pos) = response.find("```") {
        let backtick_count = response[opening_pos..].chars().take_while(|&c| c == '`').count();
        let after_backticks = &response[opening_pos + backtick_count..];

        if after_backticks.trim_start().starts_with("json") {
            let json_keyword_end = after_backticks.find("json").map(|i| i + 4).unwrap_or(0);
            let json_start = opening_pos + backtick_count + json_keyword_end;
            let closing_marker = "`".repeat(backtick_count);

            if let Some(relative_closing) = response[json_start..].find(&closing_marker) {
                let json_end = json_start + relative_closing;
                if json_start < json_end && json_end <= response.len() {
                    let trimmed = response[json_start..json_end].trim();
                    if !trimmed.is_empty() && serde_json::from_str::<Value>(trimmed).is_ok() {
                        return Ok(trimmed.to_string());
                    }
                }
            }
        }
    }

    // STRATEGY 2: raw `{...}` object anywhere in the text.
    if let (Some(obj_start), Some(obj_end)) = (response.find('{'), response.rfind('}')) {
        if obj_start < obj_end {
            let candidate = &response[obj_start..=obj_end];
            if serde_json::from_str::<Value>(candidate).is_ok() {
                return Ok(candidate.to_string());
            }
        }
    }

    Err(anyhow!(
        "no valid JSON found in LLM response (first 200 chars): {}",
        &response[..response.len().min(200)]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_fenced_code_block() {
        let response = "Here you go:\n```json\n{\"intent\": \"product_search\"}\n```\nHope that helps.";
        let json = extract_json_from_response(response).unwrap();
        assert_eq!(json, "{\"intent\": \"product_search\"}");
    }

    #[test]
    fn extracts_bare_json_object() {
        let response = "{\"intent\": \"greeting\", \"confidence\": 0.9}";
        let json = extract_json_from_response(response).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["intent"], "greeting");
    }

    #[test]
    fn extracts_json_embedded_in_prose() {
        let response = "Sure, the classification is {\"intent\": \"help\"} as requested.";
        let json = extract_json_from_response(response).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["intent"], "help");
    }

    #[test]
    fn fails_on_no_json() {
        assert!(extract_json_from_response("no json here at all").is_err());
    }
}
