use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::rotation::Rotator;
use super::transport::{send_json, with_key_rotation};
use super::types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, Role};
use crate::tools::{RawArguments, ToolCallRequest, ToolDescriptor};

pub struct OpenAIConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
}

/// Chat-completions adapter. Tool-call arguments come back as JSON text.
pub struct OpenAIAdapter {
    cfg: OpenAIConfig,
    rotator: Rotator,
    client: Client,
}

impl OpenAIAdapter {
    pub fn new(mut cfg: OpenAIConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = "https://api.openai.com".to_string();
        }
        if cfg.model.is_empty() {
            cfg.model = "gpt-4o-mini".to_string();
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ProviderError::new("client_error", &err.to_string(), false))?;
        Ok(Self {
            rotator: Rotator::new(cfg.api_keys.clone()),
            cfg,
            client,
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    async fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.cfg.model.clone());
        let temperature = request.temperature.unwrap_or(self.cfg.temperature);
        let payload = build_payload(&model, &request.messages, request.tools.as_deref(), temperature);
        let endpoint = format!("{}/v1/chat/completions", self.cfg.base_url.trim_end_matches('/'));

        let raw = with_key_rotation("OpenAI", &self.rotator, |key| {
            let call = self
                .client
                .post(endpoint.as_str())
                .bearer_auth(key)
                .json(&payload);
            send_json(call)
        })
        .await?;

        let (content, tool_calls) = parse_response(&raw)?;
        Ok(LLMResponse {
            content,
            tool_calls,
            raw: Some(raw),
        })
    }
}

fn build_payload(model: &str, messages: &[Message], tools: Option<&[ToolDescriptor]>, temperature: f64) -> Value {
    let wire: Vec<Value> = messages.iter().map(wire_message).collect();
    let mut payload = json!({
        "model": model,
        "messages": wire,
        "temperature": temperature,
    });
    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        let functions: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters.to_json_schema(),
                    }
                })
            })
            .collect();
        payload["tools"] = json!(functions);
    }
    payload
}

fn wire_message(msg: &Message) -> Value {
    match msg.role {
        Role::System => json!({"role": "system", "content": msg.content}),
        Role::User => json!({"role": "user", "content": msg.content}),
        Role::Assistant if msg.tool_calls.is_empty() => {
            json!({"role": "assistant", "content": msg.content})
        }
        Role::Assistant => {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id.clone().unwrap_or_default(),
                        "type": "function",
                        "function": {
                            "name": call.tool_name,
                            "arguments": encoded_arguments(&call.raw_arguments),
                        }
                    })
                })
                .collect();
            let content = if msg.content.is_empty() {
                Value::Null
            } else {
                Value::String(msg.content.clone())
            };
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
            "content": msg.content,
        }),
    }
}

fn encoded_arguments(raw: &RawArguments) -> String {
    match raw {
        RawArguments::Encoded(text) => text.clone(),
        other => other.to_value().to_string(),
    }
}

fn parse_response(raw: &Value) -> Result<(String, Vec<ToolCallRequest>), ProviderError> {
    let message = raw
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ProviderError::new("parse_error", "response has no choices", false))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let function = match call.get("function") {
                Some(function) => function,
                None => continue,
            };
            let name = function.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let arguments = function.get("arguments").cloned().unwrap_or(Value::Null);
            let mut request = ToolCallRequest::new(name, RawArguments::from_value(arguments));
            request.id = call.get("id").and_then(|v| v.as_str()).map(str::to_string);
            tool_calls.push(request);
        }
    }
    Ok((content, tool_calls))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encoded_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "update_ticket", "arguments": "{\"ticket_id\":\"T123\",\"status\":\"resolved\"}"}
                    }]
                }
            }]
        });
        let (content, calls) = parse_response(&raw).unwrap();
        assert!(content.is_empty());
        assert_eq!(calls[0].id.as_deref(), Some("call_abc"));
        assert!(matches!(calls[0].raw_arguments, RawArguments::Encoded(_)));
    }

    #[test]
    fn test_parse_without_choices_fails() {
        assert_eq!(parse_response(&json!({})).unwrap_err().code, "parse_error");
    }

    #[test]
    fn test_wire_messages() {
        let call = ToolCallRequest::new("get_ticket", RawArguments::Scalar(json!("T123"))).with_id("call_1");
        let assistant = wire_message(&Message::assistant_tool_calls("", vec![call]));
        assert_eq!(assistant["content"], Value::Null);
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], "\"T123\"");

        let mut tool = Message::assistant("unused");
        tool.role = Role::Tool;
        tool.tool_call_id = Some("call_1".into());
        assert_eq!(wire_message(&tool)["tool_call_id"], "call_1");
    }
}
