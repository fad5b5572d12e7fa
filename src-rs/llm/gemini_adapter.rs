use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::rotation::Rotator;
use super::transport::{send_json, with_key_rotation};
use super::types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, Role};
use crate::tools::{RawArguments, ToolCallRequest, ToolDescriptor};

const GEMINI_ALLOWED_MODELS: [&str; 3] = ["gemini-2.0-flash", "gemini-2.5-flash", "gemini-2.5-pro"];

pub struct GeminiConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
}

pub struct GeminiAdapter {
    cfg: GeminiConfig,
    rotator: Rotator,
    client: Client,
}

impl GeminiAdapter {
    pub fn new(mut cfg: GeminiConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = "https://generativelanguage.googleapis.com".to_string();
        }
        if cfg.model.is_empty() {
            cfg.model = "gemini-2.0-flash".to_string();
        }
        if cfg.temperature == 0.0 {
            cfg.temperature = 0.3;
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
impl ProviderAdapter for GeminiAdapter {
    async fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.cfg.model.clone());
        if !GEMINI_ALLOWED_MODELS.iter().any(|m| *m == model) {
            return Err(ProviderError::new(
                "invalid_model",
                &format!("model not allowed: {}", model),
                false,
            ));
        }
        let temperature = request.temperature.unwrap_or(self.cfg.temperature);
        let payload = build_payload(&request.messages, request.tools.as_deref(), temperature);
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            self.cfg.base_url.trim_end_matches('/'),
            model
        );

        let raw = with_key_rotation("Gemini", &self.rotator, |key| {
            let call = self
                .client
                .post(endpoint.as_str())
                .header("x-goog-api-key", key)
                .json(&payload);
            send_json(call)
        })
        .await?;

        let (content, tool_calls) = parse_response(&raw);
        Ok(LLMResponse {
            content,
            tool_calls,
            raw: Some(raw),
        })
    }
}

fn build_payload(messages: &[Message], tools: Option<&[ToolDescriptor]>, temperature: f64) -> Value {
    let mut contents = Vec::new();
    let mut system_instruction = None;

    let mut prev_was_tool = false;

    for msg in messages {
        let is_tool = msg.role == Role::Tool;
        match msg.role {
            Role::System => system_instruction = Some(msg.content.clone()),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{"text": msg.content}]
            })),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(json!({"text": msg.content}));
                }
                for call in &msg.tool_calls {
                    parts.push(json!({
                        "functionCall": {
                            "name": call.tool_name,
                            "args": args_object(&call.raw_arguments),
                        }
                    }));
                }
                contents.push(json!({"role": "model", "parts": parts}));
            }
            Role::Tool => {
                let result = serde_json::from_str::<Value>(&msg.content)
                    .unwrap_or_else(|_| Value::String(msg.content.clone()));
                let part = json!({
                    "functionResponse": {
                        "name": msg.name.clone().unwrap_or_default(),
                        "response": {"result": result}
                    }
                });
                // all responses to one function-call turn share a content
                let grouped = match contents.last_mut() {
                    Some(last) if prev_was_tool => last
                        .get_mut("parts")
                        .and_then(Value::as_array_mut)
                        .map(|parts| parts.push(part.clone()))
                        .is_some(),
                    _ => false,
                };
                if !grouped {
                    contents.push(json!({"role": "user", "parts": [part]}));
                }
            }
        }
        prev_was_tool = is_tool;
    }

    let mut payload = json!({
        "contents": contents,
        "generationConfig": {
            "temperature": temperature
        }
    });

    if let Some(system) = system_instruction {
        payload["systemInstruction"] = json!({
            "parts": [{"text": system}]
        });
    }

    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                let mut decl = json!({
                    "name": tool.name,
                    "description": tool.description,
                });
                if !tool.parameters.is_empty() {
                    decl["parameters"] = tool.parameters.to_json_schema();
                }
                decl
            })
            .collect();
        payload["tools"] = json!([
            {
                "functionDeclarations": declarations
            }
        ]);
    }

    payload
}

/// Gemini only takes objects as function-call args.
fn args_object(raw: &RawArguments) -> Value {
    match raw {
        RawArguments::Structured(map) => Value::Object(map.clone()),
        RawArguments::Encoded(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Value::Object(map),
            _ => json!({}),
        },
        RawArguments::Scalar(_) => json!({}),
    }
}

fn parse_response(raw: &Value) -> (String, Vec<ToolCallRequest>) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    let parts = raw
        .get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|list| list.first())
        .and_then(|first| first.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|v| v.as_array());
    let parts = match parts {
        Some(parts) => parts,
        None => return (text, tool_calls),
    };

    for part in parts {
        if let Some(chunk) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(chunk);
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let args = fc.get("args").cloned().unwrap_or(Value::Null);
            let mut call = ToolCallRequest::new(name, RawArguments::from_value(args));
            call.id = fc.get("id").and_then(|v| v.as_str()).map(str::to_string);
            tool_calls.push(call);
        }
    }

    (text, tool_calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::tools::{infer_schema, ParamDecl, ToolCallResult};

    #[test]
    fn test_parse_function_call() {
        let raw = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Checking."},
                    {"functionCall": {"name": "get_ticket", "args": {"ticket_id": "T123"}}}
                ]}
            }]
        });
        let (text, calls) = parse_response(&raw);
        assert_eq!(text, "Checking.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "get_ticket");
        assert!(matches!(calls[0].raw_arguments, RawArguments::Structured(_)));
    }

    #[test]
    fn test_payload_carries_declarations_and_results() {
        let tools = vec![ToolDescriptor {
            name: "get_ticket".into(),
            description: "Fetch a support ticket by ID.".into(),
            parameters: infer_schema(&[ParamDecl::required("ticket_id")]),
        }];
        let call = ToolCallRequest::new("get_ticket", RawArguments::Encoded("{\"ticket_id\":\"T1\"}".into()));
        let result = ToolCallResult::failure(&call, None, &ToolError::NotAllowed("get_ticket".into()));
        let messages = vec![
            Message::system("You are a support assistant."),
            Message::user("status of T1?"),
            Message::assistant_tool_calls("", vec![call.clone()]),
            Message::tool_result(&result),
        ];
        let payload = build_payload(&messages, Some(&tools), 0.3);

        assert_eq!(payload["systemInstruction"]["parts"][0]["text"], "You are a support assistant.");
        let decl = &payload["tools"][0]["functionDeclarations"][0];
        assert_eq!(decl["parameters"]["required"], json!(["ticket_id"]));
        assert_eq!(payload["contents"][1]["parts"][0]["functionCall"]["args"]["ticket_id"], "T1");
        let response = &payload["contents"][2]["parts"][0]["functionResponse"];
        assert_eq!(response["name"], "get_ticket");
        assert_eq!(response["response"]["result"]["error"]["code"], "NOT_ALLOWED");
    }

    #[test]
    fn test_parallel_results_share_one_content() {
        let first = ToolCallRequest::new("get_ticket", RawArguments::Encoded("{\"ticket_id\":\"T1\"}".into()));
        let second = ToolCallRequest::new("get_customer", RawArguments::Encoded("{\"customer_id\":\"C1\"}".into()));
        let ok = ToolCallResult::success(&first, Default::default(), json!({"status": "open"}));
        let customer = ToolCallResult::success(&second, Default::default(), json!({"name": "Alice"}));
        let messages = vec![
            Message::user("who filed T1?"),
            Message::assistant_tool_calls("", vec![first.clone(), second.clone()]),
            Message::tool_result(&ok),
            Message::tool_result(&customer),
            Message::user("thanks"),
        ];
        let payload = build_payload(&messages, None, 0.3);

        let contents = payload["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 4);
        let parts = contents[2]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["functionResponse"]["name"], "get_ticket");
        assert_eq!(parts[1]["functionResponse"]["name"], "get_customer");
        assert_eq!(contents[3]["parts"][0]["text"], "thanks");
    }
}
