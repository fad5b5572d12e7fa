use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct CLIConfig {
    pub base_url: String,
    pub provider: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub debug: bool,
    pub allowed_tools: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Overrides only apply when the request opens a new session.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub system_prompt: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub allowed_tools: Option<Vec<String>>,
    pub debug: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub output: String,
    pub session_id: Option<String>,
    #[serde(default)]
    pub round_trips: usize,
    pub trace: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallOutcome {
    pub tool_name: String,
    pub resolved_arguments: Option<Value>,
    pub output: Value,
}
