use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{HandlerError, ToolError};

/// Arguments after resolution: parameter name to value.
pub type ResolvedArguments = Map<String, Value>;

pub type HandlerFuture = BoxFuture<'static, Result<Value, HandlerError>>;
pub type HandlerFn = Arc<dyn Fn(ResolvedArguments) -> HandlerFuture + Send + Sync>;

/// JSON type advertised to the model for a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter as a handler declares it.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub default: Option<Value>,
    pub type_hint: Option<TypeTag>,
}

impl ParamDecl {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            type_hint: None,
        }
    }

    pub fn optional(name: &str, default: Value) -> Self {
        Self {
            name: name.to_string(),
            default: Some(default),
            type_hint: None,
        }
    }

    pub fn typed(mut self, tag: TypeTag) -> Self {
        self.type_hint = Some(tag);
        self
    }
}

/// One parameter as advertised in a descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub type_tag: TypeTag,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Ordered parameter list of a tool.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    /// The parameter of a tool that declares exactly one.
    pub fn single(&self) -> Option<&ParamSpec> {
        match self.params.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// First required name absent from `args`.
    pub fn first_missing(&self, args: &ResolvedArguments) -> Option<&ParamSpec> {
        self.required().find(|p| !args.contains_key(&p.name))
    }

    /// Function-calling parameter object understood by OpenAI and Gemini.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(param.name.clone(), json!({ "type": param.type_tag.as_str() }));
        }
        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        let required: Vec<&str> = self.required().map(|p| p.name.as_str()).collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDescriptor {
    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.to_json_schema(),
        }
    }
}

/// Wire form of a descriptor, as sent to providers and HTTP clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone)]
pub struct ToolHandler {
    params: Vec<ParamDecl>,
    func: HandlerFn,
}

impl ToolHandler {
    pub fn new<F, Fut>(params: Vec<ParamDecl>, func: F) -> Self
    where
        F: Fn(ResolvedArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        Self {
            params,
            func: Arc::new(move |args| func(args).boxed()),
        }
    }

    /// Declared signature, read once when the handler is registered.
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    pub fn call(&self, args: ResolvedArguments) -> HandlerFuture {
        (self.func)(args)
    }
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandler").field("params", &self.params).finish()
    }
}

pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    pub handler: ToolHandler,
}

/// Arguments exactly as the model supplied them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArguments {
    Structured(Map<String, Value>),
    Encoded(String),
    Scalar(Value),
}

impl RawArguments {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => RawArguments::Structured(map),
            Value::String(text) => RawArguments::Encoded(text),
            other => RawArguments::Scalar(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RawArguments::Structured(map) => Value::Object(map.clone()),
            RawArguments::Encoded(text) => Value::String(text.clone()),
            RawArguments::Scalar(value) => value.clone(),
        }
    }
}

impl Default for RawArguments {
    fn default() -> Self {
        RawArguments::Scalar(Value::Null)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tool_name: String,
    #[serde(default)]
    pub raw_arguments: RawArguments,
}

impl ToolCallRequest {
    pub fn new(tool_name: &str, raw_arguments: RawArguments) -> Self {
        Self {
            id: None,
            tool_name: tool_name.to_string(),
            raw_arguments,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutput {
    Success { value: Value },
    Error { code: String, message: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_arguments: Option<ResolvedArguments>,
    pub output: ToolOutput,
}

impl ToolCallResult {
    pub fn success(request: &ToolCallRequest, resolved: ResolvedArguments, value: Value) -> Self {
        Self {
            tool_name: request.tool_name.clone(),
            call_id: request.id.clone(),
            resolved_arguments: Some(resolved),
            output: ToolOutput::Success { value },
        }
    }

    pub fn failure(
        request: &ToolCallRequest,
        resolved: Option<ResolvedArguments>,
        err: &ToolError,
    ) -> Self {
        Self {
            tool_name: request.tool_name.clone(),
            call_id: request.id.clone(),
            resolved_arguments: resolved,
            output: ToolOutput::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.output, ToolOutput::Success { .. })
    }

    /// Text placed in the tool-result turn.
    pub fn observation(&self) -> String {
        match &self.output {
            ToolOutput::Success { value } => value.to_string(),
            ToolOutput::Error { code, message } => {
                json!({ "error": { "code": code, "message": message } }).to_string()
            }
        }
    }
}

pub fn required_str(args: &ResolvedArguments, name: &str) -> Result<String, HandlerError> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(HandlerError::InvalidInput(format!("{} is required", name))),
        Some(other) => Ok(other.to_string()),
    }
}

pub fn optional_str(args: &ResolvedArguments, name: &str) -> Option<String> {
    match args.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, required: bool) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            type_tag: TypeTag::String,
            required,
            default: None,
        }
    }

    #[test]
    fn test_json_schema_lists_required() {
        let schema = ParameterSchema::new(vec![param("ticket_id", true), param("status", false)]);
        let rendered = schema.to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["status"]["type"], "string");
        assert_eq!(rendered["required"], json!(["ticket_id"]));
    }

    #[test]
    fn test_json_schema_omits_empty_required() {
        let rendered = ParameterSchema::default().to_json_schema();
        assert!(rendered.get("required").is_none());
        assert_eq!(rendered["properties"], json!({}));
    }

    #[test]
    fn test_raw_arguments_deserialize_by_shape() {
        let structured: RawArguments = serde_json::from_value(json!({"q": "login"})).unwrap();
        assert!(matches!(structured, RawArguments::Structured(_)));
        let encoded: RawArguments = serde_json::from_value(json!("{\"q\":\"login\"}")).unwrap();
        assert!(matches!(encoded, RawArguments::Encoded(_)));
        let scalar: RawArguments = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(scalar, RawArguments::Scalar(json!(42)));
    }

    #[test]
    fn test_error_observation_has_marker() {
        let request = ToolCallRequest::new("get_ticket", RawArguments::default()).with_id("call_1");
        let result = ToolCallResult::failure(&request, None, &ToolError::NotAllowed("get_ticket".into()));
        assert!(!result.is_success());
        let parsed: Value = serde_json::from_str(&result.observation()).unwrap();
        assert_eq!(parsed["error"]["code"], "NOT_ALLOWED");
        assert_eq!(result.call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_string_argument_helpers() {
        let mut args = ResolvedArguments::new();
        args.insert("ticket_id".into(), json!("T123"));
        args.insert("status".into(), Value::Null);
        assert_eq!(required_str(&args, "ticket_id").unwrap(), "T123");
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(optional_str(&args, "status"), None);
    }
}
