//! Error taxonomy for the tool bridge and the agent loop.
//!
//! Errors split by blast radius:
//!
//! | Type | Scope | Fate |
//! |------|-------|------|
//! | [`ToolError`] | one tool call (or catalog setup) | written back into the conversation |
//! | [`TurnError`] | one user turn | returned to the caller, history kept |
//! | [`HandlerError`] | inside a tool handler | wrapped by [`ToolError::Execution`] |

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::llm::ProviderError;

/// Failure raised by a tool handler itself.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }
}

/// Errors about a single tool call, or about catalog integrity at startup.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool not allowed in this session: {0}")]
    NotAllowed(String),

    #[error("cannot resolve arguments for tool {tool}: {raw}")]
    ArgumentResolution { tool: String, raw: Value },

    #[error("missing required argument '{parameter}' for tool {tool}")]
    MissingRequiredArgument { tool: String, parameter: String },

    #[error("tool {tool} failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: HandlerError,
    },

    #[error("tool {tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },
}

impl ToolError {
    /// Stable marker written into the conversation for the model to react to.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::DuplicateTool(_) => "DUPLICATE_TOOL",
            ToolError::UnknownTool(_) => "UNKNOWN_TOOL",
            ToolError::NotAllowed(_) => "NOT_ALLOWED",
            ToolError::ArgumentResolution { .. } => "INVALID_ARGUMENT",
            ToolError::MissingRequiredArgument { .. } => "MISSING_ARGUMENT",
            ToolError::Execution { .. } => "EXECUTION_FAILED",
            ToolError::Timeout { .. } => "TIMEOUT",
        }
    }
}

/// Errors that end the current turn. The session keeps its partial history.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("model requested a tool that is not in the catalog: {0}")]
    UnknownTool(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(#[from] ProviderError),

    #[error("model call timed out after {after:?}")]
    ModelTimeout { after: Duration },

    #[error("turn exceeded {max_round_trips} model round trips")]
    LoopBudgetExceeded { max_round_trips: usize },

    #[error("turn cancelled")]
    Cancelled,
}

impl TurnError {
    pub fn code(&self) -> &'static str {
        match self {
            TurnError::UnknownTool(_) => "UNKNOWN_TOOL",
            TurnError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            TurnError::ModelTimeout { .. } => "MODEL_TIMEOUT",
            TurnError::LoopBudgetExceeded { .. } => "LOOP_BUDGET_EXCEEDED",
            TurnError::Cancelled => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_error_keeps_cause() {
        let err = ToolError::Execution {
            tool: "get_ticket".to_string(),
            source: HandlerError::not_found("ticket", "T999"),
        };
        assert_eq!(err.code(), "EXECUTION_FAILED");
        assert!(err.to_string().contains("ticket not found: T999"));
        let cause = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(cause.as_deref(), Some("ticket not found: T999"));
    }

    #[test]
    fn test_argument_resolution_message_carries_payload() {
        let err = ToolError::ArgumentResolution {
            tool: "update_ticket".to_string(),
            raw: json!("resolved"),
        };
        assert_eq!(err.code(), "INVALID_ARGUMENT");
        assert!(err.to_string().contains("\"resolved\""));
    }

    #[test]
    fn test_turn_error_codes() {
        assert_eq!(
            TurnError::LoopBudgetExceeded { max_round_trips: 3 }.code(),
            "LOOP_BUDGET_EXCEEDED"
        );
        let err: TurnError = ProviderError::new("network_error", "down", true).into();
        assert_eq!(err.code(), "MODEL_UNAVAILABLE");
    }
}
