use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use super::registry::ToolCatalog;
use super::types::{ResolvedArguments, ToolCallRequest, ToolCallResult};
use crate::error::{HandlerError, ToolError};

/// Runs catalog handlers. Holds no backend state of its own.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<ToolCatalog>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self {
            catalog,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Invokes `tool_name`. Handler failures, panics included, come back as
    /// [`ToolError::Execution`]; an expired tool timeout as
    /// [`ToolError::Timeout`].
    pub async fn invoke(&self, tool_name: &str, args: &ResolvedArguments) -> Result<Value, ToolError> {
        let entry = self.catalog.lookup(tool_name)?;
        let schema = &entry.descriptor.parameters;
        if let Some(missing) = schema.first_missing(args) {
            return Err(ToolError::MissingRequiredArgument {
                tool: tool_name.to_string(),
                parameter: missing.name.clone(),
            });
        }

        let mut call_args = args.clone();
        for param in schema.iter() {
            if call_args.contains_key(&param.name) {
                continue;
            }
            if let Some(default) = &param.default {
                call_args.insert(param.name.clone(), default.clone());
            }
        }

        let started = Instant::now();
        let call = AssertUnwindSafe(entry.handler.call(call_args)).catch_unwind();
        let outcome = match self.timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(tool = tool_name, ?after, "tool call timed out");
                    return Err(ToolError::Timeout {
                        tool: tool_name.to_string(),
                        after,
                    });
                }
            },
            None => call.await,
        };
        debug!(tool = tool_name, elapsed_ms = started.elapsed().as_millis() as u64, "tool call finished");

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => Err(HandlerError::Panicked(panic_message(panic))),
        };
        result.map_err(|source| ToolError::Execution {
            tool: tool_name.to_string(),
            source,
        })
    }

    /// Invokes the tool named by `request` and packages the outcome.
    pub async fn call(&self, request: &ToolCallRequest, args: ResolvedArguments) -> ToolCallResult {
        match self.invoke(&request.tool_name, &args).await {
            Ok(value) => ToolCallResult::success(request, args, value),
            Err(err) => ToolCallResult::failure(request, Some(args), &err),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{ParamDecl, RawArguments, ToolHandler, ToolOutput};
    use serde_json::json;

    fn catalog() -> Arc<ToolCatalog> {
        let mut catalog = ToolCatalog::new();
        catalog
            .register(
                "update_ticket",
                ToolHandler::new(
                    vec![
                        ParamDecl::required("ticket_id"),
                        ParamDecl::optional("status", Value::Null),
                    ],
                    |args| async move { Ok(Value::Object(args)) },
                ),
                "",
            )
            .unwrap();
        catalog
            .register(
                "broken",
                ToolHandler::new(vec![], |_| async move {
                    Err(HandlerError::Backend("db offline".to_string()))
                }),
                "",
            )
            .unwrap();
        catalog
            .register(
                "explodes",
                ToolHandler::new(vec![], |_| async move {
                    if true {
                        panic!("boom");
                    }
                    Ok(Value::Null)
                }),
                "",
            )
            .unwrap();
        catalog
            .register(
                "slow",
                ToolHandler::new(vec![], |_| async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                }),
                "",
            )
            .unwrap();
        Arc::new(catalog)
    }

    fn args(value: Value) -> ResolvedArguments {
        match value {
            Value::Object(map) => map,
            _ => ResolvedArguments::new(),
        }
    }

    #[tokio::test]
    async fn test_invoke_fills_defaults() {
        let dispatcher = Dispatcher::new(catalog());
        let out = dispatcher
            .invoke("update_ticket", &args(json!({"ticket_id": "T1"})))
            .await
            .unwrap();
        assert_eq!(out, json!({"ticket_id": "T1", "status": null}));
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let dispatcher = Dispatcher::new(catalog());
        let err = dispatcher.invoke("nope", &ResolvedArguments::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn test_invoke_missing_required() {
        let dispatcher = Dispatcher::new(catalog());
        let err = dispatcher
            .invoke("update_ticket", &args(json!({"status": "closed"})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::MissingRequiredArgument { ref parameter, .. } if parameter == "ticket_id"
        ));
    }

    #[tokio::test]
    async fn test_handler_error_wrapped() {
        let dispatcher = Dispatcher::new(catalog());
        let err = dispatcher.invoke("broken", &ResolvedArguments::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Execution { source: HandlerError::Backend(_), .. }));
    }

    #[tokio::test]
    async fn test_handler_panic_wrapped() {
        let dispatcher = Dispatcher::new(catalog());
        let err = dispatcher.invoke("explodes", &ResolvedArguments::new()).await.unwrap_err();
        match err {
            ToolError::Execution { source: HandlerError::Panicked(msg), .. } => assert_eq!(msg, "boom"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let dispatcher = Dispatcher::new(catalog()).with_timeout(Some(Duration::from_millis(50)));
        let err = dispatcher.invoke("slow", &ResolvedArguments::new()).await.unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
    }

    #[tokio::test]
    async fn test_call_packages_result() {
        let dispatcher = Dispatcher::new(catalog());
        let request = ToolCallRequest::new("broken", RawArguments::default()).with_id("c1");
        let result = dispatcher.call(&request, ResolvedArguments::new()).await;
        assert!(matches!(result.output, ToolOutput::Error { ref code, .. } if code == "EXECUTION_FAILED"));
        assert_eq!(result.call_id.as_deref(), Some("c1"));
    }
}
