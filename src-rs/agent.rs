use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::{ToolError, TurnError};
use crate::llm::{CompletionRequest, LLMResponse, LLMRouter, Message};
use crate::result::TurnResult;
use crate::tools::{
    allowlist, resolve_arguments, AllowedToolSet, Dispatcher, ResolvedArguments, ToolCallRequest, ToolCallResult,
    ToolCatalog, ToolDescriptor, ToolOutput,
};

static SESSION_COUNTER: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingUserInput,
    ModelPending,
    ToolCallsPending,
    Done,
}

/// Shared, read-only pieces every session is built from.
pub struct Agent {
    pub name: String,
    pub config: AgentConfig,
    allowed: AllowedToolSet,
    router: Arc<LLMRouter>,
    catalog: Arc<ToolCatalog>,
}

impl Agent {
    /// Fails if the configured allowlist names a tool the catalog lacks.
    pub fn new(
        name: &str,
        config: AgentConfig,
        router: Arc<LLMRouter>,
        catalog: Arc<ToolCatalog>,
    ) -> Result<Self, ToolError> {
        let resolved_name = if name.is_empty() { "agent" } else { name };
        let config = config.normalized();
        let allowed = AllowedToolSet::from_config(&catalog, config.session.allowed_tools.as_deref())?;
        Ok(Self {
            name: resolved_name.to_string(),
            config,
            allowed,
            router,
            catalog,
        })
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Allowlist of the agent's own config.
    pub fn allowed(&self) -> &AllowedToolSet {
        &self.allowed
    }

    pub fn start_session(&self) -> Session {
        self.open(self.config.clone(), self.allowed.clone())
    }

    /// Starts a session with its own config; the allowlist is fixed here.
    pub fn start_session_with(&self, config: AgentConfig) -> Result<Session, ToolError> {
        let config = config.normalized();
        let allowed = AllowedToolSet::from_config(&self.catalog, config.session.allowed_tools.as_deref())?;
        Ok(self.open(config, allowed))
    }

    fn open(&self, config: AgentConfig, allowed: AllowedToolSet) -> Session {
        let dispatcher = Dispatcher::new(self.catalog.clone()).with_timeout(config.session.tool_timeout);
        let id = next_session_id();
        let now = Utc::now();
        info!(agent = %self.name, session = %id, tools = allowed.len(), "session started");
        Session {
            history: vec![Message::system(&config.system_prompt)],
            id,
            started_at: now,
            last_active: now,
            config,
            allowed,
            router: self.router.clone(),
            dispatcher,
            state: LoopState::AwaitingUserInput,
            cancel: CancellationToken::new(),
        }
    }
}

/// One conversation. Turns run strictly one after another; the history is
/// dropped with the session.
pub struct Session {
    id: String,
    started_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    config: AgentConfig,
    allowed: AllowedToolSet,
    router: Arc<LLMRouter>,
    dispatcher: Dispatcher,
    history: Vec<Message>,
    state: LoopState,
    cancel: CancellationToken,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the last turn started.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn allowed(&self) -> &AllowedToolSet {
        &self.allowed
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// `AwaitingUserInput` between turns.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Token that stops the current (or next) turn before its next model
    /// call. A cancelled token is replaced once that turn ends, so later
    /// turns run normally.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Schemas the model sees: the catalog filtered by this session's allowlist.
    pub fn visible_tools(&self) -> Vec<ToolDescriptor> {
        allowlist::filter(self.dispatcher.catalog().list_all(), &self.allowed)
            .cloned()
            .collect()
    }

    /// Runs one user turn to a final answer.
    ///
    /// Tool-level failures go back to the model as error results. Only an
    /// unknown tool, an unavailable or slow model, cancellation, or running
    /// out of round trips end the turn early; the history built so far stays
    /// on the session.
    pub async fn run_turn(&mut self, user_input: &str) -> Result<TurnResult, TurnError> {
        self.last_active = Utc::now();
        self.history.push(Message::user(user_input));
        let outcome = self.drive(self.visible_tools()).await;
        if let Err(err) = &outcome {
            warn!(session = %self.id, code = err.code(), error = %err, "turn ended early");
        }
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.state = LoopState::AwaitingUserInput;
        outcome
    }

    async fn drive(&mut self, tools: Vec<ToolDescriptor>) -> Result<TurnResult, TurnError> {
        let max_round_trips = self.config.session.max_round_trips;
        let mut tool_results = Vec::new();

        for round in 1..=max_round_trips {
            if self.cancel.is_cancelled() {
                return Err(TurnError::Cancelled);
            }
            self.state = LoopState::ModelPending;
            let response = self.call_model(&tools).await?;
            debug!(session = %self.id, round, tool_calls = response.tool_calls.len(), "model responded");

            if response.tool_calls.is_empty() {
                self.state = LoopState::Done;
                self.history.push(Message::assistant(&response.content));
                info!(session = %self.id, round_trips = round, "turn complete");
                return Ok(TurnResult {
                    session_id: self.id.clone(),
                    output: response.content,
                    round_trips: round,
                    tool_results,
                });
            }

            self.state = LoopState::ToolCallsPending;
            let calls = with_call_ids(response.tool_calls, round);
            self.history
                .push(Message::assistant_tool_calls(&response.content, calls.clone()));

            if let Some(unknown) = calls.iter().find(|c| !self.dispatcher.catalog().has(&c.tool_name)) {
                let tool_name = unknown.tool_name.clone();
                for call in &calls {
                    let err = ToolError::UnknownTool(tool_name.clone());
                    self.history
                        .push(Message::tool_result(&ToolCallResult::failure(call, None, &err)));
                }
                return Err(TurnError::UnknownTool(tool_name));
            }

            for call in &calls {
                let result = self.run_tool_call(call).await;
                self.history.push(Message::tool_result(&result));
                tool_results.push(result);
            }
        }

        Err(TurnError::LoopBudgetExceeded { max_round_trips })
    }

    async fn call_model(&self, tools: &[ToolDescriptor]) -> Result<LLMResponse, TurnError> {
        let request = CompletionRequest {
            messages: self.history.clone(),
            tools: if tools.is_empty() { None } else { Some(tools.to_vec()) },
            temperature: Some(self.config.temperature),
            model: Some(self.config.model.clone()),
            provider: Some(self.config.provider.clone()),
        };
        let call = self.router.complete(request);
        let response = match self.config.session.model_timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| TurnError::ModelTimeout { after })?,
            None => call.await,
        };
        Ok(response?)
    }

    /// Allowlist, then resolution, then dispatch. Never fails: every
    /// problem becomes an error result for the model.
    async fn run_tool_call(&self, call: &ToolCallRequest) -> ToolCallResult {
        let result = match self.prepare(call) {
            Ok(args) => self.dispatcher.call(call, args).await,
            Err(err) => ToolCallResult::failure(call, None, &err),
        };
        match &result.output {
            ToolOutput::Success { .. } => {
                info!(session = %self.id, tool = %call.tool_name, "tool call succeeded")
            }
            ToolOutput::Error { code, .. } => {
                warn!(session = %self.id, tool = %call.tool_name, code = %code, "tool call failed")
            }
        }
        result
    }

    fn prepare(&self, call: &ToolCallRequest) -> Result<ResolvedArguments, ToolError> {
        allowlist::check(&call.tool_name, &self.allowed)?;
        let entry = self.dispatcher.catalog().lookup(&call.tool_name)?;
        resolve_arguments(&entry.descriptor, &call.raw_arguments)
    }
}

fn with_call_ids(calls: Vec<ToolCallRequest>, round: usize) -> Vec<ToolCallRequest> {
    calls
        .into_iter()
        .enumerate()
        .map(|(idx, mut call)| {
            if call.id.is_none() {
                call.id = Some(format!("call_{}_{}", round, idx + 1));
            }
            call
        })
        .collect()
}

fn next_session_id() -> String {
    let count = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("session_{}_{}", Utc::now().timestamp_millis(), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RawArguments;

    #[test]
    fn test_call_ids_assigned_when_missing() {
        let calls = vec![
            ToolCallRequest::new("a", RawArguments::default()),
            ToolCallRequest::new("b", RawArguments::default()).with_id("given"),
        ];
        let calls = with_call_ids(calls, 2);
        assert_eq!(calls[0].id.as_deref(), Some("call_2_1"));
        assert_eq!(calls[1].id.as_deref(), Some("given"));
    }

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(next_session_id(), next_session_id());
    }
}
