use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::agent::{Agent, Session};
use crate::config::default_model;
use crate::error::{HandlerError, ToolError};
use crate::support::{SupportBackend, UpdateTicketRequest};
use crate::tools::{allowlist, resolve_arguments, Dispatcher, RawArguments, ToolCallRequest, ToolCallResult};

pub type SessionMap = HashMap<String, Arc<tokio::sync::Mutex<Session>>>;

pub const DEFAULT_MAX_SESSIONS: usize = 256;

/// Shared server state.
///
/// Sessions live in memory until deleted. Once `max_sessions` are open, the
/// least recently active idle session is evicted to make room; sessions in
/// the middle of a turn are never evicted.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub backend: Arc<dyn SupportBackend>,
    pub sessions: Arc<Mutex<SessionMap>>,
    max_sessions: usize,
}

impl AppState {
    pub fn new(agent: Arc<Agent>, backend: Arc<dyn SupportBackend>) -> Self {
        Self {
            agent,
            backend,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn session(&self, id: &str) -> Result<Option<Arc<tokio::sync::Mutex<Session>>>, ApiError> {
        let sessions = self.sessions.lock().map_err(|_| ApiError::internal("session lock error"))?;
        Ok(sessions.get(id).cloned())
    }

    fn insert_session(&self, session: Session) -> Result<Arc<tokio::sync::Mutex<Session>>, ApiError> {
        let id = session.id().to_string();
        let handle = Arc::new(tokio::sync::Mutex::new(session));
        let mut sessions = self.sessions.lock().map_err(|_| ApiError::internal("session lock error"))?;
        if sessions.len() >= self.max_sessions {
            evict_idle(&mut sessions);
        }
        sessions.insert(id, handle.clone());
        Ok(handle)
    }
}

fn evict_idle(sessions: &mut SessionMap) {
    let oldest = sessions
        .iter()
        .filter_map(|(id, handle)| handle.try_lock().ok().map(|s| (id.clone(), s.last_active())))
        .min_by_key(|(_, last_active)| *last_active)
        .map(|(id, _)| id);
    match oldest {
        Some(id) => {
            sessions.remove(&id);
            info!(session = %id, "idle session evicted");
        }
        None => warn!(open = sessions.len(), "session cap reached with every session busy"),
    }
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        let status = match err {
            HandlerError::NotFound { .. } => StatusCode::NOT_FOUND,
            HandlerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub system_prompt: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub allowed_tools: Option<Vec<String>>,
    pub max_round_trips: Option<usize>,
    pub debug: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub output: String,
    pub session_id: Option<String>,
    pub round_trips: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    fn failed(session_id: Option<String>, error: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            session_id,
            round_trips: 0,
            trace: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FaqQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

/// Descriptors visible under the server's configured allowlist.
pub async fn handle_list_tools(State(state): State<AppState>) -> Json<Value> {
    let catalog = state.agent.catalog();
    let tools: Vec<_> = allowlist::filter(catalog.list_all(), state.agent.allowed())
        .map(|d| d.schema())
        .collect();
    Json(json!({"tools": tools}))
}

/// Runs one call outside any conversation; the body is the raw payload.
pub async fn handle_invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> (StatusCode, Json<ToolCallResult>) {
    let raw = body.map(|Json(value)| RawArguments::from_value(value)).unwrap_or_default();
    let request = ToolCallRequest::new(&name, raw);
    let catalog = state.agent.catalog().clone();

    let prepared = allowlist::check(&name, state.agent.allowed())
        .and_then(|_| catalog.lookup(&name))
        .and_then(|entry| resolve_arguments(&entry.descriptor, &request.raw_arguments));
    let args = match prepared {
        Ok(args) => args,
        Err(err) => {
            let status = match err {
                ToolError::UnknownTool(_) => StatusCode::NOT_FOUND,
                ToolError::NotAllowed(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::BAD_REQUEST,
            };
            return (status, Json(ToolCallResult::failure(&request, None, &err)));
        }
    };

    let dispatcher = Dispatcher::new(catalog).with_timeout(state.agent.config.session.tool_timeout);
    let result = dispatcher.call(&request, args).await;
    info!(tool = %name, success = result.is_success(), "direct tool invocation");
    (StatusCode::OK, Json(result))
}

pub async fn handle_chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    if req.message.trim().is_empty() {
        return Json(ChatResponse::failed(req.session_id, "message required".to_string()));
    }

    let handle = match open_session(&state, &req) {
        Ok(handle) => handle,
        Err(err) => return Json(ChatResponse::failed(req.session_id.clone(), err.message)),
    };

    let mut session = handle.lock().await;
    let session_id = session.id().to_string();
    let outcome = session.run_turn(&req.message).await;
    let trace = if req.debug.unwrap_or(false) {
        serde_json::to_value(session.history()).ok()
    } else {
        None
    };

    let response = match outcome {
        Ok(result) => ChatResponse {
            success: true,
            output: result.output,
            session_id: Some(session_id),
            round_trips: result.round_trips,
            trace,
            error: None,
        },
        Err(err) => {
            warn!(session = %session_id, code = err.code(), "chat turn failed");
            ChatResponse {
                trace,
                ..ChatResponse::failed(Some(session_id), format!("{}: {}", err.code(), err))
            }
        }
    };
    Json(response)
}

/// Existing session by id, or a new one built from the agent config plus
/// the request overrides. Overrides are ignored for existing sessions.
fn open_session(state: &AppState, req: &ChatRequest) -> Result<Arc<tokio::sync::Mutex<Session>>, ApiError> {
    if let Some(id) = &req.session_id {
        return state
            .session(id)?
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown session: {}", id)));
    }

    let mut config = state.agent.config.clone();
    if let Some(provider) = req.provider.as_ref().filter(|p| **p != config.provider) {
        config.provider = provider.clone();
        config.model = default_model(provider).to_string();
    }
    if let Some(model) = &req.model {
        config.model = model.clone();
    }
    if let Some(temp) = req.temperature {
        config.temperature = temp;
    }
    if let Some(prompt) = &req.system_prompt {
        config.system_prompt = prompt.clone();
    }
    if let Some(allowed) = &req.allowed_tools {
        config.session.allowed_tools = Some(allowed.clone());
    }
    if let Some(max) = req.max_round_trips {
        config.session.max_round_trips = max;
    }
    let session = state
        .agent
        .start_session_with(config)
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, format!("{}: {}", err.code(), err)))?;
    state.insert_session(session)
}

pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = {
        let mut sessions = state.sessions.lock().map_err(|_| ApiError::internal("session lock error"))?;
        sessions.remove(&id)
    };
    match removed {
        Some(_) => {
            info!(session = %id, "session discarded");
            Ok(Json(json!({"deleted": id})))
        }
        None => Err(ApiError::new(StatusCode::NOT_FOUND, format!("unknown session: {}", id))),
    }
}

pub async fn handle_get_ticket(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let ticket = state
        .backend
        .get_ticket(&id)
        .await?
        .ok_or_else(|| HandlerError::not_found("ticket", &id))?;
    Ok(Json(json!(ticket)))
}

pub async fn handle_update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<UpdateTicketRequest>,
) -> Result<Json<Value>, ApiError> {
    let resp = state.backend.update_ticket(&id, update).await?;
    Ok(Json(json!(resp)))
}

pub async fn handle_suggest_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let suggestion = state.backend.suggest_response(&id).await?;
    Ok(Json(json!(suggestion)))
}

pub async fn handle_get_customer(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let customer = state
        .backend
        .get_customer(&id)
        .await?
        .ok_or_else(|| HandlerError::not_found("customer", &id))?;
    Ok(Json(json!(customer)))
}

pub async fn handle_search_faq(
    State(state): State<AppState>,
    Query(query): Query<FaqQuery>,
) -> Result<Json<Value>, ApiError> {
    let hits = state.backend.search_faq(&query.q).await?;
    Ok(Json(json!(hits)))
}
