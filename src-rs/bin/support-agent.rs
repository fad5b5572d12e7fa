use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use support_agent_rs::api::{AgentServer, AppState};
use support_agent_rs::config::env_opt;
use support_agent_rs::helpers::{build_backend, build_llm_router, init_tracing};
use support_agent_rs::support::support_catalog;
use support_agent_rs::{Agent, AgentConfig};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let port = env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(8080);

    let config = AgentConfig::from_env();
    let backend = match build_backend() {
        Ok(backend) => backend,
        Err(err) => {
            error!(error = %err, "failed to set up support backend");
            return ExitCode::FAILURE;
        }
    };
    let catalog = match support_catalog(backend.clone()) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!(error = %err, "invalid tool catalog");
            return ExitCode::FAILURE;
        }
    };
    let router = match build_llm_router(&config) {
        Ok(router) => router,
        Err(err) => {
            error!(error = %err, "no usable model provider");
            return ExitCode::FAILURE;
        }
    };

    let agent = match Agent::new("support-agent", config, Arc::new(router), Arc::new(catalog)) {
        Ok(agent) => agent,
        Err(err) => {
            error!(error = %err, "invalid allowed tool list");
            return ExitCode::FAILURE;
        }
    };
    let mut state = AppState::new(Arc::new(agent), backend);
    if let Some(max) = env_opt("SUPPORT_AGENT_MAX_SESSIONS").and_then(|raw| raw.parse::<usize>().ok()) {
        state = state.with_max_sessions(max);
    }
    let server = AgentServer::new(port, state);
    if let Err(err) = server.start().await {
        error!(error = %err, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
