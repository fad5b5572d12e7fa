use std::net::SocketAddr;

use axum::routing::{delete, get, post};
use axum::Router;
use tracing::info;

use crate::api::handlers::{
    handle_chat, handle_delete_session, handle_get_customer, handle_get_ticket, handle_health, handle_invoke_tool,
    handle_list_tools, handle_search_faq, handle_suggest_response, handle_update_ticket, AppState,
};

pub struct AgentServer {
    pub port: u16,
    pub state: AppState,
}

impl AgentServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handle_health))
            .route("/tools", get(handle_list_tools))
            .route("/tools/:name/invoke", post(handle_invoke_tool))
            .route("/chat", post(handle_chat))
            .route("/sessions/:id", delete(handle_delete_session))
            .route("/tickets/:id", get(handle_get_ticket))
            .route("/tickets/:id/actions/update", post(handle_update_ticket))
            .route("/tickets/:id/actions/suggest_response", post(handle_suggest_response))
            .route("/customers/:id", get(handle_get_customer))
            .route("/faq/search", get(handle_search_faq))
            .with_state(self.state.clone())
    }

    pub async fn start(&self) -> Result<(), String> {
        let app = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!(%addr, "support agent listening");
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .map_err(|err| err.to_string())
    }
}
