pub use crate::agent::{Agent, Session};
pub use crate::config::AgentConfig;
pub use crate::result::TurnResult;
pub use crate::support::SupportBackend;

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::AgentServer;
