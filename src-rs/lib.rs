pub mod agent;
pub mod config;
pub mod error;
pub mod helpers;
pub mod result;

#[path = "llm/lib.rs"]
pub mod llm;
#[path = "tools/lib.rs"]
pub mod tools;
#[path = "support/lib.rs"]
pub mod support;
#[path = "api/lib.rs"]
pub mod api;

pub use agent::{Agent, LoopState, Session};
pub use config::{AgentConfig, SessionConfig};
pub use error::{HandlerError, ToolError, TurnError};
pub use result::TurnResult;
