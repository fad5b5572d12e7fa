use serde::{Deserialize, Serialize};

use crate::tools::ToolCallResult;

/// Final answer of one turn plus the tool calls made along the way.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnResult {
    pub session_id: String,
    pub output: String,
    pub round_trips: usize,
    pub tool_results: Vec<ToolCallResult>,
}
