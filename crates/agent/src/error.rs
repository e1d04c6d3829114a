//! Agent-level error type.

use thiserror::Error;
use toolweave_core::{DefinitionError, HistoryError, RuntimeError, ToolError};
use toolweave_tools::McpError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The inference stream produced something that is not a valid delta.
    #[error("Invalid inference delta: {0}")]
    InvalidDelta(String),

    #[error("Agent component '{0}' has been deleted")]
    ComponentInvalid(String),
}

impl AgentError {
    /// Errors caused by the agent's setup rather than by a turn.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Definition(_))
    }
}
