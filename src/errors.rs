use thiserror::Error;

use crate::providers::base::ProviderError;

/// Faults raised while dispatching a tool call. The agent folds these into the
/// conversation as tool output, they never end a session.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

pub type DispatchResult<T> = Result<T, ToolError>;

/// Faults that end a session.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Backend request failed: {0}")]
    Backend(#[from] ProviderError),

    #[error("Conversation history rejected a message: {0}")]
    History(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
