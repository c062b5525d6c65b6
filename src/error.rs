//! Error types for the analysis agent.

use thiserror::Error;

/// Top-level error for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The model requested a tool that is not registered. Fatal for the
    /// request; never retried.
    #[error("Unknown tool requested by model: {name}")]
    UnknownTool { name: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

/// Errors from the model gateway.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Authentication failed for {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Errors from tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {id}")]
    NotFound { id: String },

    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors resolving configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
