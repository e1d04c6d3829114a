//! Error types for the toolweave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] aggregates them.

use thiserror::Error;

/// The top-level error type for all toolweave operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Runtime errors ---
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Definition / configuration errors ---
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by (or about) the external runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("call to '{capability}' failed: {reason}")]
    Call { capability: String, reason: String },

    #[error("failed to define component '{component_id}' ({component_type}): {reason}")]
    Define {
        component_type: String,
        component_id: String,
        reason: String,
    },

    #[error("failed to delete component '{component_id}': {reason}")]
    Delete { component_id: String, reason: String },

    #[error("component '{0}' is no longer valid")]
    ComponentInvalid(String),

    #[error("stream interrupted: {0}")]
    Stream(String),
}

/// Failures while resolving or invoking a tool.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Parameter \"{parameter}\" is required by {tool} but not provided")]
    MissingParameter { tool: String, parameter: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool invocation failed: {tool} ({call_id}): {reason}")]
    InvocationFailed {
        tool: String,
        call_id: String,
        reason: String,
    },

    #[error("Transport failure in {tool} ({call_id}): {reason}")]
    Transport {
        tool: String,
        call_id: String,
        reason: String,
    },

    #[error("Invalid response from {tool} ({call_id}): {reason}")]
    InvalidResponse {
        tool: String,
        call_id: String,
        reason: String,
    },
}

impl ToolError {
    /// Fatal errors abort the whole turn instead of being reported back to the model.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MissingParameter { .. })
    }
}

/// Malformed tool definitions, presets, and model selections.
#[derive(Debug, Clone, Error)]
pub enum DefinitionError {
    #[error("tool type is not \"{expected}\" (found \"{found}\")")]
    WrongType { expected: String, found: String },

    #[error("malformed tool definition '{name}': {reason}")]
    Malformed { name: String, reason: String },

    #[error("tool preset \"{0}\" does not exist")]
    UnknownPreset(String),

    #[error("invalid output path '{expression}': {reason}")]
    InvalidOutputPath { expression: String, reason: String },

    #[error("model \"{0}\" is not supported")]
    UnsupportedModel(String),

    #[error("model \"{model}\" requires attribute \"{attribute}\"")]
    MissingModelAttribute { model: String, attribute: String },
}
