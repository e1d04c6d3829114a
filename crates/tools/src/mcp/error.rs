use thiserror::Error;

/// Failures talking to an MCP tool server.
#[derive(Debug, Clone, Error)]
pub enum McpError {
    /// The server process could not be started.
    #[error("failed to spawn MCP server '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// I/O on the server's stdio failed or the process went away.
    #[error("transport error for MCP server '{server}': {reason}")]
    Transport { server: String, reason: String },

    /// The server answered with a JSON-RPC error.
    #[error("MCP server error [{code}]: {message}")]
    Server { code: i64, message: String },

    /// The server answered with something that is not valid MCP.
    #[error("protocol error from MCP server '{server}': {reason}")]
    Protocol { server: String, reason: String },
}
