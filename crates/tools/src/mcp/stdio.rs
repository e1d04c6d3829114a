//! MCP over a child process's stdio.
//!
//! One JSON-RPC message per line. Lines that are not JSON-RPC responses
//! (server logging, notifications, answers to other ids) are skipped.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::error::McpError;
use super::protocol::{
    CallToolResult, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    PROTOCOL_VERSION, RemoteTool, extract_result,
};
use super::{McpServerParams, SessionConnector, ToolServerSession};
use toolweave_core::Arguments;

/// Time a server gets to exit after its stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Spawns a fresh server process per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioConnector;

#[async_trait]
impl SessionConnector for StdioConnector {
    async fn connect(
        &self,
        params: &McpServerParams,
    ) -> Result<Box<dyn ToolServerSession>, McpError> {
        Ok(Box::new(StdioSession::spawn(params)?))
    }
}

pub struct StdioSession {
    server: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl StdioSession {
    pub fn spawn(params: &McpServerParams) -> Result<Self, McpError> {
        let spawn_err = |reason: String| McpError::Spawn {
            command: params.command.clone(),
            reason,
        };

        let mut cmd = Command::new(&params.command);
        cmd.args(&params.args)
            .envs(&params.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &params.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| spawn_err(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_err("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err("failed to capture stdout".into()))?;

        debug!(command = %params.command, pid = ?child.id(), "MCP server spawned");
        Ok(Self {
            server: params.command.clone(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            next_id: 1,
        })
    }

    fn transport_err(&self, reason: String) -> McpError {
        McpError::Transport {
            server: self.server.clone(),
            reason,
        }
    }

    async fn write_line<T: Serialize>(&mut self, message: &T) -> Result<(), McpError> {
        let err = |reason: String| McpError::Transport {
            server: self.server.clone(),
            reason,
        };
        let mut line = serde_json::to_string(message)
            .map_err(|e| err(format!("failed to serialize message: {e}")))?;
        line.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| err("session is closed".into()))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| err(format!("failed to write to stdin: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| err(format!("failed to flush stdin: {e}")))
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id;
        self.next_id += 1;
        self.write_line(&JsonRpcRequest::new(id, method, params))
            .await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| self.transport_err(format!("failed to read from stdout: {e}")))?;
            if read == 0 {
                return Err(self.transport_err(
                    "server stdout closed (process may have exited)".into(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(resp) if resp.id == Some(id) => return extract_result(resp),
                Ok(_) => continue,
                Err(_) => {
                    debug!(server = %self.server, line = %trimmed, "Skipping non-JSON-RPC output");
                }
            }
        }
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        self.write_line(&JsonRpcNotification::new(method, params))
            .await
    }

    fn protocol_err(&self, reason: String) -> McpError {
        McpError::Protocol {
            server: self.server.clone(),
            reason,
        }
    }
}

#[async_trait]
impl ToolServerSession for StdioSession {
    async fn initialize(&mut self) -> Result<(), McpError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "toolweave",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let result = self.request("initialize", Some(params)).await?;
        debug!(server = %self.server, server_info = %result["serverInfo"], "MCP session initialized");
        self.notify("notifications/initialized", None).await
    }

    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(c) => json!({"cursor": c}),
                None => json!({}),
            };
            let result = self.request("tools/list", Some(params)).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| self.protocol_err(format!("malformed tools/list result: {e}")))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Arguments,
    ) -> Result<CallToolResult, McpError> {
        let params = json!({"name": name, "arguments": arguments});
        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| self.protocol_err(format!("malformed tools/call result: {e}")))
    }

    async fn close(&mut self) -> Result<(), McpError> {
        // EOF on stdin is the stdio transport's shutdown signal.
        drop(self.stdin.take());
        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(server = %self.server, %status, "MCP server exited");
                Ok(())
            }
            Ok(Err(e)) => Err(self.transport_err(format!("failed to wait for server: {e}"))),
            Err(_) => {
                warn!(server = %self.server, "MCP server did not exit in time, killing it");
                self.child
                    .kill()
                    .await
                    .map_err(|e| self.transport_err(format!("failed to kill server: {e}")))
            }
        }
    }
}
